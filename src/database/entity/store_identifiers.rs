use sea_orm::entity::prelude::*;

/// `(chain, type, value)` resolves to at most one store (§3.6, §8
/// "Identifier uniqueness"). `chain_slug` is duplicated from `stores` so
/// the uniqueness constraint and the resolution lookup are both single-
/// table, index-friendly operations.
/// The schema carries a unique index on `(chain_slug, identifier_type,
/// value)`; it is assumed provided rather than declared here (no migration
/// crate is part of this build).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "store_identifiers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub store_id: Uuid,
    pub chain_slug: String,
    pub identifier_type: String,
    pub value: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(belongs_to = "super::stores::Entity", from = "Column::StoreId", to = "super::stores::Column::Id")]
    Store,
}

impl Related<super::stores::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Store.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
