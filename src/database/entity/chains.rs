use sea_orm::entity::prelude::*;

/// One row per chain known to the registry (§3.1, §4.5 "ensure the chain
/// record exists"). Seeded lazily from `crate::config::chain_display_names`
/// the first time a store auto-registers for a chain not yet recorded.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "chains")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub slug: String,
    pub display_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
