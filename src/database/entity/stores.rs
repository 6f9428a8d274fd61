use sea_orm::entity::prelude::*;

/// Physical or virtual store (§3.6). A virtual store holds the canonical
/// prices for a national-pricing chain; a physical store may inherit
/// prices from one via `price_source_store_id`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "stores")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub chain_slug: String,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub is_virtual: bool,
    pub status: String,
    pub price_source_store_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::store_identifiers::Entity")]
    StoreIdentifiers,
    #[sea_orm(has_many = "super::store_item_states::Entity")]
    StoreItemStates,
}

impl Related<super::store_identifiers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StoreIdentifiers.def()
    }
}

impl Related<super::store_item_states::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StoreItemStates.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
