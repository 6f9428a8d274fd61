use sea_orm::entity::prelude::*;

/// A product as known to one chain, resolved by `(chain, external_id)` then
/// `(chain, name)` (§3.7).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "retailer_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub chain_slug: String,
    pub external_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub unit: Option<String>,
    pub unit_quantity: Option<String>,
    pub image_url: Option<String>,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::retailer_item_barcodes::Entity")]
    Barcodes,
    #[sea_orm(has_many = "super::store_item_states::Entity")]
    StoreItemStates,
}

impl Related<super::retailer_item_barcodes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Barcodes.def()
    }
}

impl Related<super::store_item_states::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StoreItemStates.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
