use sea_orm::entity::prelude::*;

/// One row per `(store, retailer_item)` (§3.8). `price_signature` gates
/// whether a new `StoreItemPricePeriod` opens on the next observation.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "store_item_states")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub store_id: Uuid,
    pub retailer_item_id: Uuid,
    pub current_price: i64,
    pub previous_price: Option<i64>,
    pub discount_price: Option<i64>,
    pub discount_start: Option<DateTimeUtc>,
    pub discount_end: Option<DateTimeUtc>,
    pub unit_price: Option<i64>,
    pub unit_price_base_quantity: Option<String>,
    pub unit_price_base_unit: Option<String>,
    pub lowest_price_30d: Option<i64>,
    pub anchor_price: Option<i64>,
    pub anchor_price_as_of: Option<DateTimeUtc>,
    pub price_signature: String,
    pub last_seen_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(belongs_to = "super::stores::Entity", from = "Column::StoreId", to = "super::stores::Column::Id")]
    Store,
    #[sea_orm(
        belongs_to = "super::retailer_items::Entity",
        from = "Column::RetailerItemId",
        to = "super::retailer_items::Column::Id"
    )]
    RetailerItem,
    #[sea_orm(has_many = "super::store_item_price_periods::Entity")]
    PricePeriods,
}

impl Related<super::stores::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Store.def()
    }
}

impl Related<super::retailer_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RetailerItem.def()
    }
}

impl Related<super::store_item_price_periods::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PricePeriods.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
