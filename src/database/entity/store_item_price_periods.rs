use sea_orm::entity::prelude::*;

/// At most one row per state has `ended_at = null` at any time (§3.8
/// invariant 1, §8 "Period monotonicity").
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "store_item_price_periods")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub store_item_state_id: Uuid,
    pub price: i64,
    pub discount_price: Option<i64>,
    pub started_at: DateTimeUtc,
    pub ended_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::store_item_states::Entity",
        from = "Column::StoreItemStateId",
        to = "super::store_item_states::Column::Id"
    )]
    StoreItemState,
}

impl Related<super::store_item_states::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StoreItemState.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
