use sea_orm::entity::prelude::*;

/// Additive: barcodes are never removed on re-ingest (§3.7, §8 "Barcode
/// monotonicity"). A barcode appears at most once per retailer item.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "retailer_item_barcodes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub retailer_item_id: Uuid,
    pub barcode: String,
    pub is_primary: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::retailer_items::Entity",
        from = "Column::RetailerItemId",
        to = "super::retailer_items::Column::Id"
    )]
    RetailerItem,
}

impl Related<super::retailer_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RetailerItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
