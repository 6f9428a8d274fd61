use sea_orm::entity::prelude::*;

/// Per-discovered-file bookkeeping for one run (§4.3 "When all chunks of a
/// file complete, mark the file complete").
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "run_files")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub run_id: Uuid,
    pub filename: String,
    pub url: String,
    pub status: String,
    pub hash: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(belongs_to = "super::runs::Entity", from = "Column::RunId", to = "super::runs::Column::Id")]
    Run,
    #[sea_orm(has_many = "super::run_chunks::Entity")]
    Chunks,
}

impl Related<super::runs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Run.def()
    }
}

impl Related<super::run_chunks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chunks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
