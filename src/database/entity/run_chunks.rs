use sea_orm::entity::prelude::*;

/// A zero-based slice of a parsed file's rows, persisted independently in
/// queue mode (§4.3 "Parse" chunking).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "run_chunks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub run_file_id: Uuid,
    pub chunk_index: i32,
    pub status: String,
    pub start_row: i32,
    pub end_row: i32,
    pub row_count: i32,
    pub blob_key: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::run_files::Entity",
        from = "Column::RunFileId",
        to = "super::run_files::Column::Id"
    )]
    RunFile,
}

impl Related<super::run_files::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RunFile.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
