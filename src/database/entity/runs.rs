use sea_orm::entity::prelude::*;

/// Single-row-per-run counters and terminal status (§4.6). `parent_run_id`,
/// `rerun_type`, and `rerun_target_id` are set only on runs created by the
/// rerun queue message (§4.3 "Rerun").
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "runs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub chain_slug: String,
    pub status: String,
    pub total_files: i32,
    pub processed_files: i32,
    pub total_entries: i32,
    pub processed_entries: i32,
    pub error_count: i32,
    pub started_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
    pub parent_run_id: Option<Uuid>,
    pub rerun_type: Option<String>,
    pub rerun_target_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::run_files::Entity")]
    Files,
}

impl Related<super::run_files::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Files.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
