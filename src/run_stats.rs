use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::database::entity::{run_files, runs};

pub const STATUS_RUNNING: &str = "running";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_FAILED: &str = "failed";

pub const FILE_STATUS_PENDING: &str = "pending";
pub const FILE_STATUS_COMPLETED: &str = "completed";
pub const FILE_STATUS_FAILED: &str = "failed";

/// Single-row-per-run counters (§4.6). Initialization zeroes every
/// counter and sets `status = running`; each phase completion makes a
/// monotonic increment; `check_completion` derives the terminal status
/// after every file's persist.
pub async fn start_run(db: &DatabaseConnection, chain_slug: &str) -> Result<runs::Model, DbErr> {
    let run = runs::ActiveModel {
        id: Set(Uuid::new_v4()),
        chain_slug: Set(chain_slug.to_string()),
        status: Set(STATUS_RUNNING.to_string()),
        total_files: Set(0),
        processed_files: Set(0),
        total_entries: Set(0),
        processed_entries: Set(0),
        error_count: Set(0),
        started_at: Set(Utc::now()),
        completed_at: Set(None),
        parent_run_id: Set(None),
        rerun_type: Set(None),
        rerun_target_id: Set(None),
    };
    run.insert(db).await
}

pub async fn record_total_files(db: &DatabaseConnection, run_id: Uuid, total: usize) -> Result<(), DbErr> {
    let run = runs::Entity::find_by_id(run_id).one(db).await?.expect("run must exist");
    let mut active: runs::ActiveModel = run.into();
    active.total_files = Set(total as i32);
    active.update(db).await?;
    Ok(())
}

pub async fn record_total_entries(db: &DatabaseConnection, run_id: Uuid, delta: usize) -> Result<(), DbErr> {
    let run = runs::Entity::find_by_id(run_id).one(db).await?.expect("run must exist");
    let mut active: runs::ActiveModel = run.clone().into();
    active.total_entries = Set(run.total_entries + delta as i32);
    active.update(db).await?;
    Ok(())
}

pub async fn increment_processed_entries(db: &DatabaseConnection, run_id: Uuid, delta: usize) -> Result<(), DbErr> {
    let run = runs::Entity::find_by_id(run_id).one(db).await?.expect("run must exist");
    let mut active: runs::ActiveModel = run.clone().into();
    active.processed_entries = Set(run.processed_entries + delta as i32);
    active.update(db).await?;
    Ok(())
}

pub async fn record_error(db: &DatabaseConnection, run_id: Uuid) -> Result<(), DbErr> {
    let run = runs::Entity::find_by_id(run_id).one(db).await?.expect("run must exist");
    let mut active: runs::ActiveModel = run.clone().into();
    active.error_count = Set(run.error_count + 1);
    active.update(db).await?;
    Ok(())
}

/// Marks one run-scoped file row complete or failed, then re-derives the
/// run's terminal status from every file's status (§4.3 "Persist": "When
/// `processedFiles == totalFiles` and no file has failed, mark the run
/// `completed`; if any failed, mark `failed`").
pub async fn complete_file(db: &DatabaseConnection, run_file_id: Uuid, failed: bool) -> Result<(), DbErr> {
    let file = run_files::Entity::find_by_id(run_file_id).one(db).await?.expect("run file must exist");
    let run_id = file.run_id;
    let mut active: run_files::ActiveModel = file.into();
    active.status = Set(if failed { FILE_STATUS_FAILED } else { FILE_STATUS_COMPLETED }.to_string());
    active.update(db).await?;

    let run = runs::Entity::find_by_id(run_id).one(db).await?.expect("run must exist");
    let mut run_active: runs::ActiveModel = run.clone().into();
    run_active.processed_files = Set(run.processed_files + 1);
    run_active.update(db).await?;

    check_completion(db, run_id).await
}

/// Promotes a run to `completed`/`failed` once every one of its files has
/// reached a terminal per-file status; a no-op otherwise.
pub async fn check_completion(db: &DatabaseConnection, run_id: Uuid) -> Result<(), DbErr> {
    let run = runs::Entity::find_by_id(run_id).one(db).await?.expect("run must exist");
    if run.status != STATUS_RUNNING {
        return Ok(());
    }
    if run.processed_files < run.total_files {
        return Ok(());
    }

    let failed = run_files::Entity::find()
        .filter(run_files::Column::RunId.eq(run_id))
        .filter(run_files::Column::Status.eq(FILE_STATUS_FAILED))
        .one(db)
        .await?
        .is_some();

    let mut active: runs::ActiveModel = run.into();
    active.status = Set(if failed { STATUS_FAILED } else { STATUS_COMPLETED }.to_string());
    active.completed_at = Set(Some(Utc::now()));
    active.update(db).await?;
    Ok(())
}

/// Marks a run failed outright, e.g. on pipeline cancellation or a fatal
/// discover/parse error (§5 "Cancellation and timeouts", §4.3 "Retries
/// and DLQ").
pub async fn fail_run(db: &DatabaseConnection, run_id: Uuid) -> Result<(), DbErr> {
    let run = runs::Entity::find_by_id(run_id).one(db).await?.expect("run must exist");
    let mut active: runs::ActiveModel = run.into();
    active.status = Set(STATUS_FAILED.to_string());
    active.completed_at = Set(Some(Utc::now()));
    active.update(db).await?;
    Ok(())
}

/// Marks a run `completed` immediately, used when discovery returns no
/// files (§4.3 "Discover": "On empty result, mark the run terminally
/// complete").
pub async fn complete_empty_run(db: &DatabaseConnection, run_id: Uuid) -> Result<(), DbErr> {
    let run = runs::Entity::find_by_id(run_id).one(db).await?.expect("run must exist");
    let mut active: runs::ActiveModel = run.into();
    active.status = Set(STATUS_COMPLETED.to_string());
    active.completed_at = Set(Some(Utc::now()));
    active.update(db).await?;
    Ok(())
}
