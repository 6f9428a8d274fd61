use log::info;
use sea_orm::Database as SeaDatabase;
use std::{fs::create_dir_all, path::Path};

pub mod entity;

pub use sea_orm::DatabaseConnection;
pub use sea_orm::DbErr;

/// Database error result type.
pub type DbResult<T> = Result<T, DbErr>;

/// Connects to `database_url` (§6.2, §6.6). The schema itself is assumed
/// provided by the deployment; this build never runs migrations.
pub async fn init(database_url: &str) -> DatabaseConnection {
    if let Some(path) = sqlite_file_path(database_url) {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                create_dir_all(parent).expect("unable to create parent directory for sqlite database");
            }
        }
    }

    info!("connecting to database");
    SeaDatabase::connect(database_url)
        .await
        .expect("unable to create database connection")
}

/// Extracts a filesystem path from a `sqlite://...` URL so its parent
/// directory can be created before sea-orm opens it, mirroring sqlx's
/// `mode=rwc` behaviour for the file itself.
fn sqlite_file_path(database_url: &str) -> Option<&Path> {
    let rest = database_url.strip_prefix("sqlite://").or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split(['?', '#']).next().unwrap_or(rest);
    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(Path::new(path))
    }
}
