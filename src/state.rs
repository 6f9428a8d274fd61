use std::sync::{Arc, OnceLock};

use sea_orm::DatabaseConnection;

use crate::adapters::AdapterRegistry;
use crate::blob_store::BlobStore;
use crate::config::AppConfig;
use crate::queue::Queue;

/// The server version extracted from the Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Process-wide collaborators, assembled once at startup (§9 "Global
/// mutable state": "an explicit init-then-freeze pattern is preferred
/// over lazy singletons").
pub struct App {
    pub config: AppConfig,
    pub db: DatabaseConnection,
    pub blob_store: Arc<dyn BlobStore>,
    pub adapters: AdapterRegistry,
    pub queue: Arc<dyn Queue>,
}

static STORE: OnceLock<App> = OnceLock::new();

impl App {
    /// Idempotent within a process: a later call to `get` after this one
    /// sees the same, already-frozen state.
    pub fn init(
        config: AppConfig,
        db: DatabaseConnection,
        blob_store: Arc<dyn BlobStore>,
        adapters: AdapterRegistry,
        queue: Arc<dyn Queue>,
    ) -> &'static App {
        STORE.get_or_init(|| App { config, db, blob_store, adapters, queue })
    }

    /// Panics if `init` has not yet run; `main` calls `init` before doing
    /// anything else, so in practice this never panics.
    pub fn get() -> &'static App {
        STORE.get().expect("App::init was not called")
    }
}
