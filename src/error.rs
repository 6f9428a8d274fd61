use thiserror::Error;

/// Transient discovery failure (HTTP or HTML layout). Per §4.2 discovery
/// never throws to its caller — this type exists for the adapter's
/// internal logging before it collapses to an empty result.
#[derive(Debug, Error)]
pub enum DiscoverError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected HTTP status {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("could not locate expected markup on {url}: {reason}")]
    Layout { url: String, reason: String },
}

/// Fetch failure (§7): non-2xx status or transport failure.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected HTTP status {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("failed to read local file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// ZIP expansion failure (§7): per-parent non-fatal.
#[derive(Debug, Error)]
pub enum ExpandError {
    #[error("failed to open archive {filename}: {source}")]
    Archive {
        filename: String,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("failed to read entry {entry} in {filename}: {source}")]
    Entry {
        filename: String,
        entry: String,
        #[source]
        source: std::io::Error,
    },
}

/// Store resolution failure (§7): identifier did not resolve and
/// auto-register was not provided.
#[derive(Debug, Error)]
pub enum StoreResolutionError {
    #[error("identifier {identifier_type:?}:{value} did not resolve to a store in chain {chain}")]
    NotFound {
        chain: String,
        identifier_type: crate::model::IdentifierType,
        value: String,
    },
    #[error("database error resolving store identifier: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Persistence failure (§7): database failure, per-store non-fatal in
/// single-process mode.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error(transparent)]
    StoreResolution(#[from] StoreResolutionError),
}

/// Geocoding/enrichment failure (§7): task marked failed, store status
/// unchanged.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("enrichment task {task_kind} for store {store_id} failed: {reason}")]
    TaskFailed {
        store_id: uuid::Uuid,
        task_kind: String,
        reason: String,
    },
}

/// Blob store failure, a collaborator-interface error (§6.1).
#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("blob store I/O error at key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}
