use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chain::ChainId;
use super::discovered::{IdentifierType, StoreMetadata};

/// Queue message payloads (§6.5). Every message carries the common
/// envelope fields plus a type-specific payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageBody {
    Discover {
        business_date: Option<chrono::NaiveDate>,
        store_filter: Option<String>,
    },
    Fetch {
        url: String,
        filename: String,
    },
    Expand {
        run_file_id: Uuid,
        blob_key: String,
    },
    Parse {
        run_file_id: Uuid,
        blob_key: String,
        filename: String,
        /// File-level identifier extracted in the Expand step, carried
        /// forward so a row group that falls back to `"unknown"` (no
        /// per-row `storeIdentifier`) still resolves against the file's
        /// own identifier rather than the placeholder (§4.2, §4.5).
        identifier_type: IdentifierType,
        identifier_value: Option<String>,
        store_metadata: Option<StoreMetadata>,
    },
    ParseChunked {
        run_file_id: Uuid,
        blob_key: String,
        filename: String,
        chunk_size: usize,
        identifier_type: IdentifierType,
        identifier_value: Option<String>,
        store_metadata: Option<StoreMetadata>,
    },
    Persist {
        run_file_id: Uuid,
        store_identifier: String,
        identifier_type: IdentifierType,
        store_metadata: Option<StoreMetadata>,
        rows_blob_key: String,
    },
    PersistChunk {
        run_chunk_id: Uuid,
        identifier_type: IdentifierType,
        identifier_value: Option<String>,
        store_metadata: Option<StoreMetadata>,
    },
    Rerun {
        target: RerunTarget,
    },
    EnrichStore {
        store_id: Uuid,
        task_kind: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RerunTarget {
    Run { run_id: Uuid },
    File { run_file_id: Uuid },
    Chunk { run_chunk_id: Uuid },
}

/// Common envelope every queue message carries (§6.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueMessage {
    pub id: Uuid,
    pub run_id: Uuid,
    pub chain: ChainId,
    pub created_at: DateTime<Utc>,
    pub delivery_attempt: u32,
    pub body: MessageBody,
}

impl QueueMessage {
    pub fn new(run_id: Uuid, chain: ChainId, body: MessageBody) -> Self {
        QueueMessage {
            id: Uuid::new_v4(),
            run_id,
            chain,
            created_at: Utc::now(),
            delivery_attempt: 0,
            body,
        }
    }
}

/// Maximum queue messages accepted per send call (§6.5).
pub const MAX_BATCH_SEND: usize = 100;
