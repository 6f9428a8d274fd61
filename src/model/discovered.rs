use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use super::chain::FileType;

/// A file an adapter's `discover` step found on a chain's portal (§3.2).
/// Immutable once constructed.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredFile {
    pub url: String,
    pub filename: String,
    pub file_type: FileType,
    pub size: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
    pub metadata: HashMap<String, String>,
}

/// A `DiscoveredFile` after its bytes have been retrieved (§3.3).
#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub discovered: DiscoveredFile,
    pub content: Vec<u8>,
    pub content_hash: String,
}

/// One unit of parseable content produced by the Expand phase (§3.4). A
/// non-archive fetched file produces exactly one entry; a ZIP fans out into
/// many.
#[derive(Debug, Clone)]
pub struct ExpandedEntry {
    pub filename: String,
    pub file_type: FileType,
    pub content: Vec<u8>,
    pub hash: String,
    pub parent_discovered: DiscoveredFile,
}

/// Metadata an adapter can derive from a discovered file's name/URL for
/// store auto-registration (§4.2 "extractStoreMetadata").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMetadata {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
}

/// A resolved or unresolved store identifier extracted from a discovered
/// file (§3.6 `StoreIdentifier`, §4.2 "extractStoreIdentifier").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IdentifierType {
    FilenameCode,
    PortalId,
    National,
    InternalId,
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedIdentifier {
    pub identifier_type: IdentifierType,
    pub value: String,
}
