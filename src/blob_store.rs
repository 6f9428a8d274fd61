use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::BlobStoreError;

/// Collaborator interface for content-addressed storage of immutable
/// payloads (§6.1). Keys are forward-slash-separated path strings rooted
/// by chain slug; the core never assumes a particular backend.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        metadata: HashMap<String, String>,
    ) -> Result<(), BlobStoreError>;

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, BlobStoreError>;

    async fn head(&self, key: &str) -> Result<Option<String>, BlobStoreError>;

    async fn exists(&self, key: &str) -> Result<bool, BlobStoreError> {
        Ok(self.head(key).await?.is_some())
    }
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub metadata: HashMap<String, String>,
}

/// Filesystem-backed `BlobStore`, sufficient to run the pipeline
/// standalone (§E of SPEC_FULL.md). Metadata is stored as a JSON sidecar
/// file next to the payload.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsBlobStore { root: root.into() }
    }

    fn payload_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn metadata_path(&self, key: &str) -> PathBuf {
        let mut path = self.payload_path(key).into_os_string();
        path.push(".meta.json");
        PathBuf::from(path)
    }
}

#[async_trait::async_trait]
impl BlobStore for FsBlobStore {
    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        metadata: HashMap<String, String>,
    ) -> Result<(), BlobStoreError> {
        let payload_path = self.payload_path(key);
        let metadata_path = self.metadata_path(key);
        if let Some(parent) = payload_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| BlobStoreError::Io {
                    key: key.to_string(),
                    source,
                })?;
        }
        tokio::fs::write(&payload_path, bytes)
            .await
            .map_err(|source| BlobStoreError::Io {
                key: key.to_string(),
                source,
            })?;
        let metadata_json = serde_json::to_vec(&metadata).unwrap_or_default();
        tokio::fs::write(&metadata_path, metadata_json)
            .await
            .map_err(|source| BlobStoreError::Io {
                key: key.to_string(),
                source,
            })?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, BlobStoreError> {
        let payload_path = self.payload_path(key);
        match tokio::fs::read(&payload_path).await {
            Ok(bytes) => {
                let metadata = match tokio::fs::read(self.metadata_path(key)).await {
                    Ok(raw) => serde_json::from_slice(&raw).unwrap_or_default(),
                    Err(_) => HashMap::new(),
                };
                Ok(Some(StoredObject { bytes, metadata }))
            }
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(BlobStoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    async fn head(&self, key: &str) -> Result<Option<String>, BlobStoreError> {
        match tokio::fs::read(self.metadata_path(key)).await {
            Ok(raw) => {
                let metadata: HashMap<String, String> =
                    serde_json::from_slice(&raw).unwrap_or_default();
                Ok(metadata.get("sha256").cloned().or(Some(String::new())))
            }
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(BlobStoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// In-memory `BlobStore`, used by orchestrator/persistence unit tests
/// (§D of SPEC_FULL.md) so phase-transition tests need no filesystem.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: parking_lot::Mutex<HashMap<String, StoredObject>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        metadata: HashMap<String, String>,
    ) -> Result<(), BlobStoreError> {
        self.objects.lock().insert(
            key.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                metadata,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, BlobStoreError> {
        Ok(self.objects.lock().get(key).cloned())
    }

    async fn head(&self, key: &str) -> Result<Option<String>, BlobStoreError> {
        Ok(self
            .objects
            .lock()
            .get(key)
            .and_then(|obj| obj.metadata.get("sha256").cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trips_bytes_and_metadata() {
        let store = MemoryBlobStore::new();
        let metadata = HashMap::from([("sha256".to_string(), "abc123".to_string())]);
        store.put("konzum/a.csv", b"hello", metadata).await.unwrap();

        let fetched = store.get("konzum/a.csv").await.unwrap().unwrap();
        assert_eq!(fetched.bytes, b"hello");
        assert_eq!(store.head("konzum/a.csv").await.unwrap().as_deref(), Some("abc123"));
        assert!(store.exists("konzum/a.csv").await.unwrap());
        assert!(!store.exists("konzum/missing.csv").await.unwrap());
    }
}
