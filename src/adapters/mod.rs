mod base;
mod dm;
mod eurospin;
mod konzum;
mod ktc;
mod lidl;
mod metro;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::Client;

use crate::error::FetchError;
use crate::model::{ChainId, DiscoveredFile, ExtractedIdentifier, FetchedFile, NormalizedRow, RowValidation, StoreMetadata};
use crate::parsers::ParseResult;

pub use base::BaseAdapter;

/// Per-chain contract every adapter implements (§4.2). None of these
/// methods throw to the orchestrator: discovery/parse/validation failures
/// are reported inside their own result types, and `fetch` is the single
/// operation with a real error channel.
#[async_trait::async_trait]
pub trait ChainAdapter: Send + Sync {
    fn chain_id(&self) -> ChainId;

    /// Sticky setter (§4.2 "discover"): subsequent `discover` calls are
    /// scoped to this date until changed or cleared.
    fn set_discovery_date(&self, date: Option<NaiveDate>);

    async fn discover(&self) -> Vec<DiscoveredFile>;

    async fn fetch(&self, file: &DiscoveredFile) -> Result<FetchedFile, FetchError>;

    fn parse(&self, content: &[u8], filename: &str) -> ParseResult;

    fn extract_store_identifier(&self, file: &DiscoveredFile) -> Option<ExtractedIdentifier>;

    fn extract_store_metadata(&self, _file: &DiscoveredFile) -> Option<StoreMetadata> {
        None
    }

    fn validate_row(&self, row: &NormalizedRow) -> RowValidation {
        base::default_validate_row(row, base::DEFAULT_BARCODE_LENGTHS)
    }
}

/// Process-scoped adapter registry, built once at startup from the chain
/// registry and a shared HTTP client (§9 "Global mutable state").
pub struct AdapterRegistry {
    adapters: HashMap<ChainId, Arc<dyn ChainAdapter>>,
}

impl AdapterRegistry {
    pub fn build(client: Client) -> Self {
        let mut adapters: HashMap<ChainId, Arc<dyn ChainAdapter>> = HashMap::new();
        adapters.insert(ChainId::Konzum, Arc::new(konzum::KonzumAdapter::new(client.clone())));
        adapters.insert(ChainId::Ktc, Arc::new(ktc::KtcAdapter::new(client.clone())));
        adapters.insert(ChainId::Metro, Arc::new(metro::MetroAdapter::new(client.clone())));
        adapters.insert(ChainId::Lidl, Arc::new(lidl::LidlAdapter::new(client.clone())));
        adapters.insert(ChainId::DmDrogerieMarkt, Arc::new(dm::DmAdapter::new(client.clone())));
        adapters.insert(ChainId::Eurospin, Arc::new(eurospin::EurospinAdapter::new(client)));
        AdapterRegistry { adapters }
    }

    pub fn get(&self, id: ChainId) -> Arc<dyn ChainAdapter> {
        self.adapters
            .get(&id)
            .unwrap_or_else(|| panic!("chain {id} missing an adapter"))
            .clone()
    }
}
