use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;

use crate::config::ChainRegistry;
use crate::error::FetchError;
use crate::model::{ChainId, DiscoveredFile, ExtractedIdentifier, FetchedFile, FileType, IdentifierType, NormalizedRow, RowValidation};
use crate::parsers::{FieldMapping, ParseOptions, ParseResult};

use super::base::{self, BaseAdapter};
use super::ChainAdapter;

/// National chain: one published price list, one fixed sentinel identifier
/// regardless of filename (§4.2 "National chains").
pub struct DmAdapter {
    base: BaseAdapter,
}

impl DmAdapter {
    pub fn new(client: Client) -> Self {
        let config = ChainRegistry::init().config(ChainId::DmDrogerieMarkt).clone();
        DmAdapter {
            base: BaseAdapter::new(client, config, 1.0, 3),
        }
    }

    fn mapping() -> FieldMapping {
        let mut mapping = FieldMapping::new("naziv", "cijena");
        mapping.barcodes = Some("barkod".to_string());
        mapping
    }
}

#[async_trait]
impl ChainAdapter for DmAdapter {
    fn chain_id(&self) -> ChainId {
        ChainId::DmDrogerieMarkt
    }

    fn set_discovery_date(&self, date: Option<NaiveDate>) {
        self.base.set_discovery_date(date);
    }

    async fn discover(&self) -> Vec<DiscoveredFile> {
        let url = self.base.config.base_url.to_string();
        let filename = BaseAdapter::filename_from_url(&url);
        vec![DiscoveredFile {
            url,
            filename,
            file_type: FileType::Csv,
            size: None,
            last_modified: None,
            metadata: Default::default(),
        }]
    }

    async fn fetch(&self, file: &DiscoveredFile) -> Result<FetchedFile, FetchError> {
        self.base.fetch(file).await
    }

    fn parse(&self, content: &[u8], filename: &str) -> ParseResult {
        let options = ParseOptions {
            mapping: Self::mapping(),
            default_store_identifier: Some(base::national_sentinel(self.base.config.id.slug())),
            ..Default::default()
        };
        crate::parsers::parse_csv(content, filename, &options)
    }

    fn extract_store_identifier(&self, _file: &DiscoveredFile) -> Option<ExtractedIdentifier> {
        Some(ExtractedIdentifier {
            identifier_type: IdentifierType::National,
            value: base::national_sentinel(self.base.config.id.slug()),
        })
    }

    fn validate_row(&self, row: &NormalizedRow) -> RowValidation {
        base::default_validate_row(row, base::DEFAULT_BARCODE_LENGTHS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_filename_resolves_to_the_same_national_sentinel() {
        let adapter = DmAdapter::new(Client::new());
        let for_input = |name: &str| {
            adapter
                .extract_store_identifier(&DiscoveredFile {
                    url: format!("https://example.test/{name}"),
                    filename: name.to_string(),
                    file_type: FileType::Csv,
                    size: None,
                    last_modified: None,
                    metadata: Default::default(),
                })
                .unwrap()
                .value
        };
        assert_eq!(for_input("any.csv"), "dm_national");
        assert_eq!(for_input("2026-08-01.csv"), "dm_national");
    }
}
