use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};

use crate::config::ChainRegistry;
use crate::error::FetchError;
use crate::model::{ChainId, DiscoveredFile, ExtractedIdentifier, FetchedFile, FileType, IdentifierType, NormalizedRow, RowValidation};
use crate::parsers::{FieldMapping, ItemsPath, ParseOptions, ParseResult};

use super::base::{self, BaseAdapter};
use super::ChainAdapter;

static PORTAL_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)").unwrap());

/// Portal-id XML chain: discovery scrapes XML file links, identifier comes
/// from discovered-file metadata when present, otherwise a filename regex
/// (§4.2 "Portal-id XML chains").
pub struct EurospinAdapter {
    base: BaseAdapter,
}

impl EurospinAdapter {
    pub fn new(client: Client) -> Self {
        let config = ChainRegistry::init().config(ChainId::Eurospin).clone();
        EurospinAdapter {
            base: BaseAdapter::new(client, config, 1.0, 3),
        }
    }

    fn mapping() -> FieldMapping {
        let mut mapping = FieldMapping::new("naziv", "cijena");
        mapping.barcodes = Some("barkod".to_string());
        mapping.store_identifier = Some("poslovnica".to_string());
        mapping
    }
}

#[async_trait]
impl ChainAdapter for EurospinAdapter {
    fn chain_id(&self) -> ChainId {
        ChainId::Eurospin
    }

    fn set_discovery_date(&self, date: Option<NaiveDate>) {
        self.base.set_discovery_date(date);
    }

    async fn discover(&self) -> Vec<DiscoveredFile> {
        let Ok(response) = self.base.get(self.base.config.base_url).await else {
            return Vec::new();
        };
        let Ok(body) = response.text().await else {
            return Vec::new();
        };
        let Ok(selector) = Selector::parse("a[href$='.xml'], a[href$='.XML']") else {
            return Vec::new();
        };
        let document = Html::parse_document(&body);
        document
            .select(&selector)
            .filter_map(|el| el.value().attr("href"))
            .map(|url| DiscoveredFile {
                url: url.to_string(),
                filename: BaseAdapter::filename_from_url(url),
                file_type: FileType::Xml,
                size: None,
                last_modified: None,
                metadata: Default::default(),
            })
            .collect()
    }

    async fn fetch(&self, file: &DiscoveredFile) -> Result<FetchedFile, FetchError> {
        self.base.fetch(file).await
    }

    fn parse(&self, content: &[u8], filename: &str) -> ParseResult {
        let options = ParseOptions {
            mapping: Self::mapping(),
            items_path: Some(ItemsPath::parse("products.product")),
            alternative_items_paths: vec![ItemsPath::parse("catalog.items.item")],
            ..Default::default()
        };
        crate::parsers::parse_xml(content, filename, &options)
    }

    fn extract_store_identifier(&self, file: &DiscoveredFile) -> Option<ExtractedIdentifier> {
        if let Some(value) = file.metadata.get("storeId") {
            return Some(ExtractedIdentifier {
                identifier_type: IdentifierType::PortalId,
                value: value.clone(),
            });
        }
        PORTAL_ID_PATTERN.captures(&file.filename).and_then(|c| c.get(1)).map(|m| ExtractedIdentifier {
            identifier_type: IdentifierType::PortalId,
            value: m.as_str().to_string(),
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
    fn prefers_declared_metadata_over_filename_regex() {
        let adapter = EurospinAdapter::new(Client::new());
        let mut metadata = std::collections::HashMap::new();
        metadata.insert("storeId".to_string(), "77".to_string());
        let file = DiscoveredFile {
            url: "https://example.test/cjenik_12.xml".to_string(),
            filename: "cjenik_12.xml".to_string(),
            file_type: FileType::Xml,
            size: None,
            last_modified: None,
            metadata,
        };
        let identifier = adapter.extract_store_identifier(&file).unwrap();
        assert_eq!(identifier.value, "77");
    }

    #[test]
    fn falls_back_to_filename_digits_when_metadata_absent() {
        let adapter = EurospinAdapter::new(Client::new());
        let file = DiscoveredFile {
            url: "https://example.test/cjenik_12.xml".to_string(),
            filename: "cjenik_12.xml".to_string(),
            file_type: FileType::Xml,
            size: None,
            last_modified: None,
            metadata: Default::default(),
        };
        let identifier = adapter.extract_store_identifier(&file).unwrap();
        assert_eq!(identifier.value, "12");
    }
}
