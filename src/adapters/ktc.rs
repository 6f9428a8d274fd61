use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};

use crate::config::ChainRegistry;
use crate::error::FetchError;
use crate::model::{ChainId, DiscoveredFile, ExtractedIdentifier, FetchedFile, FileType, IdentifierType, NormalizedRow, RowValidation};
use crate::parsers::{FieldMapping, ParseOptions, ParseResult};

use super::base::{self, BaseAdapter};
use super::ChainAdapter;

static CODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(PJ[0-9A-Za-z]*-\d+)-\d{8}-\d{6}\.csv$").unwrap());

/// Two-level store-index chain: a listing page links to per-store pages,
/// each of which links to the store's CSV (§4.2 "Filename-coded CSV
/// chains ... organized as a two-level store index").
pub struct KtcAdapter {
    base: BaseAdapter,
}

impl KtcAdapter {
    pub fn new(client: Client) -> Self {
        let config = ChainRegistry::init().config(ChainId::Ktc).clone();
        KtcAdapter {
            base: BaseAdapter::new(client, config, 1.0, 3),
        }
    }

    fn mapping() -> FieldMapping {
        let mut mapping = FieldMapping::new("naziv", "cijena");
        mapping.barcodes = Some("barkod".to_string());
        mapping
    }

    async fn store_page_links(&self) -> Vec<String> {
        let Ok(response) = self.base.get(self.base.config.base_url).await else {
            return Vec::new();
        };
        let Ok(body) = response.text().await else {
            return Vec::new();
        };
        let Ok(selector) = Selector::parse("a[href]") else {
            return Vec::new();
        };
        let document = Html::parse_document(&body);
        document
            .select(&selector)
            .filter_map(|el| el.value().attr("href"))
            .map(|s| s.to_string())
            .collect()
    }
}

#[async_trait]
impl ChainAdapter for KtcAdapter {
    fn chain_id(&self) -> ChainId {
        ChainId::Ktc
    }

    fn set_discovery_date(&self, date: Option<NaiveDate>) {
        self.base.set_discovery_date(date);
    }

    async fn discover(&self) -> Vec<DiscoveredFile> {
        let store_pages = self.store_page_links().await;
        let csv_selector = Selector::parse("a[href$='.csv'], a[href$='.CSV']").unwrap();
        let mut seen = HashSet::new();
        let mut files = Vec::new();

        for store_page in store_pages {
            let Ok(response) = self.base.get(&store_page).await else {
                continue;
            };
            let Ok(body) = response.text().await else {
                continue;
            };
            let document = Html::parse_document(&body);
            for el in document.select(&csv_selector) {
                if let Some(url) = el.value().attr("href") {
                    if seen.insert(url.to_string()) {
                        files.push(DiscoveredFile {
                            url: url.to_string(),
                            filename: BaseAdapter::filename_from_url(url),
                            file_type: FileType::Csv,
                            size: None,
                            last_modified: None,
                            metadata: Default::default(),
                        });
                    }
                }
            }
        }

        files
    }

    async fn fetch(&self, file: &DiscoveredFile) -> Result<FetchedFile, FetchError> {
        self.base.fetch(file).await
    }

    fn parse(&self, content: &[u8], filename: &str) -> ParseResult {
        let options = ParseOptions {
            mapping: Self::mapping(),
            delimiter: b';',
            encoding: self.base.config.csv_dialect.map(|d| d.encoding).unwrap_or(crate::model::Encoding::Windows1250),
            ..Default::default()
        };
        crate::parsers::parse_csv(content, filename, &options)
    }

    fn extract_store_identifier(&self, file: &DiscoveredFile) -> Option<ExtractedIdentifier> {
        BaseAdapter::extract_code(&CODE_PATTERN, &file.filename, &[]).map(|value| ExtractedIdentifier {
            identifier_type: IdentifierType::FilenameCode,
            value,
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
    fn extracts_hyphenated_store_code_with_letter_suffix() {
        let filename = "TRGOVINA-PAKRACKA ULICA 1 BJELOVAR-PJ50-1-20260105-071001.csv";
        let code = BaseAdapter::extract_code(&CODE_PATTERN, filename, &[]);
        assert_eq!(code.as_deref(), Some("PJ50-1"));
    }
}
