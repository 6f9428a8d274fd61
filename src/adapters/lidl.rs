use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};

use crate::config::ChainRegistry;
use crate::error::FetchError;
use crate::model::{ChainId, DiscoveredFile, Encoding, ExtractedIdentifier, FetchedFile, FileType, IdentifierType, NormalizedRow, RowValidation};
use crate::parsers::{FieldMapping, ParseOptions, ParseResult};

use super::base::{self, BaseAdapter};
use super::ChainAdapter;

static CODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(PJ[0-9A-Za-z]*-\d+)-\d{8}-\d{6}\.csv$").unwrap());

/// ZIP-based chain with tightened GTIN validation and multi-barcode
/// post-processing (§4.2 "Lidl-specific post-processing").
pub struct LidlAdapter {
    base: BaseAdapter,
}

impl LidlAdapter {
    pub fn new(client: Client) -> Self {
        let config = ChainRegistry::init().config(ChainId::Lidl).clone();
        LidlAdapter {
            base: BaseAdapter::new(client, config, 1.0, 3),
        }
    }

    fn mapping() -> FieldMapping {
        let mut mapping = FieldMapping::new("naziv", "cijena");
        mapping.barcodes = Some("barkod".to_string());
        mapping
    }

    /// For each row whose `barcodes` is a single element containing `;` or
    /// `|`, re-splits that element on the delimiter and trims the pieces.
    fn split_combined_barcodes(mut result: ParseResult) -> ParseResult {
        for row in &mut result.rows {
            if let [combined] = row.barcodes.as_slice() {
                if combined.contains(';') || combined.contains('|') {
                    row.barcodes = combined
                        .split(['|', ';'])
                        .map(|b| b.trim().to_string())
                        .filter(|b| !b.is_empty())
                        .collect();
                }
            }
        }
        result
    }
}

#[async_trait]
impl ChainAdapter for LidlAdapter {
    fn chain_id(&self) -> ChainId {
        ChainId::Lidl
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
        let Ok(selector) = Selector::parse("a[href$='.zip'], a[href$='.ZIP']") else {
            return Vec::new();
        };
        let document = Html::parse_document(&body);
        document
            .select(&selector)
            .filter_map(|el| el.value().attr("href"))
            .map(|url| DiscoveredFile {
                url: url.to_string(),
                filename: BaseAdapter::filename_from_url(url),
                file_type: FileType::Zip,
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
            delimiter: b';',
            encoding: Encoding::Utf8,
            ..Default::default()
        };
        let result = crate::parsers::parse_csv(content, filename, &options);
        Self::split_combined_barcodes(result)
    }

    fn extract_store_identifier(&self, file: &DiscoveredFile) -> Option<ExtractedIdentifier> {
        BaseAdapter::extract_code(&CODE_PATTERN, &file.filename, &[]).map(|value| ExtractedIdentifier {
            identifier_type: IdentifierType::FilenameCode,
            value,
        })
    }

    fn validate_row(&self, row: &NormalizedRow) -> RowValidation {
        let mut validation = base::default_validate_row(row, &[8, 13, 14]);
        if row.barcodes.is_empty() {
            validation = validation.with_warning("row has no barcode");
        }
        validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NormalizedRow;

    #[test]
    fn resplits_pipe_delimited_combined_barcode() {
        let mut result = ParseResult::default();
        result.push_row(NormalizedRow {
            barcodes: vec!["123 | 456".to_string()],
            ..Default::default()
        });
        let result = LidlAdapter::split_combined_barcodes(result);
        assert_eq!(result.rows[0].barcodes, vec!["123", "456"]);
    }

    #[test]
    fn warns_when_row_has_no_barcode() {
        let config = crate::model::ChainConfig {
            id: ChainId::Lidl,
            display_name: "Lidl Hrvatska",
            base_url: "https://example.test",
            primary_file_type: FileType::Zip,
            supported_file_types: &[FileType::Zip],
            csv_dialect: None,
            uses_archives: true,
            store_resolution: crate::model::StoreResolution::Filename,
            request_timeout_secs: 30,
        };
        let adapter = LidlAdapter {
            base: BaseAdapter::new(Client::new(), config, 1.0, 0),
        };
        let row = NormalizedRow {
            name: "Kruh".to_string(),
            price: 599,
            ..Default::default()
        };
        let validation = adapter.validate_row(&row);
        assert!(validation.warnings.iter().any(|w| w.contains("no barcode")));
    }
}
