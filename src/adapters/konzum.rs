use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use reqwest::Client;

use crate::config::ChainRegistry;
use crate::error::FetchError;
use crate::model::{ChainId, DiscoveredFile, ExtractedIdentifier, FetchedFile, FileType, IdentifierType, NormalizedRow, RowValidation};
use crate::parsers::{FieldMapping, ParseOptions, ParseResult};

use super::base::{self, BaseAdapter};
use super::ChainAdapter;

/// Filename-coded CSV chain whose portal paginates a listing page with
/// `&page=N` (§4.2 "Filename-coded CSV chains").
pub struct KonzumAdapter {
    base: BaseAdapter,
}

static CODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^,]+,[^,]+,(\d{4}),").unwrap());

impl KonzumAdapter {
    pub fn new(client: Client) -> Self {
        let config = ChainRegistry::init().config(ChainId::Konzum).clone();
        KonzumAdapter {
            base: BaseAdapter::new(client, config, 2.0, 3),
        }
    }

    fn mapping() -> FieldMapping {
        let mut mapping = FieldMapping::new("naziv", "cijena");
        mapping.barcodes = Some("barkod".to_string());
        mapping.brand = Some("marka".to_string());
        mapping.unit = Some("jedinica_mjere".to_string());
        mapping
    }
}

#[async_trait]
impl ChainAdapter for KonzumAdapter {
    fn chain_id(&self) -> ChainId {
        ChainId::Konzum
    }

    fn set_discovery_date(&self, date: Option<NaiveDate>) {
        self.base.set_discovery_date(date);
    }

    async fn discover(&self) -> Vec<DiscoveredFile> {
        let base_url = self.base.config.base_url;
        let date = self.base.discovery_date();
        let url_for_page = move |page: u32| match date {
            Some(date) => format!("{base_url}?date={}&page={page}", base::format_date(date)),
            None => format!("{base_url}?page={page}"),
        };

        let links = self.base.discover_paginated_html(url_for_page, "a[href$='.csv'], a[href$='.CSV']").await;

        links
            .into_iter()
            .map(|url| {
                let filename = BaseAdapter::filename_from_url(&url);
                DiscoveredFile {
                    url,
                    filename,
                    file_type: FileType::Csv,
                    size: None,
                    last_modified: None,
                    metadata: Default::default(),
                }
            })
            .collect()
    }

    async fn fetch(&self, file: &DiscoveredFile) -> Result<FetchedFile, FetchError> {
        self.base.fetch(file).await
    }

    fn parse(&self, content: &[u8], filename: &str) -> ParseResult {
        let options = ParseOptions {
            mapping: Self::mapping(),
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
    fn extracts_four_digit_code_from_comma_separated_filename() {
        let filename = "SUPERMARKET,VALKANELA 10 52450 VRSAR,0613,43525,29.12.2025, 05-20.CSV";
        let code = BaseAdapter::extract_code(&CODE_PATTERN, filename, &[]);
        assert_eq!(code.as_deref(), Some("0613"));
    }
}
