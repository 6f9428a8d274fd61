use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};

use crate::config::ChainRegistry;
use crate::error::FetchError;
use crate::model::{
    ChainId, DiscoveredFile, Encoding, ExtractedIdentifier, FetchedFile, FileType, IdentifierType, NormalizedRow, RowValidation,
    StoreMetadata,
};
use crate::parsers::{FieldMapping, ParseOptions, ParseResult};

use super::base::{self, BaseAdapter};
use super::ChainAdapter;

static PORTAL_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_(S\d+)_").unwrap());
static ANCHOR_HEADER_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"SIDRENA_\d{2}_\d{2}").unwrap());

/// ZIP-based chain whose per-day anchor-price column is date-suffixed and
/// whose store identifier/metadata are embedded in the archive filename
/// (§4.2 "Metro-specific preprocessing").
pub struct MetroAdapter {
    base: BaseAdapter,
}

impl MetroAdapter {
    pub fn new(client: Client) -> Self {
        let config = ChainRegistry::init().config(ChainId::Metro).clone();
        MetroAdapter {
            base: BaseAdapter::new(client, config, 1.0, 3),
        }
    }

    fn mapping() -> FieldMapping {
        let mut mapping = FieldMapping::new("naziv", "cijena");
        mapping.barcodes = Some("barkod".to_string());
        mapping.anchor_price = Some("SIDRENA".to_string());
        mapping
    }

    /// Rewrites the date-suffixed anchor-price header (e.g. `SIDRENA_02_05`)
    /// to the stable `SIDRENA` via a one-pass text substitution before the
    /// content reaches the CSV parser.
    fn rewrite_anchor_header(content: &[u8]) -> Vec<u8> {
        let Ok(text) = std::str::from_utf8(content) else {
            return content.to_vec();
        };
        let Some(first_line_end) = text.find('\n') else {
            return content.to_vec();
        };
        let (header, rest) = text.split_at(first_line_end);
        let rewritten_header = ANCHOR_HEADER_PATTERN.replace(header, "SIDRENA");
        format!("{rewritten_header}{rest}").into_bytes()
    }

    /// Parses the `_Snnn_ADDRESS,CITY.csv`-shaped tail of a Metro filename
    /// into a store metadata triple (§8 seed example).
    fn parse_filename_metadata(filename: &str) -> Option<StoreMetadata> {
        let stem = filename.strip_suffix(".csv").or_else(|| filename.strip_suffix(".CSV")).unwrap_or(filename);
        let tokens: Vec<&str> = stem.split('_').collect();
        let store_idx = tokens.iter().position(|t| PORTAL_ID_PATTERN.is_match(&format!("_{t}_")))?;
        let tail = tokens[store_idx + 1..].join(" ");
        let (address, city) = tail.split_once(',')?;
        let city = title_case(city.trim());
        Some(StoreMetadata {
            name: format!("Metro {city}"),
            address: Some(title_case(address.trim())),
            city: Some(city),
        })
    }
}

fn title_case(value: &str) -> String {
    value
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl ChainAdapter for MetroAdapter {
    fn chain_id(&self) -> ChainId {
        ChainId::Metro
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
        let Ok(selector) = Selector::parse("a[href$='.zip'], a[href$='.ZIP'], a[href$='.csv'], a[href$='.CSV']") else {
            return Vec::new();
        };
        let document = Html::parse_document(&body);
        document
            .select(&selector)
            .filter_map(|el| el.value().attr("href"))
            .map(|url| {
                let filename = BaseAdapter::filename_from_url(url);
                let file_type = FileType::from_filename(&filename).unwrap_or(FileType::Zip);
                DiscoveredFile {
                    url: url.to_string(),
                    filename,
                    file_type,
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
            delimiter: b';',
            encoding: Encoding::Windows1250,
            ..Default::default()
        };
        let content = Self::rewrite_anchor_header(content);
        crate::parsers::parse_csv(&content, filename, &options)
    }

    fn extract_store_identifier(&self, file: &DiscoveredFile) -> Option<ExtractedIdentifier> {
        PORTAL_ID_PATTERN.captures(&file.filename).and_then(|c| c.get(1)).map(|m| ExtractedIdentifier {
            identifier_type: IdentifierType::PortalId,
            value: m.as_str().to_string(),
        })
    }

    fn extract_store_metadata(&self, file: &DiscoveredFile) -> Option<StoreMetadata> {
        Self::parse_filename_metadata(&file.filename)
    }

    fn validate_row(&self, row: &NormalizedRow) -> RowValidation {
        base::default_validate_row(row, base::DEFAULT_BARCODE_LENGTHS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILENAME: &str = "cash_and_carry_prodavaonica_METRO_20260105T0630_S10_JANKOMIR_31,ZAGREB.csv";

    #[test]
    fn extracts_portal_id_from_underscore_delimited_filename() {
        let captures = PORTAL_ID_PATTERN.captures(FILENAME).unwrap();
        assert_eq!(&captures[1], "S10");
    }

    #[test]
    fn parses_address_and_city_metadata_from_filename() {
        let metadata = MetroAdapter::parse_filename_metadata(FILENAME).unwrap();
        assert_eq!(metadata.name, "Metro Zagreb");
        assert_eq!(metadata.address.as_deref(), Some("Jankomir 31"));
        assert_eq!(metadata.city.as_deref(), Some("Zagreb"));
    }

    #[test]
    fn rewrites_date_suffixed_anchor_header_to_a_stable_name() {
        let content = b"naziv;cijena;SIDRENA_02_05\nKruh;5,99;4,99\n";
        let rewritten = MetroAdapter::rewrite_anchor_header(content);
        let text = String::from_utf8(rewritten).unwrap();
        assert!(text.starts_with("naziv;cijena;SIDRENA\n"));
    }
}
