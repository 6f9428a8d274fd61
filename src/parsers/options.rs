use std::sync::Arc;

use crate::model::chain::Encoding;

/// Named source columns/elements a parser reads into a `NormalizedRow`
/// (§4.1). Every field here is the *source* name, not the target value;
/// `None` means the target field is left unset for every row.
#[derive(Clone, Default)]
pub struct FieldMapping {
    pub external_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub unit: Option<String>,
    pub unit_quantity: Option<String>,

    pub price: String,
    pub discount_price: Option<String>,
    pub discount_start: Option<String>,
    pub discount_end: Option<String>,

    /// A single delimited source field that is split into barcodes.
    pub barcodes: Option<String>,
    pub barcode_delimiter: char,

    pub image_url: Option<String>,

    pub unit_price: Option<String>,
    pub unit_price_base_quantity: Option<String>,
    pub unit_price_base_unit: Option<String>,

    pub lowest_price_30d: Option<String>,
    pub anchor_price: Option<String>,
    pub anchor_price_as_of: Option<String>,

    /// Source column for the store identifier, when it lives in the data
    /// rather than being fixed by `ParseOptions::default_store_identifier`.
    pub store_identifier: Option<String>,
}

impl FieldMapping {
    pub fn new(name_column: impl Into<String>, price_column: impl Into<String>) -> Self {
        FieldMapping {
            name: name_column.into(),
            price: price_column.into(),
            barcode_delimiter: ',',
            ..Default::default()
        }
    }
}

/// A dotted path like `products.product` split into path segments (§4.1.2).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemsPath(pub Vec<String>);

impl ItemsPath {
    pub fn parse(dotted: &str) -> Self {
        ItemsPath(dotted.split('.').map(str::to_string).collect())
    }
}

/// XML-only extension: a function of the current item element and (when
/// available) its parent, used e.g. to pull `storeIdentifier` from a
/// nested parent element that a plain column-name mapping cannot reach
/// (§4.1.2).
pub type XmlElementExtractor = Arc<
    dyn Fn(&super::xml_tree::XmlNode, Option<&super::xml_tree::XmlNode>) -> Option<String>
        + Send
        + Sync,
>;

/// Shared options bag accepted by all three parsers (§4.1). CSV-only and
/// XML-only fields are simply ignored by the parsers that don't use them.
#[derive(Clone)]
pub struct ParseOptions {
    pub encoding: Encoding,
    /// CSV only.
    pub delimiter: u8,
    /// CSV/XLSX: whether the first row is a header.
    pub has_header: bool,
    pub mapping: FieldMapping,
    /// XML only: primary items path, tried first.
    pub items_path: Option<ItemsPath>,
    /// XML only: paths tried in order if the primary path yields zero
    /// valid rows and at least one error (§4.1.2).
    pub alternative_items_paths: Vec<ItemsPath>,
    /// Used when no per-row store identifier column/extractor is
    /// available (e.g. national chains, or a store index derived
    /// out-of-band from the containing file's name).
    pub default_store_identifier: Option<String>,
    pub row_limit: Option<usize>,
    pub skip_invalid: bool,
    /// XML only: overrides `mapping.store_identifier` with a function of
    /// the current element, for chains whose identifier is only reachable
    /// by walking to a parent/sibling element (§4.1.2).
    pub store_identifier_extractor: Option<XmlElementExtractor>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            encoding: Encoding::Utf8,
            delimiter: b',',
            has_header: true,
            mapping: FieldMapping::default(),
            items_path: None,
            alternative_items_paths: Vec::new(),
            default_store_identifier: None,
            row_limit: None,
            skip_invalid: false,
            store_identifier_extractor: None,
        }
    }
}

/// Result of one parse invocation (§4.1): rows that passed structural
/// parsing (not validation — that is the adapter's `validateRow`'s job),
/// plus accumulated field-level errors/warnings.
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    pub rows: Vec<crate::model::NormalizedRow>,
    pub errors: Vec<ParseIssue>,
    pub warnings: Vec<ParseIssue>,
    pub total_rows: usize,
    pub valid_rows: usize,
}

#[derive(Debug, Clone)]
pub struct ParseIssue {
    pub row_number: u64,
    pub message: String,
}

impl ParseResult {
    pub fn push_row(&mut self, row: crate::model::NormalizedRow) {
        self.valid_rows += 1;
        self.rows.push(row);
    }

    pub fn push_error(&mut self, row_number: u64, message: impl Into<String>) {
        self.errors.push(ParseIssue {
            row_number,
            message: message.into(),
        });
    }

    pub fn push_warning(&mut self, row_number: u64, message: impl Into<String>) {
        self.warnings.push(ParseIssue {
            row_number,
            message: message.into(),
        });
    }
}
