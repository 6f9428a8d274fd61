pub mod csv_parser;
pub mod encoding;
pub mod numeric;
pub mod options;
pub mod timestamp;
pub mod xlsx_parser;
pub mod xml_parser;
pub mod xml_tree;

pub use csv_parser::parse_csv;
pub use numeric::parse_minor_units;
pub use options::{FieldMapping, ItemsPath, ParseIssue, ParseOptions, ParseResult, XmlElementExtractor};
pub use timestamp::parse_timestamp;
pub use xlsx_parser::parse_xlsx;
pub use xml_parser::parse_xml;

use crate::model::chain::FileType;

/// Dispatches to the parser matching the detected file type (§4.1).
pub fn parse(file_type: FileType, content: &[u8], filename: &str, options: &ParseOptions) -> ParseResult {
    match file_type {
        FileType::Csv => parse_csv(content, filename, options),
        FileType::Xml => parse_xml(content, filename, options),
        FileType::Xlsx => parse_xlsx(content, filename, options),
        FileType::Zip => {
            let mut result = ParseResult::default();
            result.push_error(0, "zip archives must be expanded before parsing");
            result
        }
    }
}
