use std::collections::HashMap;

use csv::ReaderBuilder;

use crate::model::NormalizedRow;

use super::encoding::decode;
use super::numeric::parse_minor_units;
use super::options::{ParseOptions, ParseResult};
use super::timestamp::parse_timestamp;

/// Streams a CSV byte buffer into normalized rows (§4.1.1). Splits on
/// `options.delimiter` respecting double-quoted fields and `""`-escaped
/// quotes (the `csv` crate's default quoting already implements this),
/// and skips blank lines.
pub fn parse_csv(content: &[u8], _filename: &str, options: &ParseOptions) -> ParseResult {
    let mut result = ParseResult::default();

    let text = match decode(content, options.encoding) {
        Ok(text) => text,
        Err(message) => {
            result.push_error(0, message);
            return result;
        }
    };

    let mut reader = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader.records();

    let header_map: HashMap<String, usize> = if options.has_header {
        match records.next() {
            Some(Ok(header)) => header
                .iter()
                .enumerate()
                .map(|(idx, name)| (name.trim().to_string(), idx))
                .collect(),
            Some(Err(err)) => {
                result.push_error(0, format!("failed to read header row: {err}"));
                return result;
            }
            None => {
                result.push_error(0, "file is empty");
                return result;
            }
        }
    } else {
        HashMap::new()
    };

    if options.has_header {
        if header_map.get(&options.mapping.name).is_none() {
            result.push_error(0, format!("missing required column '{}'", options.mapping.name));
            return result;
        }
        if header_map.get(&options.mapping.price).is_none() {
            result.push_error(0, format!("missing required column '{}'", options.mapping.price));
            return result;
        }
    }

    let column = |name: &str, record: &csv::StringRecord| -> Option<String> {
        let idx = if options.has_header {
            *header_map.get(name)?
        } else {
            name.parse::<usize>().ok()?
        };
        record.get(idx).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    };

    let mut row_number: u64 = 0;
    for record in records {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                result.push_error(row_number, format!("malformed row: {err}"));
                continue;
            }
        };

        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        row_number += 1;
        result.total_rows += 1;

        if let Some(limit) = options.row_limit {
            if row_number as usize > limit {
                break;
            }
        }

        let mapping = &options.mapping;

        let name = match column(&mapping.name, &record) {
            Some(name) => name,
            None => {
                result.push_error(row_number, "missing required field 'name'");
                continue;
            }
        };

        let price = match column(&mapping.price, &record) {
            Some(raw) => match parse_minor_units(&raw) {
                Some(price) => price,
                None => {
                    result.push_error(row_number, format!("unparsable price '{raw}'"));
                    continue;
                }
            },
            None => {
                result.push_error(row_number, "missing required field 'price'");
                continue;
            }
        };

        let store_identifier = mapping
            .store_identifier
            .as_deref()
            .and_then(|col| column(col, &record))
            .or_else(|| options.default_store_identifier.clone())
            .unwrap_or_default();

        let barcodes = mapping
            .barcodes
            .as_deref()
            .and_then(|col| column(col, &record))
            .map(|raw| {
                raw.split(mapping.barcode_delimiter)
                    .map(|b| b.trim().to_string())
                    .filter(|b| !b.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let row = NormalizedRow {
            store_identifier,
            external_id: mapping.external_id.as_deref().and_then(|c| column(c, &record)),
            name,
            description: mapping.description.as_deref().and_then(|c| column(c, &record)),
            category: mapping.category.as_deref().and_then(|c| column(c, &record)),
            subcategory: mapping.subcategory.as_deref().and_then(|c| column(c, &record)),
            brand: mapping.brand.as_deref().and_then(|c| column(c, &record)),
            unit: mapping.unit.as_deref().and_then(|c| column(c, &record)),
            unit_quantity: mapping.unit_quantity.as_deref().and_then(|c| column(c, &record)),
            price,
            discount_price: mapping
                .discount_price
                .as_deref()
                .and_then(|c| column(c, &record))
                .and_then(|v| parse_minor_units(&v)),
            discount_start: mapping
                .discount_start
                .as_deref()
                .and_then(|c| column(c, &record))
                .and_then(|v| parse_timestamp(&v)),
            discount_end: mapping
                .discount_end
                .as_deref()
                .and_then(|c| column(c, &record))
                .and_then(|v| parse_timestamp(&v)),
            barcodes,
            image_url: mapping.image_url.as_deref().and_then(|c| column(c, &record)),
            unit_price: mapping
                .unit_price
                .as_deref()
                .and_then(|c| column(c, &record))
                .and_then(|v| parse_minor_units(&v)),
            unit_price_base_quantity: mapping
                .unit_price_base_quantity
                .as_deref()
                .and_then(|c| column(c, &record)),
            unit_price_base_unit: mapping
                .unit_price_base_unit
                .as_deref()
                .and_then(|c| column(c, &record)),
            lowest_price_30d: mapping
                .lowest_price_30d
                .as_deref()
                .and_then(|c| column(c, &record))
                .and_then(|v| parse_minor_units(&v)),
            anchor_price: mapping
                .anchor_price
                .as_deref()
                .and_then(|c| column(c, &record))
                .and_then(|v| parse_minor_units(&v)),
            anchor_price_as_of: mapping
                .anchor_price_as_of
                .as_deref()
                .and_then(|c| column(c, &record))
                .and_then(|v| parse_timestamp(&v)),
            row_number,
            raw_data: record.iter().collect::<Vec<_>>().join(","),
        };

        result.push_row(row);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::options::FieldMapping;

    fn options() -> ParseOptions {
        let mut mapping = FieldMapping::new("naziv", "cijena");
        mapping.barcodes = Some("barkod".to_string());
        ParseOptions {
            mapping,
            default_store_identifier: Some("0001".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn parses_basic_rows() {
        let csv = "naziv,cijena,barkod\nKruh,12.99,3850000000017\nMlijeko,8,50\n";
        let result = parse_csv(csv.as_bytes(), "test.csv", &options());
        assert_eq!(result.total_rows, 2);
        assert_eq!(result.valid_rows, 2);
        assert_eq!(result.rows[0].price, 1299);
        assert_eq!(result.rows[0].barcodes, vec!["3850000000017"]);
        assert_eq!(result.rows[1].price, 800);
        assert_eq!(result.rows[0].store_identifier, "0001");
    }

    #[test]
    fn skips_blank_lines() {
        let csv = "naziv,cijena\nKruh,12.99\n\n\nMlijeko,8,50\n";
        let result = parse_csv(csv.as_bytes(), "test.csv", &options());
        assert_eq!(result.total_rows, 2);
    }

    #[test]
    fn reports_missing_required_column() {
        let csv = "ime,cijena\nKruh,12.99\n";
        let result = parse_csv(csv.as_bytes(), "test.csv", &options());
        assert_eq!(result.valid_rows, 0);
        assert!(!result.errors.is_empty());
    }

    #[test]
    fn accumulates_per_row_errors_without_aborting() {
        let csv = "naziv,cijena\nKruh,n/a\nMlijeko,8,50\n";
        let result = parse_csv(csv.as_bytes(), "test.csv", &options());
        assert_eq!(result.total_rows, 2);
        assert_eq!(result.valid_rows, 1);
        assert_eq!(result.errors.len(), 1);
    }
}
