use std::collections::HashMap;
use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};

use crate::model::NormalizedRow;

use super::numeric::parse_minor_units;
use super::options::{ParseOptions, ParseResult};
use super::timestamp::parse_timestamp;

/// Opens the first sheet and, unless `options.has_header` is false, treats
/// the first row as the header; otherwise behaves like the CSV parser
/// (§4.1.3).
pub fn parse_xlsx(content: &[u8], _filename: &str, options: &ParseOptions) -> ParseResult {
    let mut result = ParseResult::default();

    let cursor = Cursor::new(content.to_vec());
    let mut workbook: Xlsx<_> = match Xlsx::new(cursor) {
        Ok(workbook) => workbook,
        Err(err) => {
            result.push_error(0, format!("failed to open workbook: {err}"));
            return result;
        }
    };

    let sheet_name = match workbook.sheet_names().first().cloned() {
        Some(name) => name,
        None => {
            result.push_error(0, "workbook has no sheets");
            return result;
        }
    };

    let range = match workbook.worksheet_range(&sheet_name) {
        Ok(range) => range,
        Err(err) => {
            result.push_error(0, format!("failed to read sheet '{sheet_name}': {err}"));
            return result;
        }
    };

    let mut rows = range.rows();

    let header_map: HashMap<String, usize> = if options.has_header {
        match rows.next() {
            Some(header) => header
                .iter()
                .enumerate()
                .map(|(idx, cell)| (cell_text(cell).trim().to_string(), idx))
                .collect(),
            None => {
                result.push_error(0, "sheet is empty");
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

    let column = |name: &str, row: &[Data]| -> Option<String> {
        let idx = if options.has_header {
            *header_map.get(name)?
        } else {
            name.parse::<usize>().ok()?
        };
        row.get(idx).map(cell_text).filter(|v| !v.is_empty())
    };

    let mapping = &options.mapping;
    let mut row_number: u64 = 0;

    for row in rows {
        if row.iter().all(|cell| cell_text(cell).trim().is_empty()) {
            continue;
        }

        row_number += 1;
        result.total_rows += 1;

        if let Some(limit) = options.row_limit {
            if row_number as usize > limit {
                break;
            }
        }

        let name = match column(&mapping.name, row) {
            Some(name) => name,
            None => {
                result.push_error(row_number, "missing required field 'name'");
                continue;
            }
        };

        let price = match column(&mapping.price, row) {
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
            .and_then(|col| column(col, row))
            .or_else(|| options.default_store_identifier.clone())
            .unwrap_or_default();

        let barcodes = mapping
            .barcodes
            .as_deref()
            .and_then(|col| column(col, row))
            .map(|raw| {
                raw.split(mapping.barcode_delimiter)
                    .map(|b| b.trim().to_string())
                    .filter(|b| !b.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let normalized = NormalizedRow {
            store_identifier,
            external_id: mapping.external_id.as_deref().and_then(|c| column(c, row)),
            name,
            description: mapping.description.as_deref().and_then(|c| column(c, row)),
            category: mapping.category.as_deref().and_then(|c| column(c, row)),
            subcategory: mapping.subcategory.as_deref().and_then(|c| column(c, row)),
            brand: mapping.brand.as_deref().and_then(|c| column(c, row)),
            unit: mapping.unit.as_deref().and_then(|c| column(c, row)),
            unit_quantity: mapping.unit_quantity.as_deref().and_then(|c| column(c, row)),
            price,
            discount_price: mapping
                .discount_price
                .as_deref()
                .and_then(|c| column(c, row))
                .and_then(|v| parse_minor_units(&v)),
            discount_start: mapping
                .discount_start
                .as_deref()
                .and_then(|c| column(c, row))
                .and_then(|v| parse_timestamp(&v)),
            discount_end: mapping
                .discount_end
                .as_deref()
                .and_then(|c| column(c, row))
                .and_then(|v| parse_timestamp(&v)),
            barcodes,
            image_url: mapping.image_url.as_deref().and_then(|c| column(c, row)),
            unit_price: mapping
                .unit_price
                .as_deref()
                .and_then(|c| column(c, row))
                .and_then(|v| parse_minor_units(&v)),
            unit_price_base_quantity: mapping
                .unit_price_base_quantity
                .as_deref()
                .and_then(|c| column(c, row)),
            unit_price_base_unit: mapping.unit_price_base_unit.as_deref().and_then(|c| column(c, row)),
            lowest_price_30d: mapping
                .lowest_price_30d
                .as_deref()
                .and_then(|c| column(c, row))
                .and_then(|v| parse_minor_units(&v)),
            anchor_price: mapping
                .anchor_price
                .as_deref()
                .and_then(|c| column(c, row))
                .and_then(|v| parse_minor_units(&v)),
            anchor_price_as_of: mapping
                .anchor_price_as_of
                .as_deref()
                .and_then(|c| column(c, row))
                .and_then(|v| parse_timestamp(&v)),
            row_number,
            raw_data: row.iter().map(cell_text).collect::<Vec<_>>().join(","),
        };

        result.push_row(normalized);
    }

    result
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        _ => cell.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_text_renders_strings_and_numbers_without_type_noise() {
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::String("Kruh".to_string())), "Kruh");
        assert_eq!(cell_text(&Data::Float(5.99)), "5.99");
        assert_eq!(cell_text(&Data::Int(12)), "12");
    }
}
