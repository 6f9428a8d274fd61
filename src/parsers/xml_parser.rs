use crate::model::NormalizedRow;

use super::encoding::decode;
use super::numeric::parse_minor_units;
use super::options::{ItemsPath, ParseOptions, ParseResult};
use super::timestamp::parse_timestamp;
use super::xml_tree::{parse_xml_tree, XmlNode};

/// Parses an XML byte buffer into normalized rows by walking a configured
/// items path (§4.1.2). If the primary path yields zero valid rows and at
/// least one error, tries `alternative_items_paths` in order; if none
/// yield valid rows, returns the last attempt's result.
pub fn parse_xml(content: &[u8], _filename: &str, options: &ParseOptions) -> ParseResult {
    let text = match decode(content, options.encoding) {
        Ok(text) => text,
        Err(message) => {
            let mut result = ParseResult::default();
            result.push_error(0, message);
            return result;
        }
    };

    let tree = match parse_xml_tree(&text) {
        Ok(tree) => tree,
        Err(message) => {
            let mut result = ParseResult::default();
            result.push_error(0, message);
            return result;
        }
    };

    let Some(primary) = &options.items_path else {
        let mut result = ParseResult::default();
        result.push_error(0, "no items path configured");
        return result;
    };

    let mut attempt = extract(&tree, primary, options);
    if attempt.total_rows > 0 {
        return attempt;
    }

    for alt in &options.alternative_items_paths {
        attempt = extract(&tree, alt, options);
        if attempt.total_rows > 0 {
            return attempt;
        }
    }

    attempt
}

fn extract(tree: &XmlNode, path: &ItemsPath, options: &ParseOptions) -> ParseResult {
    let mut result = ParseResult::default();
    let items = find_items_with_parent(tree, &path.0);
    let mapping = &options.mapping;

    for (row_number, (item, parent)) in items.into_iter().enumerate() {
        let row_number = row_number as u64 + 1;
        result.total_rows += 1;

        if let Some(limit) = options.row_limit {
            if row_number as usize > limit {
                break;
            }
        }

        let name = match mapping_value(item, &mapping.name) {
            Some(name) => name,
            None => {
                result.push_error(row_number, "missing required field 'name'");
                continue;
            }
        };

        let price = match mapping_value(item, &mapping.price) {
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

        let store_identifier = options
            .store_identifier_extractor
            .as_ref()
            .and_then(|extractor| extractor(item, parent))
            .or_else(|| mapping.store_identifier.as_deref().and_then(|name| mapping_value(item, name)))
            .or_else(|| options.default_store_identifier.clone())
            .unwrap_or_default();

        let barcodes = mapping
            .barcodes
            .as_deref()
            .and_then(|name| mapping_value(item, name))
            .map(|raw| {
                raw.split(mapping.barcode_delimiter)
                    .map(|b| b.trim().to_string())
                    .filter(|b| !b.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let row = NormalizedRow {
            store_identifier,
            external_id: mapping.external_id.as_deref().and_then(|n| mapping_value(item, n)),
            name,
            description: mapping.description.as_deref().and_then(|n| mapping_value(item, n)),
            category: mapping.category.as_deref().and_then(|n| mapping_value(item, n)),
            subcategory: mapping.subcategory.as_deref().and_then(|n| mapping_value(item, n)),
            brand: mapping.brand.as_deref().and_then(|n| mapping_value(item, n)),
            unit: mapping.unit.as_deref().and_then(|n| mapping_value(item, n)),
            unit_quantity: mapping.unit_quantity.as_deref().and_then(|n| mapping_value(item, n)),
            price,
            discount_price: mapping
                .discount_price
                .as_deref()
                .and_then(|n| mapping_value(item, n))
                .and_then(|v| parse_minor_units(&v)),
            discount_start: mapping
                .discount_start
                .as_deref()
                .and_then(|n| mapping_value(item, n))
                .and_then(|v| parse_timestamp(&v)),
            discount_end: mapping
                .discount_end
                .as_deref()
                .and_then(|n| mapping_value(item, n))
                .and_then(|v| parse_timestamp(&v)),
            barcodes,
            image_url: mapping.image_url.as_deref().and_then(|n| mapping_value(item, n)),
            unit_price: mapping
                .unit_price
                .as_deref()
                .and_then(|n| mapping_value(item, n))
                .and_then(|v| parse_minor_units(&v)),
            unit_price_base_quantity: mapping
                .unit_price_base_quantity
                .as_deref()
                .and_then(|n| mapping_value(item, n)),
            unit_price_base_unit: mapping
                .unit_price_base_unit
                .as_deref()
                .and_then(|n| mapping_value(item, n)),
            lowest_price_30d: mapping
                .lowest_price_30d
                .as_deref()
                .and_then(|n| mapping_value(item, n))
                .and_then(|v| parse_minor_units(&v)),
            anchor_price: mapping
                .anchor_price
                .as_deref()
                .and_then(|n| mapping_value(item, n))
                .and_then(|v| parse_minor_units(&v)),
            anchor_price_as_of: mapping
                .anchor_price_as_of
                .as_deref()
                .and_then(|n| mapping_value(item, n))
                .and_then(|v| parse_timestamp(&v)),
            row_number,
            raw_data: format!("{item:?}"),
        };

        result.push_row(row);
    }

    result
}

/// A named field is either a child element's text or (failing that) an
/// attribute on the item itself.
fn mapping_value(item: &XmlNode, name: &str) -> Option<String> {
    item.child_text(name).or_else(|| item.attrs.get(name).cloned())
}

fn find_items_with_parent<'a>(root: &'a XmlNode, path: &[String]) -> Vec<(&'a XmlNode, Option<&'a XmlNode>)> {
    if path.is_empty() || root.name != path[0] {
        return Vec::new();
    }
    let mut current: Vec<(&XmlNode, Option<&XmlNode>)> = vec![(root, None)];
    for segment in &path[1..] {
        current = current
            .into_iter()
            .flat_map(|(node, _)| node.children.iter().filter(move |c| &c.name == segment).map(move |c| (c, Some(node))))
            .collect();
    }
    current
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
            items_path: Some(ItemsPath::parse("products.product")),
            ..Default::default()
        }
    }

    #[test]
    fn parses_items_at_primary_path() {
        let xml = "<products><product><naziv>Kruh</naziv><cijena>5,99</cijena><barkod>123|456</barkod></product></products>";
        let result = parse_xml(xml.as_bytes(), "test.xml", &options());
        assert_eq!(result.valid_rows, 1);
        assert_eq!(result.rows[0].price, 599);
        assert_eq!(result.rows[0].barcodes, vec!["123|456"]);
    }

    #[test]
    fn falls_back_to_alternative_path() {
        let xml = "<catalog><items><item><naziv>Kruh</naziv><cijena>5,99</cijena></item></items></catalog>";
        let mut opts = options();
        opts.items_path = Some(ItemsPath::parse("catalog.product"));
        opts.alternative_items_paths = vec![ItemsPath::parse("catalog.items.item")];
        let result = parse_xml(xml.as_bytes(), "test.xml", &opts);
        assert_eq!(result.valid_rows, 1);
    }

    #[test]
    fn store_identifier_extractor_reads_parent_attribute() {
        let xml = "<products poslovnica=\"PJ50-1\"><product><naziv>Kruh</naziv><cijena>5,99</cijena></product></products>";
        let mut opts = options();
        opts.store_identifier_extractor = Some(std::sync::Arc::new(|_item: &XmlNode, parent: Option<&XmlNode>| {
            parent.and_then(|p| p.attrs.get("poslovnica").cloned())
        }));
        let result = parse_xml(xml.as_bytes(), "test.xml", &opts);
        assert_eq!(result.rows[0].store_identifier, "PJ50-1");
    }
}
