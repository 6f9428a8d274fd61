use chrono::{DateTime, Utc};
use serde_json::json;

use crate::model::NormalizedRow;
use crate::utils::hashing::sha256_hex;

fn epoch_millis(timestamp: Option<DateTime<Utc>>) -> serde_json::Value {
    match timestamp {
        Some(ts) => json!(ts.timestamp_millis()),
        None => serde_json::Value::Null,
    }
}

/// SHA-256 of the canonical JSON encoding of the ten price-signature
/// fields, in fixed order (§4.5.1). A JSON array (not an object) is used
/// precisely so "fixed key order" reduces to array order and is immune to
/// map key reordering. All other row fields are excluded: name/brand/
/// description changes never open a new price period.
pub fn compute_price_signature(row: &NormalizedRow) -> String {
    let tuple = json!([
        row.price,
        row.discount_price,
        epoch_millis(row.discount_start),
        epoch_millis(row.discount_end),
        row.unit_price,
        row.unit_price_base_quantity,
        row.unit_price_base_unit,
        row.lowest_price_30d,
        row.anchor_price,
        epoch_millis(row.anchor_price_as_of),
    ]);
    sha256_hex(tuple.to_string().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> NormalizedRow {
        NormalizedRow {
            name: "Kruh".to_string(),
            price: 1999,
            ..Default::default()
        }
    }

    #[test]
    fn identical_price_fields_yield_identical_signatures() {
        assert_eq!(compute_price_signature(&row()), compute_price_signature(&row()));
    }

    #[test]
    fn changing_a_price_field_changes_the_signature() {
        let mut changed = row();
        changed.price = 2499;
        assert_ne!(compute_price_signature(&row()), compute_price_signature(&changed));
    }

    #[test]
    fn changing_only_name_does_not_change_the_signature() {
        let mut renamed = row();
        renamed.name = "Integralni kruh".to_string();
        assert_eq!(compute_price_signature(&row()), compute_price_signature(&renamed));
    }

    #[test]
    fn null_timestamps_serialize_as_null_not_zero() {
        let none_signature = compute_price_signature(&row());
        let mut with_epoch_zero = row();
        with_epoch_zero.discount_start = Some(DateTime::from_timestamp(0, 0).unwrap());
        assert_ne!(none_signature, compute_price_signature(&with_epoch_zero));
    }
}
