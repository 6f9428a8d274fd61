use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// One item observed at one store at one point in time, in the canonical
/// shape every parser converges on (§3.5). All monetary fields are
/// integer minor units (lipa/cents).
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRow {
    pub store_identifier: String,
    pub external_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub unit: Option<String>,
    pub unit_quantity: Option<String>,

    pub price: i64,
    pub discount_price: Option<i64>,
    pub discount_start: Option<DateTime<Utc>>,
    pub discount_end: Option<DateTime<Utc>>,

    pub barcodes: Vec<String>,
    pub image_url: Option<String>,

    pub unit_price: Option<i64>,
    pub unit_price_base_quantity: Option<String>,
    pub unit_price_base_unit: Option<String>,

    pub lowest_price_30d: Option<i64>,
    pub anchor_price: Option<i64>,
    pub anchor_price_as_of: Option<DateTime<Utc>>,

    pub row_number: u64,
    pub raw_data: String,
}

/// Outcome of validating one row against an adapter's rules (§4.2
/// `validateRow`). Never itself an error: a row with `errors` non-empty is
/// simply excluded from persistence by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl RowValidation {
    pub fn ok() -> Self {
        RowValidation {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.is_valid = false;
        self.errors.push(message.into());
        self
    }

    pub fn with_warning(mut self, message: impl Into<String>) -> Self {
        self.warnings.push(message.into());
        self
    }

    pub fn merge(mut self, other: RowValidation) -> Self {
        self.is_valid &= other.is_valid;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self
    }
}
