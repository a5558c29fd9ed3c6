use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CostingError {
    #[error("Invalid reconciliation thresholds: exact ({exact}) <= acceptable ({acceptable}) <= needs_review ({needs_review}) must hold and all must be non-negative")]
    InvalidThresholds {
        exact: i64,
        acceptable: i64,
        needs_review: i64,
    },

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid correction: {0}")]
    InvalidCorrection(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CostingError>;

/// Numeric fields of an extracted line, used to point diagnostics at a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LineField {
    Quantity,
    UnitPrice,
    DiscountAmount,
    NetSubtotal,
    InternalTax,
    Vat,
}

impl LineField {
    pub const ALL: [LineField; 6] = [
        LineField::Quantity,
        LineField::UnitPrice,
        LineField::DiscountAmount,
        LineField::NetSubtotal,
        LineField::InternalTax,
        LineField::Vat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LineField::Quantity => "quantity",
            LineField::UnitPrice => "unit_price",
            LineField::DiscountAmount => "discount_amount",
            LineField::NetSubtotal => "net_subtotal",
            LineField::InternalTax => "internal_tax",
            LineField::Vat => "vat",
        }
    }
}

impl fmt::Display for LineField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line that cannot enter the financial pass.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineError {
    #[error("Field '{field}' could not be parsed as a number: {raw:?}")]
    UnparsableNumber { field: LineField, raw: String },
}

/// A line that is kept but deserves a second look.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineWarning {
    #[error("Line is missing numeric fields: {}", format_fields(.missing))]
    IncompleteFields { missing: Vec<LineField> },

    #[error("Line has numeric content but no product code")]
    MissingCode,
}

fn format_fields(fields: &[LineField]) -> String {
    fields
        .iter()
        .map(LineField::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
