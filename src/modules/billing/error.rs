use rust_decimal::Decimal;

/// Errors raised by the bill computation engine.
///
/// Every variant rejects the whole bill; the engine never accepts a subset
/// of valid items or persists a partially computed record.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BillError {
    /// A single item failed quantity/price validation; `index` is 1-based
    #[error("Invalid line item at position {index}: {reason}")]
    InvalidLineItem { index: usize, reason: String },

    /// No items supplied
    #[error("Bill must contain at least one item")]
    EmptyBill,

    /// Identifier assignment failed and no fallback was available
    #[error("Failed to generate bill number: {0}")]
    BillNumberGeneration(String),

    /// Bill-level discount came in negative
    #[error("Additional discount cannot be negative, got: {0}")]
    NegativeAdditionalDiscount(Decimal),

    /// Derived totals fail the non-negativity invariant. Structurally
    /// impossible given the clamped arithmetic; fires only on an engine bug
    #[error("Inconsistent bill totals: {0}")]
    InvalidTotals(String),
}

impl BillError {
    pub fn invalid_item(index: usize, reason: impl Into<String>) -> Self {
        BillError::InvalidLineItem {
            index,
            reason: reason.into(),
        }
    }
}
