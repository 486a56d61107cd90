// A line item is one priced entry within a bill: product or service name,
// quantity, unit price, and an item-level discount. Its net amount is always
// derived here and never trusted from the caller.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::money;
use crate::modules::billing::error::BillError;

/// Caller-supplied line item data, before normalization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemInput {
    /// Product or service name
    pub name: String,

    /// Quantity; missing is coerced to 0 and then rejected as non-positive
    #[serde(default)]
    pub quantity: Option<Decimal>,

    /// Price per unit; missing is coerced to 0
    #[serde(default)]
    pub unit_price: Option<Decimal>,

    /// Item-level discount; defaults to 0
    #[serde(default)]
    pub discount: Option<Decimal>,

    /// Optional reference to a stock record; weak reference, no cascade
    #[serde(default)]
    pub inventory_ref: Option<String>,
}

/// A normalized line item with its derived net amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount: Decimal,

    /// Derived: max(0, quantity × unit_price − discount). Recomputed on
    /// every normalization pass
    pub net_amount: Decimal,

    pub inventory_ref: Option<String>,
}

impl LineItem {
    /// Validate and compute the net payable amount for one line item.
    ///
    /// `position` is the 1-based index of the item within the bill, used to
    /// identify the offending item in errors. Missing numeric fields are
    /// coerced to zero before validation. The discount is clamped at the
    /// gross amount, so the net can never go negative.
    ///
    /// Returns the normalized item together with its gross amount for the
    /// caller's running totals.
    pub fn normalize(
        input: &LineItemInput,
        position: usize,
    ) -> Result<(Self, Decimal), BillError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(BillError::invalid_item(position, "name cannot be empty"));
        }

        let quantity = money::or_zero(input.quantity);
        let unit_price = money::or_zero(input.unit_price);
        let discount = money::or_zero(input.discount);

        if quantity <= Decimal::ZERO {
            return Err(BillError::invalid_item(
                position,
                format!("quantity must be positive, got: {}", quantity),
            ));
        }

        if unit_price < Decimal::ZERO {
            return Err(BillError::invalid_item(
                position,
                format!("unit price must be non-negative, got: {}", unit_price),
            ));
        }

        if discount < Decimal::ZERO {
            return Err(BillError::invalid_item(
                position,
                format!("discount must be non-negative, got: {}", discount),
            ));
        }

        let gross = money::round(quantity * unit_price);
        let net_amount = money::floor_at_zero(gross - money::round(discount));

        let item = Self {
            name: name.to_string(),
            quantity,
            unit_price,
            discount: money::round(discount),
            net_amount,
            inventory_ref: input.inventory_ref.clone(),
        };

        Ok((item, gross))
    }

    /// Gross amount (quantity × unit price, before any discount)
    pub fn gross(&self) -> Decimal {
        money::round(self.quantity * self.unit_price)
    }
}
