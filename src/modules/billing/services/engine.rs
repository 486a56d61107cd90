//! Bill computation engine.
//!
//! One pure pass over the raw item data: normalize every line item, fold the
//! results into the bill's summary totals, and check the consistency
//! invariants. The caller (the service layer) runs this before every write;
//! derived fields are always recomputed whole, never patched.

use rust_decimal::Decimal;

use crate::core::money;
use crate::modules::billing::error::BillError;
use crate::modules::billing::models::{LineItem, LineItemInput};

/// The derived state of one normalize-and-validate pass
#[derive(Debug, Clone, PartialEq)]
pub struct BillComputation {
    /// Items in caller order, each with its recomputed net amount
    pub items: Vec<LineItem>,

    /// Sum of gross amounts (quantity × unit price), pre-discount
    pub subtotal: Decimal,

    /// Sum of item-level discounts
    pub item_discount_total: Decimal,

    /// Whole-bill discount, coerced to 0 when absent
    pub additional_discount: Decimal,

    /// max(0, subtotal − item_discount_total − additional_discount)
    pub grand_total: Decimal,
}

/// Normalize raw line items and aggregate them into bill totals.
///
/// Pure function of its inputs: re-running it on the same item set and
/// discount always yields identical derived fields. Rejection is
/// all-or-nothing; a single invalid item fails the whole bill.
pub fn normalize_and_validate(
    items: &[LineItemInput],
    additional_discount: Option<Decimal>,
) -> Result<BillComputation, BillError> {
    if items.is_empty() {
        return Err(BillError::EmptyBill);
    }

    let additional_discount = money::or_zero(additional_discount);
    if additional_discount < Decimal::ZERO {
        return Err(BillError::NegativeAdditionalDiscount(additional_discount));
    }
    let additional_discount = money::round(additional_discount);

    let mut normalized = Vec::with_capacity(items.len());
    let mut subtotal = Decimal::ZERO;
    let mut item_discount_total = Decimal::ZERO;

    for (idx, input) in items.iter().enumerate() {
        let (item, gross) = LineItem::normalize(input, idx + 1)?;
        subtotal += gross;
        item_discount_total += item.discount;
        normalized.push(item);
    }

    let subtotal = money::round(subtotal);
    let item_discount_total = money::round(item_discount_total);
    let grand_total =
        money::floor_at_zero(subtotal - item_discount_total - additional_discount);

    let computation = BillComputation {
        items: normalized,
        subtotal,
        item_discount_total,
        additional_discount,
        grand_total,
    };

    check_totals(&computation)?;

    Ok(computation)
}

// Defensive re-check of the non-negativity invariants. Structurally
// impossible to fail given the clamped arithmetic above, so a hit here is an
// engine bug and is logged as unexpected.
fn check_totals(computation: &BillComputation) -> Result<(), BillError> {
    if computation.subtotal < Decimal::ZERO {
        tracing::error!(
            subtotal = %computation.subtotal,
            "bill engine produced a negative subtotal"
        );
        return Err(BillError::InvalidTotals(format!(
            "subtotal is negative: {}",
            computation.subtotal
        )));
    }

    if computation.grand_total < Decimal::ZERO {
        tracing::error!(
            grand_total = %computation.grand_total,
            "bill engine produced a negative grand total"
        );
        return Err(BillError::InvalidTotals(format!(
            "grand total is negative: {}",
            computation.grand_total
        )));
    }

    Ok(())
}
