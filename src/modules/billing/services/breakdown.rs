//! Read-side breakdown of a persisted bill.
//!
//! Pure projection for display: re-derives each item's gross amount, takes
//! every other figure as stored. No business value is recomputed here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::modules::billing::models::Bill;

/// Display decomposition of one line item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemBreakdown {
    pub name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub gross: Decimal,
    pub discount: Decimal,
    pub net: Decimal,
}

/// Display decomposition of a whole bill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillBreakdown {
    pub bill_number: String,
    pub items: Vec<ItemBreakdown>,
    pub subtotal: Decimal,
    pub item_discount_total: Decimal,
    pub additional_discount: Decimal,

    /// item_discount_total + additional_discount
    pub total_discounts: Decimal,

    pub grand_total: Decimal,
}

/// Decompose a persisted (already-normalized) bill for display
pub fn breakdown(bill: &Bill) -> BillBreakdown {
    let items = bill
        .items
        .iter()
        .map(|item| ItemBreakdown {
            name: item.name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            gross: item.gross(),
            discount: item.discount,
            net: item.net_amount,
        })
        .collect();

    BillBreakdown {
        bill_number: bill.bill_number.clone(),
        items,
        subtotal: bill.subtotal,
        item_discount_total: bill.item_discount_total,
        additional_discount: bill.additional_discount,
        total_discounts: bill.item_discount_total + bill.additional_discount,
        grand_total: bill.grand_total,
    }
}
