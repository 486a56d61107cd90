// The Bill aggregate: one customer transaction with its ordered line items
// and derived totals. Derived fields are recomputed in full by the engine on
// every save; they are never patched incrementally. The bill number is
// assigned once at creation and immutable thereafter.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::line_item::{LineItem, LineItemInput};
use crate::modules::billing::error::BillError;

/// Bill payment lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    /// Bill issued, payment outstanding
    Pending,

    /// Customer has paid
    Paid,

    /// Bill voided by the affiliate
    Cancelled,
}

impl Default for BillStatus {
    fn default() -> Self {
        BillStatus::Pending
    }
}

impl std::fmt::Display for BillStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BillStatus::Pending => write!(f, "pending"),
            BillStatus::Paid => write!(f, "paid"),
            BillStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for BillStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BillStatus::Pending),
            "paid" => Ok(BillStatus::Paid),
            "cancelled" => Ok(BillStatus::Cancelled),
            _ => Err(format!("Invalid bill status: {}", s)),
        }
    }
}

/// How the customer settled the bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    Other,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::Card => write!(f, "card"),
            PaymentMethod::Upi => write!(f, "upi"),
            PaymentMethod::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "upi" => Ok(PaymentMethod::Upi),
            "other" => Ok(PaymentMethod::Other),
            _ => Err(format!("Invalid payment method: {}", s)),
        }
    }
}

/// A customer bill issued by an affiliate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    /// Row id (UUID), set at first persistence
    pub id: Option<String>,

    /// Owning affiliate
    pub affiliate_id: String,

    /// Customer the bill was issued to
    pub customer_id: String,

    /// Human-readable identifier, assigned once at creation
    pub bill_number: String,

    /// Ordered line items; order is preserved for display
    pub items: Vec<LineItem>,

    /// Derived: sum of gross amounts across items
    pub subtotal: Decimal,

    /// Derived: sum of item-level discounts
    pub item_discount_total: Decimal,

    /// Caller-supplied whole-bill discount, never negative
    pub additional_discount: Decimal,

    /// Derived: max(0, subtotal − item_discount_total − additional_discount)
    pub grand_total: Decimal,

    pub status: BillStatus,
    pub payment_method: Option<PaymentMethod>,
    pub remarks: Option<String>,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Bill {
    /// Gate persistence: every check rejects the whole record, no partial
    /// persistence occurs.
    pub fn validate(&self) -> Result<(), BillError> {
        if self.items.is_empty() {
            return Err(BillError::EmptyBill);
        }

        if self.bill_number.trim().is_empty() {
            return Err(BillError::BillNumberGeneration(
                "bill number is empty".to_string(),
            ));
        }

        if self.subtotal < Decimal::ZERO {
            return Err(BillError::InvalidTotals(format!(
                "subtotal is negative: {}",
                self.subtotal
            )));
        }

        if self.grand_total < Decimal::ZERO {
            return Err(BillError::InvalidTotals(format!(
                "grand total is negative: {}",
                self.grand_total
            )));
        }

        Ok(())
    }
}

/// Request body for creating or replacing a bill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBillRequest {
    pub customer_id: String,
    pub items: Vec<LineItemInput>,

    /// Whole-bill discount on top of item discounts; defaults to 0
    #[serde(default)]
    pub additional_discount: Option<Decimal>,

    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,

    #[serde(default)]
    pub remarks: Option<String>,
}

/// Response DTO for a bill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillResponse {
    pub id: Option<String>,
    pub bill_number: String,
    pub customer_id: String,
    pub items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub item_discount_total: Decimal,
    pub additional_discount: Decimal,
    pub grand_total: Decimal,
    pub status: BillStatus,
    pub payment_method: Option<PaymentMethod>,
    pub remarks: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Bill> for BillResponse {
    fn from(bill: Bill) -> Self {
        BillResponse {
            id: bill.id,
            bill_number: bill.bill_number,
            customer_id: bill.customer_id,
            items: bill.items,
            subtotal: bill.subtotal,
            item_discount_total: bill.item_discount_total,
            additional_discount: bill.additional_discount,
            grand_total: bill.grand_total,
            status: bill.status,
            payment_method: bill.payment_method,
            remarks: bill.remarks,
            created_at: bill.created_at,
            updated_at: bill.updated_at,
        }
    }
}
