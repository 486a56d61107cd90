use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One stock record owned by an affiliate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockItem {
    pub id: Option<String>,
    pub affiliate_id: String,
    pub name: String,

    /// Quantity on hand; decimal so loose goods (kg, litres) work too
    pub quantity: Decimal,

    pub unit_price: Decimal,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Request body for adding a stock item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStockItemRequest {
    pub name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Request body for a manual stock adjustment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustStockRequest {
    /// Signed quantity delta; positive restocks, negative removes
    pub delta: Decimal,
}
