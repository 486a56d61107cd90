mod stock_item;

pub use stock_item::{AdjustStockRequest, CreateStockItemRequest, StockItem};
