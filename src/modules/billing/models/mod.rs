mod bill;
mod line_item;

pub use bill::{Bill, BillResponse, BillStatus, CreateBillRequest, PaymentMethod};
pub use line_item::{LineItem, LineItemInput};
