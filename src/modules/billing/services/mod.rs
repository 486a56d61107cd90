pub mod bill_number;
pub mod bill_service;
pub mod breakdown;
pub mod engine;

pub use bill_number::{BillNumberAllocator, DailySequence};
pub use bill_service::BillService;
