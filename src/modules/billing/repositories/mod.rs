pub mod bill_repository;

pub use bill_repository::{BillRepository, SqlBillRepository, SqlDailySequence};
