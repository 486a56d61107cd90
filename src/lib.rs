//! Billmate Billing & Inventory Backend Library
//!
//! Core functionality for the billmate affiliate billing system: the bill
//! computation engine, stock tracking, and the HTTP glue around them.

pub mod config;
pub mod core;
pub mod middleware;
pub mod modules;

// Re-export commonly used types
pub use modules::billing;
pub use modules::inventory;
