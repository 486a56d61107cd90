pub mod bill_controller;
