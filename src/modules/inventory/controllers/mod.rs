pub mod stock_controller;
