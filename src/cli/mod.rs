//! Terminal commands. Each module renders one area of the console.
pub mod auth;
pub mod distribution;
pub mod expense;
pub mod funding;
pub mod ownership;
pub mod records;
pub mod settings;
pub mod setup;
pub mod stock;
pub mod ui;
