//! statement-kpis: KPI extraction for annual financial statement workbooks.
//!
//! Reads the statements of financial position, comprehensive income,
//! changes in equity and cash flows from a fixed-layout workbook, pairs
//! current and prior period values, and derives financial ratios.

pub mod engine;
pub mod error;
pub mod excel;
pub mod layout;
pub mod ratios;
pub mod render;
pub mod runner;
pub mod types;

pub use error::{KpiError, Result};
