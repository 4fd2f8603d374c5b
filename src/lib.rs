//! Credit-request reporting dashboard: loads the broker spreadsheet or CSV
//! feed, normalizes amounts and dates, filters and aggregates per chart.

pub mod cache;
pub mod config;
pub mod data;
pub mod error;
pub mod report;
pub mod state;

pub use error::{DashboardError, Result};
