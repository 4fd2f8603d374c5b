/// Data layer: core types, loading, normalization, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .xlsx / .csv / .json / .parquet / CSV URL
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  read source → raw Table
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ normalize  │  trim headers, parse R$ amounts and day-first dates
///   └───────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  multi-select constraints → filtered Table
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  sums / counts / time series per chart
///   └───────────┘
/// ```

pub mod aggregate;
pub mod filter;
pub mod loader;
pub mod model;
pub mod normalize;

use std::time::Duration;

use crate::error::{DashboardError, Result};
use loader::Source;
use model::{Schema, Table};
use normalize::DecimalSeparator;

/// Read and normalize `source`, reading amounts with the source's
/// `decimal` separator.
///
/// Fails with `Schema` when the header row is empty or none of the schema's
/// columns are present; individual missing columns surface later as
/// `MissingColumn` from whichever operation needs them.
pub fn load_table(
    source: &Source,
    schema: &Schema,
    decimal: DecimalSeparator,
    http_timeout: Duration,
) -> Result<Table> {
    let raw = loader::load(source, http_timeout)?;
    let table = normalize::normalize(raw, schema, decimal);
    check_schema(&table, schema)?;

    let missing: Vec<&str> = schema
        .all_columns()
        .into_iter()
        .filter(|c| !table.has_column(c))
        .collect();
    if !missing.is_empty() {
        log::warn!("{source}: columns not found: {missing:?}");
    }
    log::info!(
        "Loaded {} requests with columns {:?} from {source}",
        table.len(),
        table.columns
    );
    Ok(table)
}

fn check_schema(table: &Table, schema: &Schema) -> Result<()> {
    if table.columns.iter().all(|c| c.is_empty()) {
        return Err(DashboardError::Schema("source has no header row".to_string()));
    }
    if !schema.all_columns().iter().any(|c| table.has_column(c)) {
        return Err(DashboardError::Schema(format!(
            "none of the expected columns {:?} found (got {:?})",
            schema.all_columns(),
            table.columns
        )));
    }
    Ok(())
}
