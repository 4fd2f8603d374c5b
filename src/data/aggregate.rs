use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::model::{CellValue, Table};
use crate::error::Result;

// ---------------------------------------------------------------------------
// AggregateTable – group key → measure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub key: CellValue,
    pub value: f64,
}

/// Output of one grouping: one row per distinct non-absent group key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateTable {
    pub rows: Vec<AggregateRow>,
}

impl AggregateTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Measure for the group whose key displays as `key`.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.rows
            .iter()
            .find(|r| r.key.filter_key().as_deref() == Some(key))
            .map(|r| r.value)
    }

    pub fn total(&self) -> f64 {
        self.rows.iter().map(|r| r.value).sum()
    }

    /// `(label, value)` pairs, in table order.
    pub fn labelled(&self) -> Vec<(String, f64)> {
        self.rows
            .iter()
            .map(|r| (r.key.to_string(), r.value))
            .collect()
    }

    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.labelled().into_iter().collect()
    }

    /// `(date, value)` points for rows keyed by date.
    pub fn date_points(&self) -> Vec<(NaiveDate, f64)> {
        self.rows
            .iter()
            .filter_map(|r| r.key.as_date().map(|d| (d, r.value)))
            .collect()
    }

    fn sort_by_value_desc(&mut self) {
        self.rows
            .sort_by(|a, b| b.value.total_cmp(&a.value).then_with(|| a.key.cmp(&b.key)));
    }
}

// ---------------------------------------------------------------------------
// Groupings
// ---------------------------------------------------------------------------

/// Sum `value_column` per distinct `group_column` value. Absent or
/// non-numeric values add 0; rows with an absent group key are skipped.
/// Groups come back in key order.
pub fn sum_by(table: &Table, group_column: &str, value_column: &str) -> Result<AggregateTable> {
    let g = table.column_index(group_column)?;
    let v = table.column_index(value_column)?;
    Ok(group_rows(table, g, |row| row[v].as_f64().unwrap_or(0.0)))
}

/// Count rows per distinct `group_column` value, in key order. Every row
/// counts, whatever its other cells hold.
pub fn count_by(table: &Table, group_column: &str) -> Result<AggregateTable> {
    let g = table.column_index(group_column)?;
    Ok(group_rows(table, g, |_| 1.0))
}

/// Groups are keyed by display text, the same key filters match on, so a
/// spreadsheet's `101` and `"101"` land in one group.
fn group_rows(table: &Table, g: usize, measure: impl Fn(&[CellValue]) -> f64) -> AggregateTable {
    let mut groups: BTreeMap<String, f64> = BTreeMap::new();
    for row in &table.rows {
        let Some(key) = row[g].filter_key() else {
            continue;
        };
        *groups.entry(key).or_insert(0.0) += measure(row.as_slice());
    }
    AggregateTable {
        rows: groups
            .into_iter()
            .map(|(key, value)| AggregateRow {
                key: CellValue::Text(key),
                value,
            })
            .collect(),
    }
}

/// Frequency of each distinct value in `column`, most frequent first (ties
/// in key order).
pub fn count_distinct_values(table: &Table, column: &str) -> Result<AggregateTable> {
    let mut counts = count_by(table, column)?;
    counts.sort_by_value_desc();
    Ok(counts)
}

/// Sum `value_column` per day of `date_column`, ascending by date. Rows
/// whose date is absent are skipped.
pub fn time_series(table: &Table, date_column: &str, value_column: &str) -> Result<AggregateTable> {
    let d = table.column_index(date_column)?;
    let v = table.column_index(value_column)?;

    let mut days: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for row in &table.rows {
        let Some(day) = row[d].as_date() else {
            continue;
        };
        *days.entry(day).or_insert(0.0) += row[v].as_f64().unwrap_or(0.0);
    }
    Ok(date_table(days))
}

/// Number of requests per day of `date_column`, ascending by date.
pub fn count_over_time(table: &Table, date_column: &str) -> Result<AggregateTable> {
    let d = table.column_index(date_column)?;

    let mut days: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for day in table.rows.iter().filter_map(|row| row[d].as_date()) {
        *days.entry(day).or_insert(0.0) += 1.0;
    }
    Ok(date_table(days))
}

fn date_table(days: BTreeMap<NaiveDate, f64>) -> AggregateTable {
    AggregateTable {
        rows: days
            .into_iter()
            .map(|(day, value)| AggregateRow {
                key: CellValue::Date(day),
                value,
            })
            .collect(),
    }
}

/// Sum of all present numeric values in `column`.
pub fn sum_column(table: &Table, column: &str) -> Result<f64> {
    Ok(table.column_values(column)?.filter_map(CellValue::as_f64).sum())
}
