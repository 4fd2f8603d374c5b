use std::collections::{BTreeMap, BTreeSet};

use super::model::{Schema, Table};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Constraint set: which values are allowed per column
// ---------------------------------------------------------------------------

/// Per-column selection: maps column_name → set of allowed values.
/// An empty set means "no filter" for that column.
pub type ConstraintSet = BTreeMap<String, BTreeSet<String>>;

/// Return indices of rows that satisfy every non-empty constraint.
///
/// A row passes a column constraint when its cell's filter key is in the
/// allowed set. Absent cells never pass. A non-empty constraint on a column
/// the table does not have is a [`MissingColumn`](crate::error::DashboardError::MissingColumn) error.
pub fn filtered_indices(table: &Table, constraints: &ConstraintSet) -> Result<Vec<usize>> {
    let active = constraints
        .iter()
        .filter(|(_, allowed)| !allowed.is_empty())
        .map(|(col, allowed)| Ok((table.column_index(col)?, allowed)))
        .collect::<Result<Vec<_>>>()?;

    Ok(table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            active.iter().all(|(idx, allowed)| {
                row[*idx]
                    .filter_key()
                    .is_some_and(|key| allowed.contains(&key))
            })
        })
        .map(|(i, _)| i)
        .collect())
}

/// Rows of `table` passing `constraints`, as a new table. The input is left
/// untouched; no match gives an empty table.
pub fn apply(table: &Table, constraints: &ConstraintSet) -> Result<Table> {
    let indices = filtered_indices(table, constraints)?;
    if indices.len() == table.len() {
        return Ok(table.clone());
    }
    Ok(table.select(&indices))
}

// ---------------------------------------------------------------------------
// Dashboard selection
// ---------------------------------------------------------------------------

/// Which filter a multi-select widget drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterField {
    Broker,
    Purpose,
    Unit,
    Status,
}

impl FilterField {
    pub const ALL: [FilterField; 4] = [
        FilterField::Broker,
        FilterField::Purpose,
        FilterField::Unit,
        FilterField::Status,
    ];

    pub fn column<'a>(&self, schema: &'a Schema) -> &'a str {
        match self {
            FilterField::Broker => &schema.broker,
            FilterField::Purpose => &schema.purpose,
            FilterField::Unit => &schema.unit,
            FilterField::Status => &schema.status,
        }
    }
}

/// The dashboard's multi-select state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    selected: BTreeMap<FilterField, BTreeSet<String>>,
}

impl FilterSelection {
    pub fn selected(&self, field: FilterField) -> Option<&BTreeSet<String>> {
        self.selected.get(&field)
    }

    pub fn is_selected(&self, field: FilterField, value: &str) -> bool {
        self.selected
            .get(&field)
            .is_some_and(|vals| vals.contains(value))
    }

    /// Toggle one value; returns whether it is now selected.
    pub fn toggle(&mut self, field: FilterField, value: &str) -> bool {
        let vals = self.selected.entry(field).or_default();
        if vals.remove(value) {
            false
        } else {
            vals.insert(value.to_string());
            true
        }
    }

    pub fn clear(&mut self, field: FilterField) {
        self.selected.remove(&field);
    }

    pub fn clear_all(&mut self) {
        self.selected.clear();
    }

    /// Fields with at least one value selected.
    pub fn active_count(&self) -> usize {
        self.selected.values().filter(|v| !v.is_empty()).count()
    }

    /// Constraint set over the schema's column names. Unselected fields are
    /// left out so their columns are never required.
    pub fn constraints(&self, schema: &Schema) -> ConstraintSet {
        self.selected
            .iter()
            .filter(|(_, vals)| !vals.is_empty())
            .map(|(field, vals)| (field.column(schema).to_string(), vals.clone()))
            .collect()
    }
}
