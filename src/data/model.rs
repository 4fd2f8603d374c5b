use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};

/// Display format for dates, matching the source locale (day first).
pub const DATE_DISPLAY_FORMAT: &str = "%d/%m/%Y";

// ---------------------------------------------------------------------------
// CellValue – a single cell of the request table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell. `Null` is the explicit absent marker: it is
/// what empty cells and unparseable amounts/dates become.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Null,
}

// -- Manual Eq/Ord so we can key BTreeMap / BTreeSet with CellValue --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Number(_) => 1,
                Date(_) => 2,
                Text(_) => 3,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Number(a), Number(b)) => a.total_cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Text(s) => s.hash(state),
            CellValue::Number(f) => f.to_bits().hash(state),
            CellValue::Date(d) => d.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            // Whole numbers (unit codes read from spreadsheets) print without ".0".
            CellValue::Number(v) if v.fract() == 0.0 && v.abs() < 1e15 => {
                write!(f, "{}", *v as i64)
            }
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Date(d) => write!(f, "{}", d.format(DATE_DISPLAY_FORMAT)),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Text used for filter membership and filter options. `None` for absent
    /// cells, which therefore never match a constraint.
    pub fn filter_key(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Text(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Schema – names of the columns the dashboard reports on
// ---------------------------------------------------------------------------

/// Canonical column names, after whitespace trimming. Defaults follow the
/// headers of the broker spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    pub broker: String,
    pub unit: String,
    pub purpose: String,
    pub status: String,
    pub amount: String,
    pub date: String,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            broker: "Corretor Responsável".to_string(),
            unit: "Unidade da Corretora".to_string(),
            purpose: "Finalidade do Crédito".to_string(),
            status: "Status da Negociação".to_string(),
            amount: "Crédito Desejado (R$)".to_string(),
            date: "Data da Solicitação".to_string(),
        }
    }
}

impl Schema {
    pub fn all_columns(&self) -> [&str; 6] {
        [
            self.broker.as_str(),
            self.unit.as_str(),
            self.purpose.as_str(),
            self.status.as_str(),
            self.amount.as_str(),
            self.date.as_str(),
        ]
    }
}

// ---------------------------------------------------------------------------
// Table – the complete loaded dataset
// ---------------------------------------------------------------------------

/// Rows of cells sharing one column list. Row order is source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Build a table, padding short rows with `Null` and cutting long ones
    /// so every row matches the column list.
    pub fn new(columns: Vec<String>, mut rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        for row in &mut rows {
            row.resize(width, CellValue::Null);
        }
        Table { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Exact, case-sensitive lookup.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| DashboardError::MissingColumn(name.to_string()))
    }

    pub fn column_values(&self, name: &str) -> Result<impl Iterator<Item = &CellValue> + '_> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Distinct non-absent filter keys of a column, in first-seen order.
    pub fn unique_values(&self, name: &str) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for key in self.column_values(name)?.filter_map(CellValue::filter_key) {
            if seen.insert(key.clone()) {
                out.push(key);
            }
        }
        Ok(out)
    }

    /// Number of rows whose cell in `name` is absent.
    pub fn absent_count(&self, name: &str) -> Result<usize> {
        Ok(self.column_values(name)?.filter(|v| v.is_null()).count())
    }

    /// New table holding the given rows, in the given order.
    pub fn select(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}
