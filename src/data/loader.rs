use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Date32Type, Float64Type};
use arrow::error::ArrowError;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use calamine::{open_workbook_auto, Data, DataType as _, Reader};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, Table};
use crate::error::{DashboardError, Result};

// ---------------------------------------------------------------------------
// Source description
// ---------------------------------------------------------------------------

/// Where the request table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Local spreadsheet, CSV, JSON or Parquet file.
    File(PathBuf),
    /// Remote URL answering with CSV (e.g. a sheet's `export?format=csv`).
    Url(String),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(path) => write!(f, "{}", path.display()),
            Source::Url(url) => write!(f, "{url}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Read every row of `source` into a raw table (column names untrimmed,
/// cells as the source typed them).
pub fn load(source: &Source, http_timeout: Duration) -> Result<Table> {
    match source {
        Source::File(path) => load_file(path),
        Source::Url(url) => load_url(url, http_timeout),
    }
}

/// Load a request table from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.xlsx` / `.xlsm` / `.xlsb` / `.xls` / `.ods` – first worksheet, header in row 1
/// * `.csv`     – header row; `,` or `;` delimited
/// * `.json`    – `[{ "column": value, ... }, ...]`
/// * `.parquet` – flat columns of strings, numbers or dates
pub fn load_file(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_spreadsheet(path),
        "csv" => load_csv_file(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => Err(unavailable(path, format!("unsupported file extension .{other}"))),
    }
}

fn unavailable(path: &Path, reason: impl ToString) -> DashboardError {
    DashboardError::source_unavailable(path.display().to_string(), reason)
}

// ---------------------------------------------------------------------------
// Spreadsheet loader
// ---------------------------------------------------------------------------

fn load_spreadsheet(path: &Path) -> Result<Table> {
    let mut workbook = open_workbook_auto(path).map_err(|e| unavailable(path, e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| unavailable(path, "workbook has no worksheets"))?
        .map_err(|e| unavailable(path, e))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Table::default());
    };
    let columns = header
        .iter()
        .map(|c| c.get_string().map(str::to_string).unwrap_or_else(|| c.to_string()))
        .collect();
    let body = rows
        .map(|row| row.iter().map(spreadsheet_cell).collect())
        .collect();

    Ok(Table::new(columns, body))
}

fn spreadsheet_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        other => other
            .as_date()
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::Text(other.to_string())),
    }
}

// ---------------------------------------------------------------------------
// CSV loader (files and remote feeds)
// ---------------------------------------------------------------------------

fn load_csv_file(path: &Path) -> Result<Table> {
    let bytes = std::fs::read(path).map_err(|e| unavailable(path, e))?;
    parse_csv(&bytes).map_err(|e| unavailable(path, e))
}

fn load_url(url: &str, timeout: Duration) -> Result<Table> {
    let fail = |e: &dyn fmt::Display| DashboardError::source_unavailable(url, e);

    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| fail(&e))?;
    let resp = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| fail(&e))?;
    let body = resp.bytes().map_err(|e| fail(&e))?;

    log::debug!("fetched {} bytes from {url}", body.len());
    parse_csv(&body).map_err(|e| fail(&e))
}

/// Pick `;` when the header line has more semicolons than commas.
fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let first_line = bytes.split(|&b| b == b'\n').next().unwrap_or(&[]);
    let semis = first_line.iter().filter(|&&b| b == b';').count();
    let commas = first_line.iter().filter(|&&b| b == b',').count();
    if semis > commas {
        b';'
    } else {
        b','
    }
}

/// CSV layout: header row with column names; every other row is a record.
/// Empty cells are absent; everything else is kept as text.
pub fn parse_csv(bytes: &[u8]) -> std::result::Result<Table, csv::Error> {
    let bytes = bytes.strip_prefix("\u{feff}".as_bytes()).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(bytes))
        .flexible(true)
        .from_reader(bytes);

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(
            record
                .iter()
                .map(|v| {
                    if v.is_empty() {
                        CellValue::Null
                    } else {
                        CellValue::text(v)
                    }
                })
                .collect(),
        );
    }

    Ok(Table::new(columns, rows))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`). Columns are the
/// union of all object keys.
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).map_err(|e| unavailable(path, e))?;
    let root: JsonValue = serde_json::from_str(&text).map_err(|e| unavailable(path, e))?;
    let records = root
        .as_array()
        .ok_or_else(|| unavailable(path, "expected top-level JSON array"))?;

    let mut columns: Vec<String> = Vec::new();
    for rec in records {
        let obj = rec
            .as_object()
            .ok_or_else(|| unavailable(path, "every record must be a JSON object"))?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(JsonValue::as_object)
        .map(|obj| {
            columns
                .iter()
                .map(|col| obj.get(col).map(json_cell).unwrap_or(CellValue::Null))
                .collect()
        })
        .collect();

    Ok(Table::new(columns, rows))
}

fn json_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) if s.is_empty() => CellValue::Null,
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Null),
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one flat column per field. Works with files
/// written by both **Pandas** (`df.to_parquet()`) and **Polars**.
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).map_err(|e| unavailable(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| unavailable(path, e))?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().map_err(|e| unavailable(path, e))?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.map_err(|e| unavailable(path, e))?;
        let cells = batch
            .columns()
            .iter()
            .map(arrow_column)
            .collect::<std::result::Result<Vec<_>, ArrowError>>()
            .map_err(|e| unavailable(path, e))?;
        for row in 0..batch.num_rows() {
            rows.push(cells.iter().map(|col| col[row].clone()).collect());
        }
    }

    Ok(Table::new(columns, rows))
}

/// Convert one Arrow column to cells.
///
/// Integers, unsigned ints, decimals and other float widths become `Number`;
/// timestamps and `Date64` become `Date` (time of day dropped). Anything
/// else is rendered with Arrow's own value formatter.
fn arrow_column(col: &ArrayRef) -> std::result::Result<Vec<CellValue>, ArrowError> {
    let col = match col.data_type() {
        DataType::Timestamp(_, _) | DataType::Date64 => cast(col, &DataType::Date32)?,
        DataType::Float64 => Arc::clone(col),
        dt if dt.is_numeric() => cast(col, &DataType::Float64)?,
        _ => Arc::clone(col),
    };

    let cells = match col.data_type() {
        DataType::Utf8 => {
            let values = col.as_string::<i32>();
            present_cells(&col, |row| CellValue::text(values.value(row)))
        }
        DataType::LargeUtf8 => {
            let values = col.as_string::<i64>();
            present_cells(&col, |row| CellValue::text(values.value(row)))
        }
        DataType::Float64 => {
            let values = col.as_primitive::<Float64Type>();
            present_cells(&col, |row| CellValue::Number(values.value(row)))
        }
        DataType::Date32 => {
            let values = col.as_primitive::<Date32Type>();
            present_cells(&col, |row| {
                values.value_as_date(row).map(CellValue::Date).unwrap_or(CellValue::Null)
            })
        }
        DataType::Boolean => {
            let values = col.as_boolean();
            present_cells(&col, |row| CellValue::Text(values.value(row).to_string()))
        }
        _ => {
            let formatter = ArrayFormatter::try_new(col.as_ref(), &FormatOptions::default())?;
            present_cells(&col, |row| CellValue::Text(formatter.value(row).to_string()))
        }
    };
    Ok(cells)
}

fn present_cells(col: &ArrayRef, cell: impl Fn(usize) -> CellValue) -> Vec<CellValue> {
    (0..col.len())
        .map(|row| if col.is_null(row) { CellValue::Null } else { cell(row) })
        .collect()
}
