use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::model::{CellValue, Schema, Table};

/// Currency marker stripped from amount text.
pub const CURRENCY_SYMBOL: &str = "R$";

// ---------------------------------------------------------------------------
// Parse warnings
// ---------------------------------------------------------------------------

/// A single cell that could not be parsed. The cell became `Null`; the row
/// was kept.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseWarning {
    pub row: usize,
    pub column: String,
    pub raw: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}, '{}': cannot parse '{}'", self.row, self.column, self.raw)
    }
}

// ---------------------------------------------------------------------------
// Table normalization
// ---------------------------------------------------------------------------

/// Trim column names and convert the amount and date columns to typed cells.
///
/// Unparseable cells become `Null` (see [`normalize_with_warnings`]).
/// Normalizing an already-normalized table changes nothing.
pub fn normalize(table: Table, schema: &Schema, decimal: DecimalSeparator) -> Table {
    let (table, warnings) = normalize_with_warnings(table, schema, decimal);
    if !warnings.is_empty() {
        for w in &warnings {
            log::debug!("{w}");
        }
        for column in [&schema.amount, &schema.date] {
            let n = warnings.iter().filter(|w| &w.column == column).count();
            if n > 0 {
                log::warn!("{n} value(s) in '{column}' could not be parsed and were left empty");
            }
        }
    }
    table
}

/// Same as [`normalize`] but hands back every per-cell failure.
pub fn normalize_with_warnings(
    table: Table,
    schema: &Schema,
    decimal: DecimalSeparator,
) -> (Table, Vec<ParseWarning>) {
    let Table { columns, rows } = table;
    let columns = columns.into_iter().map(|c| c.trim().to_string()).collect();
    let mut table = Table { columns, rows };

    let mut warnings = Vec::new();
    convert_column(&mut table, &schema.amount, |cell| normalize_amount(cell, decimal), &mut warnings);
    convert_column(&mut table, &schema.date, normalize_date, &mut warnings);
    (table, warnings)
}

fn convert_column(
    table: &mut Table,
    column: &str,
    convert: impl Fn(&CellValue) -> Option<CellValue>,
    warnings: &mut Vec<ParseWarning>,
) {
    // Absence is reported later, by whichever operation needs the column.
    let Ok(idx) = table.column_index(column) else {
        log::debug!("column '{column}' not present, skipping normalization");
        return;
    };

    for (row_no, row) in table.rows.iter_mut().enumerate() {
        let cell = &mut row[idx];
        if is_blank(cell) {
            *cell = CellValue::Null;
            continue;
        }
        match convert(cell) {
            Some(value) => *cell = value,
            None => {
                warnings.push(ParseWarning {
                    row: row_no,
                    column: column.to_string(),
                    raw: cell.to_string(),
                });
                *cell = CellValue::Null;
            }
        }
    }
}

fn is_blank(cell: &CellValue) -> bool {
    match cell {
        CellValue::Null => true,
        CellValue::Text(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn normalize_amount(cell: &CellValue, decimal: DecimalSeparator) -> Option<CellValue> {
    match cell {
        CellValue::Number(v) if v.is_finite() => Some(CellValue::Number(*v)),
        CellValue::Text(s) => parse_currency(s, decimal).map(CellValue::Number),
        _ => None,
    }
}

fn normalize_date(cell: &CellValue) -> Option<CellValue> {
    match cell {
        CellValue::Date(d) => Some(CellValue::Date(*d)),
        CellValue::Text(s) => parse_date(s).map(CellValue::Date),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

/// Decimal marker of a source's amount text. The other mark of the pair
/// groups thousands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecimalSeparator {
    /// `1.234,56`, the broker spreadsheets' locale.
    #[default]
    #[serde(rename = ",")]
    Comma,
    /// `1,234.56`
    #[serde(rename = ".")]
    Dot,
}

impl DecimalSeparator {
    /// `(decimal mark, thousands mark)`
    fn marks(self) -> (char, char) {
        match self {
            DecimalSeparator::Comma => (',', '.'),
            DecimalSeparator::Dot => ('.', ','),
        }
    }
}

/// Parse currency text into a number.
///
/// With [`DecimalSeparator::Comma`]:
///
/// | input                          | result                                |
/// |--------------------------------|---------------------------------------|
/// | `R$ 1.234,56`, `1234,56`       | `1234.56`                             |
/// | `150.000`, `R$ 1.500`          | `150000`, `1500` (thousands groups)   |
/// | `1.234.567`                    | `1234567`                             |
/// | `1234.56`, `R$1234.56`, `1.5`  | plain numeric (dot not a valid group) |
/// | `-R$ 10,00`, `R$ -10,00`       | `-10`                                 |
/// | empty, `abc`, `NaN`, `1,2,3`   | `None`                                |
///
/// With [`DecimalSeparator::Dot`] the marks swap: `1,234.56` is `1234.56`
/// and `150.000` is `150`.
pub fn parse_currency(raw: &str, decimal: DecimalSeparator) -> Option<f64> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let stripped = compact.replace(CURRENCY_SYMBOL, "");

    let (negative, digits) = match stripped.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, stripped.as_str()),
    };
    if digits.is_empty()
        || !digits
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == ',')
    {
        return None;
    }

    let (point, group) = decimal.marks();
    let (int_part, frac_part) = match digits.split_once(point) {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (digits, None),
    };
    if frac_part.is_some_and(|f| f.contains([',', '.'])) {
        return None;
    }

    let plain = if is_grouped(int_part, group) {
        let int_digits = int_part.replace(group, "");
        match frac_part {
            Some(frac) => format!("{int_digits}.{frac}"),
            None => int_digits,
        }
    } else if decimal == DecimalSeparator::Comma
        && frac_part.is_none()
        && int_part.matches('.').count() == 1
    {
        // Plain numeric text (`1234.56`) in a comma-decimal source.
        int_part.to_string()
    } else {
        return None;
    };

    let value: f64 = plain.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// True if `s` is plain digits or thousands groups separated by `sep`
/// (leading group 1-3 digits, every following group exactly 3).
fn is_grouped(s: &str, sep: char) -> bool {
    if !s.contains(sep) {
        return true;
    }
    let mut groups = s.split(sep);
    let first_ok = groups
        .next()
        .is_some_and(|g| (1..=3).contains(&g.len()));
    first_ok && groups.all(|g| g.len() == 3)
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Parse a date written day first (`05/03/2024` is 5 March 2024).
///
/// Accepted: `d/m/Y`, `d-m-Y`, `d.m.Y`, two-digit years (`00`-`68` are
/// 2000s, `69`-`99` 1900s), ISO `Y-m-d`, each optionally followed by a time
/// (`HH:MM`, `HH:MM:SS`, fractional seconds) after a space or `T`. The time
/// is dropped. Impossible dates such as `31/02/2024` yield `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    let (date_part, time_part) = match s.find([' ', 'T']) {
        Some(pos) => (&s[..pos], Some(s[pos + 1..].trim())),
        None => (s, None),
    };
    if let Some(t) = time_part {
        if !is_time(t) {
            return None;
        }
    }

    let parts: Vec<&str> = date_part.split(['/', '-', '.']).collect();
    let [a, b, c] = parts[..] else {
        return None;
    };
    if !parts.iter().all(|p| !p.is_empty() && p.chars().all(|ch| ch.is_ascii_digit())) {
        return None;
    }

    let (year, month, day) = if a.len() == 4 {
        (a, b, c)
    } else {
        (c, b, a)
    };
    if day.len() > 2 || month.len() > 2 {
        return None;
    }

    let year: i32 = match year.len() {
        4 => year.parse().ok()?,
        2 => {
            let yy: i32 = year.parse().ok()?;
            if yy < 69 {
                2000 + yy
            } else {
                1900 + yy
            }
        }
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}

fn is_time(s: &str) -> bool {
    ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"]
        .iter()
        .any(|fmt| NaiveTime::parse_from_str(s, fmt).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn brl(raw: &str) -> Option<f64> {
        parse_currency(raw, DecimalSeparator::Comma)
    }

    #[test]
    fn currency_brazilian_format() {
        assert_eq!(brl("R$ 1.234,56"), Some(1234.56));
        assert_eq!(brl("1.234,56"), Some(1234.56));
        assert_eq!(brl("R$1234,5"), Some(1234.5));
        assert_eq!(brl("R$ 1.234.567,89"), Some(1234567.89));
    }

    #[test]
    fn currency_plain_numeric() {
        assert_eq!(brl("1234.56"), Some(1234.56));
        assert_eq!(brl("R$1234.56"), Some(1234.56));
        assert_eq!(brl("  250  "), Some(250.0));
        assert_eq!(brl("1.5"), Some(1.5));
    }

    #[test]
    fn currency_thousands_only() {
        assert_eq!(brl("R$ 1.500"), Some(1500.0));
        assert_eq!(brl("1.234.567"), Some(1234567.0));
        // Unmarked thousands are still thousands in a comma-decimal source.
        assert_eq!(brl("150.000"), Some(150000.0));
        assert_eq!(brl("1.500"), Some(1500.0));
    }

    #[test]
    fn currency_dot_decimal_source() {
        let dot = |raw| parse_currency(raw, DecimalSeparator::Dot);
        assert_eq!(dot("150.000"), Some(150.0));
        assert_eq!(dot("1,234.56"), Some(1234.56));
        assert_eq!(dot("R$ 1,500"), Some(1500.0));
        assert_eq!(dot("1.234,56"), None);
        assert_eq!(dot("1234,56"), None);
    }

    #[test]
    fn currency_negative_and_nbsp() {
        assert_eq!(brl("-R$ 10,00"), Some(-10.0));
        assert_eq!(brl("R$ -10,00"), Some(-10.0));
        assert_eq!(brl("R$\u{a0}2.000,00"), Some(2000.0));
    }

    #[test]
    fn currency_rejects_garbage() {
        for raw in ["abc", "", "R$", "NaN", "inf", "1,2,3", "12.34.5", "1.2,3.4", "1,234.56", "-", "."] {
            assert_eq!(brl(raw), None, "{raw:?}");
        }
    }

    #[test]
    fn dates_are_day_first() {
        assert_eq!(parse_date("05/03/2024"), Some(date(2024, 3, 5)));
        assert_eq!(parse_date("5-3-2024"), Some(date(2024, 3, 5)));
        assert_eq!(parse_date("05.03.24"), Some(date(2024, 3, 5)));
        assert_eq!(parse_date("01/01/99"), Some(date(1999, 1, 1)));
    }

    #[test]
    fn dates_with_time_and_iso() {
        assert_eq!(parse_date("05/03/2024 14:30"), Some(date(2024, 3, 5)));
        assert_eq!(parse_date("2024-03-05"), Some(date(2024, 3, 5)));
        assert_eq!(parse_date("2024-03-05T08:00:00"), Some(date(2024, 3, 5)));
        assert_eq!(parse_date("2024-03-05 08:00:00.250"), Some(date(2024, 3, 5)));
    }

    #[test]
    fn invalid_dates_are_absent() {
        for raw in ["31/02/2024", "13/13/2024", "abc", "", "05/03", "05/03/2024 late", "5/3/202"] {
            assert_eq!(parse_date(raw), None, "{raw:?}");
        }
    }

    fn raw_table() -> Table {
        let schema = Schema::default();
        Table::new(
            vec![format!("  {} ", schema.amount), format!("{}\t", schema.date), " Unidade da Corretora".into()],
            vec![
                vec![CellValue::text("R$ 1.234,56"), CellValue::text("05/03/2024"), CellValue::text("A")],
                vec![CellValue::text("abc"), CellValue::text("31/02/2024"), CellValue::text("B")],
                vec![CellValue::Number(10.0), CellValue::text(""), CellValue::text("A")],
            ],
        )
    }

    #[test]
    fn normalize_trims_and_converts() {
        let schema = Schema::default();
        let (table, warnings) = normalize_with_warnings(raw_table(), &schema, DecimalSeparator::Comma);

        assert_eq!(table.columns[0], schema.amount);
        assert_eq!(table.columns[2], "Unidade da Corretora");
        assert_eq!(table.rows[0][0], CellValue::Number(1234.56));
        assert_eq!(table.rows[0][1], CellValue::Date(date(2024, 3, 5)));
        assert_eq!(table.rows[2][0], CellValue::Number(10.0));

        // Bad cells become absent; rows are kept.
        assert_eq!(table.len(), 3);
        assert_eq!(table.absent_count(&schema.amount).unwrap(), 1);
        assert_eq!(table.absent_count(&schema.date).unwrap(), 2);

        // Blank cells are absent without being reported.
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].raw, "abc");
        assert_eq!(warnings[1].raw, "31/02/2024");
    }

    #[test]
    fn normalize_is_idempotent() {
        let schema = Schema::default();
        let once = normalize(raw_table(), &schema, DecimalSeparator::Comma);
        let (twice, warnings) = normalize_with_warnings(once.clone(), &schema, DecimalSeparator::Comma);
        assert_eq!(once, twice);
        assert!(warnings.is_empty());
    }

    #[test]
    fn normalize_tolerates_missing_columns() {
        let table = Table::new(vec!["other".into()], vec![vec![CellValue::text("x")]]);
        let out = normalize(table.clone(), &Schema::default(), DecimalSeparator::Comma);
        assert_eq!(out, table);
    }
}
