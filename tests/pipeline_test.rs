use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use arrow::array::{
    ArrayRef, Date32Array, Float64Array, Int16Array, StringArray, TimestampNanosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;
use tempfile::TempDir;

use credit_dashboard::data::aggregate::{count_by, count_over_time, sum_by, time_series};
use credit_dashboard::data::filter::{apply, ConstraintSet};
use credit_dashboard::data::load_table;
use credit_dashboard::data::loader::Source;
use credit_dashboard::data::model::{CellValue, Schema};
use credit_dashboard::data::normalize::DecimalSeparator;
use credit_dashboard::report::{build_report, ReportView};
use credit_dashboard::DashboardError;

const TIMEOUT: Duration = Duration::from_secs(5);

const HEADER: &str = " Corretor Responsável , Unidade da Corretora ,Finalidade do Crédito,Status da Negociação,Crédito Desejado (R$),Data da Solicitação ";

fn write(dir: &TempDir, name: &str, content: &str) -> Source {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("Failed to write fixture");
    Source::File(path)
}

fn sample_csv(dir: &TempDir) -> Source {
    let body = [
        HEADER,
        "Ana,Centro,Imóvel,Approved,\"R$ 1.234,56\",05/03/2024",
        "Bia,Sul,Veículo,Pending,\"R$ 500,00\",01/03/2024",
        "Ana,Sul,Imóvel,Approved,abc,31/02/2024",
        "Caio,Centro,Reforma,Approved,1000.50,01/03/2024",
        "Bia,Centro,Imóvel,Pending,,05/03/2024",
    ]
    .join("\n");
    write(dir, "dados.csv", &body)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn constraint(column: &str, values: &[&str]) -> ConstraintSet {
    let set: BTreeSet<String> = values.iter().map(|v| v.to_string()).collect();
    BTreeMap::from([(column.to_string(), set)])
}

#[test]
fn csv_source_is_normalized() {
    let dir = TempDir::new().unwrap();
    let schema = Schema::default();
    let table = load_table(&sample_csv(&dir), &schema, DecimalSeparator::Comma, TIMEOUT).unwrap();

    assert_eq!(table.len(), 5);
    assert_eq!(table.columns[0], "Corretor Responsável");
    assert_eq!(table.columns[5], "Data da Solicitação");

    let amounts: Vec<&CellValue> = table.column_values(&schema.amount).unwrap().collect();
    assert_eq!(amounts[0], &CellValue::Number(1234.56));
    assert_eq!(amounts[3], &CellValue::Number(1000.5));
    let dates: Vec<&CellValue> = table.column_values(&schema.date).unwrap().collect();
    assert_eq!(dates[0], &CellValue::Date(date(2024, 3, 5)));

    // "abc" and the empty cell; "31/02/2024".
    assert_eq!(table.absent_count(&schema.amount).unwrap(), 2);
    assert_eq!(table.absent_count(&schema.date).unwrap(), 1);
}

#[test]
fn filtering_then_counting() {
    let dir = TempDir::new().unwrap();
    let schema = Schema::default();
    let table = load_table(&sample_csv(&dir), &schema, DecimalSeparator::Comma, TIMEOUT).unwrap();

    let approved = apply(&table, &constraint(&schema.status, &["Approved"])).unwrap();
    assert_eq!(approved.len(), 3);
    assert_eq!(table.len(), 5);

    let per_broker = count_by(&approved, &schema.broker).unwrap();
    assert_eq!(per_broker.total(), 3.0);
    assert_eq!(per_broker.get("Ana"), Some(2.0));
}

#[test]
fn aggregates_over_loaded_table() {
    let dir = TempDir::new().unwrap();
    let schema = Schema::default();
    let table = load_table(&sample_csv(&dir), &schema, DecimalSeparator::Comma, TIMEOUT).unwrap();

    let by_unit = sum_by(&table, &schema.unit, &schema.amount).unwrap();
    assert!((by_unit.get("Centro").unwrap() - 2235.06).abs() < 1e-9);
    assert_eq!(by_unit.get("Sul"), Some(500.0));

    let series = time_series(&table, &schema.date, &schema.amount).unwrap();
    let points = series.date_points();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].0, date(2024, 3, 1));
    assert!((points[0].1 - 1500.5).abs() < 1e-9);
    assert_eq!(points[1].0, date(2024, 3, 5));
}

#[test]
fn report_for_filtered_selection() {
    let dir = TempDir::new().unwrap();
    let schema = Schema::default();
    let table = load_table(&sample_csv(&dir), &schema, DecimalSeparator::Comma, TIMEOUT).unwrap();
    let filtered = apply(&table, &constraint(&schema.unit, &["Centro"])).unwrap();

    let report = build_report(&filtered, &schema).unwrap();
    assert_eq!(report.metrics.total_requests, 3);
    assert_eq!(report.metrics.total_amount_display(), "R$ 2.235,06");
    assert_eq!(
        report.view(ReportView::StatusDistribution).unwrap().labelled()[0],
        ("Approved".to_string(), 2.0)
    );
    assert_eq!(report.detail.rows.len(), 3);
    assert_eq!(report.detail.rows[0][4], "R$ 1.234,56");
    assert_eq!(report.detail.rows[2][4], "");
}

#[test]
fn semicolon_csv_with_partial_schema() {
    let dir = TempDir::new().unwrap();
    let schema = Schema::default();
    let source = write(
        &dir,
        "unidades.csv",
        "Unidade da Corretora;Crédito Desejado (R$)\nA;R$ 100,00\nB;R$ 200,00\nA;R$ 50,00\n",
    );
    let table = load_table(&source, &schema, DecimalSeparator::Comma, TIMEOUT).unwrap();

    let by_unit = sum_by(&table, &schema.unit, &schema.amount).unwrap();
    assert_eq!(by_unit.to_map(), BTreeMap::from([("A".to_string(), 150.0), ("B".to_string(), 200.0)]));

    // Columns the file lacks are reported when something needs them.
    let err = build_report(&table, &schema).unwrap_err();
    assert!(matches!(err, DashboardError::MissingColumn(_)));
}

#[test]
fn unrelated_columns_are_a_schema_error() {
    let dir = TempDir::new().unwrap();
    let source = write(&dir, "other.csv", "foo,bar\n1,2\n");
    let err = load_table(&source, &Schema::default(), DecimalSeparator::Comma, TIMEOUT).unwrap_err();
    assert!(matches!(err, DashboardError::Schema(_)));
}

#[test]
fn missing_file_is_source_unavailable() {
    let dir = TempDir::new().unwrap();
    let source = Source::File(dir.path().join("dados.xlsx"));
    let err = load_table(&source, &Schema::default(), DecimalSeparator::Comma, TIMEOUT).unwrap_err();
    assert!(matches!(err, DashboardError::SourceUnavailable { .. }));
    assert!(err.to_string().contains("dados.xlsx"));
}

#[test]
fn json_records_source() {
    let dir = TempDir::new().unwrap();
    let schema = Schema::default();
    let source = write(
        &dir,
        "dados.json",
        r#"[
            {"Corretor Responsável": "Ana", "Crédito Desejado (R$)": 1500.0, "Data da Solicitação": "02/03/2024"},
            {"Corretor Responsável": "Bia", "Crédito Desejado (R$)": "R$ 2.000,00", "Data da Solicitação": null}
        ]"#,
    );
    let table = load_table(&source, &schema, DecimalSeparator::Comma, TIMEOUT).unwrap();
    let sums = sum_by(&table, &schema.broker, &schema.amount).unwrap();
    assert_eq!(sums.get("Ana"), Some(1500.0));
    assert_eq!(sums.get("Bia"), Some(2000.0));
    assert_eq!(table.absent_count(&schema.date).unwrap(), 1);
}

#[test]
fn parquet_source_keeps_native_types() {
    let dir = TempDir::new().unwrap();
    let schema = Schema::default();
    let path = dir.path().join("dados.parquet");

    let arrow_schema = Arc::new(ArrowSchema::new(vec![
        Field::new(&schema.unit, DataType::Utf8, false),
        Field::new(&schema.amount, DataType::Float64, true),
        Field::new(&schema.date, DataType::Date32, true),
    ]));
    let epoch = date(1970, 1, 1);
    let days = |d: NaiveDate| (d - epoch).num_days() as i32;
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(vec!["A", "B", "A"])),
        Arc::new(Float64Array::from(vec![Some(100.0), None, Some(50.0)])),
        Arc::new(Date32Array::from(vec![
            Some(days(date(2024, 3, 2))),
            Some(days(date(2024, 3, 1))),
            None,
        ])),
    ];
    let batch = RecordBatch::try_new(arrow_schema.clone(), columns).unwrap();
    let file = fs::File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, arrow_schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let table = load_table(&Source::File(path), &schema, DecimalSeparator::Comma, TIMEOUT).unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.rows[0][2], CellValue::Date(date(2024, 3, 2)));
    assert_eq!(sum_by(&table, &schema.unit, &schema.amount).unwrap().get("A"), Some(150.0));
    assert_eq!(table.absent_count(&schema.amount).unwrap(), 1);
}

#[test]
fn parquet_timestamps_and_small_ints() {
    let dir = TempDir::new().unwrap();
    let schema = Schema::default();
    let path = dir.path().join("pandas.parquet");

    let arrow_schema = Arc::new(ArrowSchema::new(vec![
        Field::new(&schema.unit, DataType::Int16, true),
        Field::new(&schema.date, DataType::Timestamp(TimeUnit::Nanosecond, None), true),
    ]));
    // 2024-03-05 00:00 and 14:30 UTC
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int16Array::from(vec![101, 102])),
        Arc::new(TimestampNanosecondArray::from(vec![
            1_709_596_800_000_000_000,
            1_709_649_000_000_000_000,
        ])),
    ];
    let batch = RecordBatch::try_new(arrow_schema.clone(), columns).unwrap();
    let mut writer = ArrowWriter::try_new(fs::File::create(&path).unwrap(), arrow_schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let table = load_table(&Source::File(path), &schema, DecimalSeparator::Comma, TIMEOUT).unwrap();
    assert_eq!(table.rows[0][0], CellValue::Number(101.0));
    assert_eq!(table.unique_values(&schema.unit).unwrap(), vec!["101", "102"]);
    assert_eq!(table.absent_count(&schema.date).unwrap(), 0);
    assert_eq!(
        count_over_time(&table, &schema.date).unwrap().date_points(),
        vec![(date(2024, 3, 5), 2.0)]
    );
}

#[test]
fn decimal_separator_follows_the_source() {
    let dir = TempDir::new().unwrap();
    let schema = Schema::default();
    let source = write(
        &dir,
        "valores.csv",
        "Unidade da Corretora;Crédito Desejado (R$)\nA;150.000\nB;2.500,75\n",
    );

    let brazilian = load_table(&source, &schema, DecimalSeparator::Comma, TIMEOUT).unwrap();
    let sums = sum_by(&brazilian, &schema.unit, &schema.amount).unwrap();
    assert_eq!(sums.get("A"), Some(150_000.0));
    assert_eq!(sums.get("B"), Some(2500.75));

    let plain = load_table(&source, &schema, DecimalSeparator::Dot, TIMEOUT).unwrap();
    assert_eq!(sum_by(&plain, &schema.unit, &schema.amount).unwrap().get("A"), Some(150.0));
    assert_eq!(plain.absent_count(&schema.amount).unwrap(), 1);
}
