use crate::data::aggregate::{self, AggregateTable};
use crate::data::model::{CellValue, Schema, Table};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Currency display
// ---------------------------------------------------------------------------

/// Render an amount the way the source displays money: `R$ 1.234,56`.
/// Negative amounts keep the sign after the symbol (`R$ -10,00`).
pub fn format_brl(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let digits = (cents / 100).to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("R$ {sign}{grouped},{:02}", cents % 100)
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    /// Share of the whole; drawn as a distribution.
    Pie,
    Line,
}

/// One chart of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportView {
    CreditByPurpose,
    RequestsByBroker,
    StatusDistribution,
    CreditByUnit,
    CreditOverTime,
    PurposeDistribution,
    CreditByBroker,
    RequestsOverTime,
}

impl ReportView {
    pub const ALL: [ReportView; 8] = [
        ReportView::CreditByPurpose,
        ReportView::RequestsByBroker,
        ReportView::StatusDistribution,
        ReportView::CreditByUnit,
        ReportView::CreditOverTime,
        ReportView::PurposeDistribution,
        ReportView::CreditByBroker,
        ReportView::RequestsOverTime,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            ReportView::CreditByPurpose => "Total credit by purpose",
            ReportView::RequestsByBroker => "Requests by broker",
            ReportView::StatusDistribution => "Negotiation status",
            ReportView::CreditByUnit => "Credit by brokerage unit",
            ReportView::CreditOverTime => "Requested credit over time",
            ReportView::PurposeDistribution => "Distribution by purpose",
            ReportView::CreditByBroker => "Credit by broker",
            ReportView::RequestsOverTime => "Requests over time",
        }
    }

    pub fn kind(&self) -> ChartKind {
        match self {
            ReportView::StatusDistribution | ReportView::PurposeDistribution => ChartKind::Pie,
            ReportView::CreditOverTime | ReportView::RequestsOverTime => ChartKind::Line,
            _ => ChartKind::Bar,
        }
    }

    /// Whether the measure is money (as opposed to a request count).
    pub fn is_amount(&self) -> bool {
        matches!(
            self,
            ReportView::CreditByPurpose
                | ReportView::CreditByUnit
                | ReportView::CreditOverTime
                | ReportView::CreditByBroker
        )
    }

    fn compute(&self, table: &Table, schema: &Schema) -> Result<AggregateTable> {
        match self {
            ReportView::CreditByPurpose => aggregate::sum_by(table, &schema.purpose, &schema.amount),
            ReportView::RequestsByBroker => aggregate::count_distinct_values(table, &schema.broker),
            ReportView::StatusDistribution => aggregate::count_distinct_values(table, &schema.status),
            ReportView::CreditByUnit => aggregate::sum_by(table, &schema.unit, &schema.amount),
            ReportView::CreditOverTime => aggregate::time_series(table, &schema.date, &schema.amount),
            ReportView::PurposeDistribution => aggregate::count_distinct_values(table, &schema.purpose),
            ReportView::CreditByBroker => aggregate::sum_by(table, &schema.broker, &schema.amount),
            ReportView::RequestsOverTime => aggregate::count_over_time(table, &schema.date),
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub total_requests: usize,
    pub total_amount: f64,
}

impl Metrics {
    pub fn total_amount_display(&self) -> String {
        format_brl(self.total_amount)
    }
}

/// The filtered table rendered as text, ready for a grid widget.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Everything the dashboard draws for one filter selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub metrics: Metrics,
    pub views: Vec<(ReportView, AggregateTable)>,
    pub detail: DetailTable,
}

impl Report {
    pub fn view(&self, view: ReportView) -> Option<&AggregateTable> {
        self.views.iter().find(|(v, _)| *v == view).map(|(_, t)| t)
    }
}

/// Aggregate a (filtered) table into metrics, chart data and detail rows.
pub fn build_report(table: &Table, schema: &Schema) -> Result<Report> {
    let metrics = Metrics {
        total_requests: table.len(),
        total_amount: aggregate::sum_column(table, &schema.amount)?,
    };

    let views = ReportView::ALL
        .iter()
        .map(|view| Ok((*view, view.compute(table, schema)?)))
        .collect::<Result<Vec<_>>>()?;

    Ok(Report {
        metrics,
        views,
        detail: detail_table(table, schema),
    })
}

/// Amounts as `R$ 1.234,56`, dates as `dd/mm/yyyy`, absent cells empty.
pub fn detail_table(table: &Table, schema: &Schema) -> DetailTable {
    let amount_idx = table.column_index(&schema.amount).ok();
    let rows = table
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(i, cell)| match cell {
                    CellValue::Null => String::new(),
                    CellValue::Number(v) if Some(i) == amount_idx => format_brl(*v),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect();

    DetailTable {
        columns: table.columns.clone(),
        rows,
    }
}
