use std::ops::RangeInclusive;

use chrono::{Datelike, NaiveDate};
use eframe::egui::Ui;
use egui_plot::{Bar, BarChart, GridMark, Legend, Line, Plot, PlotPoints, Points};

use credit_dashboard::data::aggregate::AggregateTable;
use credit_dashboard::data::model::DATE_DISPLAY_FORMAT;
use credit_dashboard::report::{format_brl, ChartKind, Report, ReportView};

use crate::color::{generate_palette, ACCENT};

const CHART_HEIGHT: f32 = 260.0;

// ---------------------------------------------------------------------------
// Chart grid (central panel)
// ---------------------------------------------------------------------------

/// Two charts per row, in report order.
pub fn chart_grid(ui: &mut Ui, report: &Report) {
    for pair in report.views.chunks(2) {
        ui.columns(2, |cols| {
            for (col, (view, data)) in cols.iter_mut().zip(pair) {
                chart(col, *view, data);
            }
        });
        ui.add_space(8.0);
    }
}

fn chart(ui: &mut Ui, view: ReportView, data: &AggregateTable) {
    ui.strong(view.title());
    if data.is_empty() {
        ui.weak("No data for the current filters.");
        return;
    }
    match view.kind() {
        ChartKind::Bar => bar_chart(ui, view, data),
        ChartKind::Pie => share_chart(ui, view, data),
        ChartKind::Line => line_chart(ui, view, data),
    }
}

fn value_label(view: ReportView, value: f64) -> String {
    if view.is_amount() {
        format_brl(value)
    } else {
        format!("{value:.0}")
    }
}

/// Category labels on the argument axis; bars sit at 0, 1, 2, ...
fn category_formatter(labels: Vec<String>) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String {
    move |mark: GridMark, _range: &RangeInclusive<f64>| {
        let idx = mark.value.round();
        if (mark.value - idx).abs() > f64::EPSILON || idx < 0.0 {
            return String::new();
        }
        labels.get(idx as usize).cloned().unwrap_or_default()
    }
}

fn bar_chart(ui: &mut Ui, view: ReportView, data: &AggregateTable) {
    let labelled = data.labelled();
    let colors = generate_palette(labelled.len());
    let labels: Vec<String> = labelled.iter().map(|(l, _)| l.clone()).collect();

    Plot::new(view.title())
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .x_axis_formatter(category_formatter(labels))
        .y_axis_formatter(move |mark, _range| value_label(view, mark.value))
        .show(ui, |plot_ui| {
            for (i, ((label, value), color)) in labelled.iter().zip(colors).enumerate() {
                let bar = Bar::new(i as f64, *value)
                    .name(format!("{label}: {}", value_label(view, *value)))
                    .fill(color)
                    .width(0.7);
                plot_ui.bar_chart(BarChart::new(vec![bar]).name(label).color(color));
            }
        });
}

/// Distribution charts: horizontal bars of each key's percentage.
fn share_chart(ui: &mut Ui, view: ReportView, data: &AggregateTable) {
    let total = data.total();
    let labelled = data.labelled();
    let colors = generate_palette(labelled.len());
    let labels: Vec<String> = labelled.iter().map(|(l, _)| l.clone()).collect();

    Plot::new(view.title())
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .include_x(0.0)
        .include_x(100.0)
        .y_axis_formatter(category_formatter(labels))
        .x_axis_formatter(|mark, _range| format!("{:.0}%", mark.value))
        .show(ui, |plot_ui| {
            for (i, ((label, value), color)) in labelled.iter().zip(colors).enumerate() {
                let pct = if total > 0.0 { value / total * 100.0 } else { 0.0 };
                let bar = Bar::new(i as f64, pct)
                    .name(format!("{label}: {value:.0} ({pct:.1}%)"))
                    .fill(color)
                    .width(0.7);
                plot_ui.bar_chart(BarChart::new(vec![bar]).horizontal().name(label).color(color));
            }
        });
}

fn line_chart(ui: &mut Ui, view: ReportView, data: &AggregateTable) {
    let points: Vec<[f64; 2]> = data
        .date_points()
        .iter()
        .map(|(day, value)| [day.num_days_from_ce() as f64, *value])
        .collect();

    Plot::new(view.title())
        .height(CHART_HEIGHT)
        .x_axis_formatter(|mark, _range| {
            NaiveDate::from_num_days_from_ce_opt(mark.value.round() as i32)
                .map(|d| d.format(DATE_DISPLAY_FORMAT).to_string())
                .unwrap_or_default()
        })
        .y_axis_formatter(move |mark, _range| value_label(view, mark.value))
        .label_formatter(move |_name, point| {
            let day = NaiveDate::from_num_days_from_ce_opt(point.x.round() as i32)
                .map(|d| d.format(DATE_DISPLAY_FORMAT).to_string())
                .unwrap_or_default();
            format!("{day}\n{}", value_label(view, point.y))
        })
        .show(ui, |plot_ui| {
            plot_ui.line(
                Line::new(PlotPoints::from(points.clone()))
                    .name(view.title())
                    .color(ACCENT)
                    .width(2.0),
            );
            plot_ui.points(Points::new(PlotPoints::from(points)).radius(3.0).color(ACCENT));
        });
}
