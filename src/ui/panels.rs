use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use credit_dashboard::data::filter::FilterField;
use credit_dashboard::data::loader::Source;
use credit_dashboard::state::AppState;

use crate::color::ACCENT;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

fn field_label(field: FilterField) -> &'static str {
    match field {
        FilterField::Broker => "Broker",
        FilterField::Purpose => "Credit purpose",
        FilterField::Unit => "Brokerage unit",
        FilterField::Status => "Negotiation status",
    }
}

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.heading("Filters");
        if state.selection.active_count() > 0 && ui.small_button("Clear all").clicked() {
            state.clear_all_filters();
        }
    });
    ui.separator();

    if state.table.is_none() {
        ui.label("No dataset loaded.");
        return;
    }

    // Clone what we need so we can mutate state inside the loop.
    let options = state.options.clone();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for field in FilterField::ALL {
                let Some(values) = options.get(&field) else {
                    continue;
                };

                // Nothing selected means every value passes.
                let n_selected = state.selection.selected(field).map_or(0, |s| s.len());
                let header_text = if n_selected == 0 {
                    format!("{}  (all)", field_label(field))
                } else {
                    format!("{}  ({n_selected}/{})", field_label(field), values.len())
                };

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(field_label(field))
                    .default_open(field == FilterField::Broker)
                    .show(ui, |ui: &mut Ui| {
                        if n_selected > 0 && ui.small_button("Clear").clicked() {
                            state.clear_filter(field);
                        }

                        for value in values {
                            let mut checked = state.selection.is_selected(field, value);
                            if ui.checkbox(&mut checked, value.as_str()).changed() {
                                state.toggle_filter_value(field, value);
                            }
                        }
                    });
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar with the headline metrics.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Reload").clicked() {
                state.reload();
                ui.close_menu();
            }
        });

        ui.separator();
        ui.label(RichText::new(state.source.to_string()).weak());

        if let Some(report) = &state.report {
            ui.separator();
            ui.label(RichText::new("Total requests:").color(ACCENT));
            ui.strong(report.metrics.total_requests.to_string());
            ui.separator();
            ui.label(RichText::new("Total requested:").color(ACCENT));
            ui.strong(report.metrics.total_amount_display());
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open credit requests")
        .add_filter("Supported files", &["xlsx", "xlsm", "xlsb", "xls", "ods", "csv", "json", "parquet", "pq"])
        .add_filter("Spreadsheet", &["xlsx", "xlsm", "xlsb", "xls", "ods"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.set_source(Source::File(path));
    }
}
