use eframe::egui::Ui;
use egui_extras::{Column, TableBuilder};

use credit_dashboard::report::DetailTable;

const ROW_HEIGHT: f32 = 18.0;

/// Render the filtered rows as a striped, resizable grid.
pub fn detail_table(ui: &mut Ui, detail: &DetailTable) {
    if detail.rows.is_empty() {
        ui.weak("No requests match the current filters.");
        return;
    }

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .vscroll(false)
        .columns(Column::auto().at_least(80.0), detail.columns.len())
        .header(ROW_HEIGHT + 4.0, |mut header| {
            for name in &detail.columns {
                header.col(|ui| {
                    ui.strong(name);
                });
            }
        })
        .body(|body| {
            body.rows(ROW_HEIGHT, detail.rows.len(), |mut row| {
                let cells = &detail.rows[row.index()];
                for cell in cells {
                    row.col(|ui| {
                        ui.label(cell);
                    });
                }
            });
        });
}
