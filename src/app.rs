use eframe::egui;

use credit_dashboard::config::DashboardConfig;
use credit_dashboard::state::AppState;

use crate::ui::{charts, panels, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct CreditDashboardApp {
    pub state: AppState,
}

impl CreditDashboardApp {
    /// Build the app and read the configured source once.
    pub fn new(config: DashboardConfig) -> Self {
        let mut state = AppState::new(config);
        state.load();
        Self { state }
    }
}

impl eframe::App for CreditDashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.state.ensure_fresh();

        // ---- Top panel: menu bar and headline metrics ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: charts and detail table ----
        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(report) = &self.state.report else {
                ui.centered_and_justified(|ui| {
                    ui.heading("Open a spreadsheet to view requests  (File → Open…)");
                });
                return;
            };

            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    charts::chart_grid(ui, report);
                    ui.separator();
                    ui.heading("Detailed data");
                    table::detail_table(ui, &report.detail);
                });
        });
    }
}
