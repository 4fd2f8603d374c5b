mod app;
mod color;
mod ui;

use std::path::Path;

use app::CreditDashboardApp;
use credit_dashboard::config::{DashboardConfig, CONFIG_FILE};
use eframe::egui;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = DashboardConfig::load(Path::new(CONFIG_FILE))?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 900.0])
            .with_min_inner_size([700.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Credit Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(CreditDashboardApp::new(config)))),
    )
    .map_err(|e| anyhow::anyhow!("failed to start UI: {e}"))
}
