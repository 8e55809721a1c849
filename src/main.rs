mod app;
mod color;
mod config;
mod data;
mod error;
mod report;
mod state;
mod ui;

use app::RainfallExplorerApp;
use config::AppConfig;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {e:#}");
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    };
    log::info!("Observations from {}", config.observations_path.display());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Bhutan Rainfall Explorer",
        options,
        Box::new(|cc| Ok(Box::new(RainfallExplorerApp::new(&cc.egui_ctx, config)))),
    )
}
