use std::path::Path;

use anyhow::{Context, Result};
use eframe::egui;

use crate::config::AppConfig;
use crate::state::{AppState, ViewState};
use crate::ui::{overlays, panels};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct RainfallExplorerApp {
    pub state: AppState,
    hero: Option<egui::TextureHandle>,
}

impl RainfallExplorerApp {
    pub fn new(ctx: &egui::Context, config: AppConfig) -> Self {
        let hero = match load_texture(ctx, &config.landing_image_path) {
            Ok(texture) => Some(texture),
            Err(e) => {
                log::warn!("No landing image: {e:#}");
                None
            }
        };
        Self {
            state: AppState::new(config),
            hero,
        }
    }
}

/// Decode an image file into an egui texture.
fn load_texture(ctx: &egui::Context, path: &Path) -> Result<egui::TextureHandle> {
    let image = image::open(path)
        .with_context(|| format!("opening {}", path.display()))?
        .to_rgba8();
    let size = [image.width() as usize, image.height() as usize];
    let pixels = egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw());
    Ok(ctx.load_texture("landing_image", pixels, egui::TextureOptions::LINEAR))
}

impl eframe::App for RainfallExplorerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.state.view.state() == ViewState::Landing {
            egui::CentralPanel::default().show(ctx, |ui| {
                if panels::landing(ui, self.hero.as_ref()) {
                    self.state.enter_dashboard();
                }
            });
            return;
        }

        // ---- Top panel: menu bar ----
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

        // ---- Central panel: charts ----
        egui::CentralPanel::default().show(ctx, |ui| {
            panels::dashboard(ui, &self.state);
        });

        // ---- Overlays ----
        overlays::forecast_window(ctx, &mut self.state);
        overlays::cluster_window(ctx, &mut self.state);
    }
}
