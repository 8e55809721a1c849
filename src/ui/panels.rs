use std::sync::Arc;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::color;
use crate::error::DashboardError;
use crate::report::{format_thousands, Metric};
use crate::state::{AppState, Overlay, ViewState};
use crate::ui::plot;

const TITLE: &str = "Bhutan Rainfall Explorer";
const SUBTITLE: &str =
    "Explore, analyze, and visualize rainfall trends across Bhutan (2021–2025).";
const INFO: Color32 = Color32::from_rgb(0x2E, 0x86, 0xAB);

// ---------------------------------------------------------------------------
// Landing page
// ---------------------------------------------------------------------------

/// Title, hero image and the enter button. Returns true when clicked.
pub fn landing(ui: &mut Ui, hero: Option<&egui::TextureHandle>) -> bool {
    let mut entered = false;
    ui.vertical_centered(|ui: &mut Ui| {
        ui.add_space(32.0);
        ui.label(
            RichText::new(format!("🏔 {TITLE}"))
                .size(36.0)
                .strong()
                .color(color::PRIMARY),
        );
        ui.label(RichText::new(SUBTITLE).size(18.0).color(Color32::GRAY));
        ui.add_space(16.0);

        if let Some(texture) = hero {
            ui.add(
                egui::Image::new(texture)
                    .max_width(ui.available_width() * 0.8)
                    .max_height(ui.available_height() * 0.6)
                    .rounding(8.0),
            );
            ui.add_space(16.0);
        }

        let button = egui::Button::new(
            RichText::new("Enter Dashboard")
                .size(20.0)
                .color(Color32::WHITE),
        )
        .fill(color::PRIMARY)
        .min_size(egui::vec2(220.0, 44.0));
        entered = ui.add(button).clicked();
    });
    entered
}

// ---------------------------------------------------------------------------
// Left side panel – filters, quick stats, panel toggles
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("🔍 Filters");
    ui.separator();

    let Some(dataset) = state.dataset.as_ref().map(Arc::clone) else {
        ui.label("No dataset loaded.");
        if let Some(err) = &state.load_error {
            ui.label(RichText::new(err.guidance()).small());
        }
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Region multi-select ----
            let n_selected = state.selection.region_codes.len();
            let n_total = dataset.region_codes.len();
            egui::CollapsingHeader::new(
                RichText::new(format!("Regions  ({n_selected}/{n_total})")).strong(),
            )
            .id_salt("regions")
            .default_open(true)
            .show(ui, |ui: &mut Ui| {
                ui.horizontal(|ui: &mut Ui| {
                    if ui.small_button("All").clicked() {
                        state.select_all();
                    }
                    if ui.small_button("None").clicked() {
                        state.select_none();
                    }
                });

                for code in &dataset.region_codes {
                    let mut text = RichText::new(code);
                    if let Some(cm) = &state.color_map {
                        text = text.color(cm.color_for(code));
                    }
                    let mut checked = state.selection.region_codes.contains(code);
                    if ui.checkbox(&mut checked, text).changed() {
                        state.toggle_region(code);
                    }
                }
            });
            ui.separator();

            // ---- Year range ----
            if let Some((min, max)) = dataset.year_bounds {
                ui.strong("Year range");
                let (mut lo, mut hi) = (state.selection.years.lo(), state.selection.years.hi());
                let from = ui.add(egui::Slider::new(&mut lo, min..=max).text("From"));
                let to = ui.add(egui::Slider::new(&mut hi, min..=max).text("To"));
                if from.changed() || to.changed() {
                    state.set_years(lo, hi);
                }
                ui.separator();
            }

            // ---- Quick stats ----
            ui.strong("📊 Quick Stats");
            ui.label(format!("Total Regions: {n_total}"));
            if let Some((min, max)) = dataset.year_bounds {
                ui.label(format!("Data Span: {min}-{max}"));
            }
            ui.label(format!("Total Records: {}", format_thousands(dataset.len())));
            ui.label(format!(
                "Visible Records: {}",
                format_thousands(state.visible_indices.len())
            ));
            ui.separator();

            // ---- Analysis panels ----
            if matches!(state.view.state(), ViewState::Dashboard(_)) {
                ui.strong("Analysis Panels");
                for (overlay, label) in [
                    (Overlay::Forecast, "🔮 Show Forecasts"),
                    (Overlay::Cluster, "🎯 Show Clusters"),
                ] {
                    let open = state.view.is_open(overlay);
                    if ui.selectable_label(open, label).clicked() {
                        state.set_overlay(overlay, !open);
                    }
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open observations…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Reload").clicked() {
                state.reload();
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(format!(
                "{} observations loaded from {}, {} visible",
                format_thousands(ds.len()),
                state.observations_path.display(),
                format_thousands(state.visible_indices.len())
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            let colour = if msg.starts_with("Error") {
                Color32::RED
            } else {
                INFO
            };
            ui.label(RichText::new(msg).color(colour));
        }
    });
}

// ---------------------------------------------------------------------------
// Central panel – dashboard
// ---------------------------------------------------------------------------

/// Charts for the current selection, or the reason there are none.
pub fn dashboard(ui: &mut Ui, state: &AppState) {
    ui.heading("🏔 Bhutan Rainfall Analysis Dashboard");
    ui.separator();

    if let Some(err) = &state.load_error {
        error_state(
            ui,
            err,
            "Choose a cleaned rainfall table with File → Open observations…",
        );
        return;
    }

    let report = match state.dashboard_report() {
        Ok(report) => report,
        Err(err) => {
            error_state(ui, &err, "");
            return;
        }
    };

    ui.horizontal(|ui: &mut Ui| {
        ui.label(RichText::new(report.header()).size(16.0));
        ui.label(
            RichText::new(format!("({} records)", format_thousands(report.row_count)))
                .color(Color32::GRAY),
        );
    });
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            plot::trend_chart(ui, &report.trend);

            ui.columns(2, |cols| {
                plot::histogram_chart(&mut cols[0], &report.distribution);
                plot::monthly_box_chart(&mut cols[1], &report.by_month);
            });

            match &report.regional {
                Some(chart) => plot::regional_chart(ui, chart, state.color_map.as_ref()),
                None => {
                    ui.add_space(8.0);
                    ui.label(
                        RichText::new("Select multiple regions to see the regional comparison.")
                            .color(INFO),
                    );
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Shared widgets
// ---------------------------------------------------------------------------

/// One row of metric tiles.
pub fn metric_row(ui: &mut Ui, metrics: &[Metric]) {
    if metrics.is_empty() {
        return;
    }
    ui.columns(metrics.len(), |cols| {
        for (col, metric) in cols.iter_mut().zip(metrics) {
            col.label(RichText::new(metric.label).small().color(Color32::GRAY));
            col.label(RichText::new(&metric.value).size(22.0).strong());
        }
    });
}

/// Local rendering of a failure. `steps` tells the user how to produce a
/// missing file; it is only shown for `DataUnavailable`.
pub fn error_state(ui: &mut Ui, err: &DashboardError, steps: &str) {
    let tone = if err.is_error() { Color32::RED } else { INFO };
    match err {
        DashboardError::DataUnavailable { path } => {
            ui.label(
                RichText::new(format!("ℹ {} is not available yet.", path.display())).color(tone),
            );
            ui.label(err.guidance());
            if !steps.is_empty() {
                ui.label(RichText::new(steps).italics());
            }
        }
        DashboardError::DataCorrupt { .. } => {
            ui.label(RichText::new(err.to_string()).color(tone));
            ui.label(err.guidance());
        }
        DashboardError::InsufficientData { .. } => {
            ui.label(RichText::new(err.guidance()).color(Color32::GRAY));
        }
        DashboardError::SelectionEmpty => {
            ui.label(RichText::new(err.guidance()).color(tone));
        }
        DashboardError::Unexpected(e) => {
            ui.label(RichText::new(format!("{}: {}", err.kind(), err.guidance())).color(tone));
            ui.label(format!("Error details: {e:#}"));
        }
    }
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open rainfall observations")
        .add_filter("Supported files", &["csv", "txt", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv", "txt"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.load_observations(&path);
    }
}
