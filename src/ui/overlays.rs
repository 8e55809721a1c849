use eframe::egui::{self, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::export::{ExportRow, EXPORT_FILE_NAME};
use crate::report::{ClusterPlot, ClusterReport, ForecastReport};
use crate::state::{AppState, Overlay};
use crate::ui::{panels, plot};

const FORECAST_STEPS: &str = "To generate forecasts, run the forecasting notebook. \
     It writes outputs/forecast.csv, which this panel picks up on the next open.";
const CLUSTER_STEPS: &str = "To generate cluster results, run the clustering section of the \
     exploratory analysis notebook. It writes outputs/cluster_summary.csv.";

const ROW_HEIGHT: f32 = 18.0;

// ---------------------------------------------------------------------------
// Forecast window
// ---------------------------------------------------------------------------

pub fn forecast_window(ctx: &egui::Context, state: &mut AppState) {
    if !state.view.is_open(Overlay::Forecast) {
        return;
    }
    let result = state.forecast_report();
    let preview_rows = state.config.forecast_preview_rows;
    let export_error = state.export_error.as_ref();
    let mut open = true;
    let mut download = false;

    egui::Window::new("🔮 Rainfall Forecast")
        .open(&mut open)
        .default_size([900.0, 720.0])
        .vscroll(true)
        .show(ctx, |ui: &mut Ui| match &result {
            Err(err) => panels::error_state(ui, err, FORECAST_STEPS),
            Ok(report) => {
                download = forecast_body(ui, report, preview_rows);
                if let Some(err) = export_error {
                    panels::error_state(ui, err, "");
                }
            }
        });

    if download {
        save_forecast(state);
    }
    if !open {
        state.set_overlay(Overlay::Forecast, false);
    }
}

/// Returns true when the download button was clicked.
fn forecast_body(ui: &mut Ui, report: &ForecastReport, preview_rows: usize) -> bool {
    ui.strong("Forecast Summary");
    panels::metric_row(ui, &report.metrics());
    ui.label(format!(
        "{} to {}",
        report.summary.start.format("%Y-%m-%d"),
        report.summary.end.format("%Y-%m-%d")
    ));

    plot::forecast_chart(ui, &report.line);
    ui.columns(2, |cols| {
        plot::forecast_monthly_chart(&mut cols[0], &report.monthly);
        plot::forecast_seasonal_chart(&mut cols[1], &report.seasonal);
    });

    ui.add_space(8.0);
    ui.strong("📋 Detailed Forecast Data");
    ui.push_id("forecast_preview", |ui: &mut Ui| {
        preview_table(ui, report.preview(preview_rows), report.has_bounds);
    });

    ui.add_space(8.0);
    ui.button("📥 Download Forecast Data").clicked()
}

fn preview_table(ui: &mut Ui, rows: &[ExportRow], with_bounds: bool) {
    let mut headers = vec!["Date", "Predicted_Rainfall_mm"];
    if with_bounds {
        headers.extend(["Lower_Bound", "Upper_Bound"]);
    }
    let fmt = |v: Option<f64>| v.map(|v| format!("{v:.2}")).unwrap_or_default();

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .max_scroll_height(320.0)
        .columns(Column::auto().at_least(90.0), headers.len())
        .header(ROW_HEIGHT + 2.0, |mut header| {
            for h in &headers {
                header.col(|ui: &mut Ui| {
                    ui.strong(*h);
                });
            }
        })
        .body(|body| {
            body.rows(ROW_HEIGHT, rows.len(), |mut row| {
                let r = &rows[row.index()];
                row.col(|ui: &mut Ui| {
                    ui.label(r.date.format("%Y-%m-%d").to_string());
                });
                row.col(|ui: &mut Ui| {
                    ui.label(format!("{:.2}", r.predicted_mm));
                });
                if with_bounds {
                    row.col(|ui: &mut Ui| {
                        ui.label(fmt(r.lower_bound_mm));
                    });
                    row.col(|ui: &mut Ui| {
                        ui.label(fmt(r.upper_bound_mm));
                    });
                }
            });
        });
}

fn save_forecast(state: &mut AppState) {
    let Some(path) = rfd::FileDialog::new()
        .set_title("Save forecast")
        .set_file_name(EXPORT_FILE_NAME)
        .add_filter("CSV", &["csv"])
        .save_file()
    else {
        return;
    };

    if let Some(n) = state.export_forecast(&path) {
        state.status_message = Some(format!("Saved {n} forecast rows to {}", path.display()));
    }
}

// ---------------------------------------------------------------------------
// Cluster window
// ---------------------------------------------------------------------------

pub fn cluster_window(ctx: &egui::Context, state: &mut AppState) {
    if !state.view.is_open(Overlay::Cluster) {
        return;
    }
    let result = state.cluster_report();
    let mut open = true;

    egui::Window::new("🎯 Regional Clustering Analysis")
        .open(&mut open)
        .default_size([800.0, 640.0])
        .vscroll(true)
        .show(ctx, |ui: &mut Ui| match &result {
            Err(err) => panels::error_state(ui, err, CLUSTER_STEPS),
            Ok(report) => cluster_body(ui, report),
        });

    if !open {
        state.set_overlay(Overlay::Cluster, false);
    }
}

fn cluster_body(ui: &mut Ui, report: &ClusterReport) {
    ui.label(
        RichText::new(format!("Available columns: {}", report.headers.join(", "))).small(),
    );
    ui.add_space(4.0);
    ui.strong("Cluster Overview");
    panels::metric_row(ui, &report.metrics());

    ui.add_space(8.0);
    ui.strong("Cluster Summary");
    ui.push_id("cluster_table", |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .max_scroll_height(260.0)
            .columns(Column::auto().at_least(70.0), report.headers.len())
            .header(ROW_HEIGHT + 2.0, |mut header| {
                for h in &report.headers {
                    header.col(|ui: &mut Ui| {
                        ui.strong(h);
                    });
                }
            })
            .body(|body| {
                body.rows(ROW_HEIGHT, report.cells.len(), |mut row| {
                    for cell in &report.cells[row.index()] {
                        row.col(|ui: &mut Ui| {
                            ui.label(cell);
                        });
                    }
                });
            });
    });

    match &report.plot {
        ClusterPlot::Chart(chart) => plot::cluster_chart(ui, chart),
        ClusterPlot::TooFewRows => {
            ui.label("Only one cluster in the summary, nothing to compare.");
        }
        ClusterPlot::NoNumericColumn => {
            ui.label("No numeric column found to chart.");
        }
    }
}
