use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::model::ForecastTable;

/// Suggested file name of the forecast download.
pub const EXPORT_FILE_NAME: &str = "bhutan_rainfall_forecast.csv";

/// One row of the forecast table preview and CSV download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Predicted_Rainfall_mm")]
    pub predicted_mm: f64,
    #[serde(rename = "Lower_Bound", default)]
    pub lower_bound_mm: Option<f64>,
    #[serde(rename = "Upper_Bound", default)]
    pub upper_bound_mm: Option<f64>,
}

/// Round to two decimals.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Display rows: prediction and (when the file has them) bounds, rounded
/// to two decimals.
pub fn export_rows(table: &ForecastTable) -> Vec<ExportRow> {
    table
        .rows
        .iter()
        .map(|r| ExportRow {
            date: r.date,
            predicted_mm: round2(r.predicted_mm),
            lower_bound_mm: table.has_bounds.then_some(r.lower_bound_mm).flatten().map(round2),
            upper_bound_mm: table.has_bounds.then_some(r.upper_bound_mm).flatten().map(round2),
        })
        .collect()
}

/// Serialise rows as CSV with a header line. Without bounds only the date
/// and prediction columns are written.
pub fn to_csv(rows: &[ExportRow], with_bounds: bool) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    if with_bounds {
        writer.write_record(["Date", "Predicted_Rainfall_mm", "Lower_Bound", "Upper_Bound"])?;
        for row in rows {
            writer.serialize(row)?;
        }
    } else {
        writer.write_record(["Date", "Predicted_Rainfall_mm"])?;
        for row in rows {
            writer.serialize((row.date, row.predicted_mm))?;
        }
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing CSV export: {}", e.error()))
}

pub fn write_file(path: &Path, rows: &[ExportRow], with_bounds: bool) -> Result<()> {
    let bytes = to_csv(rows, with_bounds)?;
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    log::info!("Exported {} forecast rows to {}", rows.len(), path.display());
    Ok(())
}
