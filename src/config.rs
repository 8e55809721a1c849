use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV: &str = "RAINFALL_EXPLORER_CONFIG";

/// Config file looked up in the working directory when the env var is unset.
pub const DEFAULT_CONFIG_FILE: &str = "rainfall-explorer.toml";

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

/// Input locations and display defaults. Every field is optional in the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub observations_path: PathBuf,
    pub forecast_path: PathBuf,
    pub cluster_summary_path: PathBuf,
    pub landing_image_path: PathBuf,
    /// Initial year window, clamped to the data on load.
    pub default_years: (i32, i32),
    pub histogram_bins: usize,
    /// Rows shown in the forecast table preview (the export has all rows).
    pub forecast_preview_rows: usize,
    pub columns: ObservationColumns,
}

/// Column names of the observation file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservationColumns {
    pub date: String,
    pub region: String,
    pub rainfall: String,
    /// Optional in the data; derived from the date when the column is absent.
    pub year: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            observations_path: PathBuf::from("data/cleaned_btn_rainfall.csv"),
            forecast_path: PathBuf::from("outputs/forecast.csv"),
            cluster_summary_path: PathBuf::from("outputs/cluster_summary.csv"),
            landing_image_path: PathBuf::from("bhutan_image.jpg"),
            default_years: (2021, 2025),
            histogram_bins: 30,
            forecast_preview_rows: 30,
            columns: ObservationColumns::default(),
        }
    }
}

impl Default for ObservationColumns {
    fn default() -> Self {
        Self {
            date: "date".to_string(),
            region: "ADM2_PCODE".to_string(),
            rainfall: "rfh".to_string(),
            year: "year".to_string(),
        }
    }
}

impl AppConfig {
    /// Resolve the config: `$RAINFALL_EXPLORER_CONFIG`, then
    /// `./rainfall-explorer.toml`, then built-in defaults.
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::from_file(local);
        }
        log::info!("No {DEFAULT_CONFIG_FILE} found, using defaults");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: AppConfig = toml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
