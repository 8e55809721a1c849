use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use super::loader;
use super::model::{ClusterTable, ForecastTable, ObservationTable};
use crate::config::ObservationColumns;
use crate::error::{DashboardError, DashboardResult};

// ---------------------------------------------------------------------------
// Memo – one table type, keyed by path
// ---------------------------------------------------------------------------

enum Cached<T> {
    Loaded(Arc<T>),
    /// Parse failure, kept until the file changes.
    Corrupt(String),
}

struct Entry<T> {
    modified: SystemTime,
    value: Cached<T>,
}

struct Memo<T> {
    entries: HashMap<PathBuf, Entry<T>>,
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> Memo<T> {
    /// Return the cached outcome while the file's modification time is
    /// unchanged, otherwise run `load`. Only tables and parse failures are
    /// remembered; a missing file is checked again on every call.
    fn get_or_load(
        &mut self,
        path: &Path,
        load: impl FnOnce(&Path) -> DashboardResult<T>,
    ) -> DashboardResult<Arc<T>> {
        let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();

        if let (Some(entry), Some(modified)) = (self.entries.get(path), modified) {
            if entry.modified == modified {
                return match &entry.value {
                    Cached::Loaded(value) => Ok(Arc::clone(value)),
                    Cached::Corrupt(reason) => Err(DashboardError::DataCorrupt {
                        path: path.to_path_buf(),
                        reason: reason.clone(),
                    }),
                };
            }
            log::info!("{} changed on disk, reloading", path.display());
        }

        let result = load(path).map(Arc::new);
        let cached = match &result {
            Ok(value) => Some(Cached::Loaded(Arc::clone(value))),
            Err(DashboardError::DataCorrupt { reason, .. }) => Some(Cached::Corrupt(reason.clone())),
            Err(_) => None,
        };
        match (cached, modified) {
            (Some(value), Some(modified)) => {
                self.entries
                    .insert(path.to_path_buf(), Entry { modified, value });
            }
            _ => {
                self.entries.remove(path);
            }
        }
        result
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

// ---------------------------------------------------------------------------
// DataCache – owned by the app, shared with every panel
// ---------------------------------------------------------------------------

/// Memoised loads of the three input tables. Repeated calls with the same
/// path return the same `Arc` until the file changes.
#[derive(Default)]
pub struct DataCache {
    columns: ObservationColumns,
    observations: Memo<ObservationTable>,
    forecast: Memo<ForecastTable>,
    clusters: Memo<ClusterTable>,
}

impl DataCache {
    pub fn new(columns: ObservationColumns) -> Self {
        Self {
            columns,
            ..Default::default()
        }
    }

    pub fn observations(&mut self, path: &Path) -> DashboardResult<Arc<ObservationTable>> {
        let columns = &self.columns;
        self.observations
            .get_or_load(path, |p| loader::load_observations(p, columns))
    }

    pub fn forecast(&mut self, path: &Path) -> DashboardResult<Arc<ForecastTable>> {
        self.forecast.get_or_load(path, loader::load_forecast)
    }

    pub fn cluster_summary(&mut self, path: &Path) -> DashboardResult<Arc<ClusterTable>> {
        self.clusters.get_or_load(path, loader::load_cluster_summary)
    }

    /// Drop every cached table (File → Reload).
    pub fn clear(&mut self) {
        self.observations.clear();
        self.forecast.clear();
        self.clusters.clear();
    }
}
