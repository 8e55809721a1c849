use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::color::ColorMap;
use crate::config::AppConfig;
use crate::data::cache::DataCache;
use crate::data::export;
use crate::data::filter::{FilterOutcome, FilterSelection, YearInterval};
use crate::data::model::{ClusterTable, ForecastTable, ObservationTable};
use crate::error::{DashboardError, DashboardResult};
use crate::report::{ClusterReport, DashboardReport, ForecastReport};

// ---------------------------------------------------------------------------
// View state machine
// ---------------------------------------------------------------------------

/// Dashboard sub-state, derived from the last filter outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardView {
    NoSelection,
    Filtered,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Landing,
    Dashboard(DashboardView),
}

/// Panels shown on top of any dashboard state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    Forecast,
    Cluster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent<'a> {
    Enter,
    Filtered(&'a FilterOutcome),
    Open(Overlay),
    Close(Overlay),
}

/// Named states and transitions of the view. Overlays are orthogonal to
/// the base state, so closing one returns to whatever was underneath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewMachine {
    state: ViewState,
    forecast_open: bool,
    cluster_open: bool,
}

impl Default for ViewMachine {
    fn default() -> Self {
        Self {
            state: ViewState::Landing,
            forecast_open: false,
            cluster_open: false,
        }
    }
}

impl ViewMachine {
    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn is_open(&self, overlay: Overlay) -> bool {
        match overlay {
            Overlay::Forecast => self.forecast_open,
            Overlay::Cluster => self.cluster_open,
        }
    }

    pub fn handle(&mut self, event: ViewEvent<'_>) {
        match (self.state, event) {
            (ViewState::Landing, ViewEvent::Enter) => {
                self.state = ViewState::Dashboard(DashboardView::NoSelection);
            }
            (ViewState::Dashboard(_), ViewEvent::Filtered(outcome)) => {
                self.state = ViewState::Dashboard(match outcome {
                    FilterOutcome::NothingSelected => DashboardView::NoSelection,
                    FilterOutcome::NoMatches => DashboardView::Empty,
                    FilterOutcome::Matched(_) => DashboardView::Filtered,
                });
            }
            (ViewState::Dashboard(_), ViewEvent::Open(overlay)) => self.set_open(overlay, true),
            (_, ViewEvent::Close(overlay)) => self.set_open(overlay, false),
            (state, event) => log::debug!("ignoring {event:?} in {state:?}"),
        }
    }

    fn set_open(&mut self, overlay: Overlay, open: bool) {
        match overlay {
            Overlay::Forecast => self.forecast_open = open,
            Overlay::Cluster => self.cluster_open = open,
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: AppConfig,

    /// Memoised input tables.
    cache: DataCache,

    /// Observation file currently shown.
    pub observations_path: PathBuf,

    /// Loaded observations (None when the file is missing or broken).
    pub dataset: Option<Arc<ObservationTable>>,

    /// Why `dataset` is empty, if it is.
    pub load_error: Option<DashboardError>,

    /// Region and year selection from the side panel.
    pub selection: FilterSelection,

    /// Indices of observations passing the current filters (cached).
    pub visible_indices: Vec<usize>,

    /// Aggregations for the current selection, rebuilt on every change.
    pub report: Option<DashboardReport>,

    pub view: ViewMachine,

    /// Region colours for the selector and the comparison chart.
    pub color_map: Option<ColorMap>,

    forecast: Option<(Arc<ForecastTable>, Arc<ForecastReport>)>,
    clusters: Option<(Arc<ClusterTable>, Arc<ClusterReport>)>,

    /// Why the last forecast download failed, shown in the forecast window.
    pub export_error: Option<DashboardError>,

    /// Status / error message shown in the top bar.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let (lo, hi) = config.default_years;
        let mut state = Self {
            cache: DataCache::new(config.columns.clone()),
            observations_path: config.observations_path.clone(),
            dataset: None,
            load_error: None,
            selection: FilterSelection::new(YearInterval::new(lo, hi)),
            visible_indices: Vec::new(),
            report: None,
            view: ViewMachine::default(),
            color_map: None,
            forecast: None,
            clusters: None,
            export_error: None,
            status_message: None,
            config,
        };
        let path = state.observations_path.clone();
        state.load_observations(&path);
        state
    }

    /// Load (or fetch from cache) an observation file and reset the filters
    /// to its regions and years.
    pub fn load_observations(&mut self, path: &Path) {
        self.observations_path = path.to_path_buf();
        match self.cache.observations(path) {
            Ok(table) => self.set_dataset(table),
            Err(e) => {
                log::error!("Failed to load observations: {e:#}");
                self.status_message = Some(format!("Error: {e}"));
                self.dataset = None;
                self.color_map = None;
                self.load_error = Some(e);
                self.refilter();
            }
        }
    }

    /// Ingest a newly loaded dataset, initialise filters and colours.
    fn set_dataset(&mut self, dataset: Arc<ObservationTable>) {
        let (lo, hi) = self.config.default_years;
        let years = match dataset.year_bounds {
            Some(bounds) => YearInterval::new(lo, hi).clamped(bounds),
            None => YearInterval::new(lo, hi),
        };
        self.selection.years = years;
        self.selection
            .region_codes
            .retain(|code| dataset.region_codes.contains(code));

        self.color_map = Some(ColorMap::new(&dataset.region_codes));
        self.dataset = Some(dataset);
        self.load_error = None;
        self.status_message = None;
        self.refilter();
    }

    /// Drop cached tables and re-read every input (File → Reload).
    pub fn reload(&mut self) {
        self.cache.clear();
        self.forecast = None;
        self.clusters = None;
        self.export_error = None;
        let path = self.observations_path.clone();
        self.load_observations(&path);
    }

    /// Re-derive the filtered rows, the view state and every aggregate.
    pub fn refilter(&mut self) {
        let outcome = match &self.dataset {
            Some(ds) => self.selection.apply(ds),
            None => self.selection.apply(&ObservationTable::default()),
        };
        self.view.handle(ViewEvent::Filtered(&outcome));

        self.visible_indices = match outcome {
            FilterOutcome::Matched(indices) => indices,
            _ => Vec::new(),
        };
        self.report = match &self.dataset {
            Some(ds) if !self.visible_indices.is_empty() => {
                let rows = ds.select(&self.visible_indices);
                Some(DashboardReport::build(&rows, &self.selection, self.config.histogram_bins))
            }
            _ => None,
        };
    }

    /// The report for the central panel, or why there is none.
    pub fn dashboard_report(&self) -> DashboardResult<&DashboardReport> {
        if self.selection.region_codes.is_empty() {
            return Err(DashboardError::SelectionEmpty);
        }
        self.report.as_ref().ok_or(DashboardError::InsufficientData {
            what: "the selected regions and year range",
        })
    }

    pub fn enter_dashboard(&mut self) {
        self.view.handle(ViewEvent::Enter);
        self.refilter();
    }

    /// Toggle a single region in the multi-select.
    pub fn toggle_region(&mut self, code: &str) {
        if !self.selection.region_codes.remove(code) {
            self.selection.region_codes.insert(code.to_string());
        }
        self.refilter();
    }

    /// Select every known region.
    pub fn select_all(&mut self) {
        if let Some(ds) = &self.dataset {
            self.selection.region_codes = ds.region_codes.iter().cloned().collect();
            self.refilter();
        }
    }

    /// Deselect every region.
    pub fn select_none(&mut self) {
        self.selection.region_codes.clear();
        self.refilter();
    }

    /// Set the year window, clamped to the data.
    pub fn set_years(&mut self, lo: i32, hi: i32) {
        let mut years = YearInterval::new(lo, hi);
        if let Some(bounds) = self.dataset.as_ref().and_then(|ds| ds.year_bounds) {
            years = years.clamped(bounds);
        }
        if years != self.selection.years {
            self.selection.years = years;
            self.refilter();
        }
    }

    pub fn set_overlay(&mut self, overlay: Overlay, open: bool) {
        let event = if open {
            ViewEvent::Open(overlay)
        } else {
            ViewEvent::Close(overlay)
        };
        self.view.handle(event);
    }

    /// Forecast panel content, read lazily and rebuilt only when the file
    /// changes.
    pub fn forecast_report(&mut self) -> DashboardResult<Arc<ForecastReport>> {
        let table = self.cache.forecast(&self.config.forecast_path)?;
        if let Some((cached, report)) = &self.forecast {
            if Arc::ptr_eq(cached, &table) {
                return Ok(Arc::clone(report));
            }
        }
        let report = Arc::new(ForecastReport::build(&table)?);
        self.forecast = Some((table, Arc::clone(&report)));
        Ok(report)
    }

    /// Write the displayed forecast rows to `path` and return the row count.
    /// A failure is kept in `export_error` until the next export succeeds.
    pub fn export_forecast(&mut self, path: &Path) -> Option<usize> {
        let result = self.forecast_report().and_then(|report| {
            export::write_file(path, &report.export, report.has_bounds)?;
            Ok(report.export.len())
        });
        match result {
            Ok(n) => {
                self.export_error = None;
                Some(n)
            }
            Err(e) => {
                log::error!("Failed to export forecast: {e:#}");
                self.export_error = Some(e);
                None
            }
        }
    }

    /// Cluster panel content, same lazy contract as the forecast.
    pub fn cluster_report(&mut self) -> DashboardResult<Arc<ClusterReport>> {
        let table = self.cache.cluster_summary(&self.config.cluster_summary_path)?;
        if let Some((cached, report)) = &self.clusters {
            if Arc::ptr_eq(cached, &table) {
                return Ok(Arc::clone(report));
            }
        }
        let report = Arc::new(ClusterReport::build(&table));
        self.clusters = Some((table, Arc::clone(&report)));
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &tempfile::TempDir) -> AppConfig {
        AppConfig {
            observations_path: dir.path().join("rain.csv"),
            forecast_path: dir.path().join("forecast.csv"),
            cluster_summary_path: dir.path().join("cluster_summary.csv"),
            ..AppConfig::default()
        }
    }

    fn write_observations(dir: &tempfile::TempDir) {
        let mut csv = String::from("date,ADM2_PCODE,rfh\n");
        for year in 2020..=2025 {
            for region in ["BT_A", "BT_B"] {
                csv.push_str(&format!("{year}-06-01,{region},{}.5\n", year - 2000));
            }
        }
        std::fs::write(dir.path().join("rain.csv"), csv).unwrap();
    }

    #[test]
    fn machine_transitions() {
        let mut m = ViewMachine::default();
        m.handle(ViewEvent::Open(Overlay::Forecast));
        assert!(!m.is_open(Overlay::Forecast), "no overlays on the landing page");
        m.handle(ViewEvent::Filtered(&FilterOutcome::Matched(vec![0])));
        assert_eq!(m.state(), ViewState::Landing);

        m.handle(ViewEvent::Enter);
        assert_eq!(m.state(), ViewState::Dashboard(DashboardView::NoSelection));

        m.handle(ViewEvent::Filtered(&FilterOutcome::Matched(vec![1, 2])));
        assert_eq!(m.state(), ViewState::Dashboard(DashboardView::Filtered));

        m.handle(ViewEvent::Open(Overlay::Forecast));
        m.handle(ViewEvent::Open(Overlay::Cluster));
        assert!(m.is_open(Overlay::Forecast) && m.is_open(Overlay::Cluster));

        m.handle(ViewEvent::Filtered(&FilterOutcome::NoMatches));
        assert_eq!(m.state(), ViewState::Dashboard(DashboardView::Empty));
        assert!(m.is_open(Overlay::Forecast));

        m.handle(ViewEvent::Close(Overlay::Forecast));
        assert!(!m.is_open(Overlay::Forecast));
        assert!(m.is_open(Overlay::Cluster));
        assert_eq!(m.state(), ViewState::Dashboard(DashboardView::Empty));
    }

    #[test]
    fn selection_drives_dashboard_state() {
        let dir = tempfile::tempdir().unwrap();
        write_observations(&dir);
        let mut state = AppState::new(config_in(&dir));
        assert!(state.dataset.is_some());
        assert_eq!(state.view.state(), ViewState::Landing);
        assert_eq!(state.selection.years, YearInterval::new(2021, 2025));

        state.enter_dashboard();
        assert_eq!(state.view.state(), ViewState::Dashboard(DashboardView::NoSelection));
        assert!(matches!(state.dashboard_report(), Err(DashboardError::SelectionEmpty)));

        state.toggle_region("BT_A");
        state.set_years(2022, 2023);
        assert_eq!(state.view.state(), ViewState::Dashboard(DashboardView::Filtered));
        assert_eq!(state.visible_indices.len(), 2);
        let report = state.report.as_ref().unwrap();
        assert!(report.regional.is_none());

        state.set_years(2019, 2019);
        assert_eq!(state.selection.years, YearInterval::new(2020, 2020));
        state.toggle_region("BT_A");
        assert_eq!(state.view.state(), ViewState::Dashboard(DashboardView::NoSelection));

        state.select_all();
        assert_eq!(state.visible_indices.len(), 2);
        assert!(state.report.as_ref().unwrap().regional.is_some());
    }

    #[test]
    fn missing_forecast_is_unavailable_and_builds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_observations(&dir);
        let mut state = AppState::new(config_in(&dir));
        state.enter_dashboard();
        state.set_overlay(Overlay::Forecast, true);
        assert!(state.view.is_open(Overlay::Forecast));

        let err = state.forecast_report().unwrap_err();
        assert!(matches!(err, DashboardError::DataUnavailable { .. }));
        assert!(state.forecast.is_none());
    }

    #[test]
    fn reports_are_reused_until_the_file_changes() {
        let dir = tempfile::tempdir().unwrap();
        write_observations(&dir);
        std::fs::write(
            dir.path().join("cluster_summary.csv"),
            "cluster,avg_rainfall,count\n0,120.0,5\n1,40.0,7\n",
        )
        .unwrap();
        let mut state = AppState::new(config_in(&dir));

        let first = state.cluster_report().unwrap();
        let second = state.cluster_report().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.overview.member_count, Some(12));
    }

    #[test]
    fn failed_export_is_kept_as_an_unexpected_error() {
        let dir = tempfile::tempdir().unwrap();
        write_observations(&dir);
        std::fs::write(
            dir.path().join("forecast.csv"),
            "ds,yhat\n2025-01-01,1.0\n2025-01-02,2.0\n",
        )
        .unwrap();
        let mut state = AppState::new(config_in(&dir));

        assert_eq!(state.export_forecast(&dir.path().join("missing/out.csv")), None);
        let err = state.export_error.as_ref().unwrap();
        assert!(matches!(err, DashboardError::Unexpected(_)));
        assert!(err.is_error());

        let out = dir.path().join("out.csv");
        assert_eq!(state.export_forecast(&out), Some(2));
        assert!(state.export_error.is_none());
        assert!(std::fs::read_to_string(out).unwrap().starts_with("Date,Predicted_Rainfall_mm\n"));
    }

    #[test]
    fn refilter_reports_only_visible_rows() {
        let dir = tempfile::tempdir().unwrap();
        write_observations(&dir);
        let mut state = AppState::new(config_in(&dir));
        state.enter_dashboard();
        state.toggle_region("BT_B");

        let ds = state.dataset.clone().unwrap();
        let rows = ds.select(&state.visible_indices);
        assert!(rows.iter().all(|o| o.region_code == "BT_B"));
        assert_eq!(state.report.as_ref().unwrap().row_count, rows.len());
    }

    #[test]
    fn missing_observations_keep_the_app_alive() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = AppState::new(config_in(&dir));
        assert!(state.dataset.is_none());
        assert!(matches!(state.load_error, Some(DashboardError::DataUnavailable { .. })));

        state.enter_dashboard();
        state.select_all();
        assert!(state.report.is_none());
    }
}
