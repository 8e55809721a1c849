use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

use crate::data::aggregate::{
    self, ForecastSummary, HistogramBin, MonthGroup, MonthlyForecast, MonthlyPoint, RegionStats,
    SeasonalForecast,
};
use crate::data::cluster::{self, ClusterOverview};
use crate::data::export::{self, ExportRow};
use crate::data::filter::FilterSelection;
use crate::data::model::{ClusterTable, ForecastTable, Observation};
use crate::error::DashboardResult;

// ---------------------------------------------------------------------------
// Chart descriptors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Histogram,
    BoxPlot,
    Bar,
}

/// How values are printed in labels, hover text and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    /// `12.3 mm`
    Millimeters,
    /// `12.3`
    OneDecimal,
    /// `12`
    Count,
}

impl ValueFormat {
    pub fn format(self, v: f64) -> String {
        match self {
            ValueFormat::Millimeters => format_mm(v),
            ValueFormat::OneDecimal => format!("{v:.1}"),
            ValueFormat::Count => format!("{v:.0}"),
        }
    }
}

/// Everything the renderer needs besides the data points.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_field: &'static str,
    pub y_field: &'static str,
    pub x_label: String,
    pub y_label: String,
    pub series_label: String,
    pub value_format: ValueFormat,
}

impl ChartSpec {
    /// Stable widget id; the field pair is unique per chart.
    pub fn id(&self) -> String {
        format!("{:?}_{}_{}", self.kind, self.x_field, self.y_field)
    }

    fn new(kind: ChartKind, title: impl Into<String>, x: (&'static str, &str), y: (&'static str, &str)) -> Self {
        ChartSpec {
            kind,
            title: title.into(),
            x_field: x.0,
            y_field: y.0,
            x_label: x.1.to_string(),
            y_label: y.1.to_string(),
            series_label: y.1.to_string(),
            value_format: ValueFormat::Millimeters,
        }
    }

    fn series(mut self, label: impl Into<String>) -> Self {
        self.series_label = label.into();
        self
    }

    fn values(mut self, format: ValueFormat) -> Self {
        self.value_format = format;
        self
    }
}

/// A chart descriptor with its data.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart<T> {
    pub spec: ChartSpec,
    pub data: T,
}

/// Rainfall for display, one decimal.
pub fn format_mm(v: f64) -> String {
    format!("{v:.1} mm")
}

/// `12345` → `12,345`.
pub fn format_thousands(n: usize) -> String {
    n.to_formatted_string(&Locale::en)
}

/// Label + value pair shown as a metric tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    pub label: &'static str,
    pub value: String,
}

/// Placeholder for a metric whose source column was not found.
pub const UNAVAILABLE: &str = "unavailable";

// ---------------------------------------------------------------------------
// Dashboard (filtered observations)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardReport {
    pub region_count: usize,
    pub years: (i32, i32),
    pub row_count: usize,
    pub trend: Chart<Vec<MonthlyPoint>>,
    pub distribution: Chart<Vec<HistogramBin>>,
    pub by_month: Chart<Vec<MonthGroup>>,
    /// Only with more than one selected region.
    pub regional: Option<Chart<Vec<RegionStats>>>,
}

impl DashboardReport {
    pub fn build(rows: &[&Observation], selection: &FilterSelection, bins: usize) -> Self {
        let region_order: Vec<String> = selection.region_codes.iter().cloned().collect();
        let regional = (selection.region_codes.len() > 1).then(|| Chart {
            spec: ChartSpec::new(
                ChartKind::Bar,
                "Average Rainfall by Region (with Standard Deviation)",
                ("region_code", "Region Code"),
                ("mean_mm", "Average Rainfall (mm)"),
            ),
            data: aggregate::regional_comparison(rows, Some(&region_order)),
        });

        DashboardReport {
            region_count: selection.region_codes.len(),
            years: (selection.years.lo(), selection.years.hi()),
            row_count: rows.len(),
            trend: Chart {
                spec: ChartSpec::new(
                    ChartKind::Line,
                    "Monthly Average Rainfall Trends",
                    ("period", "Date"),
                    ("mean_mm", "Rainfall (mm)"),
                )
                .series("Monthly mean"),
                data: aggregate::monthly_trend(rows),
            },
            distribution: Chart {
                spec: ChartSpec::new(
                    ChartKind::Histogram,
                    "Rainfall Distribution Across Selected Regions",
                    ("rainfall_mm", "Rainfall (mm)"),
                    ("count", "Frequency"),
                )
                .values(ValueFormat::Count),
                data: aggregate::histogram(&aggregate::distribution(rows), bins),
            },
            by_month: Chart {
                spec: ChartSpec::new(
                    ChartKind::BoxPlot,
                    "Monthly Rainfall Distribution Patterns",
                    ("month_name", "Month"),
                    ("rainfall_mm", "Rainfall (mm)"),
                ),
                data: aggregate::monthly_distribution(rows),
            },
            regional,
        }
    }

    /// `Showing 2 regions from 2021–2025`
    pub fn header(&self) -> String {
        format!(
            "Showing {} regions from {}–{}",
            self.region_count, self.years.0, self.years.1
        )
    }
}

// ---------------------------------------------------------------------------
// Forecast panel
// ---------------------------------------------------------------------------

/// Series of the forecast line chart.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForecastSeries {
    pub predicted: Vec<(NaiveDate, f64)>,
    /// `(date, lower, upper)`, only when the file has both bound columns.
    pub band: Option<Vec<(NaiveDate, f64, f64)>>,
    /// Historical values where the forecast overlaps them.
    pub actual: Vec<(NaiveDate, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastReport {
    pub summary: ForecastSummary,
    pub line: Chart<ForecastSeries>,
    pub monthly: Chart<Vec<MonthlyForecast>>,
    pub seasonal: Chart<Vec<SeasonalForecast>>,
    pub export: Vec<ExportRow>,
    pub has_bounds: bool,
}

impl ForecastReport {
    pub fn build(table: &ForecastTable) -> DashboardResult<Self> {
        let summary = aggregate::forecast_summary(table)?;

        let band = table.has_bounds.then(|| {
            table
                .rows
                .iter()
                .filter_map(|r| Some((r.date, r.lower_bound_mm?, r.upper_bound_mm?)))
                .collect()
        });
        let series = ForecastSeries {
            predicted: table.rows.iter().map(|r| (r.date, r.predicted_mm)).collect(),
            band,
            actual: table
                .rows
                .iter()
                .filter_map(|r| Some((r.date, r.actual_mm?)))
                .collect(),
        };

        Ok(ForecastReport {
            summary,
            line: Chart {
                spec: ChartSpec::new(
                    ChartKind::Line,
                    "Rainfall Forecast with Confidence Intervals",
                    ("ds", "Date"),
                    ("yhat", "Rainfall (mm)"),
                )
                .series("Forecast"),
                data: series,
            },
            monthly: Chart {
                spec: ChartSpec::new(
                    ChartKind::Bar,
                    "Average Monthly Forecast",
                    ("month_name", "Month"),
                    ("yhat", "Predicted Rainfall (mm)"),
                )
                .values(ValueFormat::OneDecimal),
                data: aggregate::forecast_monthly(table)?,
            },
            seasonal: Chart {
                spec: ChartSpec::new(
                    ChartKind::Bar,
                    "Seasonal Rainfall Forecast",
                    ("season", "Season"),
                    ("mean_mm", "Average Rainfall (mm)"),
                )
                .values(ValueFormat::OneDecimal),
                data: aggregate::forecast_seasonal(table)?,
            },
            export: export::export_rows(table),
            has_bounds: table.has_bounds,
        })
    }

    pub fn metrics(&self) -> Vec<Metric> {
        vec![
            Metric {
                label: "Forecast Period",
                value: format!("{} days", self.summary.period_days),
            },
            Metric {
                label: "Avg Predicted Rainfall",
                value: format_mm(self.summary.mean_mm),
            },
            Metric {
                label: "Peak Forecast",
                value: format_mm(self.summary.peak_mm),
            },
            Metric {
                label: "Lowest Forecast",
                value: format_mm(self.summary.lowest_mm),
            },
        ]
    }

    /// Last `n` export rows for the table preview.
    pub fn preview(&self, n: usize) -> &[ExportRow] {
        &self.export[self.export.len().saturating_sub(n)..]
    }
}

// ---------------------------------------------------------------------------
// Cluster panel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterBar {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClusterPlot {
    /// Charts need at least two clusters.
    TooFewRows,
    /// Only categorical columns.
    NoNumericColumn,
    Chart(Chart<Vec<ClusterBar>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterReport {
    pub overview: ClusterOverview,
    /// Header of the label column followed by the data columns.
    pub headers: Vec<String>,
    /// Display cells, floats rounded to two decimals.
    pub cells: Vec<Vec<String>>,
    pub plot: ClusterPlot,
}

impl ClusterReport {
    pub fn build(table: &ClusterTable) -> Self {
        let headers = std::iter::once(table.label_header.clone())
            .chain(table.columns.iter().cloned())
            .collect();
        let cells = table
            .rows
            .iter()
            .map(|r| {
                std::iter::once(r.label.clone())
                    .chain(r.values.iter().map(|v| v.to_string()))
                    .collect()
            })
            .collect();

        let plot = if table.len() <= 1 {
            ClusterPlot::TooFewRows
        } else {
            match cluster::plot_column(table) {
                None => ClusterPlot::NoNumericColumn,
                Some(idx) => {
                    let title = cluster::title_case(&table.columns[idx]);
                    let data = table
                        .rows
                        .iter()
                        .filter_map(|r| {
                            Some(ClusterBar {
                                label: r.label.clone(),
                                value: r.values.get(idx)?.as_f64()?,
                            })
                        })
                        .collect();
                    ClusterPlot::Chart(Chart {
                        spec: ChartSpec::new(
                            ChartKind::Bar,
                            format!("{title} by Cluster"),
                            ("cluster", "Cluster"),
                            ("value", title.as_str()),
                        )
                        .values(ValueFormat::OneDecimal),
                        data,
                    })
                }
            }
        };

        ClusterReport {
            overview: cluster::overview(table),
            headers,
            cells,
            plot,
        }
    }

    pub fn metrics(&self) -> Vec<Metric> {
        vec![
            Metric {
                label: "Total Clusters",
                value: self.overview.total_clusters.to_string(),
            },
            Metric {
                label: "Avg Rainfall (mm)",
                value: self
                    .overview
                    .avg_rainfall_mm
                    .map(|v| format!("{v:.1}"))
                    .unwrap_or_else(|| UNAVAILABLE.to_string()),
            },
            Metric {
                label: "Regions Analyzed",
                value: self
                    .overview
                    .member_count
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| UNAVAILABLE.to_string()),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::YearInterval;
    use crate::data::model::{CellValue, ClusterRow, ForecastRecord};
    use crate::error::DashboardError;

    fn obs(region: &str, y: i32, m: u32, mm: f64) -> Observation {
        Observation::new(region, NaiveDate::from_ymd_opt(y, m, 1).unwrap(), mm, None)
    }

    #[test]
    fn formatting() {
        assert_eq!(format_mm(12.345), "12.3 mm");
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1234567), "1,234,567");
        assert_eq!(ValueFormat::OneDecimal.format(2.06), "2.1");
    }

    #[test]
    fn dashboard_report_shapes_every_chart() {
        let rows = [obs("BT_A", 2022, 1, 2.0), obs("BT_B", 2022, 2, 6.0), obs("BT_A", 2023, 1, 4.0)];
        let refs: Vec<&Observation> = rows.iter().collect();
        let mut selection = FilterSelection::new(YearInterval::new(2022, 2023));
        selection.region_codes = ["BT_A", "BT_B"].iter().map(|s| s.to_string()).collect();

        let report = DashboardReport::build(&refs, &selection, 30);
        assert_eq!(report.header(), "Showing 2 regions from 2022–2023");
        assert_eq!(report.trend.spec.kind, ChartKind::Line);
        assert_eq!(report.trend.data.len(), 3);
        assert_eq!(report.distribution.data.iter().map(|b| b.count).sum::<usize>(), 3);
        assert_eq!(report.by_month.data[0].name, "January");
        let regional = report.regional.expect("two regions selected");
        assert_eq!(regional.data[0].region_code, "BT_A");
        assert_eq!(regional.data[1].std_mm, None);

        selection.region_codes.remove("BT_B");
        let single = DashboardReport::build(&refs[..1], &selection, 30);
        assert!(single.regional.is_none());
    }

    #[test]
    fn forecast_report_band_actuals_and_preview() {
        let table = ForecastTable {
            rows: (1..=40)
                .map(|d| ForecastRecord {
                    date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + chrono::Days::new(d),
                    predicted_mm: d as f64,
                    lower_bound_mm: Some(d as f64 - 1.0),
                    upper_bound_mm: Some(d as f64 + 1.0),
                    actual_mm: (d <= 5).then_some(d as f64 + 0.5),
                })
                .collect(),
            has_bounds: true,
        };
        let report = ForecastReport::build(&table).unwrap();
        assert_eq!(report.line.data.band.as_ref().map(Vec::len), Some(40));
        assert_eq!(report.line.data.actual.len(), 5);
        assert_eq!(report.preview(30).len(), 30);
        assert_eq!(report.preview(30)[29].predicted_mm, 40.0);
        assert_eq!(report.metrics()[0].value, "39 days");
        assert_eq!(report.metrics()[3].value, "1.0 mm");

        let empty = ForecastReport::build(&ForecastTable::default()).unwrap_err();
        assert!(matches!(empty, DashboardError::InsufficientData { .. }));
    }

    #[test]
    fn cluster_with_unrecognised_column_falls_back() {
        let table = ClusterTable {
            label_header: "cluster".into(),
            columns: vec!["silhouette_score".into()],
            rows: vec![
                ClusterRow {
                    label: "0".into(),
                    values: vec![CellValue::Float(0.512)],
                },
                ClusterRow {
                    label: "1".into(),
                    values: vec![CellValue::Float(0.3)],
                },
            ],
        };
        let report = ClusterReport::build(&table);
        let metrics = report.metrics();
        assert_eq!(metrics[0].value, "2");
        assert_eq!(metrics[2].value, UNAVAILABLE);
        assert_eq!(report.cells[0], vec!["0", "0.51"]);
        match report.plot {
            ClusterPlot::Chart(chart) => {
                assert_eq!(chart.spec.title, "Silhouette Score by Cluster");
                assert_eq!(chart.data.len(), 2);
            }
            other => panic!("expected a chart, got {other:?}"),
        }
    }

    #[test]
    fn single_cluster_is_not_charted() {
        let table = ClusterTable {
            label_header: String::new(),
            columns: vec!["avg_rainfall".into()],
            rows: vec![ClusterRow {
                label: "High".into(),
                values: vec![CellValue::Float(150.5)],
            }],
        };
        let report = ClusterReport::build(&table);
        assert_eq!(report.plot, ClusterPlot::TooFewRows);
        assert_eq!(report.metrics()[1].value, "150.5");
    }
}
