use chrono::{Datelike, NaiveDate};
use eframe::egui::{Color32, Stroke, Ui};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, Legend, Line, Plot, PlotPoints, PlotUi, Points,
    Polygon,
};

use crate::color::{self, ColorMap};
use crate::data::model::MONTH_NAMES;
use crate::data::aggregate::{
    HistogramBin, MonthGroup, MonthlyForecast, MonthlyPoint, RegionStats, SeasonalForecast,
};
use crate::report::{Chart, ChartSpec, ClusterBar, ForecastSeries};

const CHART_HEIGHT: f32 = 280.0;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn day_number(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce())
}

fn date_label(x: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(x.round() as i32)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Axis labels, legend and hover text shared by every chart.
fn base_plot(spec: &ChartSpec) -> Plot<'static> {
    let x_label = spec.x_label.clone();
    let y_label = spec.y_label.clone();
    let format = spec.value_format;
    Plot::new(spec.id())
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .x_axis_label(spec.x_label.clone())
        .y_axis_label(spec.y_label.clone())
        .allow_scroll(false)
        .label_formatter(move |name, value| {
            let head = if name.is_empty() { String::new() } else { format!("{name}\n") };
            format!("{head}{x_label}: {:.1}\n{y_label}: {}", value.x, format.format(value.y))
        })
}

/// Date x axis: values are days from the common era.
fn date_plot(spec: &ChartSpec) -> Plot<'static> {
    let x_label = spec.x_label.clone();
    let y_label = spec.y_label.clone();
    let format = spec.value_format;
    base_plot(spec)
        .x_axis_formatter(|mark, _range| date_label(mark.value))
        .label_formatter(move |name, value| {
            let head = if name.is_empty() { String::new() } else { format!("{name}\n") };
            format!(
                "{head}{x_label}: {}\n{y_label}: {}",
                date_label(value.x),
                format.format(value.y)
            )
        })
}

/// Categorical x axis: position `i` shows `labels[i]`.
fn category_plot(spec: &ChartSpec, labels: Vec<String>) -> Plot<'static> {
    base_plot(spec)
        .x_axis_formatter(move |mark, _range| {
            let v = mark.value;
            if (v - v.round()).abs() > 1e-6 || v < 0.0 {
                return String::new();
            }
            labels.get(v.round() as usize).cloned().unwrap_or_default()
        })
        .allow_drag(false)
}

/// Months sit at `month - 1` so gaps stay visible.
fn month_x(month: u32) -> f64 {
    f64::from(month.clamp(1, 12) - 1)
}

fn month_labels() -> Vec<String> {
    MONTH_NAMES.iter().map(|m| m[..3].to_string()).collect()
}

fn heading(ui: &mut Ui, spec: &ChartSpec) {
    ui.add_space(8.0);
    ui.strong(&spec.title);
}

/// Vertical ± bars centred on each mean; `None` draws nothing.
fn error_bars(plot_ui: &mut PlotUi, bars: impl Iterator<Item = (f64, f64, Option<f64>)>) {
    for (x, mean, sd) in bars {
        let Some(sd) = sd.filter(|s| s.is_finite()) else {
            continue;
        };
        let (lo, hi) = (mean - sd, mean + sd);
        let cap = 0.12;
        for points in [
            vec![[x, lo], [x, hi]],
            vec![[x - cap, lo], [x + cap, lo]],
            vec![[x - cap, hi], [x + cap, hi]],
        ] {
            plot_ui.line(
                Line::new(PlotPoints::from(points))
                    .color(Color32::DARK_GRAY)
                    .width(1.5),
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Dashboard charts
// ---------------------------------------------------------------------------

/// Monthly mean rainfall over time.
pub fn trend_chart(ui: &mut Ui, chart: &Chart<Vec<MonthlyPoint>>) {
    heading(ui, &chart.spec);
    let points: Vec<[f64; 2]> = chart
        .data
        .iter()
        .map(|p| [day_number(p.period), p.mean_mm])
        .collect();

    date_plot(&chart.spec).show(ui, |plot_ui| {
        plot_ui.line(
            Line::new(PlotPoints::from(points.clone()))
                .name(&chart.spec.series_label)
                .color(color::PRIMARY)
                .width(3.0),
        );
        plot_ui.points(
            Points::new(PlotPoints::from(points))
                .radius(4.0)
                .color(color::ACCENT),
        );
    });
}

/// Histogram of every filtered rainfall value.
pub fn histogram_chart(ui: &mut Ui, chart: &Chart<Vec<HistogramBin>>) {
    heading(ui, &chart.spec);
    let bars: Vec<Bar> = chart
        .data
        .iter()
        .map(|b| {
            Bar::new(b.center(), b.count as f64)
                .width(b.width())
                .fill(color::TEAL)
                .stroke(Stroke::new(1.0, color::PRIMARY))
                .name(format!("{:.1}–{:.1} mm", b.lo, b.hi))
        })
        .collect();

    base_plot(&chart.spec).show(ui, |plot_ui| {
        plot_ui.bar_chart(BarChart::new(bars).name(&chart.spec.series_label));
    });
}

/// One box per calendar month, January first.
pub fn monthly_box_chart(ui: &mut Ui, chart: &Chart<Vec<MonthGroup>>) {
    heading(ui, &chart.spec);
    let labels = month_labels();
    let fill = Color32::from_rgba_unmultiplied(0xFF, 0x6B, 0x6B, 76);

    let boxes: Vec<BoxElem> = chart
        .data
        .iter()
        .map(|g| {
            let s = &g.stats;
            BoxElem::new(
                month_x(g.month),
                BoxSpread::new(s.lower_whisker, s.q1, s.median, s.q3, s.upper_whisker),
            )
            .name(format!("{} (n={})", g.name, g.values.len()))
            .box_width(0.6)
            .fill(fill)
            .stroke(Stroke::new(1.5, color::PRIMARY))
        })
        .collect();
    let outliers: Vec<[f64; 2]> = chart
        .data
        .iter()
        .flat_map(|g| {
            let x = month_x(g.month);
            g.stats.outliers.iter().map(move |&v| [x, v])
        })
        .collect();

    category_plot(&chart.spec, labels).show(ui, |plot_ui| {
        plot_ui.box_plot(BoxPlot::new(boxes).name(&chart.spec.series_label));
        if !outliers.is_empty() {
            plot_ui.points(
                Points::new(PlotPoints::from(outliers))
                    .radius(2.0)
                    .color(color::CORAL)
                    .name("Outliers"),
            );
        }
    });
}

/// Mean per region with standard-deviation error bars.
pub fn regional_chart(ui: &mut Ui, chart: &Chart<Vec<RegionStats>>, colors: Option<&ColorMap>) {
    heading(ui, &chart.spec);
    let labels = chart.data.iter().map(|r| r.region_code.clone()).collect();
    let format = chart.spec.value_format;

    let bars: Vec<Bar> = chart
        .data
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let fill = colors.map_or(color::PRIMARY, |c| c.color_for(&r.region_code));
            Bar::new(i as f64, r.mean_mm)
                .width(0.7)
                .fill(fill)
                .stroke(Stroke::new(1.5, color::PRIMARY))
                .name(format!(
                    "{} ({}, n={})",
                    r.region_code,
                    format.format(r.mean_mm),
                    r.count
                ))
        })
        .collect();

    category_plot(&chart.spec, labels).show(ui, |plot_ui| {
        plot_ui.bar_chart(BarChart::new(bars).name(&chart.spec.series_label));
        error_bars(
            plot_ui,
            chart
                .data
                .iter()
                .enumerate()
                .map(|(i, r)| (i as f64, r.mean_mm, r.std_mm)),
        );
    });
}

// ---------------------------------------------------------------------------
// Forecast charts
// ---------------------------------------------------------------------------

/// Prediction line, optional confidence band and historical values.
pub fn forecast_chart(ui: &mut Ui, chart: &Chart<ForecastSeries>) {
    heading(ui, &chart.spec);
    let series = &chart.data;

    date_plot(&chart.spec).show(ui, |plot_ui| {
        if let Some(band) = &series.band {
            let upper = band.iter().map(|(d, _, hi)| [day_number(*d), *hi]);
            let lower = band.iter().rev().map(|(d, lo, _)| [day_number(*d), *lo]);
            let outline: Vec<[f64; 2]> = upper.chain(lower).collect();
            plot_ui.polygon(
                Polygon::new(PlotPoints::from(outline))
                    .fill_color(Color32::from_rgba_unmultiplied(46, 134, 171, 51))
                    .stroke(Stroke::NONE)
                    .name("Confidence Interval"),
            );
        }

        let predicted: Vec<[f64; 2]> = series
            .predicted
            .iter()
            .map(|(d, v)| [day_number(*d), *v])
            .collect();
        plot_ui.line(
            Line::new(PlotPoints::from(predicted))
                .name(&chart.spec.series_label)
                .color(color::PRIMARY)
                .width(3.0),
        );

        if !series.actual.is_empty() {
            let actual: Vec<[f64; 2]> = series
                .actual
                .iter()
                .map(|(d, v)| [day_number(*d), *v])
                .collect();
            plot_ui.line(
                Line::new(PlotPoints::from(actual.clone()))
                    .name("Historical Data")
                    .color(color::ACCENT)
                    .width(2.0),
            );
            plot_ui.points(
                Points::new(PlotPoints::from(actual))
                    .name("Historical Data")
                    .radius(3.0)
                    .color(color::ACCENT),
            );
        }
    });
}

fn forecast_bar(x: f64, value: f64, name: String) -> Bar {
    Bar::new(x, value)
        .width(0.7)
        .fill(Color32::from_rgb(0x8E, 0xC5, 0xDD))
        .stroke(Stroke::new(1.5, color::PRIMARY))
        .name(name)
}

pub fn forecast_monthly_chart(ui: &mut Ui, chart: &Chart<Vec<MonthlyForecast>>) {
    heading(ui, &chart.spec);
    let format = chart.spec.value_format;
    let bars: Vec<Bar> = chart
        .data
        .iter()
        .map(|m| {
            let name = format!("{}: {}", m.name, format.format(m.mean_mm));
            forecast_bar(month_x(m.month), m.mean_mm, name)
        })
        .collect();
    category_plot(&chart.spec, month_labels()).show(ui, |plot_ui| {
        plot_ui.bar_chart(BarChart::new(bars).name(&chart.spec.series_label));
    });
}

pub fn forecast_seasonal_chart(ui: &mut Ui, chart: &Chart<Vec<SeasonalForecast>>) {
    heading(ui, &chart.spec);
    let labels = chart.data.iter().map(|s| s.season.to_string()).collect();
    let format = chart.spec.value_format;
    let bars: Vec<Bar> = chart
        .data
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let name = format!("{}: {}", s.season, format.format(s.mean_mm));
            forecast_bar(i as f64, s.mean_mm, name)
        })
        .collect();
    category_plot(&chart.spec, labels).show(ui, |plot_ui| {
        plot_ui.bar_chart(BarChart::new(bars).name(&chart.spec.series_label));
        error_bars(
            plot_ui,
            chart
                .data
                .iter()
                .enumerate()
                .map(|(i, s)| (i as f64, s.mean_mm, s.std_mm)),
        );
    });
}

// ---------------------------------------------------------------------------
// Cluster chart
// ---------------------------------------------------------------------------

/// Bars coloured along a sequential scale by their value.
pub fn cluster_chart(ui: &mut Ui, chart: &Chart<Vec<ClusterBar>>) {
    heading(ui, &chart.spec);
    let labels = chart.data.iter().map(|b| b.label.clone()).collect();
    let (min, max) = chart
        .data
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), b| {
            (lo.min(b.value), hi.max(b.value))
        });
    let span = max - min;
    let format = chart.spec.value_format;

    let bars: Vec<Bar> = chart
        .data
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let t = if span > 0.0 { (b.value - min) / span } else { 0.5 };
            Bar::new(i as f64, b.value)
                .width(0.7)
                .fill(color::sequential(t))
                .stroke(Stroke::new(2.0, color::PRIMARY))
                .name(format!("{}: {}", b.label, format.format(b.value)))
        })
        .collect();

    category_plot(&chart.spec, labels).show(ui, |plot_ui| {
        plot_ui.bar_chart(BarChart::new(bars).name(&chart.spec.series_label));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plot_builders_own_their_labels() {
        let spec = ChartSpec {
            kind: crate::report::ChartKind::Bar,
            title: "Average Monthly Forecast".into(),
            x_field: "month_name",
            y_field: "yhat",
            x_label: "Month".into(),
            y_label: "Predicted Rainfall (mm)".into(),
            series_label: "Predicted Rainfall (mm)".into(),
            value_format: crate::report::ValueFormat::OneDecimal,
        };
        let plot: Plot<'static> = {
            let borrowed = spec.clone();
            category_plot(&borrowed, month_labels())
        };
        drop(plot);
        let _dated: Plot<'static> = date_plot(&spec);
    }

    #[test]
    fn date_axis_round_trips() {
        let d = NaiveDate::from_ymd_opt(2023, 5, 17).unwrap();
        assert_eq!(date_label(day_number(d)), "2023-05-17");
        assert_eq!(date_label(day_number(d) + 0.3), "2023-05-17");
    }
}
