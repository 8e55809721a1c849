use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use super::model::{month_name, ForecastTable, Observation, Season};
use super::stats::{mean, sample_std, BoxStats};
use crate::error::{DashboardError, DashboardResult};

// ---------------------------------------------------------------------------
// Observation aggregates (input: the filtered rows, never mutated)
// ---------------------------------------------------------------------------

/// Mean rainfall of one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyPoint {
    /// First day of the month.
    pub period: NaiveDate,
    pub mean_mm: f64,
}

/// Mean rainfall per (year, month), chronological.
pub fn monthly_trend(rows: &[&Observation]) -> Vec<MonthlyPoint> {
    let mut groups: BTreeMap<(i32, u32), (f64, usize)> = BTreeMap::new();
    for o in rows {
        let slot = groups.entry((o.date.year(), o.date.month())).or_default();
        slot.0 += o.rainfall_mm;
        slot.1 += 1;
    }
    groups
        .into_iter()
        .filter_map(|((year, month), (sum, n))| {
            Some(MonthlyPoint {
                period: NaiveDate::from_ymd_opt(year, month, 1)?,
                mean_mm: sum / n as f64,
            })
        })
        .collect()
}

/// Every rainfall value, in input order.
pub fn distribution(rows: &[&Observation]) -> Vec<f64> {
    rows.iter().map(|o| o.rainfall_mm).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub lo: f64,
    pub hi: f64,
    pub count: usize,
}

impl HistogramBin {
    pub fn center(&self) -> f64 {
        (self.lo + self.hi) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }
}

/// Equal-width bins spanning `[min, max]`; the last bin is closed.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let (Some(min), Some(max)) = (
        finite.iter().copied().reduce(f64::min),
        finite.iter().copied().reduce(f64::max),
    ) else {
        return Vec::new();
    };

    if bins == 0 || max - min < f64::EPSILON {
        return vec![HistogramBin {
            lo: min - 0.5,
            hi: max + 0.5,
            count: finite.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lo: min + width * i as f64,
            hi: min + width * (i + 1) as f64,
            count: 0,
        })
        .collect();
    for v in finite {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

/// Rainfall values of one calendar month, pooled across years.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthGroup {
    /// 1-based calendar month.
    pub month: u32,
    pub name: &'static str,
    pub values: Vec<f64>,
    pub stats: BoxStats,
}

/// Values grouped by month name, January first. Months with no rows are
/// omitted.
pub fn monthly_distribution(rows: &[&Observation]) -> Vec<MonthGroup> {
    let mut groups: BTreeMap<u32, (&'static str, Vec<f64>)> = BTreeMap::new();
    for o in rows {
        groups
            .entry(o.month())
            .or_insert_with(|| (o.month_name, Vec::new()))
            .1
            .push(o.rainfall_mm);
    }
    groups
        .into_iter()
        .filter_map(|(month, (name, values))| {
            let stats = BoxStats::from_values(&values)?;
            Some(MonthGroup {
                month,
                name,
                values,
                stats,
            })
        })
        .collect()
}

/// Mean and spread of one group.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionStats {
    pub region_code: String,
    pub mean_mm: f64,
    /// `None` for a single observation (no error bar).
    pub std_mm: Option<f64>,
    pub count: usize,
}

/// Per-region mean and sample standard deviation.
///
/// Regions come out ascending, or in `order` when given; regions missing
/// from `order` follow, ascending.
pub fn regional_comparison(rows: &[&Observation], order: Option<&[String]>) -> Vec<RegionStats> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for o in rows {
        groups.entry(o.region_code.as_str()).or_default().push(o.rainfall_mm);
    }

    let mut keys: Vec<&str> = Vec::with_capacity(groups.len());
    if let Some(order) = order {
        keys.extend(
            order
                .iter()
                .map(String::as_str)
                .filter(|k| groups.contains_key(k)),
        );
    }
    for &k in groups.keys() {
        if !keys.contains(&k) {
            keys.push(k);
        }
    }

    keys.into_iter()
        .filter_map(|k| {
            let values = groups.get(k)?;
            Some(RegionStats {
                region_code: k.to_string(),
                mean_mm: mean(values)?,
                std_mm: sample_std(values),
                count: values.len(),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Forecast aggregates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyForecast {
    pub month: u32,
    pub name: &'static str,
    pub mean_mm: f64,
}

/// Mean prediction per calendar month, January..December.
pub fn forecast_monthly(table: &ForecastTable) -> DashboardResult<Vec<MonthlyForecast>> {
    ensure_rows(table, "monthly forecast")?;
    let mut groups: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for r in &table.rows {
        groups.entry(r.date.month()).or_default().push(r.predicted_mm);
    }
    Ok(groups
        .into_iter()
        .filter_map(|(month, values)| {
            Some(MonthlyForecast {
                month,
                name: month_name(month),
                mean_mm: mean(&values)?,
            })
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalForecast {
    pub season: Season,
    pub mean_mm: f64,
    pub std_mm: Option<f64>,
}

/// Mean and sample standard deviation of the prediction per season, in
/// Winter, Spring, Summer, Autumn order. Seasons without rows are omitted.
pub fn forecast_seasonal(table: &ForecastTable) -> DashboardResult<Vec<SeasonalForecast>> {
    ensure_rows(table, "seasonal forecast")?;
    let mut groups: BTreeMap<Season, Vec<f64>> = BTreeMap::new();
    for r in &table.rows {
        groups
            .entry(Season::from_month(r.date.month()))
            .or_default()
            .push(r.predicted_mm);
    }
    Ok(Season::ALL
        .iter()
        .filter_map(|season| {
            let values = groups.get(season)?;
            Some(SeasonalForecast {
                season: *season,
                mean_mm: mean(values)?,
                std_mm: sample_std(values),
            })
        })
        .collect())
}

/// Headline numbers of the forecast panel.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub period_days: i64,
    pub mean_mm: f64,
    pub peak_mm: f64,
    pub lowest_mm: f64,
}

pub fn forecast_summary(table: &ForecastTable) -> DashboardResult<ForecastSummary> {
    ensure_rows(table, "forecast summary")?;
    let insufficient = || DashboardError::InsufficientData { what: "forecast summary" };

    let start = table.rows.iter().map(|r| r.date).min().ok_or_else(insufficient)?;
    let end = table.rows.iter().map(|r| r.date).max().ok_or_else(insufficient)?;
    let predicted: Vec<f64> = table.rows.iter().map(|r| r.predicted_mm).collect();

    Ok(ForecastSummary {
        start,
        end,
        period_days: (end - start).num_days(),
        mean_mm: mean(&predicted).ok_or_else(insufficient)?,
        peak_mm: predicted.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        lowest_mm: predicted.iter().copied().fold(f64::INFINITY, f64::min),
    })
}

fn ensure_rows(table: &ForecastTable, what: &'static str) -> DashboardResult<()> {
    if table.is_empty() {
        Err(DashboardError::InsufficientData { what })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::ForecastRecord;

    fn obs(region: &str, y: i32, m: u32, d: u32, mm: f64) -> Observation {
        Observation::new(region, NaiveDate::from_ymd_opt(y, m, d).unwrap(), mm, None)
    }

    fn fc(y: i32, m: u32, d: u32, mm: f64) -> ForecastRecord {
        ForecastRecord {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            predicted_mm: mm,
            lower_bound_mm: None,
            upper_bound_mm: None,
            actual_mm: None,
        }
    }

    #[test]
    fn monthly_trend_is_chronological_mean() {
        let rows = [
            obs("A", 2022, 2, 1, 4.0),
            obs("A", 2021, 12, 1, 1.0),
            obs("B", 2021, 12, 11, 3.0),
            obs("A", 2022, 2, 21, 8.0),
        ];
        let refs: Vec<&Observation> = rows.iter().collect();
        let trend = monthly_trend(&refs);
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].period, NaiveDate::from_ymd_opt(2021, 12, 1).unwrap());
        assert_eq!(trend[0].mean_mm, 2.0);
        assert_eq!(trend[1].mean_mm, 6.0);
    }

    #[test]
    fn distribution_keeps_input_order() {
        let rows = [obs("A", 2022, 1, 1, 5.0), obs("A", 2021, 1, 1, 1.0)];
        let refs: Vec<&Observation> = rows.iter().collect();
        assert_eq!(distribution(&refs), vec![5.0, 1.0]);
    }

    #[test]
    fn histogram_bins_cover_range() {
        let bins = histogram(&[0.0, 1.0, 2.0, 3.0, 10.0], 5);
        assert_eq!(bins.len(), 5);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 5);
        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[4].count, 1);
        assert_eq!(bins[4].hi, 10.0);

        let flat = histogram(&[2.0, 2.0], 30);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].count, 2);
        assert!(histogram(&[], 30).is_empty());
    }

    #[test]
    fn monthly_distribution_uses_calendar_order() {
        let mut rows = Vec::new();
        for month in (1..=12).rev() {
            rows.push(obs("A", 2023, month, 1, month as f64));
            rows.push(obs("B", 2022, month, 1, month as f64 * 2.0));
        }
        let refs: Vec<&Observation> = rows.iter().collect();
        let groups = monthly_distribution(&refs);
        let names: Vec<&str> = groups.iter().map(|g| g.name).collect();
        assert_eq!(names, crate::data::model::MONTH_NAMES.to_vec());
        assert_eq!(groups[0].values.len(), 2);
        assert_eq!(groups[11].stats.median, 18.0);
    }

    #[test]
    fn regional_comparison_single_observation_has_no_error_bar() {
        let rows = [
            obs("BT_B", 2022, 1, 1, 2.0),
            obs("BT_B", 2022, 1, 2, 4.0),
            obs("BT_A", 2022, 1, 1, 7.0),
        ];
        let refs: Vec<&Observation> = rows.iter().collect();
        let stats = regional_comparison(&refs, None);
        assert_eq!(stats[0].region_code, "BT_A");
        assert_eq!(stats[0].std_mm, None);
        assert_eq!(stats[0].mean_mm, 7.0);
        assert_eq!(stats[1].mean_mm, 3.0);
        assert!((stats[1].std_mm.unwrap() - 2f64.sqrt()).abs() < 1e-12);

        let order = vec!["BT_B".to_string(), "BT_Q".to_string()];
        let ordered = regional_comparison(&refs, Some(&order));
        let codes: Vec<&str> = ordered.iter().map(|s| s.region_code.as_str()).collect();
        assert_eq!(codes, vec!["BT_B", "BT_A"]);
    }

    #[test]
    fn forecast_monthly_and_seasonal() {
        let table = ForecastTable {
            rows: vec![
                fc(2025, 12, 1, 2.0),
                fc(2025, 1, 1, 4.0),
                fc(2025, 7, 1, 30.0),
                fc(2025, 7, 2, 10.0),
            ],
            has_bounds: false,
        };
        let monthly = forecast_monthly(&table).unwrap();
        let months: Vec<u32> = monthly.iter().map(|m| m.month).collect();
        assert_eq!(months, vec![1, 7, 12]);
        assert_eq!(monthly[1].mean_mm, 20.0);

        let seasonal = forecast_seasonal(&table).unwrap();
        assert_eq!(seasonal.len(), 2);
        assert_eq!(seasonal[0].season, Season::Winter);
        assert_eq!(seasonal[0].mean_mm, 3.0);
        assert_eq!(seasonal[1].season, Season::Summer);
        assert!(seasonal[1].std_mm.is_some());

        let summary = forecast_summary(&table).unwrap();
        assert_eq!(summary.period_days, 334);
        assert_eq!(summary.peak_mm, 30.0);
        assert_eq!(summary.lowest_mm, 2.0);
    }

    #[test]
    fn empty_forecast_is_insufficient() {
        let table = ForecastTable::default();
        for err in [
            forecast_monthly(&table).unwrap_err(),
            forecast_seasonal(&table).unwrap_err(),
            forecast_summary(&table).unwrap_err(),
        ] {
            assert!(matches!(err, DashboardError::InsufficientData { .. }));
        }
    }
}
