use std::collections::BTreeSet;

use super::model::ObservationTable;

// ---------------------------------------------------------------------------
// Filter inputs
// ---------------------------------------------------------------------------

/// Inclusive year interval with `lo <= hi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearInterval {
    lo: i32,
    hi: i32,
}

impl YearInterval {
    /// Build an interval; reversed bounds are swapped.
    pub fn new(lo: i32, hi: i32) -> Self {
        YearInterval {
            lo: lo.min(hi),
            hi: lo.max(hi),
        }
    }

    pub fn lo(&self) -> i32 {
        self.lo
    }

    pub fn hi(&self) -> i32 {
        self.hi
    }

    pub fn contains(&self, year: i32) -> bool {
        self.lo <= year && year <= self.hi
    }

    /// Clamp both ends into `[min, max]`.
    pub fn clamped(self, (min, max): (i32, i32)) -> Self {
        YearInterval::new(self.lo.clamp(min, max), self.hi.clamp(min, max))
    }
}

/// What the user has chosen in the side panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSelection {
    /// Selected region codes; empty means nothing selected.
    pub region_codes: BTreeSet<String>,
    pub years: YearInterval,
}

impl FilterSelection {
    pub fn new(years: YearInterval) -> Self {
        FilterSelection {
            region_codes: BTreeSet::new(),
            years,
        }
    }

    /// Apply the selection, keeping "nothing selected" apart from
    /// "selection matched nothing".
    pub fn apply(&self, table: &ObservationTable) -> FilterOutcome {
        if self.region_codes.is_empty() {
            return FilterOutcome::NothingSelected;
        }
        let indices = filtered_indices(table, &self.region_codes, self.years);
        if indices.is_empty() {
            FilterOutcome::NoMatches
        } else {
            FilterOutcome::Matched(indices)
        }
    }
}

/// Result of applying a [`FilterSelection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    /// No region chosen; the result is empty by construction.
    NothingSelected,
    /// Regions chosen but no row falls in the year interval.
    NoMatches,
    /// Indices into the observation table, in table order.
    Matched(Vec<usize>),
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Return indices of observations whose region is in `regions` and whose
/// year lies in `years`.
///
/// An empty `regions` set selects nothing.
pub fn filtered_indices(
    table: &ObservationTable,
    regions: &BTreeSet<String>,
    years: YearInterval,
) -> Vec<usize> {
    if regions.is_empty() {
        return Vec::new();
    }
    table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, o)| years.contains(o.year) && regions.contains(&o.region_code))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Observation;
    use chrono::NaiveDate;

    /// Regions BT_A and BT_B, one observation per region for every month
    /// of 2020..=2025.
    fn sample_table() -> ObservationTable {
        let mut rows = Vec::new();
        for year in 2020..=2025 {
            for month in 1..=12 {
                for (k, region) in ["BT_A", "BT_B"].iter().enumerate() {
                    let date = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
                    rows.push(Observation::new(*region, date, (month + k as u32) as f64, None));
                }
            }
        }
        ObservationTable::from_rows(rows)
    }

    fn set(codes: &[&str]) -> BTreeSet<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn region_and_year_scenario() {
        let table = sample_table();
        let indices = filtered_indices(&table, &set(&["BT_A"]), YearInterval::new(2022, 2023));
        let rows = table.select(&indices);
        assert_eq!(rows.len(), 24);
        assert!(rows
            .iter()
            .all(|o| o.region_code == "BT_A" && (o.year == 2022 || o.year == 2023)));
    }

    #[test]
    fn filter_is_exact_subset() {
        let table = sample_table();
        let region_sets = [set(&["BT_A"]), set(&["BT_B"]), set(&["BT_A", "BT_B"]), set(&["BT_C"])];
        for regions in &region_sets {
            for lo in 2019..=2026 {
                for hi in lo..=2026 {
                    let years = YearInterval::new(lo, hi);
                    let kept = filtered_indices(&table, regions, years);
                    for (i, o) in table.rows.iter().enumerate() {
                        let wanted = regions.contains(&o.region_code) && years.contains(o.year);
                        assert_eq!(kept.contains(&i), wanted, "row {i} with {regions:?} {lo}..={hi}");
                    }
                }
            }
        }
    }

    #[test]
    fn empty_selection_is_distinct_from_no_match() {
        let table = sample_table();
        let mut selection = FilterSelection::new(YearInterval::new(2020, 2025));
        assert!(filtered_indices(&table, &selection.region_codes, selection.years).is_empty());
        assert_eq!(selection.apply(&table), FilterOutcome::NothingSelected);

        selection.region_codes = set(&["BT_Z"]);
        assert_eq!(selection.apply(&table), FilterOutcome::NoMatches);

        selection.region_codes = set(&["BT_B"]);
        selection.years = YearInterval::new(2025, 2025);
        match selection.apply(&table) {
            FilterOutcome::Matched(idx) => assert_eq!(idx.len(), 12),
            other => panic!("expected matches, got {other:?}"),
        }
    }

    #[test]
    fn year_interval_normalises() {
        let years = YearInterval::new(2025, 2021);
        assert_eq!((years.lo(), years.hi()), (2021, 2025));
        let clamped = YearInterval::new(2015, 2030).clamped((2018, 2024));
        assert_eq!((clamped.lo(), clamped.hi()), (2018, 2024));
        assert!(clamped.contains(2018) && clamped.contains(2024) && !clamped.contains(2025));
    }
}
