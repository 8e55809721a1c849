use std::collections::BTreeSet;
use std::fmt;

use chrono::{Datelike, NaiveDate};

// ---------------------------------------------------------------------------
// Calendar helpers
// ---------------------------------------------------------------------------

/// English month names in calendar order, independent of the host locale.
pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Name of a 1-based calendar month.
pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES[(month.clamp(1, 12) - 1) as usize]
}

/// Meteorological season (northern hemisphere).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    /// Fixed display order.
    pub const ALL: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Autumn];

    pub fn from_month(month: u32) -> Self {
        match month {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            _ => Season::Autumn,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Observation – one row of the rainfall file
// ---------------------------------------------------------------------------

/// A single rainfall measurement for one region on one date.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Administrative region code (e.g. `BT001`).
    pub region_code: String,
    pub date: NaiveDate,
    pub rainfall_mm: f64,
    pub year: i32,
    /// Derived from `date`.
    pub month_name: &'static str,
}

impl Observation {
    /// Build a row, deriving `year` from the date unless the file carries one.
    pub fn new(region_code: impl Into<String>, date: NaiveDate, rainfall_mm: f64, year: Option<i32>) -> Self {
        Observation {
            region_code: region_code.into(),
            date,
            rainfall_mm,
            year: year.unwrap_or_else(|| date.year()),
            month_name: month_name(date.month()),
        }
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }
}

// ---------------------------------------------------------------------------
// ObservationTable – the complete loaded dataset
// ---------------------------------------------------------------------------

/// All observations ordered by date, with the indices the filter controls need.
#[derive(Debug, Clone, Default)]
pub struct ObservationTable {
    pub rows: Vec<Observation>,
    /// Sorted distinct region codes (values of the region multi-select).
    pub region_codes: Vec<String>,
    /// Inclusive min/max year (bounds of the year slider).
    pub year_bounds: Option<(i32, i32)>,
}

impl ObservationTable {
    /// Sort rows by date (stable, so duplicates keep file order) and build
    /// the region and year indices.
    pub fn from_rows(mut rows: Vec<Observation>) -> Self {
        rows.sort_by_key(|o| o.date);

        let region_codes: BTreeSet<&str> = rows.iter().map(|o| o.region_code.as_str()).collect();
        let region_codes = region_codes.into_iter().map(str::to_string).collect();

        let year_bounds = rows.iter().fold(None, |acc: Option<(i32, i32)>, o| match acc {
            None => Some((o.year, o.year)),
            Some((lo, hi)) => Some((lo.min(o.year), hi.max(o.year))),
        });

        ObservationTable {
            rows,
            region_codes,
            year_bounds,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Borrow the rows at `indices`, in the given order.
    pub fn select(&self, indices: &[usize]) -> Vec<&Observation> {
        indices.iter().filter_map(|&i| self.rows.get(i)).collect()
    }
}

// ---------------------------------------------------------------------------
// Forecast
// ---------------------------------------------------------------------------

/// One row of the forecast artifact (`ds`, `yhat`, bounds, sparse actuals).
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRecord {
    pub date: NaiveDate,
    pub predicted_mm: f64,
    pub lower_bound_mm: Option<f64>,
    pub upper_bound_mm: Option<f64>,
    /// Only present where the forecast overlaps history.
    pub actual_mm: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ForecastTable {
    pub rows: Vec<ForecastRecord>,
    /// Both `yhat_lower` and `yhat_upper` columns exist in the file.
    pub has_bounds: bool,
}

impl ForecastTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// CellValue – a single cell of the schemaless cluster summary
// ---------------------------------------------------------------------------

/// A dynamically-typed cell, guessed from the CSV text.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v:.2}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, ""),
        }
    }
}

impl CellValue {
    /// Guess the type of a raw CSV cell.
    pub fn guess(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("nan") {
            return CellValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::Float(f);
        }
        match s {
            "true" | "True" => CellValue::Bool(true),
            "false" | "False" => CellValue::Bool(false),
            _ => CellValue::Text(s.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Cluster summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRow {
    /// Row label (first CSV column).
    pub label: String,
    /// One cell per entry of [`ClusterTable::columns`].
    pub values: Vec<CellValue>,
}

/// Per-cluster summary produced by the offline clustering job. The column
/// set is not fixed; see [`crate::data::cluster`] for how columns are found.
#[derive(Debug, Clone, Default)]
pub struct ClusterTable {
    /// Header of the label column (often empty).
    pub label_header: String,
    pub columns: Vec<String>,
    pub rows: Vec<ClusterRow>,
}

impl ClusterTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.rows.iter().filter_map(move |r| r.values.get(idx))
    }

    /// A column is numeric when it has at least one number and nothing but
    /// numbers and nulls.
    pub fn is_numeric(&self, idx: usize) -> bool {
        let mut seen_number = false;
        for v in self.column_values(idx) {
            match v {
                CellValue::Integer(_) | CellValue::Float(_) => seen_number = true,
                CellValue::Null => {}
                _ => return false,
            }
        }
        seen_number
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
