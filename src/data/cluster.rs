//! Column discovery for the cluster summary.
//!
//! The clustering job names its columns however it likes, so the panel
//! looks them up from prioritised candidate lists. Adjust the lists here
//! when the upstream notebook changes.

use super::model::ClusterTable;

/// Column names that mean "average rainfall of the cluster", best first.
pub const AVG_RAINFALL_CANDIDATES: &[&str] = &[
    "avg_rainfall",
    "mean_rainfall",
    "average_rainfall",
    "rfh_mean",
    "mean",
];

/// Column names that mean "number of members", best first.
pub const COUNT_CANDIDATES: &[&str] = &["count", "size", "n_regions", "regions"];

/// First candidate present in the table, as a column index.
pub fn find_column(table: &ClusterTable, candidates: &[&str]) -> Option<usize> {
    candidates.iter().find_map(|name| table.column_index(name))
}

/// Column to chart: the average-rainfall column, else the first numeric one.
pub fn plot_column(table: &ClusterTable) -> Option<usize> {
    find_column(table, AVG_RAINFALL_CANDIDATES)
        .or_else(|| (0..table.columns.len()).find(|&i| table.is_numeric(i)))
}

/// `avg_rainfall` → `Avg Rainfall`.
pub fn title_case(column: &str) -> String {
    column
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Headline metrics of the cluster panel.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterOverview {
    pub total_clusters: usize,
    /// Mean of the average-rainfall column; `None` shows as unavailable.
    pub avg_rainfall_mm: Option<f64>,
    /// Sum of the member-count column; `None` shows as unavailable.
    pub member_count: Option<i64>,
}

pub fn overview(table: &ClusterTable) -> ClusterOverview {
    let avg_rainfall_mm = find_column(table, AVG_RAINFALL_CANDIDATES).and_then(|idx| {
        let values: Vec<f64> = table.column_values(idx).filter_map(|v| v.as_f64()).collect();
        super::stats::mean(&values)
    });
    let member_count = find_column(table, COUNT_CANDIDATES).and_then(|idx| {
        let values: Vec<f64> = table.column_values(idx).filter_map(|v| v.as_f64()).collect();
        (!values.is_empty()).then(|| values.iter().sum::<f64>() as i64)
    });

    ClusterOverview {
        total_clusters: table.len(),
        avg_rainfall_mm,
        member_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, ClusterRow};

    fn table(columns: &[&str], rows: Vec<(&str, Vec<CellValue>)>) -> ClusterTable {
        ClusterTable {
            label_header: String::new(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .into_iter()
                .map(|(label, values)| ClusterRow {
                    label: label.to_string(),
                    values,
                })
                .collect(),
        }
    }

    #[test]
    fn preferred_names_win() {
        let t = table(
            &["mean", "n_regions", "avg_rainfall", "size"],
            vec![
                ("0", vec![CellValue::Float(1.0), CellValue::Integer(3), CellValue::Float(100.0), CellValue::Integer(9)]),
                ("1", vec![CellValue::Float(2.0), CellValue::Integer(4), CellValue::Float(50.0), CellValue::Integer(9)]),
            ],
        );
        assert_eq!(find_column(&t, AVG_RAINFALL_CANDIDATES), Some(2));
        assert_eq!(find_column(&t, COUNT_CANDIDATES), Some(3));
        assert_eq!(plot_column(&t), Some(2));

        let o = overview(&t);
        assert_eq!(o.total_clusters, 2);
        assert_eq!(o.avg_rainfall_mm, Some(75.0));
        assert_eq!(o.member_count, Some(18));
    }

    #[test]
    fn unknown_numeric_column_is_plot_fallback() {
        let t = table(
            &["silhouette"],
            vec![
                ("0", vec![CellValue::Float(0.4)]),
                ("1", vec![CellValue::Float(0.7)]),
            ],
        );
        let o = overview(&t);
        assert_eq!(o.member_count, None);
        assert_eq!(o.avg_rainfall_mm, None);
        assert_eq!(plot_column(&t), Some(0));
    }

    #[test]
    fn text_only_table_has_nothing_to_plot() {
        let t = table(&["pattern"], vec![("0", vec![CellValue::Text("Arid".into())])]);
        assert_eq!(plot_column(&t), None);
    }

    #[test]
    fn titles() {
        assert_eq!(title_case("avg_rainfall"), "Avg Rainfall");
        assert_eq!(title_case("rfh_MEAN"), "Rfh Mean");
        assert_eq!(title_case("silhouette"), "Silhouette");
    }
}
