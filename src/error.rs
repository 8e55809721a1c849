use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// DashboardError – the failure taxonomy every panel handles locally
// ---------------------------------------------------------------------------

/// Failures surfaced to the user. None of these crash the dashboard: each
/// panel renders its own error state and the rest of the view keeps going.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// The expected input file does not exist (yet).
    #[error("data file not found: {}", path.display())]
    DataUnavailable { path: PathBuf },

    /// The file exists but could not be parsed into the expected table.
    #[error("could not read {}: {reason}", path.display())]
    DataCorrupt { path: PathBuf, reason: String },

    /// The table is valid but has no usable rows for the aggregation.
    #[error("not enough data to compute {what}")]
    InsufficientData { what: &'static str },

    /// The user has not chosen the inputs the view needs.
    #[error("no regions selected")]
    SelectionEmpty,

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type DashboardResult<T> = Result<T, DashboardError>;

impl DashboardError {
    /// Wrap a parse failure for `path`, keeping the full context chain.
    pub fn corrupt(path: impl Into<PathBuf>, err: &anyhow::Error) -> Self {
        DashboardError::DataCorrupt {
            path: path.into(),
            reason: format!("{err:#}"),
        }
    }

    /// Short name of the failure kind, shown next to unexpected errors.
    pub fn kind(&self) -> &'static str {
        match self {
            DashboardError::DataUnavailable { .. } => "DataUnavailable",
            DashboardError::DataCorrupt { .. } => "DataCorrupt",
            DashboardError::InsufficientData { .. } => "InsufficientData",
            DashboardError::SelectionEmpty => "SelectionEmpty",
            DashboardError::Unexpected(_) => "Unexpected",
        }
    }

    /// What the user can do about it.
    pub fn guidance(&self) -> &'static str {
        match self {
            DashboardError::DataUnavailable { .. } => {
                "The file has not been generated yet. Run the analysis step that produces it, then use File → Reload."
            }
            DashboardError::DataCorrupt { .. } => {
                "The file exists but does not have the expected columns. Regenerate it or open a different file."
            }
            DashboardError::InsufficientData { .. } => "No data available for the selected filters.",
            DashboardError::SelectionEmpty => "Please select at least one region to view the analysis.",
            DashboardError::Unexpected(_) => "Something went wrong. The details below describe the failure.",
        }
    }

    /// Whether the UI should show this as an error banner rather than a
    /// neutral hint.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            DashboardError::DataCorrupt { .. } | DashboardError::Unexpected(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_keeps_context_chain() {
        let inner = anyhow::anyhow!("missing 'yhat' column").context("parsing forecast");
        let err = DashboardError::corrupt("outputs/forecast.csv", &inner);
        let text = err.to_string();
        assert!(text.contains("outputs/forecast.csv"));
        assert!(text.contains("parsing forecast"));
        assert!(text.contains("missing 'yhat' column"));
        assert!(err.is_error());
    }

    #[test]
    fn expected_states_are_not_errors() {
        let missing = DashboardError::DataUnavailable {
            path: "outputs/forecast.csv".into(),
        };
        assert!(!missing.is_error());
        assert!(!DashboardError::SelectionEmpty.is_error());
        assert!(!DashboardError::InsufficientData { what: "monthly forecast" }.is_error());
        assert_eq!(missing.kind(), "DataUnavailable");
        assert!(DashboardError::SelectionEmpty.guidance().contains("select at least one region"));
    }
}
