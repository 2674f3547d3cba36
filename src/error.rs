//! Error taxonomy.
//!
//! Fatal conditions abort the run through [`AnalysisError`]. Recoverable
//! conditions are expressed as [`Unavailable`] markers so a report section can
//! be skipped with a diagnostic while the rest of the run continues.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that end the run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The input dataset does not exist.
    #[error("{} not found", path.display())]
    FileNotFound { path: PathBuf },

    /// The dataset could not be parsed as CSV.
    #[error("failed to parse {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is internally inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Why an aggregation or test could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Unavailable {
    /// A requested field is absent from the header.
    #[error("column '{column}' not found")]
    MissingColumn { column: String },

    /// No records survived cleaning for this grouping/outcome pair.
    #[error("no data for {grouping}")]
    EmptyGroup { grouping: String },

    /// The contingency table cannot support a significance test.
    #[error("test skipped for {grouping} x {outcome}: {detail}")]
    DegenerateContingencyTable {
        grouping: String,
        outcome: String,
        detail: String,
    },
}

/// Result of a single aggregation request.
pub type Availability<T> = Result<T, Unavailable>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_not_found_message() {
        let err = AnalysisError::FileNotFound {
            path: PathBuf::from("cohort.csv"),
        };
        assert_eq!(err.to_string(), "cohort.csv not found");
    }

    #[test]
    fn test_unavailable_messages() {
        let missing = Unavailable::MissingColumn {
            column: "hiv_positive".to_string(),
        };
        assert_eq!(missing.to_string(), "column 'hiv_positive' not found");

        let degenerate = Unavailable::DegenerateContingencyTable {
            grouping: "hospital".to_string(),
            outcome: "died_30day".to_string(),
            detail: "fewer than 2 groups".to_string(),
        };
        assert!(degenerate.to_string().contains("fewer than 2 groups"));
    }

    #[test]
    fn test_unavailable_serializes_with_reason_tag() {
        let missing = Unavailable::MissingColumn {
            column: "age".to_string(),
        };
        let json = serde_json::to_string(&missing).unwrap();
        assert!(json.contains("\"reason\":\"missing_column\""));
        assert!(json.contains("\"column\":\"age\""));
    }
}
