//! Report data models.
//!
//! This module contains the structures the two workflows produce and the
//! renderers consume. Sections that could not be computed carry an
//! [`Unavailable`](crate::error::Unavailable) marker instead of data, so
//! every renderer prints the same diagnostic.

use crate::analysis::{
    ChiSquareResult, FrequencyTable, GroupProfile, GroupRate, LevelAssessment, RateTable,
    RecommendationSummary, Thresholds,
};
use crate::dataset::ColumnResolution;
use crate::error::Availability;
use chrono::{DateTime, Local};
use serde::Serialize;

/// How a rate section lists its groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateOrdering {
    /// Every group, sorted by key.
    Alphabetical,
    /// The largest groups first, at most `limit`.
    ByTotal { limit: usize },
}

/// One grouping × outcome rate section of the survey.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeSection {
    pub title: String,
    pub ordering: RateOrdering,
    pub table: Availability<RateTable>,
}

impl OutcomeSection {
    /// Groups to display, in section order.
    pub fn rows(&self) -> Vec<&GroupRate> {
        match (&self.table, self.ordering) {
            (Ok(table), RateOrdering::Alphabetical) => table.alphabetical(),
            (Ok(table), RateOrdering::ByTotal { limit }) => {
                let mut rows = table.by_total();
                rows.truncate(limit);
                rows
            }
            (Err(_), _) => Vec::new(),
        }
    }
}

/// Result of the sample-size survey.
#[derive(Debug, Clone, Serialize)]
pub struct SurveyReport {
    /// Records kept after dropping short rows.
    pub records_loaded: usize,
    pub short_rows: usize,
    pub columns: Vec<ColumnResolution>,
    pub top_n: usize,
    pub thresholds: Thresholds,
    /// Source fields of the hospital, district and village groupings.
    pub hospital_field: String,
    pub district_field: String,
    pub village_field: String,
    /// Region value that means Central.
    pub central_value: String,
    pub hospitals: Availability<FrequencyTable>,
    pub districts: Availability<FrequencyTable>,
    pub villages: Availability<FrequencyTable>,
    pub regions: Availability<FrequencyTable>,
    pub outcomes: Vec<OutcomeSection>,
    pub hospital_level: Availability<LevelAssessment>,
    pub district_level: Availability<LevelAssessment>,
    pub village_level: Availability<LevelAssessment>,
    pub recommendations: RecommendationSummary,
}

impl SurveyReport {
    /// Display name of a region value.
    pub fn region_name(&self, value: &str) -> &'static str {
        if value == self.central_value {
            "Central"
        } else {
            "Other regions"
        }
    }
}

/// One figure with its headline finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FigureSummary {
    pub figure: String,
    pub title: String,
    pub filename: String,
    pub key_finding: String,
    pub geographic_level: String,
}

/// Result of the geographic outcome comparison.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomesReport {
    /// Records with a usable 30-day mortality value.
    pub participants: usize,
    /// Hospitals, largest first.
    pub hospitals: Availability<Vec<GroupProfile>>,
    /// Districts meeting `district_report_min`, largest first.
    pub districts: Availability<Vec<GroupProfile>>,
    /// Distinct districts in the analysis set.
    pub districts_represented: Availability<usize>,
    /// Urban/rural classes, sorted by label.
    pub urban_rural: Availability<Vec<GroupProfile>>,
    pub urban_label: String,
    pub rural_label: String,
    pub mortality_test: Availability<ChiSquareResult>,
    pub hiv_test: Availability<ChiSquareResult>,
    /// Percentage of participants in the Central region.
    pub central_share: Option<f64>,
    pub district_report_min: usize,
    pub significance: f64,
    pub figures: Vec<FigureSummary>,
}

impl OutcomesReport {
    /// Profile of an urban/rural class by label.
    pub fn urban_rural_profile(&self, label: &str) -> Option<&GroupProfile> {
        self.urban_rural
            .as_ref()
            .ok()
            .and_then(|profiles| profiles.iter().find(|p| p.key == label))
    }

    /// Hospital patients summed over all hospitals.
    pub fn hospital_patients(&self) -> usize {
        self.hospitals
            .as_ref()
            .map(|profiles| profiles.iter().map(|p| p.n_patients).sum())
            .unwrap_or(0)
    }
}

/// Metadata about the run.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub input: String,
    pub analysis_date: DateTime<Local>,
    pub records_loaded: usize,
    pub missing_columns: Vec<String>,
    pub duration_seconds: f64,
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub metadata: ReportMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub survey: Option<SurveyReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcomes: Option<OutcomesReport>,
}

/// Format an optional percentage with one decimal, or "n/a".
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v),
        None => "n/a".to_string(),
    }
}
