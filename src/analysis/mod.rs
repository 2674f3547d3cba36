//! The grouped aggregation and adequacy-assessment engine.
//!
//! Everything here is parameterized by field names and configuration
//! values passed in by the caller; nothing reads global state.

pub mod adequacy;
pub mod aggregator;
pub mod grouping;
pub mod profile;
pub mod recommend;
pub mod stats;

pub use adequacy::{assess, LevelAssessment, Thresholds};
pub use aggregator::{
    aggregate_rates, count_groups, percent, FrequencyTable, GroupRate, RateTable,
};
pub use grouping::{ClassificationTable, Grouping, KeyTransform};
pub use profile::{profile_groups, sort_by_patients, GroupProfile, ProfileFields};
pub use recommend::{
    find_coordinate_columns, recommend, RecommendationPolicy, RecommendationSummary,
    SurveyEvidence,
};
pub use stats::{chi_square_test, ChiSquareResult};
