//! The two analysis workflows over a loaded cohort.

pub mod outcomes;
pub mod survey;

pub use outcomes::run_outcomes;
pub use survey::run_survey;
