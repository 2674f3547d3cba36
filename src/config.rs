//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.capgeo.toml` files. Every threshold, column name and classification
//! table the engine uses lives here and is passed in explicitly.

use crate::analysis::{ClassificationTable, RecommendationPolicy, Thresholds};
use crate::cli::ChartFormat;
use crate::error::AnalysisError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default config file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".capgeo.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Input dataset settings.
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Column names used by the analyses.
    #[serde(default)]
    pub columns: ColumnConfig,

    /// Sample-size and recommendation thresholds.
    #[serde(default)]
    pub thresholds: ThresholdConfig,

    /// Geographic classification settings.
    #[serde(default)]
    pub geography: GeographyConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Input dataset settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Path to the cohort CSV.
    #[serde(default = "default_input")]
    pub input: PathBuf,

    /// Literal that marks a missing value (in addition to blank cells).
    #[serde(default = "default_missing_sentinel")]
    pub missing_sentinel: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            missing_sentinel: default_missing_sentinel(),
        }
    }
}

fn default_input() -> PathBuf {
    PathBuf::from("LoRTISA_analysis_dataset_corrected.csv")
}

fn default_missing_sentinel() -> String {
    "NA".to_string()
}

/// Column names in the input header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConfig {
    #[serde(default = "default_hospital")]
    pub hospital: String,
    #[serde(default = "default_district")]
    pub district: String,
    #[serde(default = "default_village")]
    pub village: String,
    #[serde(default = "default_region_central")]
    pub region_central: String,
    #[serde(default = "default_died_hospital")]
    pub died_hospital: String,
    #[serde(default = "default_died_30day")]
    pub died_30day: String,
    #[serde(default = "default_hiv_positive")]
    pub hiv_positive: String,
    #[serde(default = "default_patient_id")]
    pub patient_id: String,
    #[serde(default = "default_age")]
    pub age: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            hospital: default_hospital(),
            district: default_district(),
            village: default_village(),
            region_central: default_region_central(),
            died_hospital: default_died_hospital(),
            died_30day: default_died_30day(),
            hiv_positive: default_hiv_positive(),
            patient_id: default_patient_id(),
            age: default_age(),
        }
    }
}

fn default_hospital() -> String {
    "hospital".to_string()
}

fn default_district() -> String {
    "residencedistrict".to_string()
}

fn default_village() -> String {
    "residencevillagesubcounty".to_string()
}

fn default_region_central() -> String {
    "region_central".to_string()
}

fn default_died_hospital() -> String {
    "died_hospital".to_string()
}

fn default_died_30day() -> String {
    "died_30day".to_string()
}

fn default_hiv_positive() -> String {
    "hiv_positive".to_string()
}

fn default_patient_id() -> String {
    "patient_id".to_string()
}

fn default_age() -> String {
    "age_continuous".to_string()
}

impl ColumnConfig {
    /// Fields the survey workflow reads.
    pub fn survey_fields(&self) -> Vec<&str> {
        vec![
            &self.hospital,
            &self.district,
            &self.village,
            &self.region_central,
            &self.died_hospital,
            &self.died_30day,
            &self.hiv_positive,
        ]
    }

    /// Fields the outcomes workflow reads.
    pub fn outcome_fields(&self) -> Vec<&str> {
        vec![
            &self.hospital,
            &self.district,
            &self.region_central,
            &self.died_30day,
            &self.hiv_positive,
            &self.patient_id,
            &self.age,
        ]
    }

    /// Union of all configured fields, first occurrence order.
    pub fn all_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        for field in self.survey_fields().into_iter().chain(self.outcome_fields()) {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        fields
    }
}

/// Sample-size and recommendation thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Minimum group size considered adequate.
    #[serde(default = "default_min_sample")]
    pub min_sample: usize,

    /// Group size considered strong.
    #[serde(default = "default_good_sample")]
    pub good_sample: usize,

    /// Hospitals needed for a positive catchment recommendation.
    #[serde(default = "default_hospital_positive_min")]
    pub hospital_positive_min: usize,

    /// Adequate districts needed for a positive district recommendation.
    #[serde(default = "default_district_positive_min")]
    pub district_positive_min: usize,

    /// Adequate villages needed for a positive fine-scale recommendation.
    #[serde(default = "default_village_positive_min")]
    pub village_positive_min: usize,

    /// Distinct region values needed for a positive regional recommendation.
    #[serde(default = "default_region_positive_min")]
    pub region_positive_min: usize,

    /// Minimum patients for a district to appear in the outcomes tables.
    #[serde(default = "default_district_report_min")]
    pub district_report_min: usize,

    /// Significance level used in the narrative wording.
    #[serde(default = "default_significance")]
    pub significance: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            min_sample: default_min_sample(),
            good_sample: default_good_sample(),
            hospital_positive_min: default_hospital_positive_min(),
            district_positive_min: default_district_positive_min(),
            village_positive_min: default_village_positive_min(),
            region_positive_min: default_region_positive_min(),
            district_report_min: default_district_report_min(),
            significance: default_significance(),
        }
    }
}

fn default_min_sample() -> usize {
    30
}

fn default_good_sample() -> usize {
    100
}

fn default_hospital_positive_min() -> usize {
    2
}

fn default_district_positive_min() -> usize {
    5
}

fn default_village_positive_min() -> usize {
    10
}

fn default_region_positive_min() -> usize {
    2
}

fn default_district_report_min() -> usize {
    20
}

fn default_significance() -> f64 {
    0.05
}

impl ThresholdConfig {
    /// Adequacy thresholds for the assessor.
    pub fn adequacy(&self) -> Thresholds {
        Thresholds {
            min_sample: self.min_sample,
            good_sample: self.good_sample,
        }
    }

    /// Recommendation policy for the generator.
    pub fn policy(&self) -> RecommendationPolicy {
        RecommendationPolicy {
            hospital_min_groups: self.hospital_positive_min,
            district_min_adequate: self.district_positive_min,
            village_min_adequate: self.village_positive_min,
            region_min_levels: self.region_positive_min,
        }
    }
}

/// Geographic classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeographyConfig {
    /// Header substrings that suggest coordinate data (case-insensitive).
    #[serde(default = "default_coordinate_keywords")]
    pub coordinate_keywords: Vec<String>,

    /// Hospitals kept in the outcomes analysis. Empty keeps every value.
    #[serde(default = "default_hospitals")]
    pub hospitals: Vec<String>,

    /// Districts classified as urban (case-insensitive).
    #[serde(default = "default_urban_districts")]
    pub urban_districts: Vec<String>,

    /// Label for districts in the urban list.
    #[serde(default = "default_urban_label")]
    pub urban_label: String,

    /// Label for every other district.
    #[serde(default = "default_rural_label")]
    pub rural_label: String,

    /// Value of the region column that marks the Central region.
    #[serde(default = "default_central_value")]
    pub central_value: String,

    /// Bar colors per hospital, as `#RRGGBB`.
    #[serde(default = "default_hospital_colors")]
    pub hospital_colors: BTreeMap<String, String>,
}

impl Default for GeographyConfig {
    fn default() -> Self {
        Self {
            coordinate_keywords: default_coordinate_keywords(),
            hospitals: default_hospitals(),
            urban_districts: default_urban_districts(),
            urban_label: default_urban_label(),
            rural_label: default_rural_label(),
            central_value: default_central_value(),
            hospital_colors: default_hospital_colors(),
        }
    }
}

fn default_coordinate_keywords() -> Vec<String> {
    vec!["lat", "lon", "coord", "gps", "x", "y"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_hospitals() -> Vec<String> {
    vec!["Kirrudu", "Mulago", "Naguru"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_urban_districts() -> Vec<String> {
    vec!["kampala", "wakiso"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_urban_label() -> String {
    "Urban".to_string()
}

fn default_rural_label() -> String {
    "Rural/Peri-urban".to_string()
}

fn default_central_value() -> String {
    "1".to_string()
}

fn default_hospital_colors() -> BTreeMap<String, String> {
    [("Mulago", "#E31A1C"), ("Kirrudu", "#1F78B4"), ("Naguru", "#33A02C")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl GeographyConfig {
    /// The urban/rural classification table.
    pub fn urban_rural_table(&self) -> ClassificationTable {
        ClassificationTable::new(
            "urban_rural",
            &self.urban_districts,
            &self.urban_label,
            &self.rural_label,
        )
    }
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Root directory for tables, figures and the narrative.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// How many districts/villages to list in "top" sections.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Render chart images.
    #[serde(default = "default_true")]
    pub charts: bool,

    /// Chart image format.
    #[serde(default)]
    pub chart_format: ChartFormat,

    /// Resolution used to size chart images.
    #[serde(default = "default_chart_dpi")]
    pub chart_dpi: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            top_n: default_top_n(),
            charts: true,
            chart_format: ChartFormat::default(),
            chart_dpi: default_chart_dpi(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("Results")
}

fn default_top_n() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_chart_dpi() -> u32 {
    300
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were explicitly provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref input) = args.input {
            self.dataset.input = input.clone();
        }
        if let Some(ref output_dir) = args.output_dir {
            self.report.output_dir = output_dir.clone();
        }
        if let Some(top_n) = args.top_n {
            self.report.top_n = top_n;
        }
        if let Some(format) = args.chart_format {
            self.report.chart_format = format;
        }

        // Flags only ever switch charts off
        if args.no_charts {
            self.report.charts = false;
        }
    }

    /// Reject settings the engine cannot work with.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.thresholds.min_sample > self.thresholds.good_sample {
            return Err(AnalysisError::InvalidConfig(format!(
                "min_sample ({}) must not exceed good_sample ({})",
                self.thresholds.min_sample, self.thresholds.good_sample
            )));
        }
        if self.report.chart_dpi == 0 {
            return Err(AnalysisError::InvalidConfig(
                "chart_dpi must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.thresholds.significance) {
            return Err(AnalysisError::InvalidConfig(
                "significance must be between 0.0 and 1.0".to_string(),
            ));
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.thresholds.min_sample, 30);
        assert_eq!(config.thresholds.good_sample, 100);
        assert_eq!(config.columns.died_30day, "died_30day");
        assert_eq!(config.report.output_dir, PathBuf::from("Results"));
        assert!(config
            .geography
            .urban_districts
            .contains(&"kampala".to_string()));
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[dataset]
input = "cohort.csv"

[thresholds]
min_sample = 20
district_positive_min = 3

[geography]
urban_districts = ["gulu"]

[report]
top_n = 5
chart_format = "svg"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.dataset.input, PathBuf::from("cohort.csv"));
        assert_eq!(config.thresholds.min_sample, 20);
        assert_eq!(config.thresholds.good_sample, 100);
        assert_eq!(config.thresholds.district_positive_min, 3);
        assert_eq!(config.geography.urban_districts, vec!["gulu"]);
        assert_eq!(config.report.top_n, 5);
        assert_eq!(config.report.chart_format, ChartFormat::Svg);
        assert_eq!(config.columns.hospital, "hospital");
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[dataset]"));
        assert!(toml_str.contains("[thresholds]"));
        assert!(toml_str.contains("[geography]"));
        assert!(toml_str.contains("[report]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.thresholds.min_sample, 30);
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let mut config = Config::default();
        config.thresholds.min_sample = 200;
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidConfig(_))
        ));

        config.thresholds.min_sample = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_all_fields_deduplicates() {
        let columns = ColumnConfig::default();
        let fields = columns.all_fields();
        assert_eq!(fields.len(), 9);
        assert_eq!(fields.iter().filter(|f| **f == "hospital").count(), 1);
    }
}
