//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values. Every option is optional:
//! with no arguments the tool reads the default dataset and writes the
//! full set of reports under `Results/`.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// capgeo - grouped outcome statistics for a pneumonia cohort
///
/// Summarises a cohort CSV by hospital, district, village and region:
/// outcome rates per group, sample adequacy, chi-square comparisons,
/// CSV tables, charts and a narrative report.
///
/// Examples:
///   capgeo
///   capgeo --input cohort.csv --output-dir out
///   capgeo --mode survey
///   capgeo --mode outcomes --format json --no-charts
///   capgeo --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Cohort CSV to analyze
    ///
    /// Defaults to the dataset named in .capgeo.toml, or
    /// LoRTISA_analysis_dataset_corrected.csv.
    #[arg(short, long, value_name = "FILE", env = "CAPGEO_INPUT")]
    pub input: Option<PathBuf>,

    /// Root directory for tables, figures and the narrative report
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .capgeo.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Which workflow to run
    #[arg(long, default_value = "all", value_name = "MODE")]
    pub mode: RunMode,

    /// Narrative report format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// How many districts/villages to list in "top" sections
    #[arg(long, value_name = "COUNT")]
    pub top_n: Option<usize>,

    /// Skip chart rendering
    #[arg(long)]
    pub no_charts: bool,

    /// Chart image format (png, svg)
    #[arg(long, value_name = "FORMAT")]
    pub chart_format: Option<ChartFormat>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .capgeo.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Workflow selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RunMode {
    /// Sample-size survey printed to the console
    Survey,
    /// Outcome comparison with tables, figures and narrative
    Outcomes,
    /// Both workflows (default)
    #[default]
    All,
}

impl RunMode {
    pub fn runs_survey(self) -> bool {
        matches!(self, RunMode::Survey | RunMode::All)
    }

    pub fn runs_outcomes(self) -> bool {
        matches!(self, RunMode::Outcomes | RunMode::All)
    }
}

/// Output format for the narrative report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Image format for charts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ChartFormat {
    /// PNG bitmap (default)
    #[default]
    Png,
    /// SVG vector image
    Svg,
}

impl ChartFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ChartFormat::Png => "png",
            ChartFormat::Svg => "svg",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(top_n) = self.top_n {
            if top_n == 0 {
                return Err("Top-N must be at least 1".to_string());
            }
        }

        if let Some(ref dir) = self.output_dir {
            if dir.exists() && !dir.is_dir() {
                return Err(format!(
                    "Output path is not a directory: {}",
                    dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            input: None,
            output_dir: None,
            config: None,
            mode: RunMode::All,
            format: OutputFormat::Markdown,
            top_n: None,
            no_charts: false,
            chart_format: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_defaults() {
        let args = Args::try_parse_from(["capgeo"]).unwrap();
        assert_eq!(args.mode, RunMode::All);
        assert_eq!(args.format, OutputFormat::Markdown);
        assert!(args.output_dir.is_none());
        assert!(!args.no_charts);
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "capgeo",
            "--input",
            "cohort.csv",
            "--mode",
            "survey",
            "--chart-format",
            "svg",
            "--top-n",
            "5",
        ])
        .unwrap();
        assert_eq!(args.input, Some(PathBuf::from("cohort.csv")));
        assert_eq!(args.mode, RunMode::Survey);
        assert_eq!(args.chart_format, Some(ChartFormat::Svg));
        assert_eq!(args.top_n, Some(5));
    }

    #[test]
    fn test_run_mode_selection() {
        assert!(RunMode::All.runs_survey());
        assert!(RunMode::All.runs_outcomes());
        assert!(!RunMode::Survey.runs_outcomes());
        assert!(!RunMode::Outcomes.runs_survey());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_top_n() {
        let mut args = make_args();
        args.top_n = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
