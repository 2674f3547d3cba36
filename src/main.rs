//! capgeo - grouped outcome statistics for a pneumonia cohort
//!
//! A CLI tool that summarises a cohort CSV by hospital, district, village
//! and region, assesses sample adequacy, compares outcomes between
//! hospitals and writes tables, charts and a narrative report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Missing input, configuration or runtime error

mod analysis;
mod cli;
mod config;
mod dataset;
mod error;
mod models;
mod report;
mod study;

use anyhow::{Context, Result};
use chrono::Local;
use cli::Args;
use config::{Config, CONFIG_FILE_NAME};
use error::AnalysisError;
use models::{AnalysisReport, ReportMetadata};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("capgeo v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_analysis(&args) {
        Ok(()) => Ok(()),
        Err(e) => {
            if is_missing_input(&e) {
                debug!("Input missing");
            } else {
                error!("Analysis failed: {:#}", e);
            }
            eprintln!("{}", failure_message(&e));
            std::process::exit(1);
        }
    }
}

fn is_missing_input(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<AnalysisError>(),
        Some(AnalysisError::FileNotFound { .. })
    )
}

/// The single stderr line printed for a failed run.
fn failure_message(e: &anyhow::Error) -> String {
    match e.downcast_ref::<AnalysisError>() {
        Some(AnalysisError::FileNotFound { path }) => format!("Error: {} not found", path.display()),
        _ => format!("Error: {:#}", e),
    }
}

/// Handle --init-config: generate a default .capgeo.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize columns, thresholds, geography and output.");
    Ok(())
}

/// Initialize logging based on verbosity settings. `RUST_LOG` overrides the
/// level chosen by the flags.
fn init_logging(args: &Args) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(args.log_level()).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the selected workflows and write every output.
fn run_analysis(args: &Args) -> Result<()> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(args)?;
    config.merge_with_args(args);
    config.validate()?;

    // Load the cohort
    let fields = config.columns.all_fields();
    let dataset = dataset::load_dataset(
        &config.dataset.input,
        &fields,
        &config.dataset.missing_sentinel,
    )?;
    info!(
        "Dataset loaded: {} records ({} short rows dropped)",
        dataset.len(),
        dataset.short_rows()
    );

    let survey = if args.mode.runs_survey() {
        let survey = study::run_survey(&dataset, &config);
        if !args.quiet {
            print!("{}", report::render_survey(&survey));
        }
        Some(survey)
    } else {
        None
    };

    let outcomes = if args.mode.runs_outcomes() {
        let outcomes = study::run_outcomes(&dataset, &config);
        if !args.quiet {
            println!();
            print!("{}", report::render_outcomes(&outcomes));
        }
        Some(outcomes)
    } else {
        None
    };

    let mut report = AnalysisReport {
        metadata: ReportMetadata {
            input: config.dataset.input.display().to_string(),
            analysis_date: Local::now(),
            records_loaded: dataset.len(),
            missing_columns: dataset
                .missing_columns()
                .into_iter()
                .map(String::from)
                .collect(),
            duration_seconds: 0.0,
        },
        survey,
        outcomes,
    };
    report.metadata.duration_seconds = start_time.elapsed().as_secs_f64();

    let written = report::write_outputs(&report, &config, args.format, !args.quiet)?;

    print!("{}", report::render_final_summary(&report, &written));

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cli::{OutputFormat, RunMode};

    const FIXTURE: &str = include_str!("../fixtures/cohort_sample.csv");

    fn args_for(input: &Path, output: &Path, format: OutputFormat) -> Args {
        Args {
            input: Some(input.to_path_buf()),
            output_dir: Some(output.to_path_buf()),
            config: Some(input.with_file_name("capgeo.toml")),
            mode: RunMode::All,
            format,
            top_n: None,
            no_charts: true,
            chart_format: None,
            verbose: false,
            quiet: true,
            init_config: false,
        }
    }

    fn workspace() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cohort.csv"), FIXTURE).unwrap();
        std::fs::write(dir.path().join("capgeo.toml"), Config::default_toml()).unwrap();
        dir
    }

    #[test]
    fn test_end_to_end_markdown() {
        let dir = workspace();
        let output = dir.path().join("Results");
        let args = args_for(&dir.path().join("cohort.csv"), &output, OutputFormat::Markdown);

        run_analysis(&args).unwrap();

        for table in [
            "Hospital_Geographic_Analysis.csv",
            "District_Geographic_Analysis.csv",
            "Urban_Rural_Analysis.csv",
            "Geospatial_Analysis_Summary.csv",
        ] {
            assert!(output.join("Tables").join(table).is_file(), "{}", table);
        }
        assert!(output.join("Figures").is_dir());

        let markdown =
            std::fs::read_to_string(output.join("Results_summary/Geospatial_Analysis_Results.md"))
                .unwrap();
        assert!(markdown.contains("## Geographic Coverage"));
        assert!(markdown.contains("## Sample Size Assessment"));

        let hospitals =
            std::fs::read_to_string(output.join("Tables/Hospital_Geographic_Analysis.csv")).unwrap();
        let header = hospitals.lines().next().unwrap();
        assert_eq!(
            header,
            "hospital_clean,n_patients,mortality_30day,mortality_rate,hiv_positive,hiv_prevalence,median_age"
        );
        assert_eq!(hospitals.lines().count(), 4);
    }

    #[test]
    fn test_end_to_end_json() {
        let dir = workspace();
        let output = dir.path().join("out");
        let args = args_for(&dir.path().join("cohort.csv"), &output, OutputFormat::Json);

        run_analysis(&args).unwrap();

        let json =
            std::fs::read_to_string(output.join("Results_summary/Geospatial_Analysis_Results.json"))
                .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["outcomes"]["participants"].as_u64().unwrap() > 0);
        assert!(value["survey"]["recommendations"]["potential"].is_string());
    }

    #[test]
    fn test_missing_input_is_file_not_found() {
        let dir = workspace();
        let args = args_for(
            &dir.path().join("absent.csv"),
            &dir.path().join("Results"),
            OutputFormat::Markdown,
        );

        let err = run_analysis(&args).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AnalysisError>(),
            Some(AnalysisError::FileNotFound { .. })
        ));
        assert!(is_missing_input(&err));

        let message = failure_message(&err);
        assert_eq!(
            message,
            format!("Error: {} not found", dir.path().join("absent.csv").display())
        );
        assert_eq!(message.lines().count(), 1);
    }
}
