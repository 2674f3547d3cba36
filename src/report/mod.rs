//! Report rendering.
//!
//! Console text, CSV tables, chart images and the Markdown or JSON
//! narrative. Everything here only formats what the workflows computed.

pub mod charts;
pub mod console;
pub mod generator;
pub mod tables;

pub use console::{render_final_summary, render_outcomes, render_survey};
pub use generator::{generate_json_report, generate_markdown_report, write_report};

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::models::AnalysisReport;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

const SUMMARY_STEM: &str = "Geospatial_Analysis_Results";

/// Directory layout under the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub root: PathBuf,
    pub figures: PathBuf,
    pub tables: PathBuf,
    pub summary: PathBuf,
}

impl OutputLayout {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            figures: root.join("Figures"),
            tables: root.join("Tables"),
            summary: root.join("Results_summary"),
        }
    }

    /// Create every directory that does not exist yet.
    pub fn create(&self) -> Result<()> {
        for dir in [&self.figures, &self.tables, &self.summary] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }
        Ok(())
    }

    /// Path of the narrative summary for the chosen format.
    pub fn summary_file(&self, format: OutputFormat) -> PathBuf {
        let extension = match format {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
        };
        self.summary.join(format!("{}.{}", SUMMARY_STEM, extension))
    }
}

/// Write tables, figures and the narrative. Returns the files written.
pub fn write_outputs(
    report: &AnalysisReport,
    config: &Config,
    format: OutputFormat,
    show_progress: bool,
) -> Result<Vec<PathBuf>> {
    let layout = OutputLayout::new(&config.report.output_dir);
    layout.create()?;

    let mut written = Vec::new();

    if let Some(outcomes) = &report.outcomes {
        written.extend(tables::write_outcome_tables(outcomes, &layout.tables)?);

        if config.report.charts {
            let figures = charts::outcome_figures(outcomes, &config.geography.hospital_colors);
            let options = charts::RenderOptions {
                format: config.report.chart_format,
                dpi: config.report.chart_dpi,
                show_progress,
            };
            written.extend(charts::render_figures(&figures, &layout.figures, options));
        } else {
            info!("Chart rendering disabled");
        }
    }

    let content = match format {
        OutputFormat::Json => generate_json_report(report)?,
        OutputFormat::Markdown => generate_markdown_report(report),
    };
    let path = layout.summary_file(format);
    write_report(&content, &path)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    info!("Saved {}", path.display());
    written.push(path);

    Ok(written)
}
