//! CSV tables written by the outcome comparison.

use crate::analysis::GroupProfile;
use crate::models::{FigureSummary, OutcomesReport};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const HOSPITAL_TABLE: &str = "Hospital_Geographic_Analysis.csv";
pub const DISTRICT_TABLE: &str = "District_Geographic_Analysis.csv";
pub const URBAN_RURAL_TABLE: &str = "Urban_Rural_Analysis.csv";
pub const SUMMARY_TABLE: &str = "Geospatial_Analysis_Summary.csv";

const PROFILE_COLUMNS: [&str; 6] = [
    "n_patients",
    "mortality_30day",
    "mortality_rate",
    "hiv_positive",
    "hiv_prevalence",
    "median_age",
];

fn decimal(value: Option<f64>) -> String {
    value.map(|v| format!("{:.1}", v)).unwrap_or_default()
}

/// Write profiles as CSV, the group key in the first column.
pub fn write_profiles<W: Write>(writer: W, index: &str, profiles: &[GroupProfile]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    let mut header = vec![index];
    header.extend(PROFILE_COLUMNS);
    csv.write_record(&header)?;

    for p in profiles {
        csv.write_record([
            p.key.clone(),
            p.n_patients.to_string(),
            p.mortality.events.to_string(),
            decimal(p.mortality.percent()),
            p.hiv.events.to_string(),
            decimal(p.hiv.percent()),
            decimal(p.median_age),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

/// Write the figure summary table.
pub fn write_summary<W: Write>(writer: W, figures: &[FigureSummary]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["Figure", "Title", "Filename", "Key_Finding", "Geographic_Level"])?;
    for figure in figures {
        csv.write_record([
            &figure.figure,
            &figure.title,
            &figure.filename,
            &figure.key_finding,
            &figure.geographic_level,
        ])?;
    }
    csv.flush()?;
    Ok(())
}

fn write_profile_file(path: &Path, index: &str, profiles: &[GroupProfile]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_profiles(file, index, profiles)
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Write every outcome table into `dir`. Returns the files written.
///
/// The district table is only written when at least one district meets the
/// reporting minimum. Unavailable sections are logged and skipped.
pub fn write_outcome_tables(report: &OutcomesReport, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    let sections = [
        (HOSPITAL_TABLE, "hospital_clean", &report.hospitals, true),
        (DISTRICT_TABLE, "district_clean", &report.districts, false),
        (URBAN_RURAL_TABLE, "urban_rural", &report.urban_rural, true),
    ];

    for (filename, index, profiles, write_empty) in sections {
        match profiles {
            Ok(profiles) if profiles.is_empty() && !write_empty => {
                info!("No groups for {}, table not written", filename);
            }
            Ok(profiles) => {
                let path = dir.join(filename);
                write_profile_file(&path, index, profiles)?;
                info!("Saved {}", path.display());
                written.push(path);
            }
            Err(reason) => warn!("{} not written: {}", filename, reason),
        }
    }

    let path = dir.join(SUMMARY_TABLE);
    let file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_summary(file, &report.figures)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Saved {}", path.display());
    written.push(path);

    Ok(written)
}
