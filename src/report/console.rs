//! Console text for both workflows.

use crate::analysis::{percent, FrequencyTable, GroupProfile, LevelAssessment};
use crate::error::{Availability, Unavailable};
use crate::models::{format_percent, AnalysisReport, OutcomesReport, SurveyReport};
use std::fmt::Write;
use std::path::PathBuf;

const RULE_WIDTH: usize = 80;
const SUBRULE_WIDTH: usize = 50;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

fn subrule() -> String {
    "-".repeat(SUBRULE_WIDTH)
}

fn skipped(reason: &Unavailable) -> String {
    format!("  skipped: {}\n", reason)
}

/// Render the survey report.
pub fn render_survey(report: &SurveyReport) -> String {
    let mut out = String::new();

    out.push_str("Column indices found:\n");
    for column in &report.columns {
        match column.index {
            Some(index) => out.push_str(&format!("  {}: {}\n", column.field, index)),
            None => out.push_str(&format!("  {}: not found\n", column.field)),
        }
    }
    out.push('\n');
    out.push_str(&format!("Loaded {} patient records\n", report.records_loaded));
    if report.short_rows > 0 {
        out.push_str(&format!("Dropped {} short rows\n", report.short_rows));
    }

    out.push_str(&format!("\n{}\n", rule()));
    out.push_str(&variables_section(report));
    out.push_str(&format!("\n{}\n", rule()));
    out.push_str(&outcomes_section(report));
    out.push_str(&format!("\n{}\n", rule()));
    out.push_str(&assessment_section(report));
    out.push_str(&format!("\n{}\n", rule()));
    out.push_str(&recommendations_section(report));
    out.push_str(&format!("\n{}\n", rule()));
    out.push_str("Analysis complete!\n");

    out
}

fn variables_section(report: &SurveyReport) -> String {
    let mut out = format!("1. GEOGRAPHIC VARIABLES AVAILABLE:\n{}\n", subrule());
    let loaded = report.records_loaded;
    let share = |count: usize| format_percent(percent(count, loaded));

    // Hospitals: every group, largest first
    out.push_str(&frequency_header(&report.hospital_field, &report.hospitals));
    if let Ok(table) = &report.hospitals {
        for (hospital, count) in table.by_count() {
            out.push_str(&format!("  - {}: {} patients ({})\n", hospital, count, share(count)));
        }
    }
    out.push('\n');

    for (field, table, noun) in [
        (&report.district_field, &report.districts, "districts"),
        (&report.village_field, &report.villages, "villages/subcounties"),
    ] {
        out.push_str(&frequency_header(field, table));
        if let Ok(table) = table {
            out.push_str(&format!("  Total unique {}: {}\n", noun, table.len()));
            out.push_str(&format!("  Top {} {}:\n", report.top_n, noun));
            for (value, count) in table.top(report.top_n) {
                out.push_str(&format!("    - {}: {} patients ({})\n", value, count, share(count)));
            }
        }
        out.push('\n');
    }

    match &report.regions {
        Ok(table) => {
            out.push_str(&format!(
                "+ region (central vs other): {} records\n",
                table.total()
            ));
            for (value, count) in table.first_seen() {
                out.push_str(&format!(
                    "  - {}: {} patients ({})\n",
                    report.region_name(value),
                    count,
                    share(count)
                ));
            }
        }
        Err(reason) => {
            out.push_str("+ region (central vs other)\n");
            out.push_str(&skipped(reason));
        }
    }

    out
}

fn frequency_header(field: &str, table: &Availability<FrequencyTable>) -> String {
    match table {
        Ok(table) => format!("+ {}: {} records\n", field, table.total()),
        Err(reason) => format!("+ {}\n{}", field, skipped(reason)),
    }
}

fn outcomes_section(report: &SurveyReport) -> String {
    let mut out = format!("2. GEOGRAPHIC DISTRIBUTION OF KEY OUTCOMES:\n{}\n", subrule());

    for section in &report.outcomes {
        out.push_str(&format!("\n{}:\n", section.title));
        match &section.table {
            Ok(_) => {
                let rows = section.rows();
                if rows.is_empty() {
                    out.push_str("  no data\n");
                }
                for group in rows {
                    out.push_str(&format!("  {}: {}\n", group.key, group.display()));
                }
            }
            Err(reason) => out.push_str(&skipped(reason)),
        }
    }

    out
}

struct LevelLabels {
    heading: &'static str,
    plural: &'static str,
    counted: &'static str,
    sample: &'static str,
    detailed: bool,
}

fn assessment_section(report: &SurveyReport) -> String {
    let mut out = format!(
        "3. SAMPLE SIZE ASSESSMENT FOR GEOSPATIAL ANALYSIS:\n{}\n",
        subrule()
    );

    let levels = [
        (
            &report.hospital_level,
            LevelLabels {
                heading: "HOSPITAL LEVEL",
                plural: "hospitals",
                counted: "Hospitals",
                sample: "hospital",
                detailed: false,
            },
        ),
        (
            &report.district_level,
            LevelLabels {
                heading: "DISTRICT LEVEL",
                plural: "districts",
                counted: "Districts",
                sample: "district",
                detailed: true,
            },
        ),
        (
            &report.village_level,
            LevelLabels {
                heading: "VILLAGE/SUBCOUNTY LEVEL",
                plural: "villages/subcounties",
                counted: "Areas",
                sample: "area",
                detailed: true,
            },
        ),
    ];

    for (level, labels) in levels {
        out.push_str(&format!("\n{}:\n", labels.heading));
        match level {
            Ok(assessment) => out.push_str(&level_lines(assessment, &labels)),
            Err(reason) => out.push_str(&skipped(reason)),
        }
    }

    out
}

fn level_lines(assessment: &LevelAssessment, labels: &LevelLabels) -> String {
    let min = assessment.thresholds.min_sample;
    let good = assessment.thresholds.good_sample;

    let mut out = format!("  Total {}: {}\n", labels.plural, assessment.groups);
    if !assessment.has_data() {
        out.push_str("  no data\n");
        return out;
    }

    out.push_str(&format!(
        "  {} with >={} patients: {}\n",
        labels.counted,
        min,
        assessment.at_least_min()
    ));
    out.push_str(&format!(
        "  {} with >={} patients: {}\n",
        labels.counted,
        good,
        assessment.at_least_good()
    ));

    if labels.detailed {
        out.push_str(&format!(
            "  {} with <{} patients: {}\n",
            labels.counted,
            min,
            assessment.below_min()
        ));
        if let Some(range) = assessment.size_range {
            out.push_str(&format!("  Largest {} sample: {}\n", labels.sample, range.largest));
            out.push_str(&format!("  Smallest {} sample: {}\n", labels.sample, range.smallest));
        }
    }

    out
}

fn recommendations_section(report: &SurveyReport) -> String {
    let summary = &report.recommendations;
    let mut out = format!(
        "4. GEOSPATIAL ANALYSIS POTENTIAL & RECOMMENDATIONS:\n{}\n",
        subrule()
    );

    out.push_str("\nRECOMMENDATIONS:\n");
    for (i, recommendation) in summary.recommendations.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, recommendation));
    }

    out.push_str("\nOVERALL GEOSPATIAL ANALYSIS POTENTIAL:\n");
    out.push_str(&format!(
        "{} - {}\n",
        summary.potential,
        summary.potential.description()
    ));
    out.push_str(&format!("\nPositive indicators: {}\n", summary.positive));
    out.push_str(&format!("Warning indicators: {}\n", summary.warnings));

    out
}

/// Render the outcome comparison summary.
pub fn render_outcomes(report: &OutcomesReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Geographic analysis data: {} participants\n",
        report.participants
    ));

    out.push_str("\n=== HOSPITAL CATCHMENT AREA ANALYSIS ===\n");
    out.push_str(&profile_block("Hospital analysis:", "hospital_clean", &report.hospitals));

    out.push_str("\nHospital comparison tests:\n");
    for (label, test) in [
        ("Mortality differences", &report.mortality_test),
        ("HIV prevalence differences", &report.hiv_test),
    ] {
        match test {
            Ok(result) => out.push_str(&format!("{} p-value: {:.4}\n", label, result.p_value)),
            Err(reason) => out.push_str(&format!("{} test skipped: {}\n", label, reason)),
        }
    }

    out.push_str("\n=== DISTRICT-LEVEL ANALYSIS ===\n");
    out.push_str(&profile_block(
        &format!(
            "District analysis (>={} patients):",
            report.district_report_min
        ),
        "district_clean",
        &report.districts,
    ));

    out.push('\n');
    out.push_str(&profile_block(
        "Urban vs Rural comparison:",
        "urban_rural",
        &report.urban_rural,
    ));

    out
}

fn profile_block(heading: &str, index: &str, profiles: &Availability<Vec<GroupProfile>>) -> String {
    let mut out = format!("{}\n", heading);
    match profiles {
        Ok(profiles) if profiles.is_empty() => out.push_str("  no data\n"),
        Ok(profiles) => out.push_str(&profile_table(index, profiles)),
        Err(reason) => out.push_str(&skipped(reason)),
    }
    out
}

/// Fixed-width text table of group profiles.
pub fn profile_table(index: &str, profiles: &[GroupProfile]) -> String {
    let width = profiles
        .iter()
        .map(|p| p.key.len())
        .chain(std::iter::once(index.len()))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<width$}  {:>10}  {:>15}  {:>14}  {:>12}  {:>14}  {:>10}",
        index,
        "n_patients",
        "mortality_30day",
        "mortality_rate",
        "hiv_positive",
        "hiv_prevalence",
        "median_age",
    );
    for p in profiles {
        let _ = writeln!(
            out,
            "{:<width$}  {:>10}  {:>15}  {:>14}  {:>12}  {:>14}  {:>10}",
            p.key,
            p.n_patients,
            p.mortality.events,
            optional(p.mortality.percent()),
            p.hiv.events,
            optional(p.hiv.percent()),
            optional(p.median_age),
        );
    }
    out
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "NaN".to_string())
}

/// Closing block listing what the run wrote.
pub fn render_final_summary(report: &AnalysisReport, written: &[PathBuf]) -> String {
    let mut out = format!("\n{}\n", rule());
    out.push_str("GEOSPATIAL ANALYSIS SUMMARY:\n");

    if let Some(survey) = &report.survey {
        out.push_str(&format!(
            "+ Survey: {} records, potential {}\n",
            survey.records_loaded, survey.recommendations.potential
        ));
    }
    if let Some(outcomes) = &report.outcomes {
        out.push_str(&format!(
            "+ Outcomes: {} participants with 30-day status\n",
            outcomes.participants
        ));
        for figure in &outcomes.figures {
            out.push_str(&format!("  - {}: {}\n", figure.figure, figure.key_finding));
        }
    }
    if !report.metadata.missing_columns.is_empty() {
        out.push_str(&format!(
            "! Missing columns: {}\n",
            report.metadata.missing_columns.join(", ")
        ));
    }

    if written.is_empty() {
        out.push_str("No output files written\n");
    } else {
        out.push_str(&format!("Outputs written ({}):\n", written.len()));
        for path in written {
            out.push_str(&format!("  {}\n", path.display()));
        }
    }
    out.push_str(&format!(
        "Duration: {:.1}s\n",
        report.metadata.duration_seconds
    ));

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dataset::read_dataset;
    use crate::study::{run_outcomes, run_survey};

    const CSV: &str = "patient_id,hospital,residencedistrict,residencevillagesubcounty,region_central,died_hospital,died_30day,hiv_positive,age_continuous\n\
        1,Mulago,Kampala,Kawempe,1,1,1,1,34\n\
        2,Mulago,Kampala,Kawempe,1,0,0,0,51\n\
        3,Naguru,Wakiso,Nansana,1,0,1,1,45\n\
        4,Kirrudu,Gulu,Layibi,0,0,0,NA,29\n";

    fn survey(csv: &str) -> SurveyReport {
        let config = Config::default();
        let dataset = read_dataset(csv.as_bytes(), &config.columns.all_fields(), "NA").unwrap();
        run_survey(&dataset, &config)
    }

    #[test]
    fn test_survey_sections_in_order() {
        let text = render_survey(&survey(CSV));

        let positions: Vec<usize> = [
            "Column indices found:",
            "1. GEOGRAPHIC VARIABLES AVAILABLE:",
            "2. GEOGRAPHIC DISTRIBUTION OF KEY OUTCOMES:",
            "3. SAMPLE SIZE ASSESSMENT FOR GEOSPATIAL ANALYSIS:",
            "4. GEOSPATIAL ANALYSIS POTENTIAL & RECOMMENDATIONS:",
        ]
        .iter()
        .map(|heading| text.find(heading).unwrap())
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        assert!(text.contains("  hospital: 1\n"));
        assert!(text.contains("Loaded 4 patient records"));
        assert!(text.contains("  - Mulago: 2 patients (50.0%)"));
        assert!(text.contains("  - Central: 3 patients (75.0%)"));
        assert!(text.contains("  - Other regions: 1 patients (25.0%)"));
        assert!(text.contains("  Mulago: 1/2 (50.0%)"));
        assert!(text.contains("  Largest district sample: 2"));
    }

    #[test]
    fn test_missing_column_prints_diagnostic() {
        let csv = "hospital,died_hospital\nMulago,1\n";
        let text = render_survey(&survey(csv));

        assert!(text.contains("  hiv_positive: not found"));
        assert!(text.contains("skipped: column 'hiv_positive' not found"));
        assert!(text.contains("  Mulago: 1/1 (100.0%)"));
    }

    #[test]
    fn test_header_only_prints_no_data() {
        let header = CSV.lines().next().unwrap().to_string() + "\n";
        let text = render_survey(&survey(&header));

        assert!(text.contains("Loaded 0 patient records"));
        assert!(text.contains("  Total hospitals: 0\n  no data"));
        assert!(text.contains("Warning indicators:"));
    }

    #[test]
    fn test_outcomes_summary() {
        let config = Config::default();
        let dataset = read_dataset(CSV.as_bytes(), &config.columns.all_fields(), "NA").unwrap();
        let text = render_outcomes(&run_outcomes(&dataset, &config));

        assert!(text.contains("Geographic analysis data: 4 participants"));
        assert!(text.contains("=== HOSPITAL CATCHMENT AREA ANALYSIS ==="));
        assert!(text.contains("Mortality differences p-value:"));
        // No district reaches 20 patients
        assert!(text.contains("District analysis (>=20 patients):\n  no data"));
    }

    #[test]
    fn test_profile_table_alignment() {
        let profiles = vec![GroupProfile {
            key: "Mulago".to_string(),
            n_patients: 2,
            mortality: crate::analysis::profile::RateCell { events: 1, total: 2 },
            hiv: crate::analysis::profile::RateCell { events: 0, total: 0 },
            median_age: Some(42.5),
        }];
        let table = profile_table("hospital_clean", &profiles);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), lines[1].len());
        assert!(lines[1].contains("50.0"));
        assert!(lines[1].contains("NaN"));
        assert!(lines[1].ends_with("42.5"));
    }
}
