//! Markdown and JSON report generation.
//!
//! This module turns an [`AnalysisReport`] into the narrative summary
//! written under `Results_summary/`.

use crate::analysis::{ChiSquareResult, GroupProfile};
use crate::error::Availability;
use crate::models::{format_percent, AnalysisReport, OutcomesReport, ReportMetadata, SurveyReport};
use anyhow::Result;
use std::io::Write;
use std::path::Path;

/// Generate the complete Markdown narrative.
pub fn generate_markdown_report(report: &AnalysisReport) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# LoRTISA Geospatial Analysis Results Summary\n\n");

    output.push_str(&generate_metadata_section(&report.metadata, report.outcomes.as_ref()));

    if let Some(survey) = &report.survey {
        output.push_str(&generate_survey_section(survey));
    }

    if let Some(outcomes) = &report.outcomes {
        output.push_str(&generate_coverage_section(outcomes));
        output.push_str(&generate_findings_section(outcomes));
        output.push_str(&generate_figures_section(outcomes));
        output.push_str(&generate_implications_section(outcomes));
        output.push_str(&generate_methods_section());
    }

    // Footer
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata block.
fn generate_metadata_section(metadata: &ReportMetadata, outcomes: Option<&OutcomesReport>) -> String {
    let mut section = String::new();

    section.push_str(&format!(
        "**Analysis Date:** {}  \n",
        metadata.analysis_date.format("%Y-%m-%d")
    ));
    section.push_str("**Dataset:** LoRTISA Community-Acquired Pneumonia Study, Uganda  \n");
    section.push_str(&format!("**Input File:** `{}`  \n", metadata.input));
    match outcomes {
        Some(outcomes) => section.push_str(&format!(
            "**Sample Size:** {} participants with geographic data  \n",
            outcomes.participants
        )),
        None => section.push_str(&format!(
            "**Records Loaded:** {}  \n",
            metadata.records_loaded
        )),
    }
    if !metadata.missing_columns.is_empty() {
        section.push_str(&format!(
            "**Missing Columns:** {}  \n",
            metadata.missing_columns.join(", ")
        ));
    }
    section.push('\n');

    section
}

/// Generate the sample-size survey section.
fn generate_survey_section(survey: &SurveyReport) -> String {
    let mut section = String::new();

    section.push_str("## Sample Size Assessment\n\n");
    section.push_str(&format!(
        "Thresholds: adequate at >={} patients, strong at >={} patients.\n\n",
        survey.thresholds.min_sample, survey.thresholds.good_sample
    ));

    section.push_str("| Level | Groups | Adequate | Strong | Below minimum | Largest | Smallest |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|:---:|:---:|\n");
    for (name, level) in [
        ("Hospital", &survey.hospital_level),
        ("District", &survey.district_level),
        ("Village/Subcounty", &survey.village_level),
    ] {
        match level {
            Ok(assessment) => {
                let (largest, smallest) = match assessment.size_range {
                    Some(range) => (range.largest.to_string(), range.smallest.to_string()),
                    None => ("no data".to_string(), "no data".to_string()),
                };
                section.push_str(&format!(
                    "| {} | {} | {} | {} | {} | {} | {} |\n",
                    name,
                    assessment.groups,
                    assessment.at_least_min(),
                    assessment.at_least_good(),
                    assessment.below_min(),
                    largest,
                    smallest
                ));
            }
            Err(reason) => {
                section.push_str(&format!("| {} | skipped: {} | | | | | |\n", name, reason));
            }
        }
    }
    section.push('\n');

    let summary = &survey.recommendations;
    section.push_str("### Recommendations\n\n");
    for (i, recommendation) in summary.recommendations.iter().enumerate() {
        section.push_str(&format!("{}. {}\n", i + 1, recommendation));
    }
    section.push_str(&format!(
        "\n**Overall Potential:** {} - {}  \n",
        summary.potential,
        summary.potential.description()
    ));
    section.push_str(&format!(
        "**Indicators:** {} positive, {} warnings\n\n",
        summary.positive, summary.warnings
    ));

    section
}

/// Generate the geographic coverage section.
fn generate_coverage_section(outcomes: &OutcomesReport) -> String {
    let mut section = String::new();

    section.push_str("## Geographic Coverage\n\n");
    section.push_str("### Study Hospitals\n");
    match &outcomes.hospitals {
        Ok(hospitals) => {
            let total = outcomes.hospital_patients();
            for hospital in hospitals {
                let share = crate::analysis::percent(hospital.n_patients, total);
                section.push_str(&format!(
                    "- **{}:** {} patients ({})\n",
                    hospital.key,
                    hospital.n_patients,
                    format_percent(share)
                ));
            }
        }
        Err(reason) => section.push_str(&format!("- Skipped: {}\n", reason)),
    }
    section.push('\n');

    section.push_str("### Geographic Distribution\n");
    match &outcomes.districts_represented {
        Ok(count) => section.push_str(&format!(
            "- **Districts Represented:** {} districts\n",
            count
        )),
        Err(reason) => section.push_str(&format!("- **Districts Represented:** skipped: {}\n", reason)),
    }
    section.push_str(&format!(
        "- **Regional Coverage:** {} Central Region\n",
        format_percent(outcomes.central_share)
    ));
    let class_count = |label: &str| {
        outcomes
            .urban_rural_profile(label)
            .map(|p| p.n_patients)
            .unwrap_or(0)
    };
    section.push_str(&format!(
        "- **Urban vs Rural:** {} urban, {} rural/peri-urban patients\n\n",
        class_count(&outcomes.urban_label),
        class_count(&outcomes.rural_label)
    ));

    section
}

fn profile_lines(profiles: &Availability<Vec<GroupProfile>>, with_counts: bool, empty: &str) -> String {
    match profiles {
        Ok(profiles) if profiles.is_empty() => format!("- {}\n", empty),
        Ok(profiles) => profiles
            .iter()
            .map(|p| {
                let counts = if with_counts {
                    format!("{} patients, ", p.n_patients)
                } else {
                    String::new()
                };
                format!(
                    "- **{}:** {}{} mortality, {} HIV prevalence\n",
                    p.key,
                    counts,
                    format_percent(p.mortality.percent()),
                    format_percent(p.hiv.percent())
                )
            })
            .collect(),
        Err(reason) => format!("- Skipped: {}\n", reason),
    }
}

fn test_line(label: &str, test: &Availability<ChiSquareResult>) -> String {
    match test {
        Ok(result) => format!(
            "- {}: p = {:.4} (Chi-square, df = {}{})\n",
            label,
            result.p_value,
            result.degrees_of_freedom,
            if result.yates_corrected {
                ", Yates-corrected"
            } else {
                ""
            }
        ),
        Err(reason) => format!("- {}: not tested ({})\n", label, reason),
    }
}

/// Generate the key findings section.
fn generate_findings_section(outcomes: &OutcomesReport) -> String {
    let mut section = String::new();

    section.push_str("## Key Geographic Findings\n\n");

    section.push_str("### Hospital-Level Variation\n");
    section.push_str(&profile_lines(&outcomes.hospitals, false, "No hospital data"));
    section.push_str("\n**Statistical Tests:**\n");
    section.push_str(&test_line("Hospital mortality differences", &outcomes.mortality_test));
    section.push_str(&test_line("Hospital HIV prevalence differences", &outcomes.hiv_test));
    section.push('\n');

    section.push_str("### District-Level Patterns\n");
    section.push_str(&profile_lines(
        &outcomes.districts,
        true,
        "Limited district-level analysis due to sample size constraints",
    ));
    section.push('\n');

    section.push_str("### Urban vs Rural Comparison\n");
    section.push_str(&profile_lines(&outcomes.urban_rural, true, "No urban/rural data"));
    section.push('\n');

    section
}

/// Generate the figures section.
fn generate_figures_section(outcomes: &OutcomesReport) -> String {
    let mut section = String::new();

    section.push_str("## Figures Generated\n\n");
    for figure in &outcomes.figures {
        section.push_str(&format!("### {}\n", figure.title));
        section.push_str(&format!("- **File:** {}\n", figure.filename));
        section.push_str(&format!("- **Key Finding:** {}\n\n", figure.key_finding));
    }

    section
}

/// Generate the implications section. Wording follows the HIV test result.
fn generate_implications_section(outcomes: &OutcomesReport) -> String {
    let mut section = String::new();

    let significant = outcomes
        .hiv_test
        .as_ref()
        .map(|r| r.is_significant(outcomes.significance))
        .unwrap_or(false);
    let (verdict, reading) = if significant {
        ("Significant", "opportunities for quality improvement")
    } else {
        ("Non-significant", "consistent care quality")
    };

    section.push_str("## Clinical and Policy Implications\n\n");
    section.push_str("### Hospital-Level Insights\n");
    section.push_str(&format!(
        "1. **Quality Variation:** {} differences between hospitals suggest {}\n",
        verdict, reading
    ));
    section.push_str("2. **HIV Care Integration:** Hospitals with higher HIV prevalence may need enhanced co-management protocols\n");
    section.push_str("3. **Resource Allocation:** Geographic variation supports targeted resource deployment\n\n");

    section.push_str("### Population Health Implications\n");
    section.push_str("1. **Health Disparities:** Urban-rural differences indicate potential access or care quality issues\n");
    section.push_str("2. **Prevention Programs:** Geographic targeting of pneumonia prevention efforts needed\n");
    section.push_str("3. **Health System Planning:** District-level capacity building priorities identified\n\n");

    section
}

/// Generate strengths, limitations and future directions.
fn generate_methods_section() -> String {
    let mut section = String::new();

    section.push_str("## Methodological Strengths\n");
    section.push_str("- **Multi-level Analysis:** Hospital, district, and urban-rural perspectives\n");
    section.push_str("- **Adequate Sample Sizes:** Sufficient power for hospital-level comparisons\n");
    section.push_str("- **Statistical Rigor:** Appropriate tests for sample sizes\n");
    section.push_str("- **Clinical Integration:** Links geographic patterns to clinical outcomes\n\n");

    section.push_str("## Limitations\n");
    section.push_str("- **Urban Bias:** Heavy concentration in Central region limits rural representation\n");
    section.push_str("- **District Sample Sizes:** Many districts have insufficient patients for detailed analysis\n");
    section.push_str("- **No Spatial Coordinates:** Cannot perform precise geographic modeling\n");
    section.push_str("- **Temporal Clustering:** Geographic patterns may reflect enrollment timing\n\n");

    section.push_str("## Future Research Directions\n");
    section.push_str("1. **Expand Rural Representation:** Include more rural hospitals and districts\n");
    section.push_str("2. **Spatial Analysis:** Collect GPS coordinates for advanced spatial modeling\n");
    section.push_str("3. **Health System Mapping:** Link to healthcare infrastructure and access data\n");
    section.push_str("4. **Longitudinal Patterns:** Examine seasonal and temporal geographic variations\n\n");

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n");
    footer.push_str(&format!(
        "*Generated by capgeo v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &AnalysisReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered report content to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}
