//! Geographic outcome comparison workflow.
//!
//! Restricts the cohort to records with a known 30-day outcome, profiles
//! hospitals, districts and the urban/rural classes, runs the chi-square
//! comparisons between hospitals and derives the headline findings.

use crate::analysis::{
    chi_square_test, count_groups, percent, profile_groups, sort_by_patients, GroupProfile, Grouping,
    KeyTransform, ProfileFields,
};
use crate::cli::ChartFormat;
use crate::config::Config;
use crate::dataset::Dataset;
use crate::error::{Availability, Unavailable};
use crate::models::{format_percent, FigureSummary, OutcomesReport};
use tracing::{debug, info, warn};

pub const HOSPITAL_FIGURE: &str = "Figure13_Hospital_Geographic_Analysis";
pub const DISTRICT_FIGURE: &str = "Figure14_District_Geographic_Analysis";
pub const URBAN_RURAL_FIGURE: &str = "Figure15_Urban_Rural_Analysis";

/// Groupings used by the outcomes workflow.
pub struct OutcomeGroupings {
    pub hospital: Grouping,
    pub district: Grouping,
    pub urban_rural: Grouping,
}

impl OutcomeGroupings {
    pub fn from_config(config: &Config) -> Self {
        let columns = &config.columns;
        Self {
            hospital: Grouping::allow_list(
                "hospital_clean",
                &columns.hospital,
                &config.geography.hospitals,
            ),
            district: Grouping::title_case("district_clean", &columns.district),
            urban_rural: Grouping::classified(
                "urban_rural",
                &columns.district,
                config.geography.urban_rural_table(),
            ),
        }
    }
}

/// Run the outcome comparison over a loaded dataset.
pub fn run_outcomes(dataset: &Dataset, config: &Config) -> OutcomesReport {
    let columns = &config.columns;
    let groupings = OutcomeGroupings::from_config(config);
    let fields = ProfileFields {
        patient_id: &columns.patient_id,
        mortality: &columns.died_30day,
        hiv: &columns.hiv_positive,
        age: &columns.age,
    };

    let analysis_set = match dataset
        .with_value_in(&columns.died_30day)
        .and_then(|set| {
            if set.is_empty() {
                Err(Unavailable::EmptyGroup {
                    grouping: columns.died_30day.clone(),
                })
            } else {
                Ok(set)
            }
        }) {
        Ok(set) => set,
        Err(reason) => {
            warn!("Outcome comparison unavailable: {}", reason);
            return unavailable_report(config, reason);
        }
    };
    info!("Geographic analysis data: {} participants", analysis_set.len());
    if let KeyTransform::Classify(table) = &groupings.urban_rural.transform {
        debug!("{} members: {:?}", table.name, table.members());
    }

    let hospitals = profile_groups(&analysis_set, &groupings.hospital, &fields).map(|mut p| {
        sort_by_patients(&mut p);
        p
    });

    let district_report_min = config.thresholds.district_report_min;
    let districts = profile_groups(&analysis_set, &groupings.district, &fields).map(|mut p| {
        p.retain(|profile| profile.n_patients >= district_report_min);
        sort_by_patients(&mut p);
        p
    });
    let districts_represented = count_groups(&analysis_set, &groupings.district).map(|t| t.len());

    let urban_rural = profile_groups(&analysis_set, &groupings.urban_rural, &fields);

    let mortality_test = chi_square_test(&analysis_set, &groupings.hospital, &columns.died_30day);
    let hiv_test = chi_square_test(&analysis_set, &groupings.hospital, &columns.hiv_positive);
    for (name, test) in [("mortality", &mortality_test), ("HIV", &hiv_test)] {
        match test {
            Ok(result) => info!("Hospital {} differences p-value: {:.4}", name, result.p_value),
            Err(reason) => warn!("Hospital {} test skipped: {}", name, reason),
        }
    }

    let central_share = central_share(&analysis_set, config);

    let mut report = OutcomesReport {
        participants: analysis_set.len(),
        hospitals,
        districts,
        districts_represented,
        urban_rural,
        urban_label: config.geography.urban_label.clone(),
        rural_label: config.geography.rural_label.clone(),
        mortality_test,
        hiv_test,
        central_share,
        district_report_min,
        significance: config.thresholds.significance,
        figures: Vec::new(),
    };
    report.figures = figure_summaries(&report, config.report.chart_format);
    report
}

/// Percentage of the analysis set in the Central region.
fn central_share(analysis_set: &Dataset, config: &Config) -> Option<f64> {
    let regions = count_groups(
        analysis_set,
        &Grouping::by_field(&config.columns.region_central),
    )
    .ok()?;
    let central = regions.get(&config.geography.central_value).unwrap_or(0);
    percent(central, analysis_set.len())
}

fn unavailable_report(config: &Config, reason: Unavailable) -> OutcomesReport {
    let mut report = OutcomesReport {
        participants: 0,
        hospitals: Err(reason.clone()),
        districts: Err(reason.clone()),
        districts_represented: Err(reason.clone()),
        urban_rural: Err(reason.clone()),
        urban_label: config.geography.urban_label.clone(),
        rural_label: config.geography.rural_label.clone(),
        mortality_test: Err(reason.clone()),
        hiv_test: Err(reason),
        central_share: None,
        district_report_min: config.thresholds.district_report_min,
        significance: config.thresholds.significance,
        figures: Vec::new(),
    };
    report.figures = figure_summaries(&report, config.report.chart_format);
    report
}

/// Headline findings for the three figures.
pub fn figure_summaries(report: &OutcomesReport, format: ChartFormat) -> Vec<FigureSummary> {
    let filename = |stem: &str| format!("{}.{}", stem, format.extension());

    let hospital_finding = match &report.hiv_test {
        Ok(result) if result.is_significant(report.significance) => format!(
            "Hospital HIV prevalence varies significantly (p={:.3})",
            result.p_value
        ),
        Ok(result) => format!(
            "No significant hospital variation in HIV prevalence (p={:.3})",
            result.p_value
        ),
        Err(reason) => format!("Hospital HIV comparison unavailable: {}", reason),
    };

    let district_finding = match mortality_range(&report.districts) {
        Some((low, high)) => format!(
            "District mortality ranges from {:.1}% to {:.1}%",
            low, high
        ),
        None => "Limited district data".to_string(),
    };

    let urban_rate = report
        .urban_rural_profile(&report.urban_label)
        .and_then(|p| p.mortality.percent());
    let rural_rate = report
        .urban_rural_profile(&report.rural_label)
        .and_then(|p| p.mortality.percent());
    let urban_rural_finding = format!(
        "Urban vs rural mortality: {} vs {}",
        format_percent(urban_rate),
        format_percent(rural_rate)
    );

    vec![
        FigureSummary {
            figure: "Figure13".to_string(),
            title: "Hospital Catchment Area Analysis".to_string(),
            filename: filename(HOSPITAL_FIGURE),
            key_finding: hospital_finding,
            geographic_level: "Hospital".to_string(),
        },
        FigureSummary {
            figure: "Figure14".to_string(),
            title: "District-Level Geographic Analysis".to_string(),
            filename: filename(DISTRICT_FIGURE),
            key_finding: district_finding,
            geographic_level: "District".to_string(),
        },
        FigureSummary {
            figure: "Figure15".to_string(),
            title: "Urban vs Rural Health Patterns".to_string(),
            filename: filename(URBAN_RURAL_FIGURE),
            key_finding: urban_rural_finding,
            geographic_level: "Urban-Rural".to_string(),
        },
    ]
}

/// Lowest and highest mortality rate among the profiles.
fn mortality_range(profiles: &Availability<Vec<GroupProfile>>) -> Option<(f64, f64)> {
    let rates: Vec<f64> = profiles
        .as_ref()
        .ok()?
        .iter()
        .filter_map(|p| p.mortality.percent())
        .collect();

    let low = rates.iter().copied().reduce(f64::min)?;
    let high = rates.iter().copied().reduce(f64::max)?;
    Some((low, high))
}
