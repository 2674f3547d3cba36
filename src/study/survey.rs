//! Sample-size survey workflow.
//!
//! Counts every geographic grouping variable, aggregates outcome rates per
//! grouping, assesses sample adequacy per level and derives the
//! recommendations.

use crate::analysis::{
    aggregate_rates, assess, count_groups, find_coordinate_columns, recommend, FrequencyTable,
    Grouping, RecommendationSummary, SurveyEvidence,
};
use crate::config::Config;
use crate::dataset::Dataset;
use crate::error::Availability;
use crate::models::{OutcomeSection, RateOrdering, SurveyReport};
use tracing::{debug, info, warn};

/// Run the survey over a loaded dataset.
pub fn run_survey(dataset: &Dataset, config: &Config) -> SurveyReport {
    let columns = &config.columns;
    let thresholds = config.thresholds.adequacy();
    let top_n = config.report.top_n;

    info!("Surveying {} records", dataset.len());

    let hospital = Grouping::by_field(&columns.hospital);
    let district = Grouping::by_field(&columns.district);
    let village = Grouping::by_field(&columns.village);
    let region = Grouping::by_field(&columns.region_central);

    let hospitals = count_groups(dataset, &hospital);
    let districts = count_groups(dataset, &district);
    let villages = count_groups(dataset, &village);
    let regions = count_groups(dataset, &region);

    let outcome_specs = [
        (
            "HOSPITAL MORTALITY BY HOSPITAL".to_string(),
            &hospital,
            &columns.died_hospital,
            RateOrdering::Alphabetical,
        ),
        (
            "30-DAY MORTALITY BY HOSPITAL".to_string(),
            &hospital,
            &columns.died_30day,
            RateOrdering::Alphabetical,
        ),
        (
            "HIV POSITIVE STATUS BY HOSPITAL".to_string(),
            &hospital,
            &columns.hiv_positive,
            RateOrdering::Alphabetical,
        ),
        (
            format!("HOSPITAL MORTALITY BY TOP {} DISTRICTS", top_n),
            &district,
            &columns.died_hospital,
            RateOrdering::ByTotal { limit: top_n },
        ),
    ];

    let outcomes: Vec<OutcomeSection> = outcome_specs
        .into_iter()
        .map(|(title, grouping, outcome, ordering)| {
            let table = aggregate_rates(dataset, grouping, outcome);
            match &table {
                Ok(rates) if rates.is_empty() => {
                    warn!("{}: no records with a known outcome", title)
                }
                Ok(rates) => debug!(
                    "{}: {} records in {} groups",
                    title,
                    rates.total_records(),
                    rates.groups().len()
                ),
                Err(reason) => warn!("Skipping {}: {}", title.to_lowercase(), reason),
            }
            OutcomeSection {
                title,
                ordering,
                table,
            }
        })
        .collect();

    let level = |name: &str, table: &Availability<FrequencyTable>| {
        if let Ok(t) = table {
            if t.is_empty() {
                warn!("No {} values to assess", name);
            }
        }
        table.as_ref().map(|t| assess(name, t, &thresholds)).map_err(Clone::clone)
    };
    let hospital_level = level("hospital", &hospitals);
    let district_level = level("district", &districts);
    let village_level = level("village", &villages);

    let coordinate_columns =
        find_coordinate_columns(dataset.headers(), &config.geography.coordinate_keywords);
    debug!("Coordinate-like columns: {:?}", coordinate_columns);

    let evidence = SurveyEvidence {
        coordinate_columns,
        hospital: hospital_level.as_ref().ok(),
        district: district_level.as_ref().ok(),
        village: village_level.as_ref().ok(),
        region_levels: regions.as_ref().ok().map(FrequencyTable::len),
    };
    let recommendations =
        RecommendationSummary::new(recommend(&evidence, &config.thresholds.policy()));

    info!(
        "Survey potential: {} ({} positive, {} warnings)",
        recommendations.potential, recommendations.positive, recommendations.warnings
    );

    SurveyReport {
        records_loaded: dataset.len(),
        short_rows: dataset.short_rows(),
        columns: dataset.resolution().to_vec(),
        top_n,
        thresholds,
        hospital_field: hospital.field.clone(),
        district_field: district.field.clone(),
        village_field: village.field.clone(),
        central_value: config.geography.central_value.clone(),
        hospitals,
        districts,
        villages,
        regions,
        outcomes,
        hospital_level,
        district_level,
        village_level,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::recommend::{Potential, RecommendationKind};
    use crate::dataset::read_dataset;
    use crate::error::Unavailable;

    const HEADER: &str = "patient_id,hospital,residencedistrict,residencevillagesubcounty,region_central,died_hospital,died_30day,hiv_positive,age_continuous\n";

    fn load(csv: &str, config: &Config) -> Dataset {
        read_dataset(
            csv.as_bytes(),
            &config.columns.all_fields(),
            &config.dataset.missing_sentinel,
        )
        .unwrap()
    }

    #[test]
    fn test_header_only_survey() {
        let config = Config::default();
        let dataset = load(HEADER, &config);
        let report = run_survey(&dataset, &config);

        assert_eq!(report.records_loaded, 0);
        assert!(report.hospitals.as_ref().unwrap().is_empty());
        for section in &report.outcomes {
            assert!(section.table.as_ref().unwrap().is_empty());
            assert!(section.rows().is_empty());
        }
        for level in [&report.hospital_level, &report.district_level, &report.village_level] {
            assert!(!level.as_ref().unwrap().has_data());
        }

        // Only the header can contribute a positive: the coordinate keyword
        // set matches "y" in "residencevillagesubcounty"
        let data_driven: Vec<_> = report
            .recommendations
            .recommendations
            .iter()
            .skip(1)
            .collect();
        assert!(data_driven
            .iter()
            .all(|r| r.kind == RecommendationKind::Warning));
    }

    #[test]
    fn test_missing_outcome_column_skips_only_that_section() {
        let config = Config::default();
        let csv = "hospital,residencedistrict,died_hospital,died_30day\n\
                   Mulago,Kampala,1,0\n\
                   Naguru,Wakiso,0,1\n";
        let dataset = load(csv, &config);
        let report = run_survey(&dataset, &config);

        let hiv = report
            .outcomes
            .iter()
            .find(|s| s.title.contains("HIV"))
            .unwrap();
        assert_eq!(
            hiv.table,
            Err(Unavailable::MissingColumn {
                column: "hiv_positive".to_string()
            })
        );

        let mortality = &report.outcomes[0];
        assert_eq!(mortality.rows().len(), 2);
        assert!(report.villages.is_err());
        assert!(report.village_level.is_err());
        assert!(report.district_level.is_ok());
    }

    #[test]
    fn test_survey_assessment_and_potential() {
        let config = Config::default();
        let mut csv = String::from(HEADER);
        let mut id = 0;
        for (hospital, district, count) in [
            ("Mulago", "Kampala", 120),
            ("Naguru", "Wakiso", 40),
            ("Kirrudu", "Mukono", 30),
            ("Kirrudu", "Luwero", 29),
        ] {
            for i in 0..count {
                id += 1;
                let region = if district == "Kampala" || district == "Wakiso" { 1 } else { 0 };
                let died = if i % 10 == 0 { 1 } else { 0 };
                csv.push_str(&format!(
                    "{id},{hospital},{district},{district} village,{region},{died},{died},0,40\n"
                ));
            }
        }

        let dataset = load(&csv, &config);
        let report = run_survey(&dataset, &config);

        let district_level = report.district_level.as_ref().unwrap();
        assert_eq!(district_level.groups, 4);
        assert_eq!(district_level.at_least_min(), 3);
        assert_eq!(district_level.at_least_good(), 1);
        assert_eq!(district_level.below_min(), 1);

        let top = report.outcomes[3].rows();
        assert_eq!(top[0].key, "Kampala");
        assert_eq!(top[0].display(), "12/120 (10.0%)");

        // coordinates (header), hospitals, regions positive; district and
        // village below their cut-offs
        assert_eq!(report.recommendations.positive, 3);
        assert_eq!(report.recommendations.warnings, 2);
        assert_eq!(report.recommendations.potential, Potential::Excellent);
    }
}
