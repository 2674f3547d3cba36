//! Analysis-potential recommendations.
//!
//! The policy is fixed: each grouping level contributes at most one tagged
//! recommendation, and the overall potential depends only on how many of
//! them are positive.

use super::adequacy::LevelAssessment;
use serde::Serialize;
use std::fmt;

/// Tag of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    Positive,
    Warning,
}

impl RecommendationKind {
    pub fn tag(&self) -> &'static str {
        match self {
            RecommendationKind::Positive => "+",
            RecommendationKind::Warning => "!",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub text: String,
}

impl Recommendation {
    fn positive(text: impl Into<String>) -> Self {
        Self {
            kind: RecommendationKind::Positive,
            text: text.into(),
        }
    }

    fn warning(text: impl Into<String>) -> Self {
        Self {
            kind: RecommendationKind::Warning,
            text: text.into(),
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.tag(), self.text)
    }
}

/// Overall analysis potential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Potential {
    Limited,
    Moderate,
    Good,
    Excellent,
}

impl Potential {
    /// 3 or more positives is excellent, 2 good, 1 moderate, 0 limited.
    pub fn from_positive_count(positives: usize) -> Self {
        match positives {
            0 => Potential::Limited,
            1 => Potential::Moderate,
            2 => Potential::Good,
            _ => Potential::Excellent,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Potential::Excellent => {
                "Multiple geographic levels suitable for comprehensive spatial analysis"
            }
            Potential::Good => "Several geographic levels suitable for meaningful spatial analysis",
            Potential::Moderate => "Some geographic levels suitable, may need data aggregation",
            Potential::Limited => {
                "May need significant data aggregation or focus on descriptive analysis"
            }
        }
    }
}

impl fmt::Display for Potential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Potential::Excellent => write!(f, "EXCELLENT"),
            Potential::Good => write!(f, "GOOD"),
            Potential::Moderate => write!(f, "MODERATE"),
            Potential::Limited => write!(f, "LIMITED"),
        }
    }
}

/// Cut-offs for the per-level rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecommendationPolicy {
    pub hospital_min_groups: usize,
    pub district_min_adequate: usize,
    pub village_min_adequate: usize,
    pub region_min_levels: usize,
}

impl Default for RecommendationPolicy {
    fn default() -> Self {
        Self {
            hospital_min_groups: 2,
            district_min_adequate: 5,
            village_min_adequate: 10,
            region_min_levels: 2,
        }
    }
}

/// What the generator looks at. `None` means the level's column is absent.
#[derive(Debug, Clone, Default)]
pub struct SurveyEvidence<'a> {
    pub coordinate_columns: Vec<String>,
    pub hospital: Option<&'a LevelAssessment>,
    pub district: Option<&'a LevelAssessment>,
    pub village: Option<&'a LevelAssessment>,
    /// Distinct region values.
    pub region_levels: Option<usize>,
}

/// Header names containing any keyword, case-insensitively.
pub fn find_coordinate_columns(headers: &[String], keywords: &[String]) -> Vec<String> {
    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    headers
        .iter()
        .filter(|header| {
            let lowered = header.to_lowercase();
            keywords.iter().any(|k| lowered.contains(k.as_str()))
        })
        .cloned()
        .collect()
}

/// Produce the tagged recommendations, in fixed level order.
pub fn recommend(evidence: &SurveyEvidence<'_>, policy: &RecommendationPolicy) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if evidence.coordinate_columns.is_empty() {
        recommendations.push(Recommendation::warning(
            "No coordinate data found - will need geocoding of place names",
        ));
    } else {
        recommendations.push(Recommendation::positive(format!(
            "Potential coordinate data found in columns: {}",
            evidence.coordinate_columns.join(", ")
        )));
    }

    if let Some(hospital) = evidence.hospital {
        if hospital.groups >= policy.hospital_min_groups {
            recommendations.push(Recommendation::positive(format!(
                "Hospital catchment area analysis feasible ({} hospitals)",
                hospital.groups
            )));
        }
    }

    if let Some(district) = evidence.district {
        let adequate = district.at_least_min();
        if adequate >= policy.district_min_adequate {
            recommendations.push(Recommendation::positive(format!(
                "District-level analysis possible ({}/{} districts with adequate samples)",
                adequate, district.groups
            )));
        } else {
            recommendations.push(Recommendation::warning(format!(
                "Limited district analysis ({}/{} districts with adequate samples)",
                adequate, district.groups
            )));
        }
    }

    if let Some(village) = evidence.village {
        let adequate = village.at_least_min();
        if adequate >= policy.village_min_adequate {
            recommendations.push(Recommendation::positive(format!(
                "Fine-scale village/subcounty analysis possible ({}/{} areas with adequate samples)",
                adequate, village.groups
            )));
        } else {
            recommendations.push(Recommendation::warning(format!(
                "Limited fine-scale analysis ({}/{} areas with adequate samples)",
                adequate, village.groups
            )));
        }
    }

    if let Some(levels) = evidence.region_levels {
        if levels >= policy.region_min_levels {
            recommendations.push(Recommendation::positive(
                "Regional comparison analysis possible (Central vs Other regions)",
            ));
        }
    }

    recommendations
}

/// Recommendations with their tally and overall rating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecommendationSummary {
    pub recommendations: Vec<Recommendation>,
    pub positive: usize,
    pub warnings: usize,
    pub potential: Potential,
}

impl RecommendationSummary {
    pub fn new(recommendations: Vec<Recommendation>) -> Self {
        let positive = recommendations
            .iter()
            .filter(|r| r.kind == RecommendationKind::Positive)
            .count();
        let warnings = recommendations.len() - positive;

        Self {
            potential: Potential::from_positive_count(positive),
            recommendations,
            positive,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::adequacy::{assess, Thresholds};
    use crate::analysis::aggregator::FrequencyTable;

    fn level(name: &str, sizes: &[usize]) -> LevelAssessment {
        let mut values = Vec::new();
        for (i, size) in sizes.iter().enumerate() {
            for _ in 0..*size {
                values.push(format!("{}-{}", name, i));
            }
        }
        assess(name, &FrequencyTable::from_values(values), &Thresholds::default())
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_potential_buckets() {
        assert_eq!(Potential::from_positive_count(0), Potential::Limited);
        assert_eq!(Potential::from_positive_count(1), Potential::Moderate);
        assert_eq!(Potential::from_positive_count(2), Potential::Good);
        assert_eq!(Potential::from_positive_count(3), Potential::Excellent);
        assert_eq!(Potential::from_positive_count(7), Potential::Excellent);
    }

    #[test]
    fn test_coordinate_detection() {
        let headers = strings(&["patient_id", "GPS_Lat", "hospital", "sex"]);
        let keywords = strings(&["lat", "lon", "coord", "gps", "x", "y"]);
        assert_eq!(
            find_coordinate_columns(&headers, &keywords),
            vec!["GPS_Lat", "sex"]
        );

        let keywords = strings(&["lat", "lon"]);
        assert!(find_coordinate_columns(&strings(&["hospital"]), &keywords).is_empty());
    }

    #[test]
    fn test_full_positive_survey() {
        let hospital = level("hospital", &[300, 200, 100]);
        let district = level("district", &[40, 40, 40, 40, 40, 3]);
        let village = level("village", &[31; 10]);

        let evidence = SurveyEvidence {
            coordinate_columns: strings(&["gps_lat"]),
            hospital: Some(&hospital),
            district: Some(&district),
            village: Some(&village),
            region_levels: Some(2),
        };

        let summary = RecommendationSummary::new(recommend(&evidence, &RecommendationPolicy::default()));
        assert_eq!(summary.recommendations.len(), 5);
        assert_eq!(summary.positive, 5);
        assert_eq!(summary.warnings, 0);
        assert_eq!(summary.potential, Potential::Excellent);
        assert!(summary.recommendations[2].text.contains("5/6 districts"));
    }

    #[test]
    fn test_empty_levels_only_warn() {
        let hospital = level("hospital", &[]);
        let district = level("district", &[]);
        let village = level("village", &[]);

        let evidence = SurveyEvidence {
            coordinate_columns: Vec::new(),
            hospital: Some(&hospital),
            district: Some(&district),
            village: Some(&village),
            region_levels: Some(0),
        };

        let summary = RecommendationSummary::new(recommend(&evidence, &RecommendationPolicy::default()));
        assert!(summary
            .recommendations
            .iter()
            .all(|r| r.kind == RecommendationKind::Warning));
        assert_eq!(summary.warnings, 3);
        assert_eq!(summary.potential, Potential::Limited);
    }

    #[test]
    fn test_district_threshold_is_inclusive() {
        let district = level("district", &[30, 30, 30, 30, 29]);
        let evidence = SurveyEvidence {
            district: Some(&district),
            ..Default::default()
        };
        let recs = recommend(&evidence, &RecommendationPolicy::default());
        assert_eq!(recs[1].kind, RecommendationKind::Warning);
        assert_eq!(
            recs[1].to_string(),
            "! Limited district analysis (4/5 districts with adequate samples)"
        );

        let district = level("district", &[30, 30, 30, 30, 30]);
        let evidence = SurveyEvidence {
            district: Some(&district),
            ..Default::default()
        };
        let recs = recommend(&evidence, &RecommendationPolicy::default());
        assert_eq!(recs[1].kind, RecommendationKind::Positive);
    }

    #[test]
    fn test_absent_levels_are_skipped() {
        let evidence = SurveyEvidence::default();
        let recs = recommend(&evidence, &RecommendationPolicy::default());
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].kind, RecommendationKind::Warning);
    }
}
