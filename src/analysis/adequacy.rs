//! Sample-size adequacy assessment.

use super::aggregator::FrequencyTable;
use serde::Serialize;
use std::fmt;

/// Group-size thresholds. `min_sample <= good_sample` is checked at
/// configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Thresholds {
    pub min_sample: usize,
    pub good_sample: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_sample: 30,
            good_sample: 100,
        }
    }
}

/// Adequacy class of a single group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleAdequacy {
    /// Below `min_sample`.
    Inadequate,
    /// At least `min_sample`, below `good_sample`.
    Adequate,
    /// At least `good_sample`.
    Strong,
}

impl fmt::Display for SampleAdequacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleAdequacy::Inadequate => write!(f, "Inadequate"),
            SampleAdequacy::Adequate => write!(f, "Adequate"),
            SampleAdequacy::Strong => write!(f, "Strong"),
        }
    }
}

impl Thresholds {
    /// Both bounds are inclusive.
    pub fn classify(&self, total: usize) -> SampleAdequacy {
        if total >= self.good_sample {
            SampleAdequacy::Strong
        } else if total >= self.min_sample {
            SampleAdequacy::Adequate
        } else {
            SampleAdequacy::Inadequate
        }
    }
}

/// Smallest and largest group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeRange {
    pub smallest: usize,
    pub largest: usize,
}

/// Adequacy summary of one grouping level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelAssessment {
    pub level: String,
    pub thresholds: Thresholds,
    /// Distinct groups.
    pub groups: usize,
    pub inadequate: usize,
    pub adequate: usize,
    pub strong: usize,
    /// `None` when the level has no data.
    pub size_range: Option<SizeRange>,
}

impl LevelAssessment {
    /// Groups with at least `min_sample` records.
    pub fn at_least_min(&self) -> usize {
        self.adequate + self.strong
    }

    /// Groups with at least `good_sample` records.
    pub fn at_least_good(&self) -> usize {
        self.strong
    }

    /// Groups below `min_sample`.
    pub fn below_min(&self) -> usize {
        self.inadequate
    }

    pub fn has_data(&self) -> bool {
        self.size_range.is_some()
    }
}

/// Assess a frequency table against the thresholds.
pub fn assess(level: &str, table: &FrequencyTable, thresholds: &Thresholds) -> LevelAssessment {
    let mut assessment = LevelAssessment {
        level: level.to_string(),
        thresholds: *thresholds,
        groups: table.len(),
        inadequate: 0,
        adequate: 0,
        strong: 0,
        size_range: None,
    };

    for count in table.counts() {
        match thresholds.classify(count) {
            SampleAdequacy::Inadequate => assessment.inadequate += 1,
            SampleAdequacy::Adequate => assessment.adequate += 1,
            SampleAdequacy::Strong => assessment.strong += 1,
        }
    }

    if let (Some(smallest), Some(largest)) = (table.counts().min(), table.counts().max()) {
        assessment.size_range = Some(SizeRange { smallest, largest });
    }

    assessment
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_sizes(sizes: &[usize]) -> FrequencyTable {
        let mut values = Vec::new();
        for (i, size) in sizes.iter().enumerate() {
            for _ in 0..*size {
                values.push(format!("group-{}", i));
            }
        }
        FrequencyTable::from_values(values)
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let thresholds = Thresholds::default();
        assert_eq!(thresholds.classify(29), SampleAdequacy::Inadequate);
        assert_eq!(thresholds.classify(30), SampleAdequacy::Adequate);
        assert_eq!(thresholds.classify(99), SampleAdequacy::Adequate);
        assert_eq!(thresholds.classify(100), SampleAdequacy::Strong);
    }

    #[test]
    fn test_assess_counts() {
        let table = table_with_sizes(&[30, 5, 120, 99, 1]);
        let assessment = assess("district", &table, &Thresholds::default());

        assert_eq!(assessment.groups, 5);
        assert_eq!(assessment.at_least_min(), 3);
        assert_eq!(assessment.at_least_good(), 1);
        assert_eq!(assessment.below_min(), 2);
        assert_eq!(
            assessment.size_range,
            Some(SizeRange {
                smallest: 1,
                largest: 120
            })
        );
    }

    #[test]
    fn test_empty_table_has_no_data() {
        let assessment = assess("village", &FrequencyTable::new(), &Thresholds::default());
        assert_eq!(assessment.groups, 0);
        assert!(!assessment.has_data());
        assert_eq!(assessment.size_range, None);
    }

    #[test]
    fn test_classes_partition_groups() {
        let sizes = [0usize, 1, 29, 30, 31, 99, 100, 101, 250];
        let table = table_with_sizes(&sizes[1..]);
        for (min_sample, good_sample) in [(30, 100), (1, 1), (0, 500), (50, 50)] {
            let thresholds = Thresholds {
                min_sample,
                good_sample,
            };
            let assessment = assess("level", &table, &thresholds);
            assert_eq!(
                assessment.inadequate + assessment.adequate + assessment.strong,
                assessment.groups
            );
        }
    }
}
