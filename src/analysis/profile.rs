//! Per-group outcome profiles.
//!
//! A profile bundles, for one group, the patient count, 30-day mortality,
//! HIV positivity and median age. The mortality field defines the analysis
//! set: a record without a usable mortality value is not profiled.

use super::aggregator::{percent, round1};
use super::grouping::Grouping;
use crate::dataset::{is_event, Dataset};
use crate::error::Availability;
use serde::Serialize;
use std::collections::BTreeMap;

/// Events out of a total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RateCell {
    pub events: usize,
    pub total: usize,
}

impl RateCell {
    fn record(&mut self, value: &str) {
        self.total += 1;
        if is_event(value) {
            self.events += 1;
        }
    }

    /// Percentage rounded to one decimal; `None` when the total is zero.
    pub fn percent(&self) -> Option<f64> {
        percent(self.events, self.total).map(round1)
    }
}

/// Outcome summary of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupProfile {
    pub key: String,
    pub n_patients: usize,
    pub mortality: RateCell,
    pub hiv: RateCell,
    pub median_age: Option<f64>,
}

/// Fields a profile reads.
#[derive(Debug, Clone, Copy)]
pub struct ProfileFields<'a> {
    pub patient_id: &'a str,
    pub mortality: &'a str,
    pub hiv: &'a str,
    pub age: &'a str,
}

/// Profile every group, sorted by key.
///
/// The grouping and mortality fields are required. Without a patient id
/// column every record counts as a patient; without an HIV or age column
/// those cells stay empty.
pub fn profile_groups(
    dataset: &Dataset,
    grouping: &Grouping,
    fields: &ProfileFields<'_>,
) -> Availability<Vec<GroupProfile>> {
    dataset.require(&grouping.field)?;
    dataset.require(fields.mortality)?;
    let count_ids = dataset.has_column(fields.patient_id);

    struct Accumulator {
        n_patients: usize,
        mortality: RateCell,
        hiv: RateCell,
        ages: Vec<f64>,
    }

    let mut groups: BTreeMap<String, Accumulator> = BTreeMap::new();

    for record in dataset.records() {
        let Some(mortality) = dataset.value(record, fields.mortality) else {
            continue;
        };
        let Some(key) = grouping.key_of(dataset, record) else {
            continue;
        };

        let acc = groups.entry(key).or_insert_with(|| Accumulator {
            n_patients: 0,
            mortality: RateCell::default(),
            hiv: RateCell::default(),
            ages: Vec::new(),
        });

        if !count_ids || dataset.value(record, fields.patient_id).is_some() {
            acc.n_patients += 1;
        }
        acc.mortality.record(mortality);
        if let Some(hiv) = dataset.value(record, fields.hiv) {
            acc.hiv.record(hiv);
        }
        if let Some(age) = dataset
            .value(record, fields.age)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
        {
            acc.ages.push(age);
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, mut acc)| GroupProfile {
            key,
            n_patients: acc.n_patients,
            mortality: acc.mortality,
            hiv: acc.hiv,
            median_age: median(&mut acc.ages).map(round1),
        })
        .collect())
}

/// Median of the values; the mean of the middle two for an even count.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Largest groups first; ties keep their current (alphabetical) order.
pub fn sort_by_patients(profiles: &mut [GroupProfile]) {
    profiles.sort_by_key(|p| std::cmp::Reverse(p.n_patients));
}
