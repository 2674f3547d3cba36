//! Grouped counting and rate aggregation.
//!
//! This module provides the two aggregations every report is built from:
//! frequency tables of cleaned values, and per-group event rates for a
//! binary outcome. Both keep first-encountered order internally so every
//! derived ordering is deterministic.

use super::grouping::Grouping;
use crate::dataset::{is_event, Dataset};
use crate::error::Availability;
use serde::Serialize;
use std::collections::HashMap;

/// Round to one decimal place, exact ties to even.
pub fn round1(value: f64) -> f64 {
    format!("{:.1}", value).parse().unwrap_or(value)
}

/// Percentage of `part` in `whole`, or `None` when `whole` is zero.
pub fn percent(part: usize, whole: usize) -> Option<f64> {
    if whole == 0 {
        None
    } else {
        Some(part as f64 / whole as f64 * 100.0)
    }
}

/// Occurrence counts of distinct values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FrequencyTable {
    entries: Vec<(String, usize)>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every value of an iterator.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self::new();
        for value in values {
            table.increment(value.as_ref());
        }
        table
    }

    pub fn increment(&mut self, value: &str) {
        match self.index.get(value) {
            Some(&slot) => self.entries[slot].1 += 1,
            None => {
                self.index.insert(value.to_string(), self.entries.len());
                self.entries.push((value.to_string(), 1));
            }
        }
    }

    pub fn get(&self, value: &str) -> Option<usize> {
        self.index.get(value).map(|&slot| self.entries[slot].1)
    }

    /// Number of distinct values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    pub fn counts(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|(_, count)| *count)
    }

    /// Entries in first-encountered order.
    pub fn first_seen(&self) -> Vec<(&str, usize)> {
        self.entries
            .iter()
            .map(|(value, count)| (value.as_str(), *count))
            .collect()
    }

    /// All entries, most frequent first; ties keep first-encountered order.
    pub fn by_count(&self) -> Vec<(&str, usize)> {
        let mut sorted = self.first_seen();
        sorted.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
        sorted
    }

    /// The `n` most frequent entries.
    pub fn top(&self, n: usize) -> Vec<(&str, usize)> {
        let mut sorted = self.by_count();
        sorted.truncate(n);
        sorted
    }
}

/// Count the group keys of every record with a usable key.
pub fn count_groups(dataset: &Dataset, grouping: &Grouping) -> Availability<FrequencyTable> {
    dataset.require(&grouping.field)?;

    Ok(FrequencyTable::from_values(
        dataset
            .records()
            .iter()
            .filter_map(|record| grouping.key_of(dataset, record)),
    ))
}

/// Events and total for one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRate {
    pub key: String,
    pub total: usize,
    pub events: usize,
}

impl GroupRate {
    /// Event rate in percent, rounded to one decimal; `None` for an empty group.
    pub fn rate_percent(&self) -> Option<f64> {
        percent(self.events, self.total).map(round1)
    }

    /// "events/total (rate%)", or "no data" for an empty group.
    pub fn display(&self) -> String {
        match self.rate_percent() {
            Some(rate) => format!("{}/{} ({:.1}%)", self.events, self.total, rate),
            None => "no data".to_string(),
        }
    }
}

/// Per-group event rates for one (grouping, outcome) pair.
///
/// Every key seen with a usable value is present in [`RateTable::groups`],
/// possibly with a total of zero. Rate views only include groups with at
/// least one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateTable {
    pub grouping: String,
    pub outcome: String,
    groups: Vec<GroupRate>,
}

impl RateTable {
    /// All groups in first-encountered order, including empty ones.
    pub fn groups(&self) -> &[GroupRate] {
        &self.groups
    }

    /// Groups with at least one record, first-encountered order.
    pub fn rates(&self) -> impl Iterator<Item = &GroupRate> {
        self.groups.iter().filter(|g| g.total > 0)
    }

    /// Groups with at least one record, sorted by key.
    pub fn alphabetical(&self) -> Vec<&GroupRate> {
        let mut sorted: Vec<&GroupRate> = self.rates().collect();
        sorted.sort_by(|a, b| a.key.cmp(&b.key));
        sorted
    }

    /// Groups with at least one record, largest first; ties keep
    /// first-encountered order.
    pub fn by_total(&self) -> Vec<&GroupRate> {
        let mut sorted: Vec<&GroupRate> = self.rates().collect();
        sorted.sort_by_key(|g| std::cmp::Reverse(g.total));
        sorted
    }

    /// Records counted across all groups.
    pub fn total_records(&self) -> usize {
        self.groups.iter().map(|g| g.total).sum()
    }

    /// Whether no group has any records.
    pub fn is_empty(&self) -> bool {
        self.rates().next().is_none()
    }
}

/// Aggregate a binary outcome by group.
///
/// A record counts towards its group's total when both the key and the
/// outcome are usable; it is an event when the outcome is `"1"`.
pub fn aggregate_rates(
    dataset: &Dataset,
    grouping: &Grouping,
    outcome: &str,
) -> Availability<RateTable> {
    dataset.require(&grouping.field)?;
    dataset.require(outcome)?;

    let mut groups: Vec<GroupRate> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for record in dataset.records() {
        let Some(key) = grouping.key_of(dataset, record) else {
            continue;
        };

        let slot = *slots.entry(key.clone()).or_insert_with(|| {
            groups.push(GroupRate {
                key,
                total: 0,
                events: 0,
            });
            groups.len() - 1
        });

        if let Some(value) = dataset.value(record, outcome) {
            let group = &mut groups[slot];
            group.total += 1;
            if is_event(value) {
                group.events += 1;
            }
        }
    }

    Ok(RateTable {
        grouping: grouping.label.clone(),
        outcome: outcome.to_string(),
        groups,
    })
}
