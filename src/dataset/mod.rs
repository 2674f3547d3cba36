//! Cohort dataset loading and access.
//!
//! Records are kept as raw strings; every read through [`Dataset::value`]
//! is cleaned, so callers only ever see trimmed, non-missing values.

pub mod cleaner;
pub mod loader;

pub use cleaner::{clean, is_event};
pub use loader::load_dataset;
#[cfg(test)]
pub use loader::read_dataset;

use crate::error::{Availability, Unavailable};
use serde::Serialize;
use std::collections::HashMap;

/// One data row, as read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    values: Vec<String>,
}

impl Record {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    /// Raw value at a column position.
    pub fn raw(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }
}

/// How a requested field was resolved against the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnResolution {
    pub field: String,
    pub index: Option<usize>,
}

/// The loaded cohort.
#[derive(Debug, Clone)]
pub struct Dataset {
    headers: Vec<String>,
    positions: HashMap<String, usize>,
    resolution: Vec<ColumnResolution>,
    records: Vec<Record>,
    short_rows: usize,
    sentinel: String,
}

impl Dataset {
    pub(crate) fn new(
        headers: Vec<String>,
        resolution: Vec<ColumnResolution>,
        records: Vec<Record>,
        short_rows: usize,
        sentinel: &str,
    ) -> Self {
        let positions = resolution
            .iter()
            .filter_map(|r| r.index.map(|i| (r.field.clone(), i)))
            .collect();

        Self {
            headers,
            positions,
            resolution,
            records,
            short_rows,
            sentinel: sentinel.to_string(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows dropped because they were too short for the resolved fields.
    pub fn short_rows(&self) -> usize {
        self.short_rows
    }

    /// Requested fields with their header position, in request order.
    pub fn resolution(&self) -> &[ColumnResolution] {
        &self.resolution
    }

    /// Requested fields that are absent from the header.
    pub fn missing_columns(&self) -> Vec<&str> {
        self.resolution
            .iter()
            .filter(|r| r.index.is_none())
            .map(|r| r.field.as_str())
            .collect()
    }

    pub fn column_index(&self, field: &str) -> Option<usize> {
        self.positions.get(field).copied()
    }

    pub fn has_column(&self, field: &str) -> bool {
        self.positions.contains_key(field)
    }

    /// Column position, or a `MissingColumn` marker.
    pub fn require(&self, field: &str) -> Availability<usize> {
        self.column_index(field)
            .ok_or_else(|| Unavailable::MissingColumn {
                column: field.to_string(),
            })
    }

    /// Cleaned value of `field` in `record`.
    pub fn value<'a>(&self, record: &'a Record, field: &str) -> Option<&'a str> {
        let index = self.column_index(field)?;
        record.raw(index).and_then(|raw| clean(raw, &self.sentinel))
    }

    /// A copy holding only the records where `field` has a usable value.
    pub fn with_value_in(&self, field: &str) -> Availability<Dataset> {
        self.require(field)?;
        let records = self
            .records
            .iter()
            .filter(|r| self.value(r, field).is_some())
            .cloned()
            .collect();

        Ok(Dataset {
            records,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        let csv = "hospital,died_30day\nMulago,1\n Naguru ,NA\n,0\nKirrudu,\n";
        read_dataset(csv.as_bytes(), &["hospital", "died_30day", "age"], "NA").unwrap()
    }

    #[test]
    fn test_value_is_cleaned() {
        let dataset = sample();
        let records = dataset.records();
        assert_eq!(dataset.value(&records[1], "hospital"), Some("Naguru"));
        assert_eq!(dataset.value(&records[1], "died_30day"), None);
        assert_eq!(dataset.value(&records[2], "hospital"), None);
        assert_eq!(dataset.value(&records[0], "age"), None);
    }

    #[test]
    fn test_require_missing_column() {
        let dataset = sample();
        assert_eq!(
            dataset.require("age"),
            Err(Unavailable::MissingColumn {
                column: "age".to_string()
            })
        );
        assert_eq!(dataset.missing_columns(), vec!["age"]);
    }

    #[test]
    fn test_with_value_in_filters_records() {
        let dataset = sample();
        let subset = dataset.with_value_in("died_30day").unwrap();
        assert_eq!(subset.len(), 2);
        assert_eq!(subset.headers(), dataset.headers());
    }
}
