//! Grouping keys.
//!
//! A [`Grouping`] names the field that partitions records and how a cleaned
//! field value becomes a group key. Classification policies such as the
//! urban/rural split are plain data in a [`ClassificationTable`], so they can
//! be swapped through configuration.

use crate::dataset::{Dataset, Record};
use serde::Serialize;

/// Maps a value to one of two labels by membership in a fixed list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationTable {
    pub name: String,
    members: Vec<String>,
    pub matched_label: String,
    pub unmatched_label: String,
}

impl ClassificationTable {
    /// Members are compared case-insensitively.
    pub fn new(name: &str, members: &[String], matched_label: &str, unmatched_label: &str) -> Self {
        Self {
            name: name.to_string(),
            members: members.iter().map(|m| m.trim().to_lowercase()).collect(),
            matched_label: matched_label.to_string(),
            unmatched_label: unmatched_label.to_string(),
        }
    }

    pub fn classify(&self, value: &str) -> &str {
        let lowered = value.to_lowercase();
        if self.members.iter().any(|m| *m == lowered) {
            &self.matched_label
        } else {
            &self.unmatched_label
        }
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }
}

/// How a cleaned field value becomes a group key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyTransform {
    /// The value itself.
    Identity,
    /// Title-cased value ("KAMPALA" and "kampala" both become "Kampala").
    TitleCase,
    /// Only listed values; anything else is dropped. An empty list keeps all.
    AllowList(Vec<String>),
    /// The label assigned by a classification table.
    Classify(ClassificationTable),
}

/// A partition of the records by one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grouping {
    /// Name used in reports and diagnostics.
    pub label: String,
    /// Source field in the header.
    pub field: String,
    pub transform: KeyTransform,
}

impl Grouping {
    /// Group by the raw cleaned value; the label is the field name.
    pub fn by_field(field: &str) -> Self {
        Self {
            label: field.to_string(),
            field: field.to_string(),
            transform: KeyTransform::Identity,
        }
    }

    pub fn title_case(label: &str, field: &str) -> Self {
        Self {
            label: label.to_string(),
            field: field.to_string(),
            transform: KeyTransform::TitleCase,
        }
    }

    pub fn allow_list(label: &str, field: &str, allowed: &[String]) -> Self {
        Self {
            label: label.to_string(),
            field: field.to_string(),
            transform: KeyTransform::AllowList(allowed.to_vec()),
        }
    }

    pub fn classified(label: &str, field: &str, table: ClassificationTable) -> Self {
        Self {
            label: label.to_string(),
            field: field.to_string(),
            transform: KeyTransform::Classify(table),
        }
    }

    /// Key for an already-cleaned value, or `None` when the value is excluded.
    pub fn key(&self, value: &str) -> Option<String> {
        match &self.transform {
            KeyTransform::Identity => Some(value.to_string()),
            KeyTransform::TitleCase => Some(title_case(value)),
            KeyTransform::AllowList(allowed) => {
                if allowed.is_empty() || allowed.iter().any(|a| a == value) {
                    Some(value.to_string())
                } else {
                    None
                }
            }
            KeyTransform::Classify(table) => Some(table.classify(value).to_string()),
        }
    }

    /// Key of a record, or `None` when its field is missing or excluded.
    pub fn key_of(&self, dataset: &Dataset, record: &Record) -> Option<String> {
        dataset
            .value(record, &self.field)
            .and_then(|value| self.key(value))
    }
}

/// Upper-case the first letter of each word and lower-case the rest.
///
/// A word starts after any non-alphabetic character, so "o'neil" becomes
/// "O'Neil" and "wakiso-east" becomes "Wakiso-East".
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_word = false;

    for c in value.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urban_rural() -> ClassificationTable {
        ClassificationTable::new(
            "urban_rural",
            &["kampala".to_string(), "Wakiso".to_string()],
            "Urban",
            "Rural/Peri-urban",
        )
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("KAMPALA"), "Kampala");
        assert_eq!(title_case("wakiso"), "Wakiso");
        assert_eq!(title_case("mukono town council"), "Mukono Town Council");
        assert_eq!(title_case("o'neil"), "O'Neil");
        assert_eq!(title_case("wakiso-east"), "Wakiso-East");
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        let table = urban_rural();
        assert_eq!(table.classify("Kampala"), "Urban");
        assert_eq!(table.classify("WAKISO"), "Urban");
        assert_eq!(table.classify("Mukono"), "Rural/Peri-urban");
        assert_eq!(table.members(), &["kampala", "wakiso"]);
    }

    #[test]
    fn test_allow_list_drops_unknown_values() {
        let grouping = Grouping::allow_list(
            "hospital_clean",
            "hospital",
            &["Mulago".to_string(), "Naguru".to_string()],
        );
        assert_eq!(grouping.key("Mulago"), Some("Mulago".to_string()));
        assert_eq!(grouping.key("Other"), None);
    }

    #[test]
    fn test_empty_allow_list_keeps_everything() {
        let grouping = Grouping::allow_list("hospital_clean", "hospital", &[]);
        assert_eq!(grouping.key("Anything"), Some("Anything".to_string()));
    }

    #[test]
    fn test_classified_grouping() {
        let grouping = Grouping::classified("urban_rural", "residencedistrict", urban_rural());
        assert_eq!(grouping.key("kampala"), Some("Urban".to_string()));
        assert_eq!(grouping.key("Gulu"), Some("Rural/Peri-urban".to_string()));
    }
}
