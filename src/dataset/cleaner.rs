//! Field cleaning.
//!
//! A value is usable when it is non-empty after trimming and is not the
//! missing-value sentinel. Every count in the crate goes through [`clean`],
//! so missingness never becomes a category of its own.

/// Return the trimmed value, or `None` when it is blank or the sentinel.
pub fn clean<'a>(raw: &'a str, sentinel: &str) -> Option<&'a str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == sentinel {
        None
    } else {
        Some(trimmed)
    }
}

/// Whether a cleaned binary outcome value marks an event.
pub fn is_event(value: &str) -> bool {
    value == "1"
}
