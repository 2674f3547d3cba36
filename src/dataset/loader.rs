//! CSV record loading.

use super::{ColumnResolution, Dataset, Record};
use crate::error::AnalysisError;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::{debug, info, warn};

/// Load the cohort from a CSV file.
///
/// A missing file is [`AnalysisError::FileNotFound`]; requested fields that
/// are absent from the header are recorded, not fatal.
pub fn load_dataset(path: &Path, fields: &[&str], sentinel: &str) -> Result<Dataset, AnalysisError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(AnalysisError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(AnalysisError::Io(e)),
    };

    info!("Reading dataset: {}", path.display());

    read_dataset(file, fields, sentinel).map_err(|source| AnalysisError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a cohort from any CSV source.
pub fn read_dataset<R: Read>(
    reader: R,
    fields: &[&str],
    sentinel: &str,
) -> Result<Dataset, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let resolution: Vec<ColumnResolution> = fields
        .iter()
        .map(|field| ColumnResolution {
            field: field.to_string(),
            index: headers.iter().position(|h| h == field),
        })
        .collect();

    for column in resolution.iter().filter(|r| r.index.is_none()) {
        warn!("Column '{}' not found in header", column.field);
    }

    // A row must reach the right-most resolved column to be usable
    let required_len = resolution
        .iter()
        .filter_map(|r| r.index)
        .max()
        .map_or(0, |max| max + 1);

    let mut records = Vec::new();
    let mut short_rows = 0;

    for row in csv_reader.records() {
        let row = row?;
        if row.len() < required_len {
            short_rows += 1;
            continue;
        }
        records.push(Record::new(row.iter().map(String::from).collect()));
    }

    if short_rows > 0 {
        debug!("Dropped {} short rows", short_rows);
    }
    debug!("Loaded {} records", records.len());

    Ok(Dataset::new(headers, resolution, records, short_rows, sentinel))
}
