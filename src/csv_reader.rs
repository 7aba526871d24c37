use crate::dataset::Dataset;
use crate::error::IngestError;
use crate::value::Value;
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Only files named `*.csv` are accepted, case-insensitively.
pub fn is_supported_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

/// Read a dataset from a CSV file on disk.
///
/// The file name is checked before anything is opened; a rejected file
/// leaves no trace.
pub fn read_dataset(path: &Path) -> Result<Dataset, IngestError> {
    let name = path.display().to_string();
    if !is_supported_file(&name) {
        return Err(IngestError::UnsupportedFileType { name });
    }
    let file = File::open(path)?;
    let dataset = read_dataset_from_reader(file)?;
    debug!(path = %name, rows = dataset.len(), "CSV file read");
    Ok(dataset)
}

/// Parse CSV text with a header row into a dataset.
///
/// Empty lines are skipped and each field is typed with `Value::infer`. Rows
/// shorter than the header are padded with missing cells. A file with only a
/// header yields the empty dataset.
pub fn read_dataset_from_reader<R: Read>(reader: R) -> Result<Dataset, IngestError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        rows.push(record.iter().map(Value::infer).collect());
    }

    Ok(Dataset::new(columns, rows))
}
