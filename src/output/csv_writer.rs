//! CSV output of extracted records

use crate::record::Record;
use crate::HarvestError;
use csv::{QuoteStyle, WriterBuilder};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Output columns: identity columns first, then the extractor's columns
///
/// When the extractor declares no columns, every non-identity field found in
/// the records is used, in alphabetical order.
pub fn record_columns(extractor_columns: &[String], records: &[Record]) -> Vec<String> {
    let identity = [Record::ID, Record::NAME, Record::URL];
    let mut columns: Vec<String> = identity.iter().map(|c| c.to_string()).collect();

    if extractor_columns.is_empty() {
        let discovered: BTreeSet<&str> = records
            .iter()
            .flat_map(|r| r.fields().map(|(name, _)| name))
            .filter(|name| !identity.contains(name))
            .collect();
        columns.extend(discovered.into_iter().map(str::to_string));
    } else {
        columns.extend(
            extractor_columns
                .iter()
                .filter(|c| !identity.contains(&c.as_str()))
                .cloned(),
        );
    }

    columns
}

/// Writes the records to a CSV file
///
/// Non-numeric values are quoted. A field a record lacks is written empty.
///
/// # Returns
///
/// * `Ok(usize)` - Number of records written
/// * `Err(HarvestError)` - The file could not be written
pub fn write_records(
    path: &Path,
    extractor_columns: &[String],
    records: &[Record],
) -> Result<usize, HarvestError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let columns = record_columns(extractor_columns, records);
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::NonNumeric)
        .from_path(path)?;

    writer.write_record(&columns)?;
    for record in records {
        writer.write_record(columns.iter().map(|c| record.get(c).unwrap_or_default()))?;
    }
    writer.flush()?;

    tracing::info!("Wrote {} records to {}", records.len(), path.display());
    Ok(records.len())
}
