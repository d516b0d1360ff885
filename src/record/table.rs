//! Label/value table extraction for detail pages
//!
//! Directory detail pages usually present an entry as a two-column table:
//! a label cell (`th` or the first `td`) followed by the value cell(s).

use crate::config::{FieldMapping, RecordConfig};
use crate::crawler::{parse_selector, EntryLink};
use crate::record::{Record, RecordExtractor};
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};

/// Extracts records from a label/value table
pub struct TableRecordExtractor {
    table: Selector,
    row: Selector,
    cell: Selector,
    fields: Vec<FieldMapping>,
}

impl TableRecordExtractor {
    /// Builds an extractor from the `[record]` configuration
    ///
    /// With no configured fields, every labelled row becomes a column named
    /// after its slugified label.
    pub fn new(config: &RecordConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            table: parse_selector(&config.table_selector)?,
            row: parse_selector("tr")?,
            cell: parse_selector("th, td")?,
            fields: config.fields.clone(),
        })
    }

    /// Maps a row label to its output column, if kept
    fn column_for(&self, label: &str) -> Option<String> {
        if self.fields.is_empty() {
            let slug = slugify(label);
            return (!slug.is_empty()).then_some(slug);
        }

        let label = normalize_label(label);
        self.fields
            .iter()
            .find(|f| normalize_label(&f.label) == label)
            .map(|f| f.column.clone())
    }

    /// Reads the (label, value) pairs of every row with at least two cells
    fn rows(&self, table: ElementRef<'_>) -> Vec<(String, String)> {
        let mut rows = Vec::new();

        for row in table.select(&self.row) {
            let cells: Vec<String> = row.select(&self.cell).map(cell_text).collect();
            if cells.len() < 2 || cells[0].is_empty() {
                continue;
            }

            let value = cells[1..]
                .iter()
                .filter(|c| !c.is_empty())
                .cloned()
                .collect::<Vec<_>>()
                .join(" ");
            rows.push((cells[0].clone(), value));
        }

        rows
    }
}

impl RecordExtractor for TableRecordExtractor {
    fn extract(&self, page: &str, link: &EntryLink) -> Option<Record> {
        let document = Html::parse_document(page);

        let Some(table) = document.select(&self.table).next() else {
            tracing::debug!("No record table on detail page {}", link.url);
            return None;
        };

        let rows = self.rows(table);
        if rows.is_empty() {
            tracing::debug!("Record table on {} has no label/value rows", link.url);
            return None;
        }

        let mut builder = Record::builder(link);
        for (label, value) in rows {
            if let Some(column) = self.column_for(&label) {
                builder = builder.field(column, value);
            }
        }

        Some(builder.build())
    }

    fn columns(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.column.clone()).collect()
    }
}

/// Collapses the whitespace of a cell's text
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercases a label and drops a trailing colon
fn normalize_label(label: &str) -> String {
    label.trim().trim_end_matches(':').trim().to_lowercase()
}

/// Turns a label into a column name: `Permit number:` -> `permit-number`
fn slugify(label: &str) -> String {
    let mut slug = String::new();
    for c in normalize_label(label).chars() {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}
