//! Structured records extracted from detail pages
//!
//! A [`Record`] is the output of the harvest for one entry. Page layouts are
//! site-specific, so extraction sits behind the [`RecordExtractor`] trait;
//! [`TableRecordExtractor`] covers the common label/value table layout.

mod table;

pub use table::TableRecordExtractor;

use crate::crawler::EntryLink;
use std::collections::BTreeMap;

/// One extracted entry: an immutable mapping from field name to value
///
/// Every record carries the identity field `id` (the entry's dedup key),
/// plus `name` and `url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: BTreeMap<String, String>,
}

impl Record {
    pub const ID: &'static str = "id";
    pub const NAME: &'static str = "name";
    pub const URL: &'static str = "url";

    /// Starts a record for the entry behind `link`
    pub fn builder(link: &EntryLink) -> RecordBuilder {
        let mut fields = BTreeMap::new();
        fields.insert(Self::ID.to_string(), link.key.clone());
        fields.insert(
            Self::NAME.to_string(),
            link.name.clone().unwrap_or_default(),
        );
        fields.insert(Self::URL.to_string(), link.url.to_string());
        RecordBuilder { fields }
    }

    /// The identity field
    pub fn id(&self) -> &str {
        self.get(Self::ID).unwrap_or_default()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// All fields, ordered by name
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of fields, identity fields included
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builder for [`Record`]
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    fields: BTreeMap<String, String>,
}

impl RecordBuilder {
    /// Sets a field
    ///
    /// `id` and `url` cannot be overwritten. `name` keeps the listing's
    /// display name and is only filled when the link had none.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        if name == Record::ID || name == Record::URL {
            return self;
        }
        if name == Record::NAME && self.fields.get(Record::NAME).is_some_and(|n| !n.is_empty()) {
            return self;
        }
        self.fields.insert(name, value.into());
        self
    }

    pub fn build(self) -> Record {
        Record {
            fields: self.fields,
        }
    }
}

/// Turns a fetched detail page into a record
///
/// Implementations must tolerate pages that lack the expected structure by
/// returning `None`; a single malformed page never aborts a harvest.
pub trait RecordExtractor: Send + Sync {
    /// Extracts the record for `link` from its raw detail page
    fn extract(&self, page: &str, link: &EntryLink) -> Option<Record>;

    /// Extracted columns in output order, after `id`, `name` and `url`
    ///
    /// An empty list means the columns are only known from the records.
    fn columns(&self) -> Vec<String>;
}
