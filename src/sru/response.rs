//! Decoded SRW search results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::error::Result;

use super::RecordParser;
use super::xml::{TextMatch, XmlDocument};

/// Record fields present regardless of record schema.
const SCHEMA_AGNOSTIC_PATHS: &[(&str, &str)] = &[
    ("packageId", ".//packageResourceId"),
    ("preview", ".//packagePreviewLocator"),
    ("download", ".//packageDownloadLocator"),
    ("thumbnail", ".//thumbnailLocation"),
    ("lastModified", ".//record/lastModified"),
    ("created", ".//record/created"),
];

/// A classification entry extracted from a record: taxa grouped under one
/// taxonomy source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// The taxonomy source the taxa belong to.
    pub source: String,
    /// The taxa listed under this source, in document order.
    pub taxa: Vec<TaxonEntry>,
}

/// A single taxon reference inside a classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonEntry {
    /// The taxon's external reference id, when present.
    pub ref_id: Option<String>,
    /// The taxon's display name, when present.
    pub name: Option<String>,
}

/// A flat library-object record decoded from one SRW record element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryRecord {
    fields: BTreeMap<String, TextMatch>,
    classifications: Vec<Classification>,
}

impl LibraryRecord {
    /// The first value of a field, or `None` when the record lacks it.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(TextMatch::first)
    }

    /// All values of a field in document order.
    #[must_use]
    pub fn get_all(&self, field: &str) -> Vec<&str> {
        self.fields.get(field).map(TextMatch::all).unwrap_or_default()
    }

    /// The record's classification entries.
    #[must_use]
    pub fn classifications(&self) -> &[Classification] {
        &self.classifications
    }
}

/// A decoded SRW search response.
#[derive(Debug, Clone, Default)]
pub struct SruResponse {
    total_records: usize,
    records: Vec<LibraryRecord>,
}

impl SruResponse {
    /// An empty response, used when the service returned no SRW XML.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decodes an SRW response body using the injected schema parser.
    ///
    /// An empty body decodes to an empty response. A mismatch between the
    /// declared total and the returned record count is diagnostic-only.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Service`] on malformed XML.
    pub fn parse(xml: &str, parser: &dyn RecordParser) -> Result<Self> {
        if xml.trim().is_empty() {
            return Ok(Self::empty());
        }

        let doc = XmlDocument::parse(xml)?;
        let total_records = doc
            .root()
            .get_text("searchRetrieveResponse/numberOfRecords", false)
            .and_then(|text| text.first().parse::<usize>().ok())
            .unwrap_or(0);

        let mut records = Vec::new();
        for record_element in doc.root().find_all("searchRetrieveResponse/records/record") {
            let mut fields = BTreeMap::new();
            for (field, path) in parser.field_paths() {
                if let Some(text) = record_element.get_text(path, false) {
                    fields.insert((*field).to_string(), text);
                }
            }
            for (field, path) in SCHEMA_AGNOSTIC_PATHS {
                if let Some(text) = record_element.get_text(path, false) {
                    fields.insert((*field).to_string(), text);
                }
            }
            records.push(LibraryRecord {
                fields,
                classifications: parser.classifications(record_element),
            });
        }

        if total_records != records.len() {
            warn!(
                declared = total_records,
                returned = records.len(),
                "Declared record total does not match returned records"
            );
        }

        Ok(Self {
            total_records,
            records,
        })
    }

    /// The total declared by the service, which may exceed the records
    /// actually returned.
    #[must_use]
    pub fn total_records(&self) -> usize {
        self.total_records
    }

    /// The decoded records.
    #[must_use]
    pub fn records(&self) -> &[LibraryRecord] {
        &self.records
    }

    /// Consumes the response, returning its records.
    #[must_use]
    pub fn into_records(self) -> Vec<LibraryRecord> {
        self.records
    }
}
