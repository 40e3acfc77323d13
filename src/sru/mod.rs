//! SRU/SRW XML response decoding and XSearch query execution.
//!
//! The search services speak SRW XML. This module folds the quick-xml
//! event stream into a small element tree, offers slash-path lookups with
//! explicit single/multi text extraction, and delegates per-record field
//! extraction to an injected [`RecordParser`] schema collaborator.
//!
//! - [`XmlDocument`] / [`XmlElement`] - parsed element tree
//! - [`TextMatch`] - single-or-many text extraction result
//! - [`RecordParser`] / [`LomRecordParser`] - schema seam and shipped LOM
//!   implementation
//! - [`SruResponse`] / [`LibraryRecord`] - decoded search results
//! - [`XSearchRequest`] / [`XSearchQuery`] - search query construction

mod lom;
mod response;
mod xml;
mod xsearch;

pub use lom::LomRecordParser;
pub use response::{Classification, LibraryRecord, SruResponse, TaxonEntry};
pub use xml::{TextMatch, XmlDocument, XmlElement};
pub use xsearch::{XSEARCH_ENDPOINT, XSearchQuery, XSearchRequest};

/// Schema-specific record extraction, injected into SRW decoding.
///
/// Implementations name their record schema (sent as the `recordSchema`
/// query parameter), map flat field names to element paths, and extract
/// the record's classification entries.
pub trait RecordParser: Send + Sync {
    /// The record schema identifier, e.g. `lom`.
    fn record_schema(&self) -> &'static str;

    /// Field-name to element-path mapping applied to every record.
    fn field_paths(&self) -> &[(&'static str, &'static str)];

    /// Extracts classification entries from a record element.
    fn classifications(&self, record: &XmlElement) -> Vec<Classification>;
}
