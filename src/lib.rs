//! Stacks Client Library
//!
//! This library is a client SDK for the Stacks digital-library web-service
//! suite. A host application configures connection details once, then
//! queries and searches remote library objects and resolves hierarchical
//! taxonomy metadata, while the SDK hides authentication, the
//! unauthorized-retry protocol, response parsing, and a pluggable cache.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Key/value configuration consumed by the request layer
//! - [`proxy`] - Host-pluggable cache and debug action registry
//! - [`rest`] - Authenticated REST request protocol and envelope decoding
//! - [`sru`] - SRU/SRW XML response decoding and XSearch queries
//! - [`taxonomy`] - Taxonomy resolution and caching engine
//! - [`objects`] - Library-object search and result caching

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod objects;
pub mod proxy;
pub mod rest;
pub mod sru;
pub mod taxonomy;

// Re-export commonly used types
pub use config::Configuration;
pub use error::Error;
pub use objects::ObjectStore;
pub use proxy::{CacheLookup, CacheValue, CacheWrite, ProxyAction, ProxyRegistry};
pub use rest::{RestRequest, RestResponse};
pub use sru::{
    LibraryRecord, LomRecordParser, RecordParser, SruResponse, XSearchQuery, XSearchRequest,
};
pub use taxonomy::{CachePrefix, NodeType, TaxonomyData, TaxonomyNode, cache_key};
