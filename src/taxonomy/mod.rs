//! Taxonomy resolution and caching engine.
//!
//! - [`TaxonomyNode`] / [`NodeType`] - the parsed node model
//! - [`CachePrefix`] / [`cache_key`] - derived cache-key formula
//! - [`TaxonomyData`] - retrieval state machine over the two cache tiers
//!   and the Taxonomy REST service

mod engine;
mod node;

pub use engine::{TAXONOMY_REST_METHOD, TaxonomyData};
pub use node::{CachePrefix, NodeType, TaxonomyNode, cache_key};
