//! Taxonomy node model and cache-key derivation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// The two kinds of taxonomy node.
///
/// A node's type is fixed at construction and decides which of
/// `ref_id`/`source` it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// A classification scheme, identified by a `source`.
    Taxonomy,
    /// An entry within a scheme, identified by a `ref_id` unique within
    /// its source.
    Taxon,
}

impl NodeType {
    /// The lowercase wire/cache-key spelling of the type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Taxonomy => "taxonomy",
            Self::Taxon => "taxon",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identifier family a cache key is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePrefix {
    /// Keyed by node id.
    Id,
    /// Keyed by ref id scoped to a source.
    RefId,
    /// Keyed by taxonomy source.
    Source,
}

impl CachePrefix {
    /// The spelling used inside cache keys.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "Id",
            Self::RefId => "RefId",
            Self::Source => "Source",
        }
    }
}

/// Derives the cache key for an identifier.
///
/// The formula is shared byte-for-byte by the write path (caching parsed
/// nodes) and the read path (retrieval state): `source` contributes an
/// empty string when not applicable.
#[must_use]
pub fn cache_key(
    identifier: &str,
    prefix: CachePrefix,
    node_type: NodeType,
    source: Option<&str>,
) -> String {
    format!(
        "{}-{}-{}_{}",
        node_type.as_str(),
        prefix.as_str(),
        source.unwrap_or(""),
        identifier
    )
}

/// A taxonomy or taxon node parsed from the Taxonomy REST service.
///
/// Nodes are created only by the recursive tree parser and are immutable
/// afterwards; parent and children are set once before the node is cached.
/// The parent back-reference is weak: it is an id/type pair resolved
/// through the retrieval engine, never an owning pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyNode {
    node_type: NodeType,
    id: String,
    name: Option<String>,
    description: Option<String>,
    ref_id: Option<String>,
    source: Option<String>,
    parent_id: Option<String>,
    parent_type: Option<NodeType>,
    child_ids: Vec<String>,
    /// Attributes beyond the modeled set, e.g. `useFors`.
    extra: BTreeMap<String, Value>,
}

fn attribute_string(attrs: &Value, name: &str) -> Option<String> {
    match attrs.get(name)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

impl TaxonomyNode {
    /// Builds a node from the `_attributes` member of a service response.
    ///
    /// A Taxon takes its `refId`; a Taxonomy takes its `source`; the two
    /// are mutually exclusive by construction. Attributes outside the
    /// modeled set are preserved in `extra`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTaxonData`] when the attributes carry no id.
    pub(crate) fn from_attributes(node_type: NodeType, attrs: &Value) -> Result<Self> {
        let id = attribute_string(attrs, "id")
            .ok_or_else(|| Error::InvalidTaxonData("node attributes carry no id".to_string()))?;

        let (ref_id, source) = match node_type {
            NodeType::Taxon => (attribute_string(attrs, "refId"), None),
            NodeType::Taxonomy => (None, attribute_string(attrs, "source")),
        };

        let modeled = ["id", "name", "description", "refId", "source"];
        let extra = attrs
            .as_object()
            .map(|object| {
                object
                    .iter()
                    .filter(|(key, _)| !modeled.contains(&key.as_str()))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            node_type,
            id,
            name: attribute_string(attrs, "name"),
            description: attribute_string(attrs, "description"),
            ref_id,
            source,
            parent_id: None,
            parent_type: None,
            child_ids: Vec::new(),
            extra,
        })
    }

    /// Records the weak back-reference to `parent`. Root nodes keep both
    /// fields unset.
    pub(crate) fn set_parent(&mut self, parent: Option<&TaxonomyNode>) {
        match parent {
            Some(parent) => {
                self.parent_id = Some(parent.id.clone());
                self.parent_type = Some(parent.node_type);
            }
            None => {
                self.parent_id = None;
                self.parent_type = None;
            }
        }
    }

    /// Records the ordered ids of this node's children.
    pub(crate) fn set_child_ids(&mut self, child_ids: Vec<String>) {
        self.child_ids = child_ids;
    }

    /// The node's type.
    #[must_use]
    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    /// The node's id, unique within its type.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name, when the service supplied one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Description, when the service supplied one.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// External reference id; populated only for Taxon nodes.
    #[must_use]
    pub fn ref_id(&self) -> Option<&str> {
        self.ref_id.as_deref()
    }

    /// Stored source; populated only for Taxonomy nodes. A Taxon's source
    /// is derived by walking the parent chain — see
    /// [`crate::taxonomy::TaxonomyData::get_source`].
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Parent node id, unset for roots.
    #[must_use]
    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    /// Parent node type, unset for roots.
    #[must_use]
    pub fn parent_type(&self) -> Option<NodeType> {
        self.parent_type
    }

    /// Ordered child node ids, resolvable via retrieval by id.
    #[must_use]
    pub fn child_ids(&self) -> &[String] {
        &self.child_ids
    }

    /// A preserved attribute outside the modeled set (e.g. `useFors`).
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }
}
