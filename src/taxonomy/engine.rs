//! Taxonomy retrieval, recursive tree parsing, and multi-key caching.
//!
//! Retrieval is a small state machine per call: check the external cache,
//! check the in-process runtime fallback, rebuild the entire tree from the
//! Taxonomy REST service at most once, then check both caches once more.
//! "Not found" is a normal absent result, never an error.
//!
//! Every node parsed from a rebuild is written to the external cache under
//! up to three derived keys (id, refId+source, source). A refused external
//! write degrades to the runtime fallback map under the identical key, so
//! lookups within the same process still succeed.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::{Configuration, keys};
use crate::error::{Error, Result};
use crate::proxy::{CacheLookup, CacheValue, CacheWrite, ProxyRegistry};
use crate::rest::RestRequest;

use super::node::{CachePrefix, NodeType, TaxonomyNode, cache_key};

/// REST method serving the full taxonomy collection.
pub const TAXONOMY_REST_METHOD: &str = "Taxonomy";

/// Per-call retrieval state: which identifier family is being resolved.
/// Discarded after each call; exists only to derive the cache key.
struct RetrieveState {
    identifier: String,
    prefix: CachePrefix,
    node_type: NodeType,
    source: Option<String>,
}

impl RetrieveState {
    fn cache_key(&self) -> String {
        cache_key(
            &self.identifier,
            self.prefix,
            self.node_type,
            self.source.as_deref(),
        )
    }
}

/// Resolves taxonomy nodes against the external cache, the in-process
/// runtime fallback, and the Taxonomy REST service.
pub struct TaxonomyData {
    config: Arc<Configuration>,
    registry: Arc<ProxyRegistry>,
    // Session-scoped secondary store for nodes the external cache refused.
    runtime_cache: DashMap<String, TaxonomyNode>,
}

impl TaxonomyData {
    /// Creates an engine over the given configuration and proxy registry.
    #[must_use]
    pub fn new(config: Arc<Configuration>, registry: Arc<ProxyRegistry>) -> Self {
        Self {
            config,
            registry,
            runtime_cache: DashMap::new(),
        }
    }

    /// Retrieves a node by id.
    ///
    /// An empty id returns `Ok(None)` without touching any cache.
    ///
    /// # Errors
    ///
    /// Propagates rebuild failures (configuration, service, malformed
    /// taxonomy data). Absence is `Ok(None)`.
    #[instrument(skip(self), fields(node_type = %node_type))]
    pub async fn retrieve_by_id(
        &self,
        id: &str,
        node_type: NodeType,
    ) -> Result<Option<TaxonomyNode>> {
        if id.is_empty() {
            return Ok(None);
        }
        self.retrieve(RetrieveState {
            identifier: id.to_string(),
            prefix: CachePrefix::Id,
            node_type,
            source: None,
        })
        .await
    }

    /// Retrieves a taxon by its reference id within a source taxonomy.
    ///
    /// An empty ref id or source returns `Ok(None)` without touching any
    /// cache.
    ///
    /// # Errors
    ///
    /// Propagates rebuild failures. Absence is `Ok(None)`.
    #[instrument(skip(self))]
    pub async fn retrieve_by_ref_id(
        &self,
        ref_id: &str,
        source: &str,
    ) -> Result<Option<TaxonomyNode>> {
        if ref_id.is_empty() || source.is_empty() {
            return Ok(None);
        }
        self.retrieve(RetrieveState {
            identifier: ref_id.to_string(),
            prefix: CachePrefix::RefId,
            node_type: NodeType::Taxon,
            source: Some(source.to_string()),
        })
        .await
    }

    /// Retrieves a taxonomy by its source identifier.
    ///
    /// An empty source returns `Ok(None)` without touching any cache.
    ///
    /// # Errors
    ///
    /// Propagates rebuild failures. Absence is `Ok(None)`.
    #[instrument(skip(self))]
    pub async fn retrieve_by_source(&self, source: &str) -> Result<Option<TaxonomyNode>> {
        if source.is_empty() {
            return Ok(None);
        }
        self.retrieve(RetrieveState {
            identifier: source.to_string(),
            prefix: CachePrefix::Source,
            node_type: NodeType::Taxonomy,
            source: None,
        })
        .await
    }

    /// The retrieval state machine: caches, one rebuild, caches again.
    async fn retrieve(&self, state: RetrieveState) -> Result<Option<TaxonomyNode>> {
        let key = state.cache_key();
        if let Some(node) = self.check_caches(&key, state.node_type)? {
            return Ok(Some(node));
        }

        debug!(key, "Cache miss; rebuilding taxonomy tree");
        self.get_available_taxonomies(true, false).await?;

        self.check_caches(&key, state.node_type)
    }

    /// One pass over both cache tiers. A hit must carry the expected node
    /// type; anything else counts as a miss.
    fn check_caches(&self, key: &str, node_type: NodeType) -> Result<Option<TaxonomyNode>> {
        if let CacheLookup::Found(value) = self.registry.cache_load(key)? {
            if let Some(node) = value.as_node() {
                if node.node_type() == node_type {
                    return Ok(Some(node.clone()));
                }
            }
        }
        if let Some(node) = self.runtime_cache.get(key) {
            if node.node_type() == node_type {
                return Ok(Some(node.clone()));
            }
        }
        Ok(None)
    }

    /// Returns the ordered top-level taxonomy ids available to the admin
    /// account or the configured user.
    ///
    /// With `use_cache`, a cached id list is returned unchanged. Otherwise
    /// the full taxonomy collection is fetched and recursively parsed,
    /// caching every node in the tree as a side effect. A response without
    /// a taxonomy list yields an empty sequence, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for missing hostname or admin
    /// credentials, [`Error::Service`] for failed admin recovery, and
    /// [`Error::InvalidTaxonData`] for a malformed tree.
    #[instrument(skip(self))]
    pub async fn get_available_taxonomies(
        &self,
        using_admin: bool,
        use_cache: bool,
    ) -> Result<Vec<String>> {
        let key = if using_admin {
            "taxonomies//admin".to_string()
        } else {
            format!(
                "taxonomies//user:{}",
                self.config.get(keys::USERNAME).unwrap_or("")
            )
        };

        if use_cache {
            if let CacheLookup::Found(value) = self.registry.cache_load(&key)? {
                if let Some(ids) = value.as_id_list() {
                    return Ok(ids.to_vec());
                }
            }
        }

        let mut request = RestRequest::new(Arc::clone(&self.config), Arc::clone(&self.registry))?;
        let response = if using_admin {
            request.admin_get(TAXONOMY_REST_METHOD, &[]).await?
        } else {
            request.get(TAXONOMY_REST_METHOD, &[]).await?
        };

        let Some(list) = response
            .data()
            .and_then(|data| data.get("list"))
            .and_then(|list| list.get("taxonomy"))
            .cloned()
        else {
            return Ok(Vec::new());
        };

        let ids = self.parse_taxonomy_data(&list, NodeType::Taxonomy, None, None)?;
        if self.registry.cache_save(&key, CacheValue::IdList(ids.clone()), None)?
            == CacheWrite::NotStored
        {
            debug!(key, "External cache refused taxonomy id list");
        }
        Ok(ids)
    }

    /// Recursively parses raw tree data, caching every node built.
    ///
    /// Returns the ids of the nodes at the highest level of `value`.
    /// Writes for siblings parsed before a malformed node are not rolled
    /// back.
    fn parse_taxonomy_data(
        &self,
        value: &Value,
        node_type: NodeType,
        parent: Option<&TaxonomyNode>,
        source: Option<&str>,
    ) -> Result<Vec<String>> {
        // A non-empty array is a list of siblings sharing this context.
        if let Some(siblings) = value.as_array().filter(|items| !items.is_empty()) {
            let mut ids = Vec::new();
            for sibling in siblings {
                ids.extend(self.parse_taxonomy_data(sibling, node_type, parent, source)?);
            }
            return Ok(ids);
        }

        if let Some(attrs) = value.get("_attributes") {
            let mut node = TaxonomyNode::from_attributes(node_type, attrs)?;
            node.set_parent(parent);

            // Only a Taxonomy contributes its own source; a Taxon inherits
            // the nearest enclosing Taxonomy's.
            let source = if node_type == NodeType::Taxonomy {
                node.source().map(str::to_string)
            } else {
                source.map(str::to_string)
            };

            if let Some(children) = value.get("taxon") {
                let child_ids = self.parse_taxonomy_data(
                    children,
                    NodeType::Taxon,
                    Some(&node),
                    source.as_deref(),
                )?;
                node.set_child_ids(child_ids);
            }

            self.cache_object(&node, source.as_deref())?;
            return Ok(vec![node.id().to_string()]);
        }

        Err(Error::InvalidTaxonData(
            "node is neither a sibling list nor an attributed object".to_string(),
        ))
    }

    /// Writes a parsed node under its derived keys: always by id, by
    /// refId+source for a Taxon, by source for a Taxonomy.
    fn cache_object(&self, node: &TaxonomyNode, source: Option<&str>) -> Result<()> {
        let id_key = cache_key(node.id(), CachePrefix::Id, node.node_type(), None);
        self.save_with_fallback(&id_key, node)?;

        match node.node_type() {
            NodeType::Taxon => {
                if let Some(ref_id) = node.ref_id() {
                    let ref_key = cache_key(ref_id, CachePrefix::RefId, NodeType::Taxon, source);
                    self.save_with_fallback(&ref_key, node)?;
                }
            }
            NodeType::Taxonomy => {
                if let Some(own_source) = node.source() {
                    let source_key =
                        cache_key(own_source, CachePrefix::Source, NodeType::Taxonomy, None);
                    self.save_with_fallback(&source_key, node)?;
                }
            }
        }
        Ok(())
    }

    /// External cache first with no expiry; the runtime map catches
    /// refused writes so same-process lookups still succeed.
    fn save_with_fallback(&self, key: &str, node: &TaxonomyNode) -> Result<()> {
        match self
            .registry
            .cache_save(key, CacheValue::Node(node.clone()), Some(0))?
        {
            CacheWrite::Stored => {}
            CacheWrite::NotStored => {
                warn!(key, "External cache write failed; using runtime fallback");
                self.runtime_cache.insert(key.to_string(), node.clone());
            }
        }
        Ok(())
    }

    /// The source of a node: a Taxonomy's own source, or for a Taxon the
    /// source of the nearest enclosing Taxonomy, resolved by walking the
    /// parent chain through [`Self::retrieve_by_id`] (which may itself
    /// trigger cache lookups and a rebuild).
    ///
    /// # Errors
    ///
    /// Propagates rebuild failures from parent resolution.
    pub async fn get_source(&self, node: &TaxonomyNode) -> Result<Option<String>> {
        let mut current = node.clone();
        loop {
            match current.node_type() {
                NodeType::Taxonomy => return Ok(current.source().map(str::to_string)),
                NodeType::Taxon => {
                    let (Some(parent_id), Some(parent_type)) = (
                        current.parent_id().map(str::to_string),
                        current.parent_type(),
                    ) else {
                        return Ok(None);
                    };
                    match self.retrieve_by_id(&parent_id, parent_type).await? {
                        Some(parent) => current = parent,
                        None => return Ok(None),
                    }
                }
            }
        }
    }

    /// Composes [`Self::retrieve_by_id`] and [`Self::get_source`].
    ///
    /// # Errors
    ///
    /// Propagates rebuild failures.
    pub async fn get_source_from_id(
        &self,
        id: &str,
        node_type: NodeType,
    ) -> Result<Option<String>> {
        match self.retrieve_by_id(id, node_type).await? {
            Some(node) => self.get_source(&node).await,
            None => Ok(None),
        }
    }

    #[cfg(test)]
    fn runtime_cached(&self, key: &str) -> Option<TaxonomyNode> {
        self.runtime_cache.get(key).map(|entry| entry.clone())
    }
}
