//! Library-object search and result caching.
//!
//! A peer consumer of the request layer: builds XSearch queries from
//! shortcut metadata parameters, caches the decoded results through the
//! proxy registry, and exposes the admin group listing. Unlike the
//! taxonomy engine this store is single-tier: a refused external cache
//! write is logged and the result simply stays uncached.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::{Configuration, keys};
use crate::error::Result;
use crate::proxy::{CacheLookup, CacheValue, CacheWrite, ProxyRegistry};
use crate::rest::RestRequest;
use crate::sru::{LibraryRecord, LomRecordParser, XSearchQuery, XSearchRequest};

/// Shortcut names accepted by [`ObjectStore::get_objects`] and the LOM
/// metadata fields they expand to. Unknown names pass through unchanged.
const METADATA_PARAM_MAP: &[(&str, &str)] = &[
    ("type", "lom.educational_learningResourceType"),
    ("taxon", "lom.classification_taxonpath_taxon_id"),
    ("source", "lom.classification_taxonpath_source"),
    ("catalog", "lom.general_catalogentry_entry"),
];

/// REST method serving the group listing.
const GROUP_REST_METHOD: &str = "Group";

fn expand_param(name: &str) -> &str {
    METADATA_PARAM_MAP
        .iter()
        .find(|(shortcut, _)| *shortcut == name)
        .map_or(name, |(_, field)| field)
}

/// Joins metadata conditions into one XSearch query expression.
fn build_query(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(name, value)| format!("{}={value}", expand_param(name)))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Search-query construction and result caching for library objects.
pub struct ObjectStore {
    config: Arc<Configuration>,
    registry: Arc<ProxyRegistry>,
    username: String,
}

impl ObjectStore {
    /// Creates a store bound to the configured username (part of every
    /// user-scoped cache key).
    #[must_use]
    pub fn new(config: Arc<Configuration>, registry: Arc<ProxyRegistry>) -> Self {
        let username = config.get(keys::USERNAME).unwrap_or("").to_string();
        Self {
            config,
            registry,
            username,
        }
    }

    /// Retrieves the objects matching the metadata `params`, cached per
    /// user, parameter set and limit.
    ///
    /// Results are sorted by title.
    ///
    /// # Errors
    ///
    /// Propagates configuration and service failures from the search call.
    #[instrument(skip(self))]
    pub async fn get_objects(
        &self,
        params: &[(&str, &str)],
        limit: Option<u32>,
    ) -> Result<Vec<LibraryRecord>> {
        let mut key = format!("objects//user:{}", self.username);
        for (name, value) in params {
            key.push_str(&format!("//{name}:{value}"));
        }
        if let Some(limit) = limit {
            key.push_str(&format!("//limit:{limit}"));
        }

        if let Some(cached) = self.cached_payload(&key)? {
            if let Ok(records) = serde_json::from_value::<Vec<LibraryRecord>>(cached) {
                return Ok(records);
            }
        }

        let mut query = XSearchQuery::new(build_query(params));
        query.limit = limit;
        let mut request =
            XSearchRequest::new(Arc::clone(&self.config), Arc::clone(&self.registry))?;
        let response = request.query(&query, &LomRecordParser::new()).await?;

        let mut records = response.into_records();
        records.sort_by(|a, b| {
            a.get("title")
                .unwrap_or("")
                .to_lowercase()
                .cmp(&b.get("title").unwrap_or("").to_lowercase())
        });

        self.save_payload(&key, serde_json::to_value(&records).unwrap_or(Value::Null))?;
        Ok(records)
    }

    /// Convenience wrapper filtering by resource type and, optionally, a
    /// taxon source.
    ///
    /// # Errors
    ///
    /// Propagates configuration and service failures from the search call.
    pub async fn get_objects_by_type(
        &self,
        resource_type: &str,
        taxon_source: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<LibraryRecord>> {
        let mut params: Vec<(&str, &str)> = vec![("type", resource_type)];
        if let Some(source) = taxon_source {
            params.push(("source", source));
        }
        self.get_objects(&params, limit).await
    }

    /// Retrieves a single object by its catalog entry.
    ///
    /// An empty catalog entry returns `Ok(None)` without touching the
    /// cache.
    ///
    /// # Errors
    ///
    /// Propagates configuration and service failures from the search call.
    #[instrument(skip(self))]
    pub async fn get_object_by_catalog_entry(
        &self,
        catalog_entry: &str,
    ) -> Result<Option<LibraryRecord>> {
        if catalog_entry.is_empty() {
            return Ok(None);
        }

        let key = format!("object//catalogEntry:{catalog_entry}");
        if let Some(cached) = self.cached_payload(&key)? {
            if let Ok(record) = serde_json::from_value::<LibraryRecord>(cached) {
                return Ok(Some(record));
            }
        }

        let query = XSearchQuery::new(build_query(&[("catalog", catalog_entry)]));
        let mut request =
            XSearchRequest::new(Arc::clone(&self.config), Arc::clone(&self.registry))?;
        let response = request.query(&query, &LomRecordParser::new()).await?;
        let record = response.into_records().into_iter().next();

        if let Some(record) = &record {
            self.save_payload(&key, serde_json::to_value(record).unwrap_or(Value::Null))?;
        }
        Ok(record)
    }

    /// Retrieves the user groups as an id-keyed map, via an admin-scoped
    /// REST call, cached under a shared key.
    ///
    /// # Errors
    ///
    /// Propagates configuration and service failures from the admin call.
    #[instrument(skip(self))]
    pub async fn get_groups(&self) -> Result<BTreeMap<String, Value>> {
        let key = "groups";
        if let Some(cached) = self.cached_payload(key)? {
            if let Ok(groups) = serde_json::from_value::<BTreeMap<String, Value>>(cached) {
                return Ok(groups);
            }
        }

        let mut request = RestRequest::new(Arc::clone(&self.config), Arc::clone(&self.registry))?;
        let response = request.admin_get(GROUP_REST_METHOD, &[]).await?;

        let mut groups = BTreeMap::new();
        if let Some(list) = response
            .data()
            .and_then(|data| data.get("list"))
            .and_then(|list| list.get("group"))
            .and_then(Value::as_array)
        {
            for group in list {
                let Some(id) = group.get("id") else { continue };
                let id = match id {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                groups.insert(id, group.clone());
            }
        }

        self.save_payload(key, serde_json::to_value(&groups).unwrap_or(Value::Null))?;
        Ok(groups)
    }

    fn cached_payload(&self, key: &str) -> Result<Option<Value>> {
        if let CacheLookup::Found(value) = self.registry.cache_load(key)? {
            return Ok(value.as_payload().cloned());
        }
        Ok(None)
    }

    fn save_payload(&self, key: &str, payload: Value) -> Result<()> {
        if self.registry.cache_save(key, CacheValue::Payload(payload), None)?
            == CacheWrite::NotStored
        {
            debug!(key, "External cache refused object-store payload");
        }
        Ok(())
    }
}
