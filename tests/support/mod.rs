//! Shared helpers for the wiremock integration suites.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use stacks_client::config::keys;
use stacks_client::{CacheLookup, CacheValue, CacheWrite, Configuration, ProxyRegistry};

/// An in-memory cache backend registered into a proxy registry.
///
/// Keeps a handle on the underlying map so tests can assert on the keys
/// the SDK derived.
#[derive(Clone)]
pub struct MemoryCache {
    store: Arc<Mutex<HashMap<String, CacheValue>>>,
}

impl MemoryCache {
    pub fn register(registry: &ProxyRegistry) -> Self {
        let store: Arc<Mutex<HashMap<String, CacheValue>>> = Arc::default();

        let load_store = Arc::clone(&store);
        registry
            .register_cache_load(move |key| {
                load_store
                    .lock()
                    .ok()
                    .and_then(|guard| guard.get(key).cloned())
                    .map_or(CacheLookup::Missing, CacheLookup::Found)
            })
            .unwrap();

        let save_store = Arc::clone(&store);
        registry
            .register_cache_save(move |key, value, _expiry| {
                match save_store.lock() {
                    Ok(mut guard) => {
                        guard.insert(key.to_string(), value);
                        CacheWrite::Stored
                    }
                    Err(_) => CacheWrite::NotStored,
                }
            })
            .unwrap();

        Self { store }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.store.lock().map(|guard| guard.contains_key(key)).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.store.lock().map(|guard| guard.len()).unwrap_or(0)
    }
}

/// A registry that tolerates missing callbacks (no cache, silent debug).
pub fn tolerant_registry() -> Arc<ProxyRegistry> {
    let registry = ProxyRegistry::new();
    registry.set_tolerant(true);
    Arc::new(registry)
}

/// Full connection configuration pointed at a mock server.
pub fn configured(uri: &str) -> Arc<Configuration> {
    let mut config = Configuration::new();
    config.set(keys::HOSTNAME, uri);
    config.set(keys::USERNAME, "reader");
    config.set(keys::PASSWORD, "reader-pw");
    config.set(keys::ADMIN_USERNAME, "admin");
    config.set(keys::ADMIN_PASSWORD, "admin-pw");
    Arc::new(config)
}

/// Wraps a `response` member in the REST JSON envelope.
pub fn envelope(response: Value) -> String {
    json!({"stacks-ws": {"response": response}}).to_string()
}

/// An envelope carrying a taxonomy list.
pub fn taxonomy_envelope(tree: Value) -> String {
    envelope(json!({"list": {"taxonomy": tree}}))
}

/// The unauthorized exception the service emits for non-admin sessions.
pub fn unauthorized_envelope() -> String {
    envelope(json!({"exception": {"message":
        "Cannot access to this action because :You need to have admin access[false] => FAILED"}}))
}

/// A two-level taxonomy tree: taxonomy 10 (source S) with taxon 20 (R1)
/// containing taxon 30 (R2).
pub fn sample_tree() -> Value {
    json!({
        "_attributes": {"id": "10", "name": "Animals", "description": "", "source": "S"},
        "taxon": {
            "_attributes": {"id": "20", "name": "Birds", "description": "", "refId": "R1"},
            "taxon": {
                "_attributes": {"id": "30", "name": "Owls", "description": "", "refId": "R2"}
            }
        }
    })
}
