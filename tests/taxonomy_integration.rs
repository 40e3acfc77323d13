//! Integration tests for the taxonomy resolution and caching engine.
//!
//! Drives the full retrieval state machine against a mock REST service:
//! cache checks, the at-most-one rebuild, multi-key cache population and
//! the runtime fallback tier.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stacks_client::{NodeType, TaxonomyData};

mod support;
use support::{
    MemoryCache, configured, sample_tree, taxonomy_envelope, tolerant_registry,
};

async fn mount_taxonomy_collection(server: &MockServer, body: String, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/Stacks-REST/Taxonomy"))
        .and(query_param("output", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_retrieve_by_id_rebuilds_once_then_hits_cache() {
    let server = MockServer::start().await;
    mount_taxonomy_collection(&server, taxonomy_envelope(sample_tree()), 1).await;

    let registry = tolerant_registry();
    let cache = MemoryCache::register(&registry);
    let engine = TaxonomyData::new(configured(&server.uri()), registry);

    let first = engine.retrieve_by_id("20", NodeType::Taxon).await.unwrap();
    let node = first.expect("taxon 20 should resolve after rebuild");
    assert_eq!(node.id(), "20");
    assert_eq!(node.ref_id(), Some("R1"));
    assert_eq!(node.parent_id(), Some("10"));

    // Second retrieval is served from cache; the mock's expect(1) verifies
    // no second rebuild happened.
    let second = engine.retrieve_by_id("20", NodeType::Taxon).await.unwrap();
    assert_eq!(second, Some(node));

    assert!(cache.contains("taxon-Id-_20"));
    assert!(cache.contains("taxon-RefId-S_R1"));
    assert!(cache.contains("taxonomy-Id-_10"));
    assert!(cache.contains("taxonomy-Source-_S"));
}

#[tokio::test]
async fn test_retrieve_missing_id_rebuilds_at_most_once_and_returns_absent() {
    let server = MockServer::start().await;
    mount_taxonomy_collection(&server, taxonomy_envelope(sample_tree()), 1).await;

    let registry = tolerant_registry();
    let _cache = MemoryCache::register(&registry);
    let engine = TaxonomyData::new(configured(&server.uri()), registry);

    let resolved = engine.retrieve_by_id("999", NodeType::Taxon).await.unwrap();
    assert!(resolved.is_none(), "absent node is a normal result, not an error");
}

#[tokio::test]
async fn test_retrieve_by_ref_id_and_source() {
    let server = MockServer::start().await;
    mount_taxonomy_collection(&server, taxonomy_envelope(sample_tree()), 1).await;

    let registry = tolerant_registry();
    let _cache = MemoryCache::register(&registry);
    let engine = TaxonomyData::new(configured(&server.uri()), registry);

    let taxon = engine.retrieve_by_ref_id("R2", "S").await.unwrap();
    assert_eq!(taxon.unwrap().id(), "30");

    // The tree is already cached; the same mock serves at most one call.
    let taxonomy = engine.retrieve_by_source("S").await.unwrap();
    assert_eq!(taxonomy.unwrap().id(), "10");
}

#[tokio::test]
async fn test_source_inheritance_through_arbitrary_depth() {
    let server = MockServer::start().await;
    mount_taxonomy_collection(&server, taxonomy_envelope(sample_tree()), 1).await;

    let registry = tolerant_registry();
    let _cache = MemoryCache::register(&registry);
    let engine = TaxonomyData::new(configured(&server.uri()), registry);

    // The leaf taxon inherits the root taxonomy's source through two
    // parent hops.
    let source = engine.get_source_from_id("30", NodeType::Taxon).await.unwrap();
    assert_eq!(source.as_deref(), Some("S"));

    let direct = engine.get_source_from_id("10", NodeType::Taxonomy).await.unwrap();
    assert_eq!(direct.as_deref(), Some("S"));
}

#[tokio::test]
async fn test_sibling_taxonomies_return_ordered_id_list() {
    let server = MockServer::start().await;
    let tree = json!([
        {"_attributes": {"id": "1", "name": "A", "description": "", "source": "SA"}},
        {"_attributes": {"id": "2", "name": "B", "description": "", "source": "SB"}}
    ]);
    mount_taxonomy_collection(&server, taxonomy_envelope(tree), 1).await;

    let registry = tolerant_registry();
    let cache = MemoryCache::register(&registry);
    let engine = TaxonomyData::new(configured(&server.uri()), registry);

    let ids = engine.get_available_taxonomies(true, false).await.unwrap();
    assert_eq!(ids, vec!["1".to_string(), "2".to_string()]);
    assert!(cache.contains("taxonomy-Id-_1"));
    assert!(cache.contains("taxonomy-Id-_2"));
}

#[tokio::test]
async fn test_available_taxonomies_id_list_is_cached() {
    let server = MockServer::start().await;
    mount_taxonomy_collection(&server, taxonomy_envelope(sample_tree()), 1).await;

    let registry = tolerant_registry();
    let cache = MemoryCache::register(&registry);
    let engine = TaxonomyData::new(configured(&server.uri()), registry);

    let first = engine.get_available_taxonomies(true, true).await.unwrap();
    assert_eq!(first, vec!["10".to_string()]);
    assert!(cache.contains("taxonomies//admin"));

    // Second call honors the cached id list; expect(1) verifies no
    // further service call.
    let second = engine.get_available_taxonomies(true, true).await.unwrap();
    assert_eq!(second, first);
}

#[tokio::test]
async fn test_empty_taxonomy_list_is_empty_sequence_not_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Stacks-REST/Taxonomy"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            support::envelope(json!({"list": {}})),
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let registry = tolerant_registry();
    let _cache = MemoryCache::register(&registry);
    let engine = TaxonomyData::new(configured(&server.uri()), registry);

    let ids = engine.get_available_taxonomies(true, false).await.unwrap();
    assert!(ids.is_empty());
}

#[tokio::test]
async fn test_malformed_tree_is_fatal_for_the_parse() {
    let server = MockServer::start().await;
    let tree = json!({"unexpected": "shape"});
    mount_taxonomy_collection(&server, taxonomy_envelope(tree), 1).await;

    let registry = tolerant_registry();
    let _cache = MemoryCache::register(&registry);
    let engine = TaxonomyData::new(configured(&server.uri()), registry);

    let err = engine.get_available_taxonomies(true, false).await.unwrap_err();
    assert!(err.to_string().contains("invalid taxon data"));
}

#[tokio::test]
async fn test_refused_external_writes_fall_back_to_runtime_cache() {
    let server = MockServer::start().await;
    // One rebuild only: after it, every node must be resolvable from the
    // runtime fallback even though the external cache refuses all writes.
    mount_taxonomy_collection(&server, taxonomy_envelope(sample_tree()), 1).await;

    let registry = tolerant_registry();
    registry
        .register_cache_load(|_key| stacks_client::CacheLookup::Missing)
        .unwrap();
    registry
        .register_cache_save(|_key, _value, _expiry| stacks_client::CacheWrite::NotStored)
        .unwrap();
    let engine = TaxonomyData::new(configured(&server.uri()), registry);

    let first = engine.retrieve_by_id("30", NodeType::Taxon).await.unwrap();
    assert!(first.is_some());

    let second = engine.retrieve_by_id("20", NodeType::Taxon).await.unwrap();
    assert!(second.is_some(), "runtime fallback must serve later lookups");
}
