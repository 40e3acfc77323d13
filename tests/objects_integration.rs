//! Integration tests for the object store.
//!
//! Exercises shortcut-parameter expansion into XSearch queries, SRW
//! decoding, title sorting, and result caching for searches and the
//! admin group listing.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stacks_client::ObjectStore;

mod support;
use support::{MemoryCache, configured, envelope, tolerant_registry};

const SEARCH_RESPONSE: &str = r#"
    <searchRetrieveResponse xmlns="http://www.loc.gov/zing/srw/">
        <numberOfRecords>2</numberOfRecords>
        <records>
            <record>
                <lom><general><title><string>Zebra Guide</string></title></general></lom>
                <packageResourceId>pkg-z</packageResourceId>
            </record>
            <record>
                <lom><general><title><string>bird atlas</string></title></general></lom>
                <packageResourceId>pkg-b</packageResourceId>
            </record>
        </records>
    </searchRetrieveResponse>"#;

const CATALOG_RESPONSE: &str = r#"
    <searchRetrieveResponse>
        <numberOfRecords>1</numberOfRecords>
        <records>
            <record>
                <lom><general>
                    <identifier><catalog>lib</catalog><entry>CAT-9</entry></identifier>
                    <title><string>Owl Survey</string></title>
                </general></lom>
            </record>
        </records>
    </searchRetrieveResponse>"#;

#[tokio::test]
async fn test_get_objects_expands_params_sorts_by_title_and_caches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Stacks-XSearch"))
        .and(query_param("version", "1.1"))
        .and(query_param("operation", "searchRetrieve"))
        .and(query_param("recordSchema", "lom"))
        .and(query_param("username", "reader"))
        .and(query_param("query", "lom.educational_learningResourceType=Video"))
        .and(query_param("maximumRecords", "5"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(SEARCH_RESPONSE, "application/xml"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let registry = tolerant_registry();
    let cache = MemoryCache::register(&registry);
    let store = ObjectStore::new(configured(&server.uri()), registry);

    let records = store.get_objects(&[("type", "Video")], Some(5)).await.unwrap();
    assert_eq!(records.len(), 2);
    // Sorting is case-insensitive on the title.
    assert_eq!(records[0].get("title"), Some("bird atlas"));
    assert_eq!(records[1].get("title"), Some("Zebra Guide"));
    assert!(cache.contains("objects//user:reader//type:Video//limit:5"));

    // Second call is answered from the cache; expect(1) proves no second
    // search was issued.
    let cached = store.get_objects(&[("type", "Video")], Some(5)).await.unwrap();
    assert_eq!(cached, records);
}

#[tokio::test]
async fn test_get_objects_by_type_adds_source_condition() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Stacks-XSearch"))
        .and(query_param(
            "query",
            "lom.educational_learningResourceType=Video AND lom.classification_taxonpath_source=aves",
        ))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(SEARCH_RESPONSE, "application/xml"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let registry = tolerant_registry();
    let _cache = MemoryCache::register(&registry);
    let store = ObjectStore::new(configured(&server.uri()), registry);

    let records = store
        .get_objects_by_type("Video", Some("aves"), None)
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_get_object_by_catalog_entry_caches_single_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Stacks-XSearch"))
        .and(query_param("query", "lom.general_catalogentry_entry=CAT-9"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(CATALOG_RESPONSE, "application/xml"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let registry = tolerant_registry();
    let cache = MemoryCache::register(&registry);
    let store = ObjectStore::new(configured(&server.uri()), registry);

    let record = store.get_object_by_catalog_entry("CAT-9").await.unwrap().unwrap();
    assert_eq!(record.get("title"), Some("Owl Survey"));
    assert_eq!(record.get("id"), Some("CAT-9"));
    assert!(cache.contains("object//catalogEntry:CAT-9"));

    let cached = store.get_object_by_catalog_entry("CAT-9").await.unwrap();
    assert_eq!(cached, Some(record));
}

#[tokio::test]
async fn test_empty_catalog_entry_is_absent_without_cache_touch() {
    let server = MockServer::start().await;
    let registry = tolerant_registry();
    let cache = MemoryCache::register(&registry);
    let store = ObjectStore::new(configured(&server.uri()), registry);

    let record = store.get_object_by_catalog_entry("").await.unwrap();
    assert!(record.is_none());
    assert_eq!(cache.len(), 0);
}

#[tokio::test]
async fn test_no_matches_is_absent_and_uncached() {
    let server = MockServer::start().await;
    let empty = r"
        <searchRetrieveResponse>
            <numberOfRecords>0</numberOfRecords>
            <records/>
        </searchRetrieveResponse>";
    Mock::given(method("GET"))
        .and(path("/Stacks-XSearch"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(empty, "application/xml"))
        .expect(2)
        .mount(&server)
        .await;

    let registry = tolerant_registry();
    let cache = MemoryCache::register(&registry);
    let store = ObjectStore::new(configured(&server.uri()), registry);

    assert!(store.get_object_by_catalog_entry("CAT-0").await.unwrap().is_none());
    assert!(!cache.contains("object//catalogEntry:CAT-0"));

    // Absence is not cached, so the second call searches again.
    assert!(store.get_object_by_catalog_entry("CAT-0").await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_groups_uses_admin_call_and_shared_cache_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Stacks-REST/Group"))
        .and(query_param("output", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            envelope(json!({"list": {"group": [
                {"id": "g2", "name": "Readers"},
                {"id": "g1", "name": "Editors"}
            ]}})),
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let registry = tolerant_registry();
    let cache = MemoryCache::register(&registry);
    let store = ObjectStore::new(configured(&server.uri()), registry);

    let groups = store.get_groups().await.unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(
        groups.get("g1").and_then(|group| group.get("name")).and_then(|n| n.as_str()),
        Some("Editors")
    );
    assert!(cache.contains("groups"));

    // Cached on the second call; expect(1) proves it.
    let again = store.get_groups().await.unwrap();
    assert_eq!(again, groups);
}
