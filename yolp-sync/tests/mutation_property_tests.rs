//! Property-Based Tests for Mutation Invalidation
//!
//! **Property 2: Post-Write Invalidation**
//!
//! After a mutation succeeds, every key it declares SHALL be Stale and the
//! next read SHALL start a new fetch. A failed mutation SHALL leave every
//! entry untouched and return the gateway's error unmodified.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;
use yolp_sync::{CacheStatus, KeyedCache, Mutation, MutationExecutor};
use yolp_test_utils::generators::arb_new_restaurant;
use yolp_test_utils::{
    fixtures, CacheKey, ClientError, FakeDirectory, Method, MockGateway, RequestGateway,
    Restaurant,
};

fn restaurants_key() -> CacheKey {
    CacheKey::new("restaurants")
}

/// Read the restaurant listing through `gateway`, waiting for the fetch.
async fn list<G>(cache: &KeyedCache<Value>, gateway: &Arc<G>) -> Vec<Restaurant>
where
    G: RequestGateway + 'static,
{
    let gateway = Arc::clone(gateway);
    let entry = cache
        .fetch(&restaurants_key(), move || async move {
            gateway.request(Method::Get, "/restaurants", None).await
        })
        .await;
    entry
        .value()
        .and_then(|value| serde_json::from_value(Value::clone(value)).ok())
        .unwrap_or_default()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// **Property 2: Post-Write Invalidation**
    #[test]
    fn prop_added_restaurant_appears_after_refetch(new in arb_new_restaurant()) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async {
            let directory = Arc::new(FakeDirectory::new().signed_in_as("Ana", "ana@example.com"));
            let cache: KeyedCache<Value> = KeyedCache::default();
            let executor = MutationExecutor::new(Arc::clone(&directory), cache.clone());

            assert!(list(&cache, &directory).await.is_empty());

            let mutation = Mutation::post("/restaurants")
                .json(&new)
                .unwrap()
                .invalidates(restaurants_key());
            executor.execute(mutation).await.unwrap();

            assert_eq!(cache.peek(&restaurants_key()).unwrap().status(), CacheStatus::Stale);
            let listed = list(&cache, &directory).await;
            assert_eq!(listed.len(), 1);
            assert_eq!(listed[0].name, new.name);
            assert_eq!(directory.call_count(Method::Get, "/restaurants"), 2);
        });
    }
}

#[tokio::test]
async fn test_successful_mutation_makes_next_read_fetch() {
    let gateway = Arc::new(MockGateway::new());
    gateway
        .on(Method::Get, "/restaurants", Ok(fixtures::restaurants_body(&[])))
        .on(Method::Post, "/restaurants", Ok(json!({ "id": 1, "name": "Cafe X" })));
    let cache: KeyedCache<Value> = KeyedCache::default();
    let executor = MutationExecutor::new(Arc::clone(&gateway), cache.clone());

    list(&cache, &gateway).await;
    let response = executor
        .execute(
            Mutation::post("/restaurants")
                .body(json!({ "name": "Cafe X" }))
                .invalidates(restaurants_key()),
        )
        .await
        .unwrap();
    assert_eq!(response["name"], "Cafe X");

    let gw = Arc::clone(&gateway);
    let next = cache.read(&restaurants_key(), move || async move {
        gw.request(Method::Get, "/restaurants", None).await
    });
    assert_eq!(next.status(), CacheStatus::Fetching);
    assert_eq!(cache.stats().invalidations, 1);
}

#[tokio::test]
async fn test_failed_mutation_invalidates_nothing() {
    let gateway = Arc::new(MockGateway::new());
    gateway
        .on(Method::Get, "/restaurants", Ok(fixtures::restaurants_body(&["Diner"])))
        .on(
            Method::Post,
            "/restaurants",
            Err(ClientError::http(400, "Name is required")),
        );
    let cache: KeyedCache<Value> = KeyedCache::default();
    let executor = MutationExecutor::new(Arc::clone(&gateway), cache.clone());
    list(&cache, &gateway).await;

    let err = executor
        .execute(Mutation::post("/restaurants").body(json!({})).invalidates(restaurants_key()))
        .await
        .unwrap_err();

    assert_eq!(err, ClientError::http(400, "Name is required"));
    let entry = cache.peek(&restaurants_key()).unwrap();
    assert_eq!(entry.status(), CacheStatus::Fresh);
    assert_eq!(cache.stats().invalidations, 0);
}

#[tokio::test]
async fn test_mutation_leaves_unrelated_keys_fresh() {
    let gateway = Arc::new(MockGateway::new());
    gateway.on(Method::Post, "/restaurants", Ok(json!({ "id": 2, "name": "Bistro" })));
    let cache: KeyedCache<Value> = KeyedCache::default();
    let identity = CacheKey::new("identity");
    let detail = CacheKey::new("restaurant").with(1);
    cache.fetch(&identity, || async { Ok(fixtures::identity_body()) }).await;
    cache.fetch(&detail, || async { Ok(json!({ "id": 1, "name": "Diner" })) }).await;

    MutationExecutor::new(gateway, cache.clone())
        .execute(Mutation::post("/restaurants").invalidates(restaurants_key()))
        .await
        .unwrap();

    assert_eq!(cache.peek(&identity).unwrap().status(), CacheStatus::Fresh);
    assert_eq!(cache.peek(&detail).unwrap().status(), CacheStatus::Fresh);
}

#[tokio::test]
async fn test_mutations_are_not_deduplicated() {
    let gateway = Arc::new(MockGateway::new());
    gateway.on(Method::Post, "/auth/sign-out", Ok(Value::Null));
    let executor = MutationExecutor::new(Arc::clone(&gateway), KeyedCache::<Value>::default());

    let mutation = Mutation::post("/auth/sign-out").invalidates(CacheKey::new("identity"));
    executor.execute(mutation.clone()).await.unwrap();
    executor.execute(mutation).await.unwrap();

    assert_eq!(gateway.call_count(Method::Post, "/auth/sign-out"), 2);
}

#[tokio::test]
async fn test_empty_listing_then_added_restaurant() {
    let directory = Arc::new(FakeDirectory::new().signed_in_as("Ana", "ana@example.com"));
    let cache: KeyedCache<Value> = KeyedCache::default();
    let executor = MutationExecutor::new(Arc::clone(&directory), cache.clone());

    assert!(list(&cache, &directory).await.is_empty());

    executor
        .execute(
            Mutation::post("/restaurants")
                .body(json!({ "name": "Cafe X" }))
                .invalidates(restaurants_key()),
        )
        .await
        .unwrap();

    let names: Vec<String> = list(&cache, &directory)
        .await
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["Cafe X".to_string()]);
}
