//! Read-side queries over the shared cache.
//!
//! Each query owns one cache key and the `GET` that fills it. Query failures
//! never surface as errors: the identity lookup falls back to "signed out",
//! the listing to an empty list and the detail to "not found".

use futures_util::future::{BoxFuture, FutureExt};
use serde_json::{json, Value};
use std::sync::Arc;
use yolp_core::{ClientResult, Identity, Method, RestaurantId};
use yolp_sync::{CacheEntry, KeyedCache};

use crate::keys;
use crate::views::{RestaurantDetailView, RestaurantListView};
use crate::SharedGateway;

type Fetcher = Box<dyn FnOnce() -> BoxFuture<'static, ClientResult<Value>> + Send>;

#[derive(Clone)]
pub struct Queries {
    store: KeyedCache<Value>,
    gateway: SharedGateway,
}

impl Queries {
    pub fn new(store: KeyedCache<Value>, gateway: SharedGateway) -> Self {
        Self { store, gateway }
    }

    pub fn store(&self) -> &KeyedCache<Value> {
        &self.store
    }

    /// Read the identity entry, fetching `GET /auth` if needed.
    pub fn identity(&self) -> CacheEntry<Value> {
        self.store.read(&keys::identity(), self.fetcher("/auth".to_string(), Value::Null))
    }

    /// Resolve the identity, waiting for any fetch in flight.
    pub async fn current_identity(&self) -> Identity {
        let entry = self
            .store
            .fetch(&keys::identity(), self.fetcher("/auth".to_string(), Value::Null))
            .await;
        entry
            .value()
            .map(|value| Identity::from_value(value))
            .unwrap_or_default()
    }

    pub fn restaurants(&self) -> RestaurantListView {
        let entry = self.store.read(&keys::restaurants(), self.listing_fetcher());
        RestaurantListView::from_entry(&entry)
    }

    pub async fn restaurants_settled(&self) -> RestaurantListView {
        let entry = self
            .store
            .fetch(&keys::restaurants(), self.listing_fetcher())
            .await;
        RestaurantListView::from_entry(&entry)
    }

    pub fn restaurant(&self, id: RestaurantId) -> RestaurantDetailView {
        let entry = self.store.read(&keys::restaurant(id), self.detail_fetcher(id));
        RestaurantDetailView::from_entry(&entry)
    }

    pub async fn restaurant_settled(&self, id: RestaurantId) -> RestaurantDetailView {
        let entry = self
            .store
            .fetch(&keys::restaurant(id), self.detail_fetcher(id))
            .await;
        RestaurantDetailView::from_entry(&entry)
    }

    fn listing_fetcher(&self) -> Fetcher {
        self.fetcher("/restaurants".to_string(), json!([]))
    }

    fn detail_fetcher(&self, id: RestaurantId) -> Fetcher {
        self.fetcher(format!("/restaurants/{id}"), Value::Null)
    }

    /// `GET path`, replacing any failure with `fallback`.
    fn fetcher(&self, path: String, fallback: Value) -> Fetcher {
        let gateway = Arc::clone(&self.gateway);
        Box::new(move || {
            async move {
                match gateway.request(Method::Get, &path, None).await {
                    Ok(body) => Ok(body),
                    Err(err) if err.is_unauthorized() => {
                        tracing::debug!(path = %path, error = %err, "Query unauthorized, using fallback");
                        Ok(fallback)
                    }
                    Err(err) => {
                        tracing::warn!(path = %path, error = %err, "Query failed, using fallback");
                        Ok(fallback)
                    }
                }
            }
            .boxed()
        })
    }
}
