//! Mutation execution with post-write invalidation.
//!
//! Writes pass straight through to the gateway. Only once the server has
//! acknowledged a write are the cache keys it affects marked stale; a failed
//! write touches nothing so the UI keeps showing the data it already had
//! next to the error.

use serde::Serialize;
use serde_json::Value;
use yolp_core::{CacheKey, ClientResult, Method, RequestGateway};

use crate::cache::KeyedCache;

/// A write request plus the cache keys it makes stale.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    method: Method,
    path: String,
    body: Option<Value>,
    invalidates: Vec<CacheKey>,
}

impl Mutation {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            invalidates: Vec::new(),
        }
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Attach a raw JSON body.
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `payload` as the request body.
    pub fn json<T: Serialize + ?Sized>(self, payload: &T) -> ClientResult<Self> {
        Ok(self.body(serde_json::to_value(payload)?))
    }

    /// Declare a key (and every key under it) to invalidate on success.
    pub fn invalidates(mut self, key: CacheKey) -> Self {
        self.invalidates.push(key);
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn payload(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn invalidated_keys(&self) -> &[CacheKey] {
        &self.invalidates
    }
}

/// Executes mutations against the gateway and invalidates the cache.
///
/// Mutations are not deduplicated: executing the same mutation twice sends
/// it twice.
pub struct MutationExecutor<G, V = Value> {
    gateway: G,
    store: KeyedCache<V>,
}

impl<G: Clone, V> Clone for MutationExecutor<G, V> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            store: self.store.clone(),
        }
    }
}

impl<G, V> MutationExecutor<G, V>
where
    G: RequestGateway,
    V: Send + Sync + 'static,
{
    pub fn new(gateway: G, store: KeyedCache<V>) -> Self {
        Self { gateway, store }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn store(&self) -> &KeyedCache<V> {
        &self.store
    }

    /// Send the write; on success invalidate its declared keys by prefix.
    ///
    /// Errors are returned unmodified and leave the cache untouched.
    pub async fn execute(&self, mutation: Mutation) -> ClientResult<Value> {
        let response = match self
            .gateway
            .request(mutation.method, &mutation.path, mutation.body.as_ref())
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(
                    method = %mutation.method,
                    path = %mutation.path,
                    error = %err,
                    "Mutation failed"
                );
                return Err(err);
            }
        };

        let invalidated: usize = mutation
            .invalidates
            .iter()
            .map(|key| self.store.invalidate_prefix(key))
            .sum();

        tracing::info!(
            method = %mutation.method,
            path = %mutation.path,
            invalidated,
            "Mutation succeeded"
        );
        Ok(response)
    }
}
