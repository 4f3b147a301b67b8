//! Keyed async cache with explicit staleness.
//!
//! Every cached resource lives in a [`CacheEntry`] whose [`CacheStatus`] says
//! whether the value can be trusted. Readers never block on the network:
//! [`KeyedCache::read`] returns the current snapshot and, when the entry is
//! missing or stale, starts exactly one background fetch for that key.
//! Subscribers are notified when the fetch settles.
//!
//! # Example
//!
//! ```ignore
//! let cache: KeyedCache<Vec<Restaurant>> = KeyedCache::new(CacheConfig::default());
//! let key = CacheKey::new("restaurants");
//!
//! // Non-blocking: returns Fetching on first read
//! let snapshot = cache.read(&key, || load_restaurants(gateway.clone()));
//!
//! // Or wait for the fetch to settle
//! let entry = cache.fetch(&key, || load_restaurants(gateway.clone())).await;
//!
//! // After a write, force the next read to refetch
//! cache.invalidate(&key);
//! ```

pub mod entry;
pub mod keyed;
pub mod stats;

pub use entry::{CacheEntry, CacheStatus, PendingFetch};
pub use keyed::{CacheConfig, KeyedCache};
pub use stats::CacheStats;
