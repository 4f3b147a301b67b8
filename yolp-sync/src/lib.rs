//! Yolp Sync - Client-Side Data Synchronization
//!
//! Server-derived data is cached per [`CacheKey`](yolp_core::CacheKey) in a
//! [`KeyedCache`]. Writes go through a [`MutationExecutor`], which marks the
//! affected keys stale once the server has acknowledged the write so the next
//! read refetches.

pub mod cache;
pub mod mutation;

pub use cache::{CacheConfig, CacheEntry, CacheStats, CacheStatus, KeyedCache, PendingFetch};
pub use mutation::{Mutation, MutationExecutor};
