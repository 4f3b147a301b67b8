//! Cache entry snapshots and status.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use yolp_core::{CacheKey, ClientError};

/// Lifecycle of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheStatus {
    /// Known key, never fetched.
    Idle,
    /// A fetch is in flight.
    Fetching,
    /// Last fetch succeeded and nothing has invalidated it since.
    Fresh,
    /// Value may no longer reflect server state; the next read refetches.
    Stale,
    /// Last fetch failed. Any previous value is kept alongside the error.
    Errored,
}

impl CacheStatus {
    /// True if a read of an entry in this status should start a fetch.
    pub fn needs_fetch(&self) -> bool {
        matches!(self, Self::Idle | Self::Stale)
    }

    /// True once a fetch has completed, successfully or not.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Fresh | Self::Errored)
    }
}

/// Handle describing the fetch currently in flight for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingFetch {
    /// Cache-wide sequence number; completions with another id are discarded.
    pub id: u64,
    pub issued_at: DateTime<Utc>,
}

/// Read-only snapshot of a cache entry.
///
/// Values are shared through `Arc`, so snapshots are cheap to hand to every
/// reader and never alias the cache's own state.
#[derive(Debug)]
pub struct CacheEntry<V> {
    pub(crate) key: CacheKey,
    pub(crate) value: Option<Arc<V>>,
    pub(crate) status: CacheStatus,
    pub(crate) last_error: Option<ClientError>,
    pub(crate) in_flight: Option<PendingFetch>,
    pub(crate) updated_at: Option<DateTime<Utc>>,
}

impl<V> Clone for CacheEntry<V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            value: self.value.clone(),
            status: self.status,
            last_error: self.last_error.clone(),
            in_flight: self.in_flight,
            updated_at: self.updated_at,
        }
    }
}

impl<V> CacheEntry<V> {
    pub(crate) fn idle(key: CacheKey) -> Self {
        Self {
            key,
            value: None,
            status: CacheStatus::Idle,
            last_error: None,
            in_flight: None,
            updated_at: None,
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn status(&self) -> CacheStatus {
        self.status
    }

    /// Last known good value, if any. Still present when the entry is
    /// Stale, Fetching or Errored.
    pub fn value(&self) -> Option<&Arc<V>> {
        self.value.as_ref()
    }

    pub fn last_error(&self) -> Option<&ClientError> {
        self.last_error.as_ref()
    }

    pub fn in_flight(&self) -> Option<&PendingFetch> {
        self.in_flight.as_ref()
    }

    /// When the value was last replaced by a successful fetch.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn is_fetching(&self) -> bool {
        self.status == CacheStatus::Fetching
    }

    /// True while no fetch has ever settled for this key.
    pub fn is_loading(&self) -> bool {
        self.updated_at.is_none() && self.last_error.is_none()
    }

    /// Time since the value was last refreshed, zero if never.
    pub fn age(&self) -> Duration {
        self.updated_at
            .and_then(|at| Utc::now().signed_duration_since(at).to_std().ok())
            .unwrap_or(Duration::ZERO)
    }

    /// Map the value to a new type, keeping the entry metadata.
    pub fn map<U, F>(self, f: F) -> CacheEntry<U>
    where
        F: FnOnce(&V) -> U,
    {
        CacheEntry {
            key: self.key,
            value: self.value.map(|v| Arc::new(f(&v))),
            status: self.status,
            last_error: self.last_error,
            in_flight: self.in_flight,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_predicates() {
        assert!(CacheStatus::Idle.needs_fetch());
        assert!(CacheStatus::Stale.needs_fetch());
        assert!(!CacheStatus::Fresh.needs_fetch());
        assert!(!CacheStatus::Errored.needs_fetch());
        assert!(!CacheStatus::Fetching.needs_fetch());

        assert!(CacheStatus::Fresh.is_settled());
        assert!(CacheStatus::Errored.is_settled());
        assert!(!CacheStatus::Stale.is_settled());
    }

    #[test]
    fn test_idle_entry() {
        let entry: CacheEntry<u32> = CacheEntry::idle(CacheKey::new("identity"));
        assert_eq!(entry.status(), CacheStatus::Idle);
        assert!(entry.value().is_none());
        assert!(entry.is_loading());
        assert_eq!(entry.age(), Duration::ZERO);
    }

    #[test]
    fn test_map_keeps_metadata() {
        let mut entry: CacheEntry<u32> = CacheEntry::idle(CacheKey::new("n"));
        entry.value = Some(Arc::new(41));
        entry.status = CacheStatus::Stale;
        entry.updated_at = Some(Utc::now());

        let mapped = entry.map(|v| v + 1);
        assert_eq!(mapped.value().map(|v| **v), Some(42));
        assert_eq!(mapped.status(), CacheStatus::Stale);
        assert!(!mapped.is_loading());
    }
}
