//! Keyed async cache with fetch deduplication and invalidation.
//!
//! The cache owns every entry. Consumers hold a cheap cloneable handle and
//! only ever see snapshots; the sole ways to change an entry are a fetch
//! completing and an invalidation.

use std::collections::HashMap;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use futures_util::FutureExt;
use tokio::sync::watch;
use yolp_core::{CacheKey, ClientError, ClientResult};

use super::entry::{CacheEntry, CacheStatus, PendingFetch};
use super::stats::CacheStats;

/// Configuration for the keyed cache.
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    /// Age after which a Fresh entry is treated as Stale on read.
    /// `None` keeps entries Fresh until they are invalidated.
    pub stale_after: Option<Duration>,
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the age after which fresh entries go stale.
    pub fn with_stale_after(mut self, duration: Duration) -> Self {
        self.stale_after = Some(duration);
        self
    }
}

struct Slot<V> {
    entry: CacheEntry<V>,
    /// Set when `invalidate` hits an entry with a fetch in flight.
    invalidated_in_flight: bool,
    notify: watch::Sender<CacheEntry<V>>,
}

impl<V> Slot<V> {
    fn new(key: CacheKey) -> Self {
        let entry = CacheEntry::idle(key);
        let (notify, _) = watch::channel(entry.clone());
        Self {
            entry,
            invalidated_in_flight: false,
            notify,
        }
    }

    fn publish(&self) {
        self.notify.send_replace(self.entry.clone());
    }

    /// Returns true if the entry changed.
    fn mark_stale(&mut self) -> bool {
        if self.entry.in_flight.is_some() {
            self.invalidated_in_flight = true;
            return true;
        }
        match self.entry.status {
            CacheStatus::Fresh | CacheStatus::Errored => {
                self.entry.status = CacheStatus::Stale;
                self.publish();
                true
            }
            CacheStatus::Idle | CacheStatus::Stale | CacheStatus::Fetching => false,
        }
    }
}

struct State<V> {
    slots: HashMap<CacheKey, Slot<V>>,
    stats: CacheStats,
}

struct Inner<V> {
    config: CacheConfig,
    state: Mutex<State<V>>,
    next_fetch_id: AtomicU64,
}

impl<V> Inner<V> {
    fn lock(&self) -> MutexGuard<'_, State<V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn settle(&self, key: &CacheKey, fetch_id: u64, result: ClientResult<V>) {
        let mut state = self.lock();
        let State { slots, stats } = &mut *state;

        let Some(slot) = slots.get_mut(key) else {
            tracing::debug!(key = %key, fetch_id, "Discarding completion for removed entry");
            return;
        };
        if slot.entry.in_flight.map(|pending| pending.id) != Some(fetch_id) {
            tracing::debug!(key = %key, fetch_id, "Discarding superseded completion");
            return;
        }

        slot.entry.in_flight = None;
        match result {
            Ok(value) => {
                slot.entry.value = Some(Arc::new(value));
                slot.entry.status = CacheStatus::Fresh;
                slot.entry.last_error = None;
                slot.entry.updated_at = Some(Utc::now());
                stats.fetches_succeeded += 1;
                tracing::debug!(key = %key, fetch_id, "Fetch settled");
            }
            Err(err) => {
                tracing::warn!(key = %key, fetch_id, error = %err, "Fetch failed");
                slot.entry.status = CacheStatus::Errored;
                slot.entry.last_error = Some(err);
                stats.fetches_failed += 1;
            }
        }
        slot.publish();

        if std::mem::take(&mut slot.invalidated_in_flight) {
            slot.entry.status = CacheStatus::Stale;
            slot.publish();
            tracing::debug!(key = %key, fetch_id, "Entry invalidated while in flight, marked stale");
        }
    }
}

/// Keyed async cache.
///
/// # Guarantees
///
/// - At most one fetch is in flight per key. Reads arriving while a fetch is
///   in flight share its result.
/// - An invalidation that races an in-flight fetch is never lost: the fetch's
///   result is applied and the entry is immediately marked Stale again.
/// - A failed fetch keeps the last good value next to the error.
///
/// Fetches run as spawned Tokio tasks, so `read` must be called from within a
/// runtime. The cache lock is never held across an await point.
pub struct KeyedCache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for KeyedCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Default for KeyedCache<V>
where
    V: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl<V> KeyedCache<V>
where
    V: Send + Sync + 'static,
{
    /// Create an empty cache.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(State {
                    slots: HashMap::new(),
                    stats: CacheStats::default(),
                }),
                next_fetch_id: AtomicU64::new(1),
            }),
        }
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Read an entry, starting a fetch if it is missing or stale.
    ///
    /// Returns immediately with the current snapshot. When a fetch is started
    /// the snapshot is `Fetching` and still carries any previous value. The
    /// fetcher is only invoked when this call starts the fetch; readers that
    /// find one already in flight do not call it.
    pub fn read<F, Fut>(&self, key: &CacheKey, fetcher: F) -> CacheEntry<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<V>> + Send + 'static,
    {
        let (snapshot, fetch_id) = {
            let mut state = self.inner.lock();
            let State { slots, stats } = &mut *state;
            let slot = slots
                .entry(key.clone())
                .or_insert_with(|| Slot::new(key.clone()));

            self.expire_if_due(slot);

            if slot.entry.in_flight.is_some() {
                stats.deduplicated_reads += 1;
                tracing::trace!(key = %key, "Joining in-flight fetch");
                return slot.entry.clone();
            }
            if !slot.entry.status.needs_fetch() {
                stats.hits += 1;
                return slot.entry.clone();
            }

            let fetch_id = self.inner.next_fetch_id.fetch_add(1, Ordering::Relaxed);
            slot.entry.status = CacheStatus::Fetching;
            slot.entry.in_flight = Some(PendingFetch {
                id: fetch_id,
                issued_at: Utc::now(),
            });
            slot.invalidated_in_flight = false;
            slot.publish();
            stats.fetches_started += 1;
            (slot.entry.clone(), fetch_id)
        };

        tracing::debug!(key = %key, fetch_id, "Starting fetch");
        let future = fetcher();
        let weak: Weak<Inner<V>> = Arc::downgrade(&self.inner);
        let key = key.clone();
        tokio::spawn(async move {
            // A panicking fetcher still settles the entry, otherwise readers
            // would keep joining a fetch that never completes.
            let result = AssertUnwindSafe(future)
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    let reason = panic_reason(panic.as_ref());
                    tracing::error!(key = %key, fetch_id, reason, "Fetch panicked");
                    Err(ClientError::aborted(format!("fetch panicked: {reason}")))
                });
            match weak.upgrade() {
                Some(inner) => inner.settle(&key, fetch_id, result),
                None => tracing::debug!(key = %key, fetch_id, "Cache dropped before fetch settled"),
            }
        });

        snapshot
    }

    /// Read an entry and wait until any fetch for it has settled.
    pub async fn fetch<F, Fut>(&self, key: &CacheKey, fetcher: F) -> CacheEntry<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<V>> + Send + 'static,
    {
        self.read(key, fetcher);
        self.settled(key).await
    }

    /// Wait until the entry for `key` is not Fetching and return it.
    ///
    /// Does not start a fetch. Returns an Idle snapshot if the entry is
    /// removed while waiting.
    pub async fn settled(&self, key: &CacheKey) -> CacheEntry<V> {
        let mut rx = self.subscribe(key);
        let settled = rx
            .wait_for(|entry| !entry.is_fetching())
            .await
            .map(|entry| (*entry).clone());
        match settled {
            Ok(entry) => entry,
            Err(_) => self
                .peek(key)
                .unwrap_or_else(|| CacheEntry::idle(key.clone())),
        }
    }

    /// Subscribe to changes of one entry.
    ///
    /// Creates an Idle entry if the key is unknown. The channel closes when
    /// the entry is removed or the cache is disposed.
    pub fn subscribe(&self, key: &CacheKey) -> watch::Receiver<CacheEntry<V>> {
        let mut state = self.inner.lock();
        state
            .slots
            .entry(key.clone())
            .or_insert_with(|| Slot::new(key.clone()))
            .notify
            .subscribe()
    }

    /// Snapshot an entry without triggering a fetch.
    pub fn peek(&self, key: &CacheKey) -> Option<CacheEntry<V>> {
        self.inner.lock().slots.get(key).map(|slot| slot.entry.clone())
    }

    /// Mark one entry Stale so the next read refetches.
    ///
    /// Returns false if the key is unknown or already awaiting a refetch.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let mut state = self.inner.lock();
        let State { slots, stats } = &mut *state;
        let changed = slots.get_mut(key).is_some_and(Slot::mark_stale);
        if changed {
            stats.invalidations += 1;
            tracing::debug!(key = %key, "Invalidated entry");
        }
        changed
    }

    /// Mark every entry whose key starts with `prefix` Stale.
    ///
    /// Returns the number of entries invalidated.
    pub fn invalidate_prefix(&self, prefix: &CacheKey) -> usize {
        let mut state = self.inner.lock();
        let State { slots, stats } = &mut *state;
        let mut count = 0;
        for (key, slot) in slots.iter_mut() {
            if key.starts_with(prefix) && slot.mark_stale() {
                count += 1;
            }
        }
        stats.invalidations += count as u64;
        if count > 0 {
            tracing::debug!(prefix = %prefix, count, "Invalidated entries by prefix");
        }
        count
    }

    /// Drop an entry entirely. A fetch still in flight for it is discarded
    /// when it completes.
    pub fn remove(&self, key: &CacheKey) -> Option<CacheEntry<V>> {
        self.inner.lock().slots.remove(key).map(|slot| slot.entry)
    }

    /// Drop every entry and close all subscriber channels.
    ///
    /// The handle stays usable; subsequent reads start from an empty cache.
    pub fn dispose(&self) {
        let mut state = self.inner.lock();
        let dropped = state.slots.len();
        state.slots.clear();
        tracing::debug!(dropped, "Cache disposed");
    }

    pub fn len(&self) -> usize {
        self.inner.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self.inner.lock().slots.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let state = self.inner.lock();
        CacheStats {
            entry_count: state.slots.len() as u64,
            ..state.stats.clone()
        }
    }

    fn expire_if_due(&self, slot: &mut Slot<V>) {
        let Some(stale_after) = self.inner.config.stale_after else {
            return;
        };
        if slot.entry.status == CacheStatus::Fresh && slot.entry.age() > stale_after {
            slot.entry.status = CacheStatus::Stale;
            slot.publish();
        }
    }
}

fn panic_reason(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown")
}
