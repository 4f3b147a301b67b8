//! Cache usage counters.

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads served from a fresh entry without starting a fetch.
    pub hits: u64,
    /// Reads that joined a fetch already in flight for the same key.
    pub deduplicated_reads: u64,
    /// Fetches started on behalf of a read.
    pub fetches_started: u64,
    /// Fetches that settled with a value.
    pub fetches_succeeded: u64,
    /// Fetches that settled with an error.
    pub fetches_failed: u64,
    /// Entries marked stale by invalidation.
    pub invalidations: u64,
    /// Number of entries currently in the cache.
    pub entry_count: u64,
}

impl CacheStats {
    /// Fraction of reads that did not start a fetch (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits + self.deduplicated_reads;
        let total = served + self.fetches_started;
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 6,
            deduplicated_reads: 2,
            fetches_started: 2,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }
}
