//! Hit/miss/invalidation accounting.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::tier::Tier;

/// Process-lifetime cache counters.
///
/// Each counter is an independent atomic, so recording a hit never
/// contends with recording an invalidation. Only the interceptor and the
/// invalidation path record; everything else reads snapshots.
#[derive(Debug, Default)]
pub struct CacheStatsCollector {
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl CacheStatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }

    /// Combine the counters with store-derived figures into a snapshot.
    pub fn snapshot(
        &self,
        enabled: bool,
        max_size_per_tier: usize,
        entries_by_tier: BTreeMap<Tier, usize>,
        evictions: u64,
    ) -> CacheStats {
        let hits = self.hits();
        let misses = self.misses();
        CacheStats {
            enabled,
            max_size_per_tier,
            total_entries: entries_by_tier.values().sum(),
            entries_by_tier,
            hits,
            misses,
            hit_rate_percent: hit_rate_percent(hits, misses),
            invalidations: self.invalidations(),
            evictions,
        }
    }
}

/// Point-in-time view of the cache, as served by the admin stats surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub max_size_per_tier: usize,
    pub total_entries: usize,
    pub entries_by_tier: BTreeMap<Tier, usize>,
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses) * 100`, rounded to two decimals; `0` before
    /// any lookup.
    pub hit_rate_percent: f64,
    pub invalidations: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Total non-forced lookups performed.
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }
}

fn hit_rate_percent(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        return 0.0;
    }
    let rate = hits as f64 / total as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}
