//! Caching subsystem.
//!
//! [`ResponseCache`] is the single cache service for a process. It owns one
//! [`TierStore`] per [`Tier`], the [`CacheStatsCollector`], and the
//! configuration it was built from. Build it once at startup and share it
//! by `Arc` with every call site that wraps a read operation.
//!
//! - [`key`] — deterministic `operation:caller:digest` keys.
//! - [`store`] — bounded per-tier store with lazy TTL expiry and LRU eviction.
//! - [`interceptor`] — [`ResponseCache::get_or_fetch()`] and the
//!   [`CachedOperation`] decorator built by [`ResponseCache::wrap()`].
//! - [`invalidation`] — selective clearing by tier and/or key pattern.
//! - [`stats`] — hit/miss/invalidation counters.
//!
//! # Concurrency
//!
//! Every tier has its own lock, held only for the in-memory lookup or
//! mutation, never across the wrapped operation's `.await`. Concurrent
//! misses for one key may both run the underlying operation; whichever
//! store completes last wins. There is no single-flight de-duplication.

pub mod interceptor;
pub mod invalidation;
pub mod key;
pub mod stats;
pub mod store;
pub mod tier;

pub use interceptor::{CacheSource, Cached, CachedOperation, ReadOperation, wrap};
pub use invalidation::{DomainEvent, InvalidationOutcome, InvalidationRequest};
pub use key::{ANONYMOUS_CALLER, cache_key};
pub use stats::{CacheStats, CacheStatsCollector};
pub use store::{CacheEntry, TierStore};
pub use tier::{Tier, TierSettings};

use std::collections::BTreeMap;

use tracing::info;

use crate::Result;
use crate::config::CacheConfig;

/// Tiered in-memory response cache.
///
/// Values are typically `serde_json::Value` (the default), but any `Clone`
/// type works as long as every wrapped operation sharing the cache
/// returns it.
pub struct ResponseCache<V = serde_json::Value> {
    config: CacheConfig,
    live: TierStore<V>,
    daily: TierStore<V>,
    static_: TierStore<V>,
    none: TierStore<V>,
    stats: CacheStatsCollector,
}

impl<V: Clone> ResponseCache<V> {
    /// Build the cache from validated configuration.
    ///
    /// Fails with [`CacheError::Configuration`](crate::CacheError::Configuration)
    /// if any storing tier has a zero TTL or capacity.
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        let cache = Self {
            live: TierStore::new(Tier::Live, config.settings_for(Tier::Live))?,
            daily: TierStore::new(Tier::Daily, config.settings_for(Tier::Daily))?,
            static_: TierStore::new(Tier::Static, config.settings_for(Tier::Static))?,
            none: TierStore::none(),
            stats: CacheStatsCollector::new(),
            config,
        };
        info!(
            enabled = cache.config.enabled,
            max_entries_per_tier = cache.config.max_entries_per_tier,
            live_ttl_secs = cache.config.ttl.live,
            daily_ttl_secs = cache.config.ttl.daily,
            static_ttl_secs = cache.config.ttl.static_,
            "response cache initialised"
        );
        Ok(cache)
    }

    /// A cache that never stores: every call runs the underlying operation.
    pub fn disabled() -> Self {
        let config = CacheConfig::default().enabled(false);
        Self {
            live: TierStore::none(),
            daily: TierStore::none(),
            static_: TierStore::none(),
            none: TierStore::none(),
            stats: CacheStatsCollector::new(),
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The store backing `tier`.
    pub fn store(&self, tier: Tier) -> &TierStore<V> {
        match tier {
            Tier::Live => &self.live,
            Tier::Daily => &self.daily,
            Tier::Static => &self.static_,
            Tier::None => &self.none,
        }
    }

    /// Number of entries currently held by `tier`.
    pub fn tier_size(&self, tier: Tier) -> usize {
        self.store(tier).size()
    }

    /// Snapshot for the administrative stats surface.
    pub fn stats(&self) -> CacheStats {
        let entries_by_tier: BTreeMap<Tier, usize> = Tier::STORING
            .iter()
            .map(|tier| (*tier, self.tier_size(*tier)))
            .collect();
        let evictions = Tier::STORING
            .iter()
            .map(|tier| self.store(*tier).evictions())
            .sum();
        self.stats.snapshot(
            self.config.enabled,
            self.config.max_entries_per_tier,
            entries_by_tier,
            evictions,
        )
    }

    pub(crate) fn collector(&self) -> &CacheStatsCollector {
        &self.stats
    }
}
