//! Per-tier bounded store with lazy TTL expiry and LRU eviction.
//!
//! Each [`Tier`] gets its own [`TierStore`] behind its own mutex, so
//! contention on the `live` tier never blocks the `static` tier. Expired
//! entries are only removed when a lookup observes them; there is no
//! background sweep.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use lru::LruCache;
use tokio::time::Instant;
use tracing::debug;

use super::tier::{Tier, TierSettings};
use crate::telemetry;
use crate::{CacheError, Result};

/// A stored result. Every write replaces the whole entry.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub tier: Tier,
    /// Monotonic store time, used for expiry.
    pub stored_at: Instant,
    /// `None` when the TTL reaches past what the clock can represent.
    pub expires_at: Option<Instant>,
    /// Wall-clock store time, reported to callers as `cached_at`.
    pub cached_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    /// Whether the entry may no longer be served at `now`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Bounded, time-expiring store for a single tier.
///
/// The `none` tier is a degenerate store that holds nothing: `get` always
/// misses and `set` is a no-op.
pub struct TierStore<V> {
    tier: Tier,
    settings: TierSettings,
    entries: Option<Mutex<LruCache<String, CacheEntry<V>>>>,
    evictions: AtomicU64,
}

impl<V: Clone> TierStore<V> {
    /// Create a store for `tier`. TTL and capacity are fixed from here on.
    ///
    /// Storing tiers need a non-zero TTL and capacity; settings for the
    /// `none` tier are ignored.
    pub fn new(tier: Tier, settings: TierSettings) -> Result<Self> {
        if !tier.is_storing() {
            return Ok(Self::none());
        }
        if settings.ttl.is_zero() {
            return Err(CacheError::Configuration(format!(
                "tier '{tier}' needs a TTL greater than zero"
            )));
        }
        let capacity = NonZeroUsize::new(settings.max_entries).ok_or_else(|| {
            CacheError::Configuration(format!("tier '{tier}' needs max_entries greater than zero"))
        })?;
        Ok(Self {
            tier,
            settings,
            entries: Some(Mutex::new(LruCache::new(capacity))),
            evictions: AtomicU64::new(0),
        })
    }

    /// The degenerate `none` store.
    pub fn none() -> Self {
        Self {
            tier: Tier::None,
            settings: TierSettings::new(Tier::None.default_ttl(), 0),
            entries: None,
            evictions: AtomicU64::new(0),
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn settings(&self) -> TierSettings {
        self.settings
    }

    /// Look up `key`, marking it most recently used on a hit.
    ///
    /// An entry whose TTL has lapsed is removed and reported absent.
    pub fn get(&self, key: &str) -> Option<CacheEntry<V>> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        let expired = entries.peek(key)?.is_expired_at(now);
        if expired {
            entries.pop(key);
            debug!(tier = %self.tier, key, "dropped expired entry");
            return None;
        }
        entries.get(key).cloned()
    }

    /// Store `value` under `key`, stamped with the current time.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.insert(key.into(), value, Utc::now());
    }

    /// Store `value` with an explicit wall-clock stamp.
    ///
    /// At capacity, the least recently used entry is evicted first.
    pub(crate) fn insert(&self, key: String, value: V, cached_at: DateTime<Utc>) {
        let Some(mut entries) = self.lock() else {
            return;
        };
        let stored_at = Instant::now();
        let entry = CacheEntry {
            value,
            tier: self.tier,
            stored_at,
            expires_at: stored_at.checked_add(self.settings.ttl),
            cached_at,
        };
        if let Some((evicted, _)) = entries.push(key.clone(), entry)
            && evicted != key
        {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL, "tier" => self.tier.as_str())
                .increment(1);
            debug!(tier = %self.tier, key = %evicted, "evicted least recently used entry");
        }
    }

    /// Remove every entry, returning how many were held.
    pub fn clear(&self) -> usize {
        let Some(mut entries) = self.lock() else {
            return 0;
        };
        let removed = entries.len();
        entries.clear();
        removed
    }

    /// Remove every entry whose key satisfies `predicate`.
    pub fn clear_matching<F>(&self, predicate: F) -> usize
    where
        F: Fn(&str) -> bool,
    {
        let Some(mut entries) = self.lock() else {
            return 0;
        };
        let doomed: Vec<String> = entries
            .iter()
            .filter(|(key, _)| predicate(key.as_str()))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        doomed.len()
    }

    /// Number of entries held, including expired ones not yet observed.
    pub fn size(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Entries evicted under capacity pressure since construction.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    fn lock(&self) -> Option<MutexGuard<'_, LruCache<String, CacheEntry<V>>>> {
        // A panic while holding the lock cannot leave the LRU half-updated
        // from our side, so a poisoned guard is still usable.
        self.entries
            .as_ref()
            .map(|m| m.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
