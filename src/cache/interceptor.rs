//! Read-operation interception.
//!
//! [`ResponseCache::get_or_fetch()`] is the core: key the call, consult the
//! tier's store, and only run the underlying operation on a miss or a
//! forced refresh. [`CachedOperation`] packages that for a
//! [`ReadOperation`], the same way the provider decorators wrap a provider
//! trait, so call sites pass identity and tier once at construction:
//!
//! ```rust,ignore
//! let oee = cache.wrap(OeeQuery::new(pool), Tier::Live);
//! let result = oee.call(Some(user_id), &params, false).await?;
//! if result.is_hit() {
//!     // served without touching the database
//! }
//! ```
//!
//! Failures of the underlying operation are returned unchanged and never
//! stored. An older unexpired entry for the same key survives a failed
//! refresh, but the failing call itself does not fall back to it.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::store::CacheEntry;
use super::tier::Tier;
use super::{ResponseCache, key};
use crate::telemetry;

/// A read-style query or tool whose results may be cached.
#[async_trait]
pub trait ReadOperation: Send + Sync {
    /// Parameters; serialized canonically to build the cache key.
    type Params: Serialize + Send + Sync;
    type Output: Clone + Send + Sync;
    type Error: fmt::Display + Send;

    /// Stable operation identity, used as the first key segment.
    fn name(&self) -> &str;

    /// Run the operation against the underlying data source.
    async fn execute(&self, params: &Self::Params) -> Result<Self::Output, Self::Error>;
}

/// Where a returned value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheSource {
    /// Served from the store; the operation did not run.
    Hit,
    /// Lookup missed; the operation ran and its result was stored.
    Miss,
    /// Lookup was skipped by `force_refresh`; the result was stored.
    Refresh,
    /// Caching was not applied (disabled, or un-keyable parameters).
    Bypass,
}

/// A result annotated with cache metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cached<V> {
    pub value: V,
    pub source: CacheSource,
    /// When the value was stored: the original store time on a hit, a
    /// fresh stamp on a miss or refresh. `None` if nothing was stored.
    pub cached_at: Option<DateTime<Utc>>,
    pub cache_tier: Option<Tier>,
}

impl<V> Cached<V> {
    fn hit(entry: CacheEntry<V>) -> Self {
        Self {
            value: entry.value,
            source: CacheSource::Hit,
            cached_at: Some(entry.cached_at),
            cache_tier: Some(entry.tier),
        }
    }

    fn bypass(value: V) -> Self {
        Self {
            value,
            source: CacheSource::Bypass,
            cached_at: None,
            cache_tier: None,
        }
    }

    pub fn is_hit(&self) -> bool {
        self.source == CacheSource::Hit
    }

    pub fn into_value(self) -> V {
        self.value
    }
}

impl Cached<Value> {
    /// Fold `cached_at` and `cache_tier` into an object result, the shape
    /// dashboard clients read. Non-object values are returned as-is.
    pub fn into_annotated(self) -> Value {
        let mut value = self.value;
        if let Value::Object(map) = &mut value {
            if let Some(at) = self.cached_at {
                map.insert("cached_at".to_string(), Value::String(at.to_rfc3339()));
            }
            if let Some(tier) = self.cache_tier {
                map.insert("cache_tier".to_string(), Value::String(tier.to_string()));
            }
        }
        value
    }
}

impl<V: Clone> ResponseCache<V> {
    /// Serve `operation` from the `tier` store, running `fetch` on a miss.
    ///
    /// With `force_refresh`, lookup is skipped and the fresh result replaces
    /// whatever was stored. Errors from `fetch` are returned untouched and
    /// nothing is stored for that attempt.
    #[instrument(
        skip_all,
        fields(operation = operation, tier = %tier, force_refresh = force_refresh)
    )]
    pub async fn get_or_fetch<P, F, Fut, E>(
        &self,
        operation: &str,
        tier: Tier,
        caller: Option<&str>,
        params: &P,
        force_refresh: bool,
        fetch: F,
    ) -> Result<Cached<V>, E>
    where
        P: Serialize + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: fmt::Display,
    {
        if !self.is_enabled() {
            return run(operation, fetch).await.map(Cached::bypass);
        }

        let key = match key::cache_key(operation, caller, params) {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "parameters cannot be keyed, running uncached");
                return run(operation, fetch).await.map(Cached::bypass);
            }
        };

        let store = self.store(tier);
        if force_refresh {
            count(telemetry::CACHE_REFRESHES_TOTAL, operation, tier);
            debug!(key = %key, "forced refresh, skipping lookup");
        } else if let Some(entry) = store.get(&key) {
            self.collector().record_hit();
            count(telemetry::CACHE_HITS_TOTAL, operation, tier);
            debug!(key = %key, "cache hit");
            return Ok(Cached::hit(entry));
        } else {
            self.collector().record_miss();
            count(telemetry::CACHE_MISSES_TOTAL, operation, tier);
            debug!(key = %key, "cache miss");
        }

        let value = run(operation, fetch).await?;
        let cached_at = tier.is_storing().then(Utc::now);
        if let Some(at) = cached_at {
            store.insert(key, value.clone(), at);
        }
        Ok(Cached {
            value,
            source: if force_refresh {
                CacheSource::Refresh
            } else {
                CacheSource::Miss
            },
            cached_at,
            cache_tier: Some(tier),
        })
    }

    /// Wrap `operation` so every call goes through this cache at `tier`.
    pub fn wrap<O>(self: &Arc<Self>, operation: O, tier: Tier) -> CachedOperation<O>
    where
        O: ReadOperation<Output = V>,
    {
        wrap(Arc::clone(self), operation, tier)
    }
}

fn count(name: &'static str, operation: &str, tier: Tier) {
    metrics::counter!(name,
        "operation" => operation.to_owned(),
        "tier" => tier.as_str(),
    )
    .increment(1);
}

/// Run the underlying operation, recording its duration and outcome.
async fn run<F, Fut, V, E>(operation: &str, fetch: F) -> Result<V, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V, E>>,
    E: fmt::Display,
{
    let start = Instant::now();
    let result = fetch().await;
    let status = if result.is_ok() { "ok" } else { "error" };
    metrics::histogram!(telemetry::OPERATION_DURATION_SECONDS,
        "operation" => operation.to_owned(),
        "status" => status,
    )
    .record(start.elapsed().as_secs_f64());
    if let Err(e) = &result {
        warn!(operation, error = %e, "wrapped operation failed, nothing cached");
    }
    result
}

/// Build a [`CachedOperation`] from an explicit cache, operation and tier.
pub fn wrap<O>(cache: Arc<ResponseCache<O::Output>>, operation: O, tier: Tier) -> CachedOperation<O>
where
    O: ReadOperation,
{
    CachedOperation {
        cache,
        inner: operation,
        tier,
    }
}

/// A [`ReadOperation`] bound to a cache and tier.
pub struct CachedOperation<O: ReadOperation> {
    cache: Arc<ResponseCache<O::Output>>,
    inner: O,
    tier: Tier,
}

impl<O: ReadOperation> CachedOperation<O> {
    /// Call the operation through the cache.
    ///
    /// `caller` is the authenticated user id, if any; `force_refresh`
    /// bypasses lookup for this call only.
    pub async fn call(
        &self,
        caller: Option<&str>,
        params: &O::Params,
        force_refresh: bool,
    ) -> Result<Cached<O::Output>, O::Error> {
        self.cache
            .get_or_fetch(
                self.inner.name(),
                self.tier,
                caller,
                params,
                force_refresh,
                || self.inner.execute(params),
            )
            .await
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }
}
