//! Telemetry metric name constants.
//!
//! Centralised metric names for cache operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops. The in-process counters behind
//! [`ResponseCache::stats()`](crate::ResponseCache::stats) are kept
//! independently and do not depend on a recorder.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `millcache_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `operation` — wrapped read operation name (e.g. "oee_query", "alert_check")
//! - `tier` — freshness tier: "live", "daily", "static" or "none"
//! - `status` — outcome of a wrapped operation: "ok" or "error"

/// Total cache hits.
///
/// Labels: `operation`, `tier`.
pub const CACHE_HITS_TOTAL: &str = "millcache_cache_hits_total";

/// Total cache misses (lookups that found nothing servable).
///
/// Labels: `operation`, `tier`.
pub const CACHE_MISSES_TOTAL: &str = "millcache_cache_misses_total";

/// Total forced refreshes (calls that bypassed lookup).
///
/// Labels: `operation`, `tier`.
pub const CACHE_REFRESHES_TOTAL: &str = "millcache_cache_refreshes_total";

/// Total entries evicted under capacity pressure.
///
/// Labels: `tier`.
pub const CACHE_EVICTIONS_TOTAL: &str = "millcache_cache_evictions_total";

/// Total invalidation calls, whether or not anything was removed.
///
/// Labels: `tier` ("all" when only a pattern was given).
pub const CACHE_INVALIDATIONS_TOTAL: &str = "millcache_cache_invalidations_total";

/// Wrapped operation duration in seconds, measured on misses and refreshes.
///
/// Labels: `operation`, `status`.
pub const OPERATION_DURATION_SECONDS: &str = "millcache_operation_duration_seconds";
