//! Millcache - tiered response cache for manufacturing dashboard read paths
//!
//! Production metrics, safety alerts, recommendations and comparisons are
//! all served by read operations over a relational store. This crate sits
//! in front of those operations: it keys each call by operation, caller and
//! parameters, serves fresh-enough results from memory, and lets event
//! consumers clear stale entries selectively.
//!
//! Each operation is assigned a freshness [`Tier`] at its call site:
//!
//! | Tier     | TTL    | Typical data                        |
//! |----------|--------|-------------------------------------|
//! | `live`   | 60s    | current OEE, active alerts          |
//! | `daily`  | 900s   | trends, recommendations, comparisons|
//! | `static` | 3600s  | line layouts, equipment catalogues  |
//! | `none`   | never  | lookups that must always be fresh   |
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use millcache::{CacheConfig, ResponseCache, Tier};
//! use serde_json::{Value, json};
//!
//! #[tokio::main]
//! async fn main() -> millcache::Result<()> {
//!     let cache: Arc<ResponseCache> = Arc::new(ResponseCache::new(CacheConfig::default())?);
//!
//!     let params = json!({"line_id": "L3", "window_hours": 8});
//!     let result = cache
//!         .get_or_fetch("oee_query", Tier::Live, Some("user-17"), &params, false, || async {
//!             // query the database here
//!             Ok::<Value, std::io::Error>(json!({"oee": 0.81}))
//!         })
//!         .await
//!         .expect("query failed");
//!     println!("{}", result.into_annotated());
//!
//!     // A new safety incident makes every alert view stale.
//!     cache.invalidate(None, Some("alert_check"))?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export main types at crate root
pub use cache::{
    CacheSource, CacheStats, Cached, CachedOperation, DomainEvent, InvalidationOutcome,
    InvalidationRequest, ReadOperation, ResponseCache, Tier, TierSettings, TierStore, wrap,
};
pub use config::{CacheConfig, Config};
pub use error::{CacheError, Result};
