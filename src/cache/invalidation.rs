//! Selective invalidation.
//!
//! Invalidation is purely reactive: the cache never subscribes to or polls
//! for domain events. Whatever consumes those events (an ingestion job, a
//! webhook handler) calls [`ResponseCache::invalidate()`] or passes the
//! event to [`ResponseCache::on_event()`].
//!
//! Patterns are plain substrings matched against the `operation:caller`
//! portion of each key. Parameter digests are never matched.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::ResponseCache;
use super::key::key_scope;
use super::tier::Tier;
use crate::telemetry;
use crate::{CacheError, Result};

/// Arguments of one invalidation call, as accepted by the admin surface.
///
/// At least one of `tier` and `key_pattern` must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct InvalidationRequest {
    #[serde(default)]
    pub tier: Option<Tier>,
    #[serde(default)]
    pub key_pattern: Option<String>,
}

impl InvalidationRequest {
    /// Clear an entire tier.
    pub fn tier(tier: Tier) -> Self {
        Self {
            tier: Some(tier),
            key_pattern: None,
        }
    }

    /// Clear matching keys in every tier.
    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self {
            tier: None,
            key_pattern: Some(pattern.into()),
        }
    }

    /// Clear matching keys in one tier only.
    pub fn tier_pattern(tier: Tier, pattern: impl Into<String>) -> Self {
        Self {
            tier: Some(tier),
            key_pattern: Some(pattern.into()),
        }
    }
}

/// What one invalidation call did, for the operational log and the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidationOutcome {
    pub removed: usize,
    pub tier: Option<Tier>,
    pub key_pattern: Option<String>,
}

/// Domain events that make cached reads stale.
///
/// Each event maps to a fixed set of invalidation requests. The mapping
/// lives here so every consumer of an event clears the same keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainEvent {
    /// A safety incident was recorded; alert views are stale.
    SafetyIncidentRecorded,
    /// A production batch was ingested; live metrics are stale.
    ProductionDataIngested,
    /// A maintenance or downtime log was written.
    MaintenanceLogged,
    /// Line layouts, equipment or other reference data changed.
    ReferenceDataChanged,
}

impl DomainEvent {
    /// The invalidations this event triggers.
    pub fn invalidations(&self) -> Vec<InvalidationRequest> {
        match self {
            DomainEvent::SafetyIncidentRecorded => vec![
                InvalidationRequest::pattern("alert"),
                InvalidationRequest::pattern("safety"),
            ],
            DomainEvent::ProductionDataIngested => vec![InvalidationRequest::tier(Tier::Live)],
            DomainEvent::MaintenanceLogged => vec![
                InvalidationRequest::pattern("maintenance"),
                InvalidationRequest::pattern("downtime"),
            ],
            DomainEvent::ReferenceDataChanged => vec![InvalidationRequest::tier(Tier::Static)],
        }
    }
}

impl<V: Clone> ResponseCache<V> {
    /// Remove entries by tier and/or key pattern, returning how many went.
    ///
    /// - tier only: clear that tier.
    /// - pattern only: remove matching keys from every tier.
    /// - both: remove matching keys from that tier only.
    ///
    /// An empty pattern counts as absent. With neither argument this is
    /// [`CacheError::InvalidInvalidationRequest`].
    pub fn invalidate(&self, tier: Option<Tier>, key_pattern: Option<&str>) -> Result<usize> {
        let key_pattern = key_pattern.filter(|p| !p.is_empty());
        let removed = match (tier, key_pattern) {
            (None, None) => return Err(CacheError::InvalidInvalidationRequest),
            (Some(tier), None) => self.store(tier).clear(),
            (Some(tier), Some(pattern)) => self.clear_pattern(tier, pattern),
            (None, Some(pattern)) => Tier::ALL
                .iter()
                .map(|tier| self.clear_pattern(*tier, pattern))
                .sum(),
        };

        self.collector().record_invalidation();
        metrics::counter!(telemetry::CACHE_INVALIDATIONS_TOTAL,
            "tier" => tier.map(|t| t.as_str()).unwrap_or("all"),
        )
        .increment(1);
        info!(
            removed,
            tier = ?tier,
            key_pattern = ?key_pattern,
            "cache invalidated"
        );
        Ok(removed)
    }

    /// [`invalidate()`](Self::invalidate) for a deserialized admin request.
    pub fn invalidate_request(&self, request: &InvalidationRequest) -> Result<InvalidationOutcome> {
        let removed = self.invalidate(request.tier, request.key_pattern.as_deref())?;
        Ok(InvalidationOutcome {
            removed,
            tier: request.tier,
            key_pattern: request.key_pattern.clone(),
        })
    }

    /// Apply every invalidation `event` triggers; returns the total removed.
    pub fn on_event(&self, event: &DomainEvent) -> usize {
        event
            .invalidations()
            .iter()
            .filter_map(|request| self.invalidate_request(request).ok())
            .map(|outcome| outcome.removed)
            .sum()
    }

    fn clear_pattern(&self, tier: Tier, pattern: &str) -> usize {
        self.store(tier)
            .clear_matching(|key| key_scope(key).contains(pattern))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_event_triggers_a_valid_request() {
        for event in [
            DomainEvent::SafetyIncidentRecorded,
            DomainEvent::ProductionDataIngested,
            DomainEvent::MaintenanceLogged,
            DomainEvent::ReferenceDataChanged,
        ] {
            let requests = event.invalidations();
            assert!(!requests.is_empty());
            for request in requests {
                assert!(request.tier.is_some() || request.key_pattern.is_some());
            }
        }
    }

    #[test]
    fn request_deserializes_from_admin_payload() {
        let request: InvalidationRequest =
            serde_json::from_str(r#"{"tier": "live", "key_pattern": "alert_check"}"#).unwrap();
        assert_eq!(request, InvalidationRequest::tier_pattern(Tier::Live, "alert_check"));

        let empty: InvalidationRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, InvalidationRequest::default());
    }
}
