//! Tests for selective invalidation on [`ResponseCache`].

use millcache::cache::key::{cache_key, escape_segment};
use millcache::{
    CacheConfig, CacheError, DomainEvent, InvalidationRequest, ResponseCache, Tier,
};

fn cache() -> ResponseCache<String> {
    ResponseCache::new(CacheConfig::default()).unwrap()
}

fn seed(cache: &ResponseCache<String>, tier: Tier, key: &str) {
    cache.store(tier).set(key, key.to_string());
}

// =========================================================================
// Argument handling
// =========================================================================

#[test]
fn neither_tier_nor_pattern_is_rejected() {
    let cache = cache();
    seed(&cache, Tier::Live, "alert_check:user1:ab12");

    let err = cache.invalidate(None, None).unwrap_err();
    assert!(matches!(err, CacheError::InvalidInvalidationRequest));
    assert!(!err.is_fatal());

    // Nothing removed, nothing counted
    assert_eq!(cache.tier_size(Tier::Live), 1);
    assert_eq!(cache.stats().invalidations, 0);
}

#[test]
fn empty_pattern_counts_as_absent() {
    let cache = cache();
    seed(&cache, Tier::Live, "alert_check:user1:ab12");

    assert!(cache.invalidate(None, Some("")).is_err());
    assert_eq!(cache.invalidate(Some(Tier::Live), Some("")).unwrap(), 1);
}

#[test]
fn empty_admin_request_is_rejected() {
    let cache = cache();
    let err = cache
        .invalidate_request(&InvalidationRequest::default())
        .unwrap_err();
    assert!(matches!(err, CacheError::InvalidInvalidationRequest));
}

// =========================================================================
// By tier
// =========================================================================

#[test]
fn tier_invalidation_is_idempotent() {
    let cache = cache();
    seed(&cache, Tier::Daily, "recommendations:user1:aa");
    seed(&cache, Tier::Daily, "line_comparison:user1:bb");
    seed(&cache, Tier::Live, "oee_query:user1:cc");

    assert_eq!(cache.invalidate(Some(Tier::Daily), None).unwrap(), 2);
    assert_eq!(cache.invalidate(Some(Tier::Daily), None).unwrap(), 0);

    // Other tiers untouched
    assert_eq!(cache.tier_size(Tier::Live), 1);
}

#[test]
fn none_tier_invalidation_removes_nothing() {
    let cache = cache();
    assert_eq!(cache.invalidate(Some(Tier::None), None).unwrap(), 0);
    assert_eq!(cache.stats().invalidations, 1);
}

// =========================================================================
// By pattern
// =========================================================================

#[test]
fn pattern_removes_only_matching_operation_keys() {
    let cache = cache();
    seed(&cache, Tier::Live, "alert_check:user1:ab12");
    seed(&cache, Tier::Live, "oee_query:user1:cd34");

    assert_eq!(cache.invalidate(None, Some("alert_check")).unwrap(), 1);
    assert!(cache.store(Tier::Live).get("alert_check:user1:ab12").is_none());
    assert!(cache.store(Tier::Live).get("oee_query:user1:cd34").is_some());
}

#[test]
fn pattern_spans_all_tiers() {
    let cache = cache();
    seed(&cache, Tier::Live, "alert_check:user1:aa");
    seed(&cache, Tier::Daily, "alert_history:user2:bb");
    seed(&cache, Tier::Static, "alert_rules:anonymous:cc");
    seed(&cache, Tier::Static, "equipment_catalogue:anonymous:dd");

    assert_eq!(cache.invalidate(None, Some("alert")).unwrap(), 3);
    assert_eq!(cache.stats().total_entries, 1);
}

#[test]
fn pattern_matches_caller_portion() {
    let cache = cache();
    seed(&cache, Tier::Live, "oee_query:user1:aa");
    seed(&cache, Tier::Live, "oee_query:user2:bb");

    assert_eq!(cache.invalidate(None, Some("user2")).unwrap(), 1);
    assert!(cache.store(Tier::Live).get("oee_query:user1:aa").is_some());
}

#[test]
fn pattern_never_matches_digest() {
    let cache = cache();
    seed(&cache, Tier::Live, "oee_query:user1:deadbeef");

    assert_eq!(cache.invalidate(None, Some("deadbeef")).unwrap(), 0);
    assert_eq!(cache.invalidate(None, Some("user1:dead")).unwrap(), 0);
    assert_eq!(cache.tier_size(Tier::Live), 1);
}

#[test]
fn pattern_matches_encoded_segments() {
    let cache = cache();
    let params = serde_json::json!({"period": "weekly"});
    let shared = cache_key("report", Some("acme:alice"), &params).unwrap();
    let other = cache_key("report", Some("acme"), &params).unwrap();
    seed(&cache, Tier::Daily, &shared);
    seed(&cache, Tier::Daily, &other);

    let pattern = escape_segment("acme:alice");
    assert_eq!(cache.invalidate(None, Some(pattern.as_ref())).unwrap(), 1);
    assert!(cache.store(Tier::Daily).get(&other).is_some());
}

#[test]
fn tier_and_pattern_restricts_to_tier() {
    let cache = cache();
    seed(&cache, Tier::Live, "alert_check:user1:aa");
    seed(&cache, Tier::Daily, "alert_check:user1:bb");

    let outcome = cache
        .invalidate_request(&InvalidationRequest::tier_pattern(Tier::Live, "alert_check"))
        .unwrap();
    assert_eq!(outcome.removed, 1);
    assert_eq!(outcome.tier, Some(Tier::Live));
    assert_eq!(outcome.key_pattern.as_deref(), Some("alert_check"));
    assert_eq!(cache.tier_size(Tier::Daily), 1);
}

// =========================================================================
// Accounting and events
// =========================================================================

#[test]
fn every_valid_call_is_counted() {
    let cache = cache();
    cache.invalidate(Some(Tier::Live), None).unwrap();
    cache.invalidate(None, Some("nothing_matches")).unwrap();
    cache.invalidate(Some(Tier::Static), Some("x")).unwrap();

    assert_eq!(cache.stats().invalidations, 3);
}

#[test]
fn safety_incident_clears_alert_views() {
    let cache = cache();
    seed(&cache, Tier::Live, "alert_check:user1:aa");
    seed(&cache, Tier::Daily, "safety_summary:user1:bb");
    seed(&cache, Tier::Live, "oee_query:user1:cc");

    let removed = cache.on_event(&DomainEvent::SafetyIncidentRecorded);

    assert_eq!(removed, 2);
    assert_eq!(cache.stats().total_entries, 1);
    assert_eq!(cache.stats().invalidations, 2);
}

#[test]
fn reference_data_change_clears_static_tier() {
    let cache = cache();
    seed(&cache, Tier::Static, "equipment_catalogue:anonymous:aa");
    seed(&cache, Tier::Live, "oee_query:user1:bb");

    assert_eq!(cache.on_event(&DomainEvent::ReferenceDataChanged), 1);
    assert_eq!(cache.tier_size(Tier::Live), 1);
}

#[test]
fn production_ingest_clears_live_tier() {
    let cache = cache();
    seed(&cache, Tier::Live, "oee_query:user1:aa");
    seed(&cache, Tier::Live, "alert_check:user1:bb");
    seed(&cache, Tier::Daily, "recommendations:user1:cc");

    assert_eq!(cache.on_event(&DomainEvent::ProductionDataIngested), 2);
    assert_eq!(cache.tier_size(Tier::Daily), 1);
}
