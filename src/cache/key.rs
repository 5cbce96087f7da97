//! Cache key generation.
//!
//! A key has the shape `operation:caller:digest`. The digest is a truncated
//! SHA-256 of the parameters in canonical JSON form (object fields sorted by
//! name at every depth), so two parameter sets that differ only in field
//! order produce the same key, and raw parameter values never appear in the
//! key itself.
//!
//! `:` and `%` inside the operation or caller are percent-encoded, so the
//! two separators always split the key back into its three segments.

use std::borrow::Cow;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::Result;

/// Caller id used when the request is unauthenticated.
pub const ANONYMOUS_CALLER: &str = "anonymous";

/// Digest bytes kept in the key (rendered as twice as many hex chars).
const DIGEST_BYTES: usize = 16;

/// Build the cache key for a call.
///
/// Fails only if `params` cannot be represented as JSON (e.g. a map with
/// non-string keys).
pub fn cache_key<P>(operation: &str, caller: Option<&str>, params: &P) -> Result<String>
where
    P: Serialize + ?Sized,
{
    let value = serde_json::to_value(params)?;
    Ok(cache_key_from_value(operation, caller, &value))
}

/// Build the cache key for parameters already held as JSON.
pub fn cache_key_from_value(operation: &str, caller: Option<&str>, params: &Value) -> String {
    let caller = match caller {
        Some(c) if !c.is_empty() => c,
        _ => ANONYMOUS_CALLER,
    };
    format!(
        "{}:{}:{}",
        escape_segment(operation),
        escape_segment(caller),
        params_digest(params)
    )
}

/// Encode `%` and `:` so a segment cannot contain a key separator.
pub fn escape_segment(segment: &str) -> Cow<'_, str> {
    if !segment.contains([':', '%']) {
        return Cow::Borrowed(segment);
    }
    let mut out = String::with_capacity(segment.len() + 4);
    for c in segment.chars() {
        match c {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Hex digest of the canonical form of `params`.
pub fn params_digest(params: &Value) -> String {
    let canonical = canonical_json(params);
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(&digest[..DIGEST_BYTES])
}

/// Serialize `value` as compact JSON with object fields sorted by name.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut fields: Vec<(&String, &Value)> = map.iter().collect();
            fields.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (name, field)) in fields.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(name.clone()).to_string());
                out.push(':');
                write_canonical(field, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// The `operation:caller` portion of a key, which pattern invalidation
/// matches against, in its encoded form. The digest never contains `:`, so
/// the last separator always precedes it.
pub fn key_scope(key: &str) -> &str {
    key.rsplit_once(':').map(|(scope, _)| scope).unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use serde_json::json;

    use super::*;

    #[derive(Serialize)]
    struct OeeParams {
        line_id: String,
        days: u32,
    }

    #[derive(Serialize)]
    struct OeeParamsReordered {
        days: u32,
        line_id: String,
    }

    #[test]
    fn cache_key_deterministic() {
        let params = json!({"line_id": "L1", "days": 7});
        let k1 = cache_key("oee_query", Some("user1"), &params).unwrap();
        let k2 = cache_key("oee_query", Some("user1"), &params).unwrap();
        assert_eq!(k1, k2);
    }

    #[test]
    fn field_order_does_not_change_key() {
        let a = OeeParams {
            line_id: "L1".into(),
            days: 7,
        };
        let b = OeeParamsReordered {
            days: 7,
            line_id: "L1".into(),
        };
        assert_eq!(
            cache_key("oee_query", Some("user1"), &a).unwrap(),
            cache_key("oee_query", Some("user1"), &b).unwrap()
        );
    }

    #[test]
    fn nested_field_order_does_not_change_key() {
        let mut inner_a = HashMap::new();
        inner_a.insert("z", 1);
        inner_a.insert("a", 2);
        let mut inner_b = BTreeMap::new();
        inner_b.insert("a", 2);
        inner_b.insert("z", 1);

        let a = json!({"filters": inner_a, "shift": "night"});
        let b = json!({"shift": "night", "filters": inner_b});
        assert_eq!(canonical_json(&a), canonical_json(&b));
        assert_eq!(params_digest(&a), params_digest(&b));
    }

    #[test]
    fn array_order_matters() {
        let a = json!({"lines": ["L1", "L2"]});
        let b = json!({"lines": ["L2", "L1"]});
        assert_ne!(params_digest(&a), params_digest(&b));
    }

    #[test]
    fn cache_key_differs_on_operation_and_caller() {
        let params = json!({"days": 1});
        let base = cache_key("oee_query", Some("user1"), &params).unwrap();
        assert_ne!(base, cache_key("alert_check", Some("user1"), &params).unwrap());
        assert_ne!(base, cache_key("oee_query", Some("user2"), &params).unwrap());
    }

    #[test]
    fn missing_or_empty_caller_is_anonymous() {
        let params = json!({});
        let none = cache_key("oee_query", None, &params).unwrap();
        let empty = cache_key("oee_query", Some(""), &params).unwrap();
        assert_eq!(none, empty);
        assert!(none.starts_with("oee_query:anonymous:"));
    }

    #[test]
    fn key_length_is_bounded_and_hides_values() {
        let long_value = "x".repeat(10_000);
        let key = cache_key("nl_query", Some("user1"), &json!({"question": long_value})).unwrap();
        let digest = key.rsplit(':').next().unwrap();
        assert_eq!(digest.len(), DIGEST_BYTES * 2);
        assert!(!key.contains("xxxx"));
    }

    #[test]
    fn non_string_map_keys_are_rejected() {
        let mut params = HashMap::new();
        params.insert((1, 2), "pair");
        assert!(cache_key("oee_query", None, &params).is_err());
    }

    #[test]
    fn colons_in_segments_do_not_collide() {
        let params = json!({"days": 7});
        let a = cache_key("oee_query", Some("tenant:alice"), &params).unwrap();
        let b = cache_key("oee_query:tenant", Some("alice"), &params).unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("oee_query:tenant%3Aalice:"));
        assert!(b.starts_with("oee_query%3Atenant:alice:"));
        assert_eq!(a.matches(':').count(), 2);
    }

    #[test]
    fn escaping_is_unambiguous() {
        assert_eq!(escape_segment("plain"), "plain");
        assert_eq!(escape_segment("a:b"), "a%3Ab");
        assert_eq!(escape_segment("a%3Ab"), "a%253Ab");
        assert_ne!(escape_segment("a:b"), escape_segment("a%3Ab"));
    }

    #[test]
    fn key_scope_strips_digest() {
        assert_eq!(key_scope("alert_check:user1:ab12"), "alert_check:user1");
        assert_eq!(key_scope("tenant:a:user1:ab12"), "tenant:a:user1");
        assert_eq!(key_scope("bare"), "bare");
    }
}
