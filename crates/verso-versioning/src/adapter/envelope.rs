//! Envelope conversion between the current and legacy shapes
//!
//! Current: `{success, data, message, timestamp, pagination?, errors?}`
//! Legacy: `{status, result, msg, timestamp, pagination?, errors?}`
//!
//! Payloads that are not envelopes pass through untouched.

use super::{errors, pagination};
use crate::error::{VersionError, VersionResult};
use serde_json::{Map, Value};

const ADAPTER: &str = "envelope";

fn convert_nested(
    out: &mut Map<String, Value>,
    source: &mut Map<String, Value>,
    key: &str,
    convert: fn(&Value) -> VersionResult<Value>,
) -> VersionResult<()> {
    match source.remove(key) {
        Some(Value::Null) => {
            out.insert(key.into(), Value::Null);
        }
        Some(value) => {
            out.insert(key.into(), convert(&value)?);
        }
        None => {}
    }
    Ok(())
}

/// Current envelope to the legacy shape
pub fn to_v1(payload: Value) -> VersionResult<Value> {
    let mut map = match payload {
        Value::Object(map) if map.contains_key("success") => map,
        other => return Ok(other),
    };

    let success = map
        .remove("success")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| VersionError::adaptation(ADAPTER, "'success' is not a boolean"))?;

    let mut out = Map::new();
    out.insert(
        "status".into(),
        Value::from(if success { "success" } else { "error" }),
    );
    out.insert("result".into(), map.remove("data").unwrap_or(Value::Null));
    out.insert(
        "msg".into(),
        map.remove("message").unwrap_or_else(|| Value::from("")),
    );
    convert_nested(&mut out, &mut map, "pagination", pagination::to_v1)?;
    convert_nested(&mut out, &mut map, "errors", errors::to_v1)?;

    // timestamp and anything unknown carry over as-is
    out.extend(map);
    Ok(Value::Object(out))
}

/// Legacy envelope to the current shape
pub fn to_v2(payload: Value) -> VersionResult<Value> {
    let mut map = match payload {
        Value::Object(map) if map.contains_key("status") && map.contains_key("result") => map,
        other => return Ok(other),
    };

    let success = match map.remove("status") {
        Some(Value::String(status)) => status == "success",
        _ => {
            return Err(VersionError::adaptation(
                ADAPTER,
                "'status' is not a string",
            ))
        }
    };

    let mut out = Map::new();
    out.insert("success".into(), Value::Bool(success));
    out.insert("data".into(), map.remove("result").unwrap_or(Value::Null));
    out.insert(
        "message".into(),
        map.remove("msg").unwrap_or_else(|| Value::from("")),
    );
    convert_nested(&mut out, &mut map, "pagination", pagination::to_v2)?;
    convert_nested(&mut out, &mut map, "errors", errors::to_v2)?;

    out.extend(map);
    Ok(Value::Object(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope_to_v1() {
        let v2 = json!({"success": true, "data": {"id": "123", "name": "Test"}, "message": "ok"});
        assert_eq!(
            to_v1(v2).unwrap(),
            json!({"status": "success", "result": {"id": "123", "name": "Test"}, "msg": "ok"})
        );
    }

    #[test]
    fn test_error_envelope_to_v1() {
        let v2 = json!({
            "success": false,
            "data": null,
            "message": "invalid",
            "timestamp": "2024-06-01T00:00:00+00:00",
            "errors": [{"code": "E", "message": "m", "field": "f", "context": {"x": 1}}]
        });
        let v1 = to_v1(v2).unwrap();
        assert_eq!(v1["status"], "error");
        assert_eq!(v1["result"], Value::Null);
        assert_eq!(v1["msg"], "invalid");
        assert_eq!(v1["timestamp"], "2024-06-01T00:00:00+00:00");
        assert_eq!(
            v1["errors"],
            json!([{"error_code": "E", "error_message": "m", "field_name": "f"}])
        );
    }

    #[test]
    fn test_paginated_envelope_to_v1() {
        let v2 = json!({
            "success": true, "data": [], "message": "",
            "pagination": {"page": 1, "size": 10, "total": 0, "total_pages": 0,
                           "has_next": false, "has_previous": false}
        });
        let v1 = to_v1(v2).unwrap();
        assert_eq!(
            v1["pagination"],
            json!({"current_page": 1, "per_page": 10, "total_count": 0, "total_pages": 0})
        );
    }

    #[test]
    fn test_round_trip_preserves_semantics() {
        let original = json!({
            "success": true,
            "data": {"id": "123"},
            "message": "ok",
            "timestamp": "2024-06-01T00:00:00+00:00",
            "pagination": {"page": 2, "size": 5, "total": 11, "total_pages": 3,
                           "has_next": true, "has_previous": true},
            "errors": [{"code": "W", "message": "warn", "field": null, "context": {}}]
        });
        let back = to_v2(to_v1(original.clone()).unwrap()).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_non_envelope_passes_through() {
        let plain = json!({"id": 1});
        assert_eq!(to_v1(plain.clone()).unwrap(), plain);
        assert_eq!(to_v2(plain.clone()).unwrap(), plain);
        assert_eq!(to_v1(json!([1, 2])).unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_malformed_envelope_fails() {
        assert!(to_v1(json!({"success": "yes"})).is_err());
        assert!(to_v1(json!({"success": true, "errors": "boom"})).is_err());
        assert!(to_v2(json!({"status": 1, "result": null})).is_err());
    }
}
