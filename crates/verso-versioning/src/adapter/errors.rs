//! Error entry conversion
//!
//! Current entries are `{code, message, field, context}`; legacy entries are
//! `{error_code, error_message, field_name}`. `context` has no legacy
//! counterpart and is dropped on the way down; it comes back as `{}`.

use crate::error::{VersionError, VersionResult};
use serde_json::{Map, Value};

const ADAPTER: &str = "errors";

fn entries(value: &Value) -> VersionResult<&Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| VersionError::adaptation(ADAPTER, "errors is not an array"))
}

fn entry(value: &Value) -> VersionResult<&Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| VersionError::adaptation(ADAPTER, "error entry is not an object"))
}

fn field(map: &Map<String, Value>, name: &str) -> Value {
    map.get(name).cloned().unwrap_or(Value::Null)
}

/// Current error list to the legacy shape
pub fn to_v1(value: &Value) -> VersionResult<Value> {
    entries(value)?
        .iter()
        .map(|item| {
            let map = entry(item)?;
            let mut out = Map::new();
            out.insert("error_code".into(), field(map, "code"));
            out.insert("error_message".into(), field(map, "message"));
            out.insert("field_name".into(), field(map, "field"));
            Ok(Value::Object(out))
        })
        .collect::<VersionResult<Vec<_>>>()
        .map(Value::Array)
}

/// Legacy error list to the current shape
pub fn to_v2(value: &Value) -> VersionResult<Value> {
    entries(value)?
        .iter()
        .map(|item| {
            let map = entry(item)?;
            let mut out = Map::new();
            out.insert("code".into(), field(map, "error_code"));
            out.insert("message".into(), field(map, "error_message"));
            out.insert("field".into(), field(map, "field_name"));
            out.insert("context".into(), Value::Object(Map::new()));
            Ok(Value::Object(out))
        })
        .collect::<VersionResult<Vec<_>>>()
        .map(Value::Array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_v1_drops_context() {
        let v2 = json!([{"code": "REQUIRED", "message": "name is required",
                         "field": "name", "context": {"min": 1}}]);
        assert_eq!(
            to_v1(&v2).unwrap(),
            json!([{"error_code": "REQUIRED", "error_message": "name is required",
                    "field_name": "name"}])
        );
    }

    #[test]
    fn test_to_v2_defaults_context() {
        let v1 = json!([{"error_code": "E1", "error_message": "bad"}]);
        assert_eq!(
            to_v2(&v1).unwrap(),
            json!([{"code": "E1", "message": "bad", "field": null, "context": {}}])
        );
    }

    #[test]
    fn test_non_array_fails() {
        assert!(to_v1(&json!({"code": "E"})).is_err());
        assert!(to_v2(&json!(["E"])).is_err());
    }
}
