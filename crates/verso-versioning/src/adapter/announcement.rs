//! Legacy announcement shape
//!
//! The legacy contract lifts `business_name`, `business_type` and `status`
//! out of the nested `announcement_data` object, renames a handful of
//! top-level fields and prints timestamps as `YYYY-MM-DD HH:MM:SS`.

use super::envelope;
use crate::error::{VersionError, VersionResult};
use chrono::{DateTime, NaiveDateTime};
use serde_json::{Map, Value};

const ADAPTER: &str = "announcement";

/// Nested fields lifted to the top level
pub const FLATTENED_FIELDS: [&str; 3] = ["business_name", "business_type", "status"];

/// Top-level renames, current name first
pub const RENAMED_FIELDS: [(&str, &str); 4] = [
    ("id", "announcement_id"),
    ("created_at", "created_date"),
    ("updated_at", "modified_date"),
    ("is_active", "active_flag"),
];

/// Renamed fields whose values are reformatted timestamps
pub const TIMESTAMP_FIELDS: [&str; 2] = ["created_date", "modified_date"];

/// Output format of legacy timestamps
pub const LEGACY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const NAIVE_ISO_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"];

/// Reformat an ISO-8601 timestamp; anything unparseable is returned unchanged
pub fn legacy_timestamp(value: &Value) -> Value {
    let Some(raw) = value.as_str() else {
        return value.clone();
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Value::String(parsed.format(LEGACY_TIMESTAMP_FORMAT).to_string());
    }
    NAIVE_ISO_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|parsed| Value::String(parsed.format(LEGACY_TIMESTAMP_FORMAT).to_string()))
        .unwrap_or_else(|| value.clone())
}

/// Flatten one announcement object in place
pub fn flatten(map: &mut Map<String, Value>) -> VersionResult<()> {
    if let Some(nested) = map.remove("announcement_data") {
        match nested {
            Value::Object(mut nested) => {
                for field in FLATTENED_FIELDS {
                    if let Some(value) = nested.remove(field) {
                        map.insert(field.to_string(), value);
                    }
                }
                if !nested.is_empty() {
                    map.insert("announcement_data".into(), Value::Object(nested));
                }
            }
            Value::Null => {}
            _ => {
                return Err(VersionError::adaptation(
                    ADAPTER,
                    "'announcement_data' is not an object",
                ))
            }
        }
    }

    for (from, to) in RENAMED_FIELDS {
        if let Some(value) = map.remove(from) {
            map.insert(to.to_string(), value);
        }
    }

    for field in TIMESTAMP_FIELDS {
        if let Some(value) = map.get_mut(field) {
            *value = legacy_timestamp(value);
        }
    }
    Ok(())
}

fn flatten_value(value: &mut Value) -> VersionResult<()> {
    match value {
        Value::Object(map) => flatten(map),
        Value::Array(items) => items.iter_mut().try_for_each(|item| match item {
            Value::Object(map) => flatten(map),
            _ => Ok(()),
        }),
        _ => Ok(()),
    }
}

/// Flatten announcement data, then convert the envelope to the legacy shape
///
/// Bare announcements (or lists of them) outside an envelope are flattened too.
pub fn to_v1(mut payload: Value) -> VersionResult<Value> {
    let is_envelope = payload
        .as_object()
        .map_or(false, |map| map.contains_key("success"));

    if is_envelope {
        if let Some(data) = payload.get_mut("data") {
            flatten_value(data)?;
        }
    } else {
        flatten_value(&mut payload)?;
    }
    envelope::to_v1(payload)
}
