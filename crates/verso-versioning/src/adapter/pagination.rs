//! Pagination block conversion
//!
//! | current | legacy |
//! |---------|--------|
//! | `page` | `current_page` |
//! | `size` | `per_page` |
//! | `total` | `total_count` |
//! | `total_pages` | `total_pages` |
//! | `has_next`, `has_previous` | implicit |

use crate::envelope::total_pages;
use crate::error::{VersionError, VersionResult};
use serde_json::{Map, Value};

const ADAPTER: &str = "pagination";

fn number(map: &Map<String, Value>, field: &str) -> VersionResult<u64> {
    map.get(field).and_then(Value::as_u64).ok_or_else(|| {
        VersionError::adaptation(ADAPTER, format!("missing or non-numeric '{}'", field))
    })
}

fn object(value: &Value) -> VersionResult<&Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| VersionError::adaptation(ADAPTER, "pagination is not an object"))
}

/// Current pagination block to the legacy shape
pub fn to_v1(value: &Value) -> VersionResult<Value> {
    let map = object(value)?;
    let page = number(map, "page")?;
    let size = number(map, "size")?;
    let total = number(map, "total")?;
    let pages = map
        .get("total_pages")
        .and_then(Value::as_u64)
        .unwrap_or_else(|| total_pages(size, total));

    let mut out = Map::new();
    out.insert("current_page".into(), page.into());
    out.insert("per_page".into(), size.into());
    out.insert("total_count".into(), total.into());
    out.insert("total_pages".into(), pages.into());
    Ok(Value::Object(out))
}

/// Legacy pagination block to the current shape, recomputing navigation flags
pub fn to_v2(value: &Value) -> VersionResult<Value> {
    let map = object(value)?;
    let page = number(map, "current_page")?;
    let size = number(map, "per_page")?;
    let total = number(map, "total_count")?;
    let pages = map
        .get("total_pages")
        .and_then(Value::as_u64)
        .unwrap_or_else(|| total_pages(size, total));

    let mut out = Map::new();
    out.insert("page".into(), page.into());
    out.insert("size".into(), size.into());
    out.insert("total".into(), total.into());
    out.insert("total_pages".into(), pages.into());
    out.insert("has_next".into(), (page < pages).into());
    out.insert("has_previous".into(), (page > 1).into());
    Ok(Value::Object(out))
}
