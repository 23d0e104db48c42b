//! Response envelope in the internal (latest) wire shape
//!
//! Handlers build these and never care which version the client speaks;
//! the adapter framework rewrites them on the way out.
//!
//! ```json
//! {
//!   "success": true,
//!   "data": {"id": "123"},
//!   "message": "ok",
//!   "timestamp": "2024-06-01T12:00:00+00:00",
//!   "pagination": {"page": 1, "size": 20, "total": 45, "total_pages": 3,
//!                  "has_next": true, "has_previous": false}
//! }
//! ```

use crate::error::VersionError;
use chrono::Utc;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use verso_core::{IntoResponse, Json, Response};

/// Standard response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
    /// Whether the request succeeded
    pub success: bool,
    /// Payload, `null` for errors
    pub data: Option<T>,
    /// Human readable message
    pub message: String,
    /// RFC 3339 timestamp of when the envelope was built
    pub timestamp: String,
    /// Paging metadata for list responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    /// Error details for failed requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorDetail>>,
}

impl<T> Envelope<T> {
    /// Successful envelope
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
            timestamp: now(),
            pagination: None,
            errors: None,
        }
    }

    /// Failed envelope
    pub fn error(message: impl Into<String>, errors: Vec<ErrorDetail>) -> Self {
        Self {
            success: false,
            data: None,
            message: message.into(),
            timestamp: now(),
            pagination: None,
            errors: Some(errors),
        }
    }

    /// Attach paging metadata
    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

impl Envelope<Value> {
    /// Error envelope for a client-visible version error
    pub fn from_version_error(err: &VersionError) -> Self {
        let message = err.to_string();
        let mut detail = ErrorDetail::new(err.error_code(), message.clone());

        let context = match err {
            VersionError::UnsupportedVersion {
                requested,
                supported,
            } => {
                detail.field = Some("version".to_string());
                json!({ "requested": requested, "supported": supported })
            }
            VersionError::VersionGone {
                version,
                sunset_date,
            } => json!({ "version": version, "sunset_date": sunset_date.to_string() }),
            VersionError::VersionRangeViolation {
                version,
                min_version,
                max_version,
            } => json!({
                "version": version,
                "min_version": min_version,
                "max_version": max_version,
            }),
            VersionError::RouteRemoved {
                version,
                removed_in,
                path,
            } => json!({ "version": version, "removed_in": removed_in, "path": path }),
            _ => Value::Object(Map::new()),
        };
        if let Value::Object(map) = context {
            detail.context = map;
        }

        Self::error(message, vec![detail])
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        let status = if self.success {
            StatusCode::OK
        } else {
            StatusCode::BAD_REQUEST
        };
        (status, Json(self)).into_response()
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

/// Paging metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// 1-based page number
    pub page: u64,
    /// Items per page
    pub size: u64,
    /// Total number of items
    pub total: u64,
    /// Number of pages
    pub total_pages: u64,
    /// Whether a later page exists
    pub has_next: bool,
    /// Whether an earlier page exists
    pub has_previous: bool,
}

impl Pagination {
    /// Compute derived fields from page, size and total
    pub fn new(page: u64, size: u64, total: u64) -> Self {
        let total_pages = total_pages(size, total);
        Self {
            page,
            size,
            total,
            total_pages,
            has_next: page < total_pages,
            has_previous: page > 1,
        }
    }
}

/// Pages needed for `total` items at `size` per page; zero when `size` is zero
pub fn total_pages(size: u64, total: u64) -> u64 {
    if size == 0 {
        0
    } else {
        total.div_ceil(size)
    }
}

/// One error entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine readable code
    pub code: String,
    /// Human readable message
    pub message: String,
    /// Offending field, if any
    #[serde(default)]
    pub field: Option<String>,
    /// Free-form extra data
    #[serde(default)]
    pub context: Map<String, Value>,
}

impl ErrorDetail {
    /// Error entry with no field and an empty context
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field: None,
            context: Map::new(),
        }
    }

    /// Set the offending field
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Add a context entry
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}
