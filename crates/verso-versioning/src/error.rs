//! Error taxonomy for version negotiation

use chrono::NaiveDate;
use http::StatusCode;
use thiserror::Error;

/// Result alias for versioning operations
pub type VersionResult<T> = std::result::Result<T, VersionError>;

/// Errors raised by the registry, the extractor and route constraints
///
/// Only the first four variants are ever shown to clients; the rest describe
/// configuration or administrative mistakes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VersionError {
    /// The requested version is not registered
    #[error("API version '{requested}' is not supported. Supported versions: {}", supported.join(", "))]
    UnsupportedVersion {
        /// Version string as extracted from the request
        requested: String,
        /// Currently supported keys
        supported: Vec<String>,
    },

    /// The version's sunset date has passed
    #[error("API version '{version}' was sunset on {sunset_date} and is no longer available")]
    VersionGone {
        /// Registry key of the retired version
        version: String,
        /// Date the version stopped being served
        sunset_date: NaiveDate,
    },

    /// The version falls outside a route's declared bounds
    #[error("API version '{version}' is not available on this endpoint (requires {})", describe_bounds(.min_version.as_deref(), .max_version.as_deref()))]
    VersionRangeViolation {
        /// Negotiated version key
        version: String,
        /// Route minimum, inclusive
        min_version: Option<String>,
        /// Route maximum, inclusive
        max_version: Option<String>,
    },

    /// The route was removed in or before the negotiated version
    #[error("Endpoint '{path}' was removed in API version '{removed_in}'")]
    RouteRemoved {
        /// Negotiated version key
        version: String,
        /// Version that removed the route
        removed_in: String,
        /// Route path
        path: String,
    },

    /// No default version to fall back on
    #[error("Versioning misconfigured: {0}")]
    Configuration(String),

    /// A version with the same key is already registered
    #[error("API version '{0}' is already registered")]
    DuplicateVersion(String),

    /// No version with this key is registered
    #[error("API version '{0}' not found")]
    NotFound(String),

    /// The version string could not be parsed
    #[error("Invalid version string '{0}'")]
    InvalidVersion(String),

    /// Lifecycle dates are out of order
    #[error("Invalid lifecycle for '{version}': {reason}")]
    InvalidLifecycle {
        /// Registry key
        version: String,
        /// Which ordering rule failed
        reason: String,
    },

    /// A payload adapter failed
    #[error("Adapter '{adapter}' failed: {reason}")]
    Adaptation {
        /// Adapter name
        adapter: String,
        /// Failure detail
        reason: String,
    },
}

fn describe_bounds(min: Option<&str>, max: Option<&str>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("{} to {}", min, max),
        (Some(min), None) => format!("{} or later", min),
        (None, Some(max)) => format!("{} or earlier", max),
        (None, None) => "any version".to_string(),
    }
}

impl VersionError {
    /// HTTP status the error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnsupportedVersion { .. }
            | Self::VersionRangeViolation { .. }
            | Self::InvalidVersion(_) => StatusCode::BAD_REQUEST,
            Self::VersionGone { .. } | Self::RouteRemoved { .. } => StatusCode::GONE,
            Self::DuplicateVersion(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Configuration(_) | Self::InvalidLifecycle { .. } | Self::Adaptation { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code used in error envelopes
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedVersion { .. } => "UNSUPPORTED_VERSION",
            Self::VersionGone { .. } => "VERSION_GONE",
            Self::VersionRangeViolation { .. } => "VERSION_RANGE_VIOLATION",
            Self::RouteRemoved { .. } => "ROUTE_REMOVED",
            Self::Configuration(_) => "VERSION_CONFIGURATION_ERROR",
            Self::DuplicateVersion(_) => "DUPLICATE_VERSION",
            Self::NotFound(_) => "VERSION_NOT_FOUND",
            Self::InvalidVersion(_) => "INVALID_VERSION",
            Self::InvalidLifecycle { .. } => "INVALID_VERSION_LIFECYCLE",
            Self::Adaptation { .. } => "ADAPTATION_FAILED",
        }
    }

    /// Whether the error belongs to the client-visible taxonomy
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    /// Build an adaptation failure
    pub fn adaptation(adapter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Adaptation {
            adapter: adapter.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_message_lists_versions() {
        let err = VersionError::UnsupportedVersion {
            requested: "v99".into(),
            supported: vec!["v1".into(), "v2".into()],
        };
        assert_eq!(
            err.to_string(),
            "API version 'v99' is not supported. Supported versions: v1, v2"
        );
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "UNSUPPORTED_VERSION");
    }

    #[test]
    fn test_range_violation_message() {
        let err = VersionError::VersionRangeViolation {
            version: "v1".into(),
            min_version: Some("v2".into()),
            max_version: None,
        };
        assert!(err.to_string().contains("requires v2 or later"));

        let err = VersionError::VersionRangeViolation {
            version: "v4".into(),
            min_version: Some("v2".into()),
            max_version: Some("v3".into()),
        };
        assert!(err.to_string().contains("requires v2 to v3"));
    }

    #[test]
    fn test_status_mapping() {
        let gone = VersionError::VersionGone {
            version: "v1".into(),
            sunset_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        assert_eq!(gone.status(), StatusCode::GONE);
        assert!(gone.is_client_error());

        let removed = VersionError::RouteRemoved {
            version: "v3".into(),
            removed_in: "v3".into(),
            path: "/api/legacy".into(),
        };
        assert_eq!(removed.status(), StatusCode::GONE);

        let config = VersionError::Configuration("no default".into());
        assert_eq!(config.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!config.is_client_error());
    }
}
