//! Version response headers

use crate::extractor::NegotiatedVersion;
use crate::registry::RegistrySnapshot;
use chrono::NaiveDate;
use http::{HeaderMap, HeaderName, HeaderValue};

/// Negotiated version key
pub const X_API_VERSION: &str = "x-api-version";
/// Full version string, e.g. `2.0.0-beta`
pub const X_API_VERSION_FULL: &str = "x-api-version-full";
/// Comma separated current version keys
pub const X_API_SUPPORTED_VERSIONS: &str = "x-api-supported-versions";
/// Latest version key
pub const X_API_LATEST_VERSION: &str = "x-api-latest-version";
/// `true` when the version or route is deprecated
pub const X_API_DEPRECATED: &str = "x-api-deprecated";
/// Deprecation date or version
pub const X_API_DEPRECATED_SINCE: &str = "x-api-deprecated-since";
/// Scheduled sunset date
pub const X_API_SUNSET_DATE: &str = "x-api-sunset-date";
/// Whole days left before sunset
pub const X_API_DAYS_UNTIL_SUNSET: &str = "x-api-days-until-sunset";
/// Version clients should move to
pub const X_API_RECOMMENDED_VERSION: &str = "x-api-recommended-version";
/// `true` for experimental versions or routes
pub const X_API_EXPERIMENTAL: &str = "x-api-experimental";

/// Insert a header, skipping values that are not valid header text
pub(crate) fn set(headers: &mut HeaderMap, name: &'static str, value: impl AsRef<str>) {
    if let Ok(value) = HeaderValue::from_str(value.as_ref()) {
        headers.insert(HeaderName::from_static(name), value);
    }
}

/// Deprecation details for the `X-API-Deprecated*` family
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeprecationNotice {
    /// Date or version the deprecation started
    pub since: Option<String>,
    /// Sunset date
    pub sunset: Option<NaiveDate>,
    /// Days left before sunset
    pub days_until_sunset: Option<i64>,
    /// Replacement version
    pub recommended: Option<String>,
}

impl DeprecationNotice {
    /// Write the deprecation headers
    pub fn apply(&self, headers: &mut HeaderMap) {
        set(headers, X_API_DEPRECATED, "true");
        if let Some(since) = &self.since {
            set(headers, X_API_DEPRECATED_SINCE, since);
        }
        if let Some(sunset) = self.sunset {
            set(headers, X_API_SUNSET_DATE, sunset.to_string());
        }
        if let Some(days) = self.days_until_sunset {
            set(headers, X_API_DAYS_UNTIL_SUNSET, days.to_string());
        }
        if let Some(recommended) = &self.recommended {
            set(headers, X_API_RECOMMENDED_VERSION, recommended);
        }
    }
}

/// Registry-wide headers sent on every versioned response, errors included
pub fn apply_registry_headers(headers: &mut HeaderMap, snapshot: &RegistrySnapshot) {
    set(
        headers,
        X_API_SUPPORTED_VERSIONS,
        snapshot.supported_keys().join(", "),
    );
    if let Some(latest) = snapshot.latest_key() {
        set(headers, X_API_LATEST_VERSION, latest);
    }
}

/// Headers describing a successful negotiation
pub fn apply_version_headers(
    headers: &mut HeaderMap,
    negotiated: &NegotiatedVersion,
    snapshot: &RegistrySnapshot,
) {
    set(headers, X_API_VERSION, &negotiated.key);
    set(headers, X_API_VERSION_FULL, negotiated.version.full());
    apply_registry_headers(headers, snapshot);

    if negotiated.deprecated {
        DeprecationNotice {
            since: negotiated
                .version
                .deprecation_date
                .map(|date| date.to_string()),
            sunset: negotiated.version.sunset_date,
            days_until_sunset: negotiated.days_until_sunset,
            recommended: snapshot.latest_key().map(str::to_string),
        }
        .apply(headers);
    }

    if negotiated.version.is_experimental {
        set(headers, X_API_EXPERIMENTAL, "true");
    }
}
