//! Version introspection endpoint

use crate::envelope::Envelope;
use crate::middleware::RequestVersionExt;
use crate::registry::{RegistrySnapshot, VersionRegistry};
use crate::version::ApiVersion;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use verso_core::{get, MethodRouter, Request};

/// One registered version as reported to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDetails {
    /// Full semantic version, e.g. `2.0.0`
    pub version: String,
    /// Short key, e.g. `v2`
    pub short: String,
    /// Whether the version is a stable release
    pub is_stable: bool,
    /// Whether the version has been deprecated
    pub is_deprecated: bool,
    /// Whether the version is experimental
    pub is_experimental: bool,
    /// Neither deprecated nor past its sunset date
    pub is_current: bool,
    /// Date the version shipped
    pub release_date: Option<NaiveDate>,
    /// Date the version was deprecated
    pub deprecation_date: Option<NaiveDate>,
    /// Date after which requests for the version are refused
    pub sunset_date: Option<NaiveDate>,
    /// Whole days left before sunset, never negative
    pub days_until_sunset: Option<i64>,
}

impl VersionDetails {
    fn describe(version: &ApiVersion, today: NaiveDate) -> Self {
        Self {
            version: version.full(),
            short: version.key(),
            is_stable: version.is_stable,
            is_deprecated: version.is_deprecated,
            is_experimental: version.is_experimental,
            is_current: version.is_current_on(today),
            release_date: version.release_date,
            deprecation_date: version.deprecation_date,
            sunset_date: version.sunset_date,
            days_until_sunset: version.days_until_sunset_on(today),
        }
    }
}

/// Payload of the introspection endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Version negotiated for this request, if any
    pub current_version: Option<String>,
    /// Key served when a request carries no version signal
    pub default_version: Option<String>,
    /// Key of the newest (or pinned) version
    pub latest_version: Option<String>,
    /// Keys of versions that are neither deprecated nor sunset
    pub supported_versions: Vec<String>,
    /// Every registered version, oldest first
    pub versions: Vec<VersionDetails>,
}

impl VersionInfo {
    /// Describe a registry snapshot
    pub fn from_snapshot(snapshot: &RegistrySnapshot, current: Option<String>) -> Self {
        let today = snapshot.today();
        Self {
            current_version: current,
            default_version: snapshot.default_key().map(str::to_string),
            latest_version: snapshot.latest_key().map(str::to_string),
            supported_versions: snapshot.supported_keys(),
            versions: snapshot
                .versions()
                .iter()
                .map(|version| VersionDetails::describe(version, today))
                .collect(),
        }
    }
}

/// `GET` handler listing the registry's versions
pub fn version_info(registry: Arc<VersionRegistry>) -> MethodRouter {
    get(move |req: Request| {
        let registry = registry.clone();
        async move {
            let current = req.negotiated_version().map(|v| v.key.clone());
            let info = VersionInfo::from_snapshot(&registry.snapshot(), current);
            Envelope::success(info, "API version information")
        }
    })
}
