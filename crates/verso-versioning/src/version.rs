//! API version value type and lifecycle
//!
//! Versions are ordered by `(major, minor, patch)`; labels and lifecycle
//! metadata never take part in equality or ordering.

use crate::error::{VersionError, VersionResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// One supported API generation
///
/// Parses from `v1`, `v1.2`, `v1.2.3`, `1.2` and `v2.0.0-beta`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiVersion {
    /// Major version number, at least 1
    pub major: u32,
    /// Minor version number
    pub minor: u32,
    /// Patch version number
    pub patch: u32,
    /// Optional pre-release label such as `beta`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Date the version was released
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    /// Date the version was deprecated
    #[serde(default)]
    pub deprecation_date: Option<NaiveDate>,
    /// Date after which requests are rejected
    #[serde(default)]
    pub sunset_date: Option<NaiveDate>,
    /// Whether the version is considered stable
    #[serde(default = "default_true")]
    pub is_stable: bool,
    /// Whether the version has been deprecated
    #[serde(default)]
    pub is_deprecated: bool,
    /// Whether the version is experimental
    #[serde(default)]
    pub is_experimental: bool,
}

fn default_true() -> bool {
    true
}

impl ApiVersion {
    /// Create a stable version with no lifecycle dates
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            label: None,
            release_date: None,
            deprecation_date: None,
            sunset_date: None,
            is_stable: true,
            is_deprecated: false,
            is_experimental: false,
        }
    }

    /// Create a version with only a major number
    pub fn major(major: u32) -> Self {
        Self::new(major, 0, 0)
    }

    /// Attach a pre-release label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the release date
    pub fn released(mut self, date: NaiveDate) -> Self {
        self.release_date = Some(date);
        self
    }

    /// Mark as deprecated on `date`
    pub fn deprecated_on(mut self, date: NaiveDate) -> Self {
        self.is_deprecated = true;
        self.deprecation_date = Some(date);
        self
    }

    /// Set the sunset date
    pub fn sunset_on(mut self, date: NaiveDate) -> Self {
        self.sunset_date = Some(date);
        self
    }

    /// Mark as experimental; experimental versions are never stable
    pub fn experimental(mut self) -> Self {
        self.is_experimental = true;
        self.is_stable = false;
        self
    }

    /// Mark as unstable without flagging it experimental
    pub fn unstable(mut self) -> Self {
        self.is_stable = false;
        self
    }

    /// Canonical short form used as registry key: `v1`, `v2.1`, `v1.0.3`
    pub fn key(&self) -> String {
        if self.minor == 0 && self.patch == 0 {
            format!("v{}", self.major)
        } else if self.patch == 0 {
            format!("v{}.{}", self.major, self.minor)
        } else {
            format!("v{}.{}.{}", self.major, self.minor, self.patch)
        }
    }

    /// Full version string: `1.0.0` or `2.0.0-beta`
    pub fn full(&self) -> String {
        match &self.label {
            Some(label) => format!("{}.{}.{}-{}", self.major, self.minor, self.patch, label),
            None => format!("{}.{}.{}", self.major, self.minor, self.patch),
        }
    }

    /// Whether two versions share the same `(major, minor, patch)` triple
    pub fn same_release(&self, other: &ApiVersion) -> bool {
        self.triple() == other.triple()
    }

    fn triple(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.patch)
    }

    /// Check the major number and lifecycle date ordering
    pub fn validate(&self) -> VersionResult<()> {
        if self.major < 1 {
            return Err(VersionError::InvalidVersion(self.full()));
        }

        if let (Some(release), Some(deprecation)) = (self.release_date, self.deprecation_date) {
            if deprecation <= release {
                return Err(VersionError::InvalidLifecycle {
                    version: self.key(),
                    reason: format!(
                        "deprecation date {} must be after release date {}",
                        deprecation, release
                    ),
                });
            }
        }

        if let (Some(deprecation), Some(sunset)) = (self.deprecation_date, self.sunset_date) {
            if sunset <= deprecation {
                return Err(VersionError::InvalidLifecycle {
                    version: self.key(),
                    reason: format!(
                        "sunset date {} must be after deprecation date {}",
                        sunset, deprecation
                    ),
                });
            }
        }

        Ok(())
    }

    /// Whether the sunset date has been reached; the sunset day itself counts
    pub fn is_sunset_on(&self, today: NaiveDate) -> bool {
        matches!(self.sunset_date, Some(sunset) if today >= sunset)
    }

    /// Not deprecated and not yet sunset
    pub fn is_current_on(&self, today: NaiveDate) -> bool {
        !self.is_deprecated && !self.is_sunset_on(today)
    }

    /// Whole days left before sunset, clamped at zero
    pub fn days_until_sunset_on(&self, today: NaiveDate) -> Option<i64> {
        self.sunset_date
            .map(|sunset| (sunset - today).num_days().max(0))
    }
}

impl PartialEq for ApiVersion {
    fn eq(&self, other: &Self) -> bool {
        self.triple() == other.triple()
    }
}

impl Eq for ApiVersion {}

impl Hash for ApiVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.triple().hash(state);
    }
}

impl PartialOrd for ApiVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ApiVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.triple().cmp(&other.triple())
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full())
    }
}

impl FromStr for ApiVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionError::InvalidVersion(s.to_string());

        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        let (numbers, label) = match body.split_once('-') {
            Some((numbers, label)) if !label.is_empty() => (numbers, Some(label)),
            Some(_) => return Err(invalid()),
            None => (body, None),
        };

        let parts: Vec<&str> = numbers.split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(invalid());
        }

        let mut triple = [0u32; 3];
        for (slot, part) in triple.iter_mut().zip(parts.iter()) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            *slot = part.parse().map_err(|_| invalid())?;
        }

        let mut version = ApiVersion::new(triple[0], triple[1], triple[2]);
        if let Some(label) = label {
            version = version.with_label(label);
        }
        Ok(version)
    }
}

/// Normalize a loose version string (`1`, `V1.2`, `v1.0.0`) to its registry key
pub fn normalize_key(raw: &str) -> Option<String> {
    raw.parse::<ApiVersion>().ok().map(|v| v.key())
}

/// Inclusive version range with optional exclusions
#[derive(Debug, Clone, Default)]
pub struct VersionRange {
    /// Minimum version (inclusive)
    pub min: Option<ApiVersion>,
    /// Maximum version (inclusive)
    pub max: Option<ApiVersion>,
    /// Specific excluded versions
    pub excluded: Vec<ApiVersion>,
}

impl VersionRange {
    /// A range with no constraints
    pub fn any() -> Self {
        Self::default()
    }

    /// Every version from `version` onwards
    pub fn from(version: ApiVersion) -> Self {
        Self {
            min: Some(version),
            ..Self::default()
        }
    }

    /// Every version up to and including `version`
    pub fn until(version: ApiVersion) -> Self {
        Self {
            max: Some(version),
            ..Self::default()
        }
    }

    /// Versions between `min` and `max`, both inclusive
    pub fn between(min: ApiVersion, max: ApiVersion) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            excluded: Vec::new(),
        }
    }

    /// Exclude a specific version
    pub fn exclude(mut self, version: ApiVersion) -> Self {
        self.excluded.push(version);
        self
    }

    /// Check whether `version` lies inside the range
    pub fn contains(&self, version: &ApiVersion) -> bool {
        if self.excluded.contains(version) {
            return false;
        }
        if matches!(&self.min, Some(min) if version < min) {
            return false;
        }
        if matches!(&self.max, Some(max) if version > max) {
            return false;
        }
        true
    }

    /// Short keys of the bounds, for error messages
    pub fn bounds(&self) -> (Option<String>, Option<String>) {
        (
            self.min.as_ref().map(ApiVersion::key),
            self.max.as_ref().map(ApiVersion::key),
        )
    }
}
