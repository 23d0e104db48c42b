//! Version registry
//!
//! The authoritative, shared store of every known API version. Reads happen
//! on every request; writes only through the administrative operations
//! below, serialized behind a reader-writer lock.

use crate::clock::{system_clock, SharedClock};
use crate::error::{VersionError, VersionResult};
use crate::version::{normalize_key, ApiVersion};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct RegistryState {
    versions: HashMap<String, ApiVersion>,
    default_key: Option<String>,
    latest_key: Option<String>,
    /// Latest was set explicitly and must not follow the maximum
    latest_pinned: bool,
}

impl RegistryState {
    fn max_key(&self) -> Option<String> {
        self.versions.values().max().map(ApiVersion::key)
    }

    fn sorted(&self) -> Vec<ApiVersion> {
        let mut versions: Vec<ApiVersion> = self.versions.values().cloned().collect();
        versions.sort();
        versions
    }

    fn lookup(&self, key: &str) -> Option<&ApiVersion> {
        self.versions.get(key).or_else(|| {
            normalize_key(key).and_then(|normalized| self.versions.get(&normalized))
        })
    }
}

/// Registry of supported API versions
#[derive(Debug)]
pub struct VersionRegistry {
    state: RwLock<RegistryState>,
    clock: SharedClock,
}

impl VersionRegistry {
    /// Create an empty registry driven by the system clock
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    /// Create an empty registry driven by `clock`
    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            clock,
        }
    }

    /// The clock used for lifecycle decisions
    pub fn clock(&self) -> SharedClock {
        self.clock.clone()
    }

    /// Today according to the registry's clock
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a version
    ///
    /// `is_default` replaces any existing default. `is_latest` pins the
    /// latest pointer; otherwise latest follows the maximum version.
    pub fn register(
        &self,
        version: ApiVersion,
        is_default: bool,
        is_latest: bool,
    ) -> VersionResult<()> {
        version.validate()?;
        let key = version.key();

        let mut state = self.write();
        if state.versions.contains_key(&key) {
            return Err(VersionError::DuplicateVersion(key));
        }

        state.versions.insert(key.clone(), version);
        if is_default {
            state.default_key = Some(key.clone());
        }
        if is_latest {
            state.latest_key = Some(key.clone());
            state.latest_pinned = true;
        } else if !state.latest_pinned {
            state.latest_key = state.max_key();
        }

        tracing::info!(
            version = %key,
            is_default,
            latest = ?state.latest_key,
            "Registered API version"
        );
        Ok(())
    }

    /// Builder-style registration for startup code
    pub fn with_version(
        self,
        version: ApiVersion,
        is_default: bool,
        is_latest: bool,
    ) -> VersionResult<Self> {
        self.register(version, is_default, is_latest)?;
        Ok(self)
    }

    /// Look up a version by key; loose forms such as `1` or `v1.0` are normalized
    pub fn get(&self, key: &str) -> Option<ApiVersion> {
        self.read().lookup(key).cloned()
    }

    /// Whether `key` resolves to a registered version
    pub fn contains(&self, key: &str) -> bool {
        self.read().lookup(key).is_some()
    }

    /// The default version, if one was registered
    pub fn get_default(&self) -> Option<ApiVersion> {
        let state = self.read();
        state
            .default_key
            .as_ref()
            .and_then(|key| state.versions.get(key))
            .cloned()
    }

    /// The latest version, if any
    pub fn get_latest(&self) -> Option<ApiVersion> {
        let state = self.read();
        state
            .latest_key
            .as_ref()
            .and_then(|key| state.versions.get(key))
            .cloned()
    }

    /// Keys of every current (not deprecated, not sunset) version, in version order
    pub fn list_supported(&self) -> Vec<String> {
        let today = self.today();
        self.read()
            .sorted()
            .into_iter()
            .filter(|v| v.is_current_on(today))
            .map(|v| v.key())
            .collect()
    }

    /// Every registered version in version order
    pub fn list_all(&self) -> Vec<ApiVersion> {
        self.read().sorted()
    }

    /// Number of registered versions
    pub fn len(&self) -> usize {
        self.read().versions.len()
    }

    /// Whether no versions are registered
    pub fn is_empty(&self) -> bool {
        self.read().versions.is_empty()
    }

    /// Deprecate a version as of today, optionally scheduling its sunset
    pub fn deprecate(&self, key: &str, sunset_date: Option<NaiveDate>) -> VersionResult<()> {
        let today = self.today();
        let mut state = self.write();

        let mut updated = state
            .lookup(key)
            .cloned()
            .ok_or_else(|| VersionError::NotFound(key.to_string()))?;
        let resolved = updated.key();
        updated.is_deprecated = true;
        updated.deprecation_date = Some(today);
        if sunset_date.is_some() {
            updated.sunset_date = sunset_date;
        }
        updated.validate()?;

        state.versions.insert(resolved.clone(), updated);
        tracing::info!(
            version = %resolved,
            deprecated_since = %today,
            sunset_date = ?sunset_date,
            "Deprecated API version"
        );
        Ok(())
    }

    /// Remove a version, recomputing default and latest if it held either role
    pub fn remove(&self, key: &str) -> VersionResult<ApiVersion> {
        let mut state = self.write();

        let resolved = state
            .lookup(key)
            .map(ApiVersion::key)
            .ok_or_else(|| VersionError::NotFound(key.to_string()))?;

        let removed = state
            .versions
            .remove(&resolved)
            .ok_or_else(|| VersionError::NotFound(key.to_string()))?;

        if state.default_key.as_deref() == Some(resolved.as_str()) {
            state.default_key = state.max_key();
        }
        if state.latest_key.as_deref() == Some(resolved.as_str()) {
            state.latest_key = state.max_key();
            state.latest_pinned = false;
        }

        tracing::info!(
            version = %resolved,
            default = ?state.default_key,
            latest = ?state.latest_key,
            "Removed API version"
        );
        Ok(removed)
    }

    /// Consistent, immutable view for the duration of one request
    pub fn snapshot(&self) -> RegistrySnapshot {
        let today = self.today();
        let state = self.read();
        RegistrySnapshot {
            versions: state.sorted(),
            default_key: state.default_key.clone(),
            latest_key: state.latest_key.clone(),
            today,
        }
    }
}

impl Default for VersionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the registry
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    versions: Vec<ApiVersion>,
    default_key: Option<String>,
    latest_key: Option<String>,
    today: NaiveDate,
}

impl RegistrySnapshot {
    /// Every version in version order
    pub fn versions(&self) -> &[ApiVersion] {
        &self.versions
    }

    /// Look up by key, normalizing loose forms
    pub fn get(&self, key: &str) -> Option<&ApiVersion> {
        let normalized = normalize_key(key);
        self.versions.iter().find(|v| {
            let own = v.key();
            own == key || normalized.as_deref() == Some(own.as_str())
        })
    }

    /// Default version key
    pub fn default_key(&self) -> Option<&str> {
        self.default_key.as_deref()
    }

    /// Latest version key
    pub fn latest_key(&self) -> Option<&str> {
        self.latest_key.as_deref()
    }

    /// Default version
    pub fn default_version(&self) -> Option<&ApiVersion> {
        self.default_key.as_deref().and_then(|k| self.get(k))
    }

    /// Latest version
    pub fn latest(&self) -> Option<&ApiVersion> {
        self.latest_key.as_deref().and_then(|k| self.get(k))
    }

    /// Keys of current versions
    pub fn supported_keys(&self) -> Vec<String> {
        self.versions
            .iter()
            .filter(|v| v.is_current_on(self.today))
            .map(ApiVersion::key)
            .collect()
    }

    /// The date the snapshot was taken
    pub fn today(&self) -> NaiveDate {
        self.today
    }
}
