//! Versioning configuration
//!
//! Loaded from `VERSO_VERSIONING_*` environment variables (after reading a
//! `.env` file, if present). Lists are comma separated.
//!
//! ```text
//! VERSO_VERSIONING_PRIMARY_STRATEGY=path
//! VERSO_VERSIONING_FALLBACK_STRATEGIES=custom_header,query
//! VERSO_VERSIONING_VERSION_HEADER=X-Client-Version
//! VERSO_VERSIONING_BYPASS_PATHS=/health,/metrics
//! ```

use crate::error::VersionResult;
use crate::middleware::DEFAULT_BYPASS_PATHS;
use crate::strategy::{VersionStrategy, DEFAULT_PATH_PREFIX, DEFAULT_VERSION_HEADER};
use serde::Deserialize;

/// Prefix of every versioning environment variable
pub const ENV_PREFIX: &str = "VERSO_VERSIONING_";

/// Settings for [`VersioningLayer`](crate::VersioningLayer)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VersioningConfig {
    /// Strategy tried first
    pub primary_strategy: String,
    /// Strategies tried after the primary, in order
    pub fallback_strategies: Vec<String>,
    /// Header read by the `custom_header` strategy
    pub version_header: String,
    /// Path segments in front of the version segment
    pub path_prefix: String,
    /// Remove the version segment before routing
    pub strip_path_version: bool,
    /// Paths that skip negotiation entirely
    pub bypass_paths: Vec<String>,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            primary_strategy: "path".to_string(),
            fallback_strategies: vec![
                "header".to_string(),
                "content_type".to_string(),
                "query".to_string(),
            ],
            version_header: DEFAULT_VERSION_HEADER.to_string(),
            path_prefix: DEFAULT_PATH_PREFIX.to_string(),
            strip_path_version: true,
            bypass_paths: DEFAULT_BYPASS_PATHS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl VersioningConfig {
    /// Load from the environment, falling back to defaults for anything unset
    #[cfg(feature = "config")]
    pub fn from_env() -> VersionResult<Self> {
        let _ = dotenvy::dotenv();
        envy::prefixed(ENV_PREFIX)
            .from_env::<Self>()
            .map_err(|err| crate::error::VersionError::Configuration(err.to_string()))
    }

    fn strategy(&self, name: &str) -> VersionResult<VersionStrategy> {
        Ok(match name.parse::<VersionStrategy>()? {
            VersionStrategy::UrlPath { .. } => {
                VersionStrategy::path_with_prefix(self.path_prefix.clone())
            }
            VersionStrategy::CustomHeader { .. } => {
                VersionStrategy::custom_header_named(self.version_header.clone())
            }
            other => other,
        })
    }

    /// The configured primary strategy
    pub fn primary(&self) -> VersionResult<VersionStrategy> {
        self.strategy(&self.primary_strategy)
    }

    /// The configured fallback strategies; blank entries are ignored
    pub fn fallbacks(&self) -> VersionResult<Vec<VersionStrategy>> {
        self.fallback_strategies
            .iter()
            .filter(|name| !name.trim().is_empty())
            .map(|name| self.strategy(name))
            .collect()
    }
}
