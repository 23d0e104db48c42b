//! Version negotiation
//!
//! Turns an inbound request into a validated [`ApiVersion`] by trying a
//! primary strategy and then each fallback, falling back to the registry
//! default, and checking the result against the registry lifecycle.

use crate::error::{VersionError, VersionResult};
use crate::registry::{RegistrySnapshot, VersionRegistry};
use crate::strategy::{RequestSignals, VersionSource, VersionStrategy};
use crate::version::{normalize_key, ApiVersion};
use std::sync::Arc;

/// Outcome of a successful negotiation, stored in request extensions
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiatedVersion {
    /// The resolved registry entry
    pub version: ApiVersion,
    /// Its registry key
    pub key: String,
    /// Which signal produced it
    pub source: VersionSource,
    /// Whether the version is deprecated (but not yet sunset)
    pub deprecated: bool,
    /// Days left before sunset, if scheduled
    pub days_until_sunset: Option<i64>,
}

/// Multi-strategy version extractor
#[derive(Debug, Clone)]
pub struct VersionExtractor {
    registry: Arc<VersionRegistry>,
    primary: VersionStrategy,
    fallbacks: Vec<VersionStrategy>,
}

impl VersionExtractor {
    /// Path first, then Accept header, content type and query
    pub fn new(registry: Arc<VersionRegistry>) -> Self {
        Self {
            registry,
            primary: VersionStrategy::path(),
            fallbacks: vec![
                VersionStrategy::AcceptHeader,
                VersionStrategy::ContentType,
                VersionStrategy::QueryParam,
            ],
        }
    }

    /// Replace the primary strategy
    pub fn with_primary(mut self, strategy: VersionStrategy) -> Self {
        self.primary = strategy;
        self
    }

    /// Replace the fallback list
    pub fn with_fallbacks(mut self, strategies: Vec<VersionStrategy>) -> Self {
        self.fallbacks = strategies;
        self
    }

    /// Append a fallback strategy
    pub fn add_fallback(mut self, strategy: VersionStrategy) -> Self {
        self.fallbacks.push(strategy);
        self
    }

    /// The registry versions are resolved against
    pub fn registry(&self) -> &Arc<VersionRegistry> {
        &self.registry
    }

    /// Primary strategy followed by fallbacks, in the order they are tried
    pub fn strategies(&self) -> impl Iterator<Item = &VersionStrategy> {
        std::iter::once(&self.primary).chain(self.fallbacks.iter())
    }

    /// Run the strategies without consulting the registry
    pub fn detect(&self, signals: &RequestSignals<'_>) -> Option<(String, VersionSource)> {
        self.strategies().find_map(|strategy| {
            strategy
                .extract(signals)
                .map(|version| (version, strategy.source()))
        })
    }

    /// Negotiate the version for a request against the live registry
    ///
    /// `explicit` is a programmatic override that skips every strategy.
    pub fn extract(
        &self,
        signals: &RequestSignals<'_>,
        explicit: Option<&str>,
    ) -> VersionResult<NegotiatedVersion> {
        self.extract_in(&self.registry.snapshot(), signals, explicit)
    }

    /// Negotiate the version for a request against one registry snapshot
    ///
    /// Every lookup reads `snapshot`, so a concurrent `deprecate` or `remove`
    /// cannot change the outcome halfway through a request.
    pub fn extract_in(
        &self,
        snapshot: &RegistrySnapshot,
        signals: &RequestSignals<'_>,
        explicit: Option<&str>,
    ) -> VersionResult<NegotiatedVersion> {
        let requested = match explicit {
            Some(raw) => Some((
                normalize_key(raw).unwrap_or_else(|| raw.trim().to_string()),
                VersionSource::Explicit,
            )),
            None => self.detect(signals),
        };

        let (key, source) = match requested {
            Some(found) => found,
            None => {
                let default = snapshot.default_version().ok_or_else(|| {
                    VersionError::Configuration(
                        "no API version could be extracted and no default version is registered"
                            .to_string(),
                    )
                })?;
                (default.key(), VersionSource::Default)
            }
        };

        let negotiated = self.resolve_in(snapshot, &key, source)?;

        tracing::debug!(
            version = %negotiated.key,
            source = %negotiated.source,
            path = %signals.path,
            method = %signals.method,
            deprecated = negotiated.deprecated,
            "Negotiated API version"
        );

        if negotiated.deprecated {
            tracing::warn!(
                version = %negotiated.key,
                path = %signals.path,
                method = %signals.method,
                days_until_sunset = ?negotiated.days_until_sunset,
                "Deprecated API version requested"
            );
        }

        Ok(negotiated)
    }

    /// Validate a version key against the live registry lifecycle
    pub fn resolve(&self, key: &str, source: VersionSource) -> VersionResult<NegotiatedVersion> {
        self.resolve_in(&self.registry.snapshot(), key, source)
    }

    /// Validate a version key against a snapshot's lifecycle
    pub fn resolve_in(
        &self,
        snapshot: &RegistrySnapshot,
        key: &str,
        source: VersionSource,
    ) -> VersionResult<NegotiatedVersion> {
        let version = snapshot
            .get(key)
            .cloned()
            .ok_or_else(|| VersionError::UnsupportedVersion {
                requested: key.to_string(),
                supported: snapshot.supported_keys(),
            })?;

        let today = snapshot.today();
        if let Some(sunset_date) = version.sunset_date {
            if version.is_sunset_on(today) {
                return Err(VersionError::VersionGone {
                    version: version.key(),
                    sunset_date,
                });
            }
        }

        Ok(NegotiatedVersion {
            key: version.key(),
            source,
            deprecated: !version.is_current_on(today),
            days_until_sunset: version.days_until_sunset_on(today),
            version,
        })
    }

    /// The version whose wire shape an error response should use
    ///
    /// Whatever could be parsed from the request wins, even if unregistered;
    /// otherwise the registry default.
    pub fn best_guess(&self, signals: &RequestSignals<'_>) -> Option<ApiVersion> {
        self.best_guess_in(&self.registry.snapshot(), signals)
    }

    /// [`best_guess`](Self::best_guess) against one registry snapshot
    pub fn best_guess_in(
        &self,
        snapshot: &RegistrySnapshot,
        signals: &RequestSignals<'_>,
    ) -> Option<ApiVersion> {
        self.detect(signals)
            .and_then(|(raw, _)| {
                snapshot
                    .get(&raw)
                    .cloned()
                    .or_else(|| raw.parse::<ApiVersion>().ok())
            })
            .or_else(|| snapshot.default_version().cloned())
    }
}
