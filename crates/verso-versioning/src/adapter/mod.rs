//! Response adapter framework
//!
//! Handlers produce payloads in the internal (latest) schema. An
//! [`AdapterChain`] rewrites them for the negotiated version using two
//! mechanisms, tried in order:
//!
//! 1. Directed adapters, checked in registration order. The first whose
//!    predicate accepts `(from, to)` transforms the payload. If it fails the
//!    failure is logged and the second mechanism runs instead.
//! 2. Generic field mapping: per target version, top-level renames followed
//!    by per-field value transformers. Unmapped fields pass through.
//!
//! Adaptation never fails from the caller's point of view; if both
//! mechanisms fail the original payload is returned.
//!
//! ```rust,ignore
//! let chain = AdapterChain::standard()
//!     .map_field("v1", "name", "title")
//!     .transform_field("v1", "title", |v| Ok(v.to_string().to_uppercase().into()));
//! let adapted = chain.adapt(payload, &ApiVersion::major(2), &ApiVersion::major(1));
//! ```

pub mod announcement;
pub mod envelope;
pub mod errors;
pub mod pagination;

use crate::error::{VersionError, VersionResult};
use crate::version::{normalize_key, ApiVersion};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Predicate deciding whether an adapter handles `(from, to)`
pub type Predicate = Arc<dyn Fn(&ApiVersion, &ApiVersion) -> bool + Send + Sync>;

/// Whole-payload transformation
pub type Transform = Arc<dyn Fn(Value) -> VersionResult<Value> + Send + Sync>;

/// Single field value transformation
pub type FieldTransformer = Arc<dyn Fn(&Value) -> VersionResult<Value> + Send + Sync>;

/// A directed payload transformation
#[derive(Clone)]
pub enum Adapter {
    /// Current envelope, pagination and errors to the v1 shape
    LegacyEnvelope,
    /// v1 envelope, pagination and errors back to the current shape
    CurrentEnvelope,
    /// Announcement flattening plus the v1 envelope
    LegacyAnnouncement,
    /// User supplied adapter
    Custom {
        /// Name used in logs
        name: String,
        /// Which version pairs it handles
        predicate: Predicate,
        /// The transformation
        transform: Transform,
    },
}

impl Adapter {
    /// Build a custom adapter
    pub fn custom<P, T>(name: impl Into<String>, predicate: P, transform: T) -> Self
    where
        P: Fn(&ApiVersion, &ApiVersion) -> bool + Send + Sync + 'static,
        T: Fn(Value) -> VersionResult<Value> + Send + Sync + 'static,
    {
        Self::Custom {
            name: name.into(),
            predicate: Arc::new(predicate),
            transform: Arc::new(transform),
        }
    }

    /// Name used in logs
    pub fn name(&self) -> &str {
        match self {
            Self::LegacyEnvelope => "legacy_envelope",
            Self::CurrentEnvelope => "current_envelope",
            Self::LegacyAnnouncement => "legacy_announcement",
            Self::Custom { name, .. } => name,
        }
    }

    /// Whether this adapter handles payloads going from `from` to `to`
    pub fn can_transform(&self, from: &ApiVersion, to: &ApiVersion) -> bool {
        match self {
            Self::LegacyEnvelope | Self::LegacyAnnouncement => from.major >= 2 && to.major == 1,
            Self::CurrentEnvelope => from.major == 1 && to.major >= 2,
            Self::Custom { predicate, .. } => predicate(from, to),
        }
    }

    /// Apply the transformation
    pub fn transform(&self, payload: Value) -> VersionResult<Value> {
        match self {
            Self::LegacyEnvelope => envelope::to_v1(payload),
            Self::CurrentEnvelope => envelope::to_v2(payload),
            Self::LegacyAnnouncement => announcement::to_v1(payload),
            Self::Custom { transform, .. } => transform(payload),
        }
    }
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Adapter").field(&self.name()).finish()
    }
}

/// Ordered adapters plus generic per-version field mappings
#[derive(Clone, Default)]
pub struct AdapterChain {
    adapters: Vec<Adapter>,
    field_mappings: HashMap<String, Vec<(String, String)>>,
    transformers: HashMap<String, Vec<(String, FieldTransformer)>>,
}

impl AdapterChain {
    /// Empty chain; every payload passes through
    pub fn new() -> Self {
        Self::default()
    }

    /// Envelope adapters in both directions
    pub fn standard() -> Self {
        Self::new()
            .register(Adapter::LegacyEnvelope)
            .register(Adapter::CurrentEnvelope)
    }

    /// Announcement flattening for v1, envelope conversion otherwise
    pub fn announcements() -> Self {
        Self::new()
            .register(Adapter::LegacyAnnouncement)
            .register(Adapter::CurrentEnvelope)
    }

    /// Append an adapter; earlier registrations win
    pub fn register(mut self, adapter: Adapter) -> Self {
        self.adapters.push(adapter);
        self
    }

    /// Rename a top-level field when adapting to `target`
    pub fn map_field(
        mut self,
        target: &str,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        self.field_mappings
            .entry(target_key(target))
            .or_default()
            .push((from.into(), to.into()));
        self
    }

    /// Transform a top-level field's value when adapting to `target`
    ///
    /// Transformers run after renames, so `field` is the renamed name.
    pub fn transform_field<F>(mut self, target: &str, field: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> VersionResult<Value> + Send + Sync + 'static,
    {
        self.transformers
            .entry(target_key(target))
            .or_default()
            .push((field.into(), Arc::new(f)));
        self
    }

    /// Registered adapters in order
    pub fn adapters(&self) -> &[Adapter] {
        &self.adapters
    }

    /// Rewrite `payload` from the `from` schema into the `to` schema
    pub fn adapt(&self, payload: Value, from: &ApiVersion, to: &ApiVersion) -> Value {
        if from.same_release(to) {
            return payload;
        }

        if let Some(adapter) = self.adapters.iter().find(|a| a.can_transform(from, to)) {
            match adapter.transform(payload.clone()) {
                Ok(adapted) => return adapted,
                Err(err) => {
                    tracing::warn!(
                        adapter = adapter.name(),
                        from = %from.key(),
                        to = %to.key(),
                        error = %err,
                        "Response adapter failed, falling back to field mapping"
                    );
                }
            }
        }

        match self.apply_field_mapping(payload.clone(), to) {
            Ok(adapted) => adapted,
            Err(err) => {
                tracing::warn!(
                    to = %to.key(),
                    error = %err,
                    "Field mapping failed, returning payload unadapted"
                );
                payload
            }
        }
    }

    /// Apply only the generic renames and transformers for `to`
    pub fn apply_field_mapping(&self, payload: Value, to: &ApiVersion) -> VersionResult<Value> {
        let key = to.key();
        let renames = self.field_mappings.get(&key);
        let transformers = self.transformers.get(&key);
        if renames.is_none() && transformers.is_none() {
            return Ok(payload);
        }

        let mut map = match payload {
            Value::Object(map) => map,
            other => return Ok(other),
        };

        for (old, new) in renames.into_iter().flatten() {
            if let Some(value) = map.remove(old) {
                map.insert(new.clone(), value);
            }
        }

        for (field, transformer) in transformers.into_iter().flatten() {
            if let Some(value) = map.get_mut(field) {
                *value = transformer(&*value).map_err(|err| {
                    VersionError::adaptation(format!("field '{}'", field), err.to_string())
                })?;
            }
        }

        Ok(Value::Object(map))
    }
}

fn target_key(target: &str) -> String {
    normalize_key(target).unwrap_or_else(|| target.to_string())
}

impl fmt::Debug for AdapterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterChain")
            .field("adapters", &self.adapters)
            .field("field_mappings", &self.field_mappings)
            .field(
                "transformers",
                &self
                    .transformers
                    .iter()
                    .map(|(k, v)| (k, v.iter().map(|(f, _)| f).collect::<Vec<_>>()))
                    .collect::<HashMap<_, _>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v1() -> ApiVersion {
        ApiVersion::major(1)
    }

    fn v2() -> ApiVersion {
        ApiVersion::major(2)
    }

    #[test]
    fn test_standard_chain_to_v1() {
        let payload = json!({"success": true, "data": {"id": "123", "name": "Test"}, "message": "ok"});
        let adapted = AdapterChain::standard().adapt(payload, &v2(), &v1());
        assert_eq!(
            adapted,
            json!({"status": "success", "result": {"id": "123", "name": "Test"}, "msg": "ok"})
        );
    }

    #[test]
    fn test_same_version_is_untouched() {
        let payload = json!({"success": true, "data": 1, "message": ""});
        let adapted = AdapterChain::standard().adapt(payload.clone(), &v2(), &v2().with_label("x"));
        assert_eq!(adapted, payload);
    }

    #[test]
    fn test_round_trip_through_chain() {
        let chain = AdapterChain::standard();
        let original = json!({"success": false, "data": null, "message": "nope",
                              "errors": [{"code": "E", "message": "m", "field": "f", "context": {}}]});
        let down = chain.adapt(original.clone(), &v2(), &v1());
        let up = chain.adapt(down, &v1(), &v2());
        assert_eq!(up, original);
    }

    #[test]
    fn test_first_matching_adapter_wins() {
        let chain = AdapterChain::new()
            .register(Adapter::custom("first", |_, to| to.major == 1, |_| Ok(json!("first"))))
            .register(Adapter::custom("second", |_, _| true, |_| Ok(json!("second"))));
        assert_eq!(chain.adapt(json!({}), &v2(), &v1()), json!("first"));
        assert_eq!(chain.adapt(json!({}), &v1(), &v2()), json!("second"));
    }

    #[test]
    fn test_failing_adapter_falls_back_to_field_mapping() {
        let chain = AdapterChain::new()
            .register(Adapter::custom(
                "broken",
                |_, _| true,
                |_| Err(VersionError::adaptation("broken", "boom")),
            ))
            .map_field("v1", "name", "title");
        assert_eq!(
            chain.adapt(json!({"name": "x", "id": 1}), &v2(), &v1()),
            json!({"title": "x", "id": 1})
        );
    }

    #[test]
    fn test_field_mapping_and_transformers() {
        let chain = AdapterChain::new()
            .map_field("1", "created_at", "created_date")
            .transform_field("v1", "created_date", |v| {
                Ok(announcement::legacy_timestamp(v))
            });
        let adapted = chain.adapt(
            json!({"created_at": "2024-01-02T03:04:05Z", "other": true}),
            &v2(),
            &v1(),
        );
        assert_eq!(
            adapted,
            json!({"created_date": "2024-01-02 03:04:05", "other": true})
        );

        // no mapping registered for v3
        let untouched = json!({"created_at": "x"});
        assert_eq!(
            chain.adapt(untouched.clone(), &v2(), &ApiVersion::major(3)),
            untouched
        );
    }

    #[test]
    fn test_total_failure_returns_original() {
        let chain = AdapterChain::new()
            .register(Adapter::custom(
                "broken",
                |_, _| true,
                |_| Err(VersionError::adaptation("broken", "boom")),
            ))
            .transform_field("v1", "id", |_| Err(VersionError::adaptation("id", "nope")));
        let payload = json!({"id": 7});
        assert_eq!(chain.adapt(payload.clone(), &v2(), &v1()), payload);
    }

    #[test]
    fn test_announcement_chain() {
        let payload = json!({
            "success": true,
            "message": "ok",
            "data": {"id": "9", "is_active": false,
                     "announcement_data": {"status": "draft"}}
        });
        let adapted = AdapterChain::announcements().adapt(payload, &v2(), &v1());
        assert_eq!(
            adapted["result"],
            json!({"announcement_id": "9", "active_flag": false, "status": "draft"})
        );
        assert_eq!(adapted["status"], "success");
    }
}
