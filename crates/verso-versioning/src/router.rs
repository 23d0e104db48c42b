//! Version-aware route registration
//!
//! Routes carry a [`RouteVersionSpec`] attached at registration time. The
//! constraints are enforced before the handler runs, using the version
//! [`VersioningLayer`](crate::VersioningLayer) negotiated.

use crate::adapter::AdapterChain;
use crate::error::{VersionError, VersionResult};
use crate::extractor::NegotiatedVersion;
use crate::introspection::version_info;
use crate::middleware::{version_error_response, ExperimentalRoute, RequestVersionExt, RouteAdapters};
use crate::registry::VersionRegistry;
use crate::version::{ApiVersion, VersionRange};
use std::sync::Arc;
use verso_core::{BoxFuture, BoxedHandler, MethodRouter, Request, Router};

/// Per-route version constraints
#[derive(Debug, Clone, Default)]
pub struct RouteVersionSpec {
    /// Oldest version that may call the route (inclusive)
    pub min_version: Option<ApiVersion>,
    /// Newest version that may call the route (inclusive)
    pub max_version: Option<ApiVersion>,
    /// Versions at or after this one are warned about
    pub deprecated_in: Option<ApiVersion>,
    /// Versions at or after this one get `410 Gone`
    pub removed_in: Option<ApiVersion>,
    /// Adapter chain overriding the layer default
    pub adapters: Option<Arc<AdapterChain>>,
    /// Tag responses as experimental
    pub experimental: bool,
}

impl RouteVersionSpec {
    /// No constraints
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum version
    pub fn min(mut self, version: ApiVersion) -> Self {
        self.min_version = Some(version);
        self
    }

    /// Set the maximum version
    pub fn max(mut self, version: ApiVersion) -> Self {
        self.max_version = Some(version);
        self
    }

    /// Warn when called at or after `version`
    pub fn deprecated_in(mut self, version: ApiVersion) -> Self {
        self.deprecated_in = Some(version);
        self
    }

    /// Reject calls at or after `version`
    pub fn removed_in(mut self, version: ApiVersion) -> Self {
        self.removed_in = Some(version);
        self
    }

    /// Use a route-specific adapter chain
    pub fn adapters(mut self, chain: AdapterChain) -> Self {
        self.adapters = Some(Arc::new(chain));
        self
    }

    /// Tag responses with `X-API-Experimental: true`
    pub fn experimental(mut self) -> Self {
        self.experimental = true;
        self
    }

    /// The `[min, max]` bounds as a range
    pub fn range(&self) -> VersionRange {
        VersionRange {
            min: self.min_version.clone(),
            max: self.max_version.clone(),
            excluded: Vec::new(),
        }
    }

    /// Enforce the constraints for a negotiated version
    ///
    /// Deprecation only logs; range and removal violations are errors.
    pub fn check(&self, negotiated: &NegotiatedVersion, route: &str) -> VersionResult<()> {
        let version = &negotiated.version;

        if !self.range().contains(version) {
            let (min_version, max_version) = self.range().bounds();
            return Err(VersionError::VersionRangeViolation {
                version: negotiated.key.clone(),
                min_version,
                max_version,
            });
        }

        if let Some(removed_in) = &self.removed_in {
            if version >= removed_in {
                return Err(VersionError::RouteRemoved {
                    version: negotiated.key.clone(),
                    removed_in: removed_in.key(),
                    path: route.to_string(),
                });
            }
        }

        if let Some(deprecated_in) = &self.deprecated_in {
            if version >= deprecated_in {
                tracing::warn!(
                    route = %route,
                    version = %negotiated.key,
                    deprecated_in = %deprecated_in.key(),
                    "Deprecated route called"
                );
            }
        }

        Ok(())
    }
}

/// Wrap a handler so its route constraints are enforced before it runs
pub fn guard_handler(inner: BoxedHandler, spec: Arc<RouteVersionSpec>, route: Arc<str>) -> BoxedHandler {
    Arc::new(move |req: Request| {
        let inner = inner.clone();
        let spec = spec.clone();
        let route = route.clone();
        Box::pin(async move {
            if let Some(negotiated) = req.negotiated_version() {
                if let Err(err) = spec.check(negotiated, &route) {
                    tracing::warn!(
                        method = %req.method(),
                        path = %req.original_path(),
                        version = %negotiated.key,
                        error = %err,
                        "Route version constraint violated"
                    );
                    return version_error_response(&err);
                }
            }

            let mut response = inner(req).await;
            if let Some(chain) = &spec.adapters {
                response
                    .extensions_mut()
                    .insert(RouteAdapters(chain.clone()));
            }
            if spec.experimental {
                response.extensions_mut().insert(ExperimentalRoute);
            }
            response
        }) as BoxFuture
    })
}

/// Router whose routes may declare version constraints
///
/// ```rust,ignore
/// let router = VersionedRouter::new()
///     .route("/api/announcements", get(list_announcements))
///     .versioned_route(
///         "/api/businesses/{id}/stats",
///         get(business_stats),
///         RouteVersionSpec::new().min(ApiVersion::major(2)),
///     )
///     .into_router();
/// ```
#[derive(Default)]
pub struct VersionedRouter {
    router: Router,
    specs: Vec<(String, RouteVersionSpec)>,
}

impl VersionedRouter {
    /// Create an empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route served to every version
    pub fn route(mut self, path: &str, method_router: MethodRouter) -> Self {
        self.router = self.router.route(path, method_router);
        self
    }

    /// Register a route with version constraints
    pub fn versioned_route(
        mut self,
        path: &str,
        method_router: MethodRouter,
        spec: RouteVersionSpec,
    ) -> Self {
        let shared = Arc::new(spec.clone());
        let route: Arc<str> = Arc::from(path);
        let guarded = method_router
            .map_handlers(|inner| guard_handler(inner, shared.clone(), route.clone()));

        self.router = self.router.route(path, guarded);
        self.specs.push((path.to_string(), spec));
        self
    }

    /// Mount the introspection endpoint at `path`
    pub fn introspection(self, path: &str, registry: Arc<VersionRegistry>) -> Self {
        self.route(path, version_info(registry))
    }

    /// Registered constraints, in registration order
    pub fn specs(&self) -> &[(String, RouteVersionSpec)] {
        &self.specs
    }

    /// The underlying route table
    pub fn into_router(self) -> Router {
        self.router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::VersionSource;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use verso_core::get;

    fn negotiated(major: u32) -> NegotiatedVersion {
        NegotiatedVersion {
            version: ApiVersion::major(major),
            key: format!("v{}", major),
            source: VersionSource::Path,
            deprecated: false,
            days_until_sunset: None,
        }
    }

    fn request(path: &str, version: Option<u32>) -> Request {
        let req = http::Request::builder().uri(path).body(()).unwrap();
        let mut req = Request::from_http_request(req, Bytes::new());
        if let Some(major) = version {
            req.extensions_mut().insert(negotiated(major));
        }
        req
    }

    async fn ok(_req: Request) -> &'static str {
        "ok"
    }

    #[test]
    fn test_range_violation() {
        let spec = RouteVersionSpec::new()
            .min(ApiVersion::major(2))
            .max(ApiVersion::major(3));
        assert!(spec.check(&negotiated(2), "/x").is_ok());
        assert!(spec.check(&negotiated(3), "/x").is_ok());
        assert_eq!(
            spec.check(&negotiated(1), "/x").unwrap_err(),
            VersionError::VersionRangeViolation {
                version: "v1".into(),
                min_version: Some("v2".into()),
                max_version: Some("v3".into()),
            }
        );
        assert!(spec.check(&negotiated(4), "/x").is_err());
    }

    #[test]
    fn test_removed_in() {
        let spec = RouteVersionSpec::new()
            .deprecated_in(ApiVersion::major(2))
            .removed_in(ApiVersion::major(3));
        assert!(spec.check(&negotiated(1), "/legacy").is_ok());
        assert!(spec.check(&negotiated(2), "/legacy").is_ok());
        let err = spec.check(&negotiated(3), "/legacy").unwrap_err();
        assert_eq!(err.status(), StatusCode::GONE);
        assert_eq!(
            err,
            VersionError::RouteRemoved {
                version: "v3".into(),
                removed_in: "v3".into(),
                path: "/legacy".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_guarded_route_rejects_before_handler() {
        let router = VersionedRouter::new()
            .versioned_route(
                "/api/stats",
                get(ok),
                RouteVersionSpec::new().min(ApiVersion::major(2)),
            )
            .into_router();

        let response = router.dispatch(request("/api/stats", Some(1))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["errors"][0]["code"], "VERSION_RANGE_VIOLATION");

        let response = router.dispatch(request("/api/stats", Some(2))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_guard_is_inert_without_negotiation() {
        let router = VersionedRouter::new()
            .versioned_route(
                "/api/stats",
                get(ok),
                RouteVersionSpec::new().min(ApiVersion::major(2)),
            )
            .into_router();
        let response = router.dispatch(request("/api/stats", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_route_markers_on_response() {
        let router = VersionedRouter::new()
            .versioned_route(
                "/api/announcements",
                get(ok),
                RouteVersionSpec::new()
                    .adapters(AdapterChain::announcements())
                    .experimental(),
            )
            .into_router();
        let response = router.dispatch(request("/api/announcements", Some(1))).await;
        assert!(response.extensions().get::<RouteAdapters>().is_some());
        assert!(response.extensions().get::<ExperimentalRoute>().is_some());
    }

    #[test]
    fn test_specs_are_recorded() {
        let router = VersionedRouter::new()
            .route("/a", get(ok))
            .versioned_route("/b", get(ok), RouteVersionSpec::new().max(ApiVersion::major(1)));
        assert_eq!(router.specs().len(), 1);
        assert_eq!(router.specs()[0].0, "/b");
    }
}
