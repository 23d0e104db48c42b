//! Version negotiation middleware
//!
//! [`VersioningLayer`] drives every request through
//! `Unrouted → VersionExtracted → Handled → Adapted → Responded`, or into
//! `Error` when negotiation fails. Routing happens inside the layer, so the
//! version segment can be stripped from the path before the route table sees
//! it and one table serves every version.

use crate::adapter::AdapterChain;
use crate::config::VersioningConfig;
use crate::envelope::Envelope;
use crate::error::{VersionError, VersionResult};
use crate::extractor::{NegotiatedVersion, VersionExtractor};
use crate::headers::{self, apply_registry_headers, apply_version_headers};
use crate::registry::{RegistrySnapshot, VersionRegistry};
use crate::strategy::RequestSignals;
use crate::version::ApiVersion;
use bytes::Bytes;
use http::{header, StatusCode};
use http_body_util::{BodyExt, Full};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use verso_core::middleware::{BoxedNext, MiddlewareLayer};
use verso_core::{is_json, BoxFuture, IntoResponse, Json, Request, Response};

/// Paths that skip negotiation unless configured otherwise
pub const DEFAULT_BYPASS_PATHS: [&str; 5] =
    ["/docs", "/openapi.json", "/health", "/ready", "/live"];

/// Per-request pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    /// Request received, no version yet
    Unrouted,
    /// Version negotiated and attached to the request
    VersionExtracted,
    /// Route handler finished
    Handled,
    /// Payload rewritten for the negotiated version
    Adapted,
    /// Headers attached, response leaving the layer
    Responded,
    /// Negotiation failed
    Error,
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unrouted => "unrouted",
            Self::VersionExtracted => "version_extracted",
            Self::Handled => "handled",
            Self::Adapted => "adapted",
            Self::Responded => "responded",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Path as received, before the version segment was stripped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalPath(pub String);

/// Version forced by an outer layer, skipping every extraction strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitVersion(pub String);

/// Adapter chain chosen by the matched route, carried on the response
#[derive(Debug, Clone)]
pub struct RouteAdapters(pub Arc<AdapterChain>);

/// Marks a response as coming from an experimental route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExperimentalRoute;

/// Version accessors on [`Request`]
pub trait RequestVersionExt {
    /// The negotiated version, if the request went through [`VersioningLayer`]
    fn negotiated_version(&self) -> Option<&NegotiatedVersion>;

    /// The path before version stripping
    fn original_path(&self) -> &str;
}

impl RequestVersionExt for Request {
    fn negotiated_version(&self) -> Option<&NegotiatedVersion> {
        self.extensions().get::<NegotiatedVersion>()
    }

    fn original_path(&self) -> &str {
        self.extensions()
            .get::<OriginalPath>()
            .map(|p| p.0.as_str())
            .unwrap_or_else(|| self.path())
    }
}

/// Render a version error as a current-schema error envelope
pub fn version_error_response(err: &VersionError) -> Response {
    (err.status(), Json(Envelope::from_version_error(err))).into_response()
}

fn log_phase(phase: RequestPhase, method: &http::Method, path: &str) {
    tracing::debug!(phase = %phase, method = %method, path = %path, "Request phase");
}

/// Middleware negotiating the API version and adapting responses
#[derive(Clone)]
pub struct VersioningLayer {
    extractor: VersionExtractor,
    adapters: Arc<AdapterChain>,
    bypass_paths: Arc<Vec<String>>,
    strip_path_version: bool,
    internal_version: ApiVersion,
}

/// Oldest schema handlers can be written against
const MIN_INTERNAL_MAJOR: u32 = 2;

fn highest_registered(registry: &VersionRegistry) -> ApiVersion {
    registry
        .list_all()
        .into_iter()
        .max()
        .map_or_else(
            || ApiVersion::major(MIN_INTERNAL_MAJOR),
            |highest| highest.max(ApiVersion::major(MIN_INTERNAL_MAJOR)),
        )
}

impl VersioningLayer {
    /// Default strategies, the standard envelope adapters and default bypass paths
    pub fn new(registry: Arc<VersionRegistry>) -> Self {
        Self::with_extractor(VersionExtractor::new(registry))
    }

    /// Use a pre-configured extractor
    pub fn with_extractor(extractor: VersionExtractor) -> Self {
        let internal_version = highest_registered(extractor.registry());
        Self {
            extractor,
            adapters: Arc::new(AdapterChain::standard()),
            bypass_paths: Arc::new(
                DEFAULT_BYPASS_PATHS
                    .iter()
                    .map(|p| p.to_string())
                    .collect(),
            ),
            strip_path_version: true,
            internal_version,
        }
    }

    /// Build from configuration
    pub fn from_config(
        registry: Arc<VersionRegistry>,
        config: &VersioningConfig,
    ) -> VersionResult<Self> {
        let internal_version = highest_registered(&registry);
        let extractor = VersionExtractor::new(registry)
            .with_primary(config.primary()?)
            .with_fallbacks(config.fallbacks()?);

        Ok(Self {
            extractor,
            adapters: Arc::new(AdapterChain::standard()),
            bypass_paths: Arc::new(config.bypass_paths.clone()),
            strip_path_version: config.strip_path_version,
            internal_version,
        })
    }

    /// Default adapter chain for routes that do not bring their own
    pub fn with_adapters(mut self, adapters: AdapterChain) -> Self {
        self.adapters = Arc::new(adapters);
        self
    }

    /// Add a bypass path; it also covers everything below it
    pub fn bypass(mut self, path: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.bypass_paths).push(path.into());
        self
    }

    /// Whether a path-carried version segment is removed before routing
    pub fn strip_path_version(mut self, strip: bool) -> Self {
        self.strip_path_version = strip;
        self
    }

    /// Schema version handlers produce
    ///
    /// Defaults to the highest version registered when the layer is built,
    /// never below `v2`. Later registry changes do not move it.
    pub fn with_internal_version(mut self, version: ApiVersion) -> Self {
        self.internal_version = version;
        self
    }

    /// Schema version handlers produce
    pub fn internal_version(&self) -> &ApiVersion {
        &self.internal_version
    }

    /// The extractor in use
    pub fn extractor(&self) -> &VersionExtractor {
        &self.extractor
    }

    fn is_bypassed(&self, path: &str) -> bool {
        self.bypass_paths.iter().any(|bypass| {
            path == bypass
                || path
                    .strip_prefix(bypass.as_str())
                    .map_or(false, |rest| rest.starts_with('/'))
        })
    }

    async fn process(&self, mut req: Request, next: BoxedNext) -> Response {
        if self.is_bypassed(req.path()) {
            return next(req).await;
        }

        let method = req.method().clone();
        let path = req.path().to_string();
        log_phase(RequestPhase::Unrouted, &method, &path);

        let snapshot = self.extractor.registry().snapshot();
        let explicit = req.extensions().get::<ExplicitVersion>().map(|e| e.0.clone());

        let negotiated = {
            let signals = RequestSignals::from_request(&req);
            match self
                .extractor
                .extract_in(&snapshot, &signals, explicit.as_deref())
            {
                Ok(negotiated) => negotiated,
                Err(err) => {
                    let guess = self.extractor.best_guess_in(&snapshot, &signals);
                    log_phase(RequestPhase::Error, &method, &path);
                    tracing::warn!(
                        method = %method,
                        path = %path,
                        version = ?signals_version(&self.extractor, &signals),
                        error = %err,
                        "API version negotiation failed"
                    );
                    return self.error_response(&err, guess.as_ref(), &snapshot);
                }
            }
        };

        if self.strip_path_version {
            if let Some(stripped) = self
                .extractor
                .strategies()
                .find_map(|strategy| strategy.strip_path(&path))
            {
                if req.set_path(&stripped) {
                    req.extensions_mut().insert(OriginalPath(path.clone()));
                }
            }
        }
        req.extensions_mut().insert(negotiated.clone());
        log_phase(RequestPhase::VersionExtracted, &method, &path);

        let response = next(req).await;
        log_phase(RequestPhase::Handled, &method, &path);

        let mut response = self.adapt_response(response, &negotiated).await;
        log_phase(RequestPhase::Adapted, &method, &path);

        apply_version_headers(response.headers_mut(), &negotiated, &snapshot);
        if response.extensions().get::<ExperimentalRoute>().is_some() {
            headers::set(response.headers_mut(), headers::X_API_EXPERIMENTAL, "true");
        }
        log_phase(RequestPhase::Responded, &method, &path);
        response
    }

    async fn adapt_response(
        &self,
        response: Response,
        negotiated: &NegotiatedVersion,
    ) -> Response {
        let internal = &self.internal_version;
        if internal.same_release(&negotiated.version) || !is_json(&response) {
            return response;
        }

        let chain = response
            .extensions()
            .get::<RouteAdapters>()
            .map(|route| route.0.clone())
            .unwrap_or_else(|| self.adapters.clone());

        let (mut parts, body) = response.into_parts();
        let bytes = body
            .collect()
            .await
            .map(|collected| collected.to_bytes())
            .unwrap_or_default();

        let payload: Value = match serde_json::from_slice(&bytes) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(
                    version = %negotiated.key,
                    error = %err,
                    "Response declared JSON but did not parse, skipping adaptation"
                );
                return http::Response::from_parts(parts, Full::new(bytes));
            }
        };

        let adapted = chain.adapt(payload, internal, &negotiated.version);
        match serde_json::to_vec(&adapted) {
            Ok(encoded) => {
                parts.headers.remove(header::CONTENT_LENGTH);
                http::Response::from_parts(parts, Full::new(Bytes::from(encoded)))
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to encode adapted response");
                http::Response::from_parts(parts, Full::new(bytes))
            }
        }
    }

    fn error_response(
        &self,
        err: &VersionError,
        guess: Option<&ApiVersion>,
        snapshot: &RegistrySnapshot,
    ) -> Response {
        let envelope = match serde_json::to_value(Envelope::from_version_error(err)) {
            Ok(value) => value,
            Err(_) => return version_error_response(err),
        };

        let body = match guess {
            Some(target) => self.adapters.adapt(envelope, &self.internal_version, target),
            None => envelope,
        };

        let status = if err.is_client_error() {
            err.status()
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let mut response = (status, Json(body)).into_response();
        apply_registry_headers(response.headers_mut(), snapshot);
        response
    }
}

fn signals_version(extractor: &VersionExtractor, signals: &RequestSignals<'_>) -> Option<String> {
    extractor.detect(signals).map(|(version, _)| version)
}

impl MiddlewareLayer for VersioningLayer {
    fn call(&self, req: Request, next: BoxedNext) -> BoxFuture {
        let layer = self.clone();
        Box::pin(async move { layer.process(req, next).await })
    }

    fn clone_box(&self) -> Box<dyn MiddlewareLayer> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::NaiveDate;
    use serde_json::json;
    use verso_core::{get, App, TestClient, TestRequest};

    fn registry() -> Arc<VersionRegistry> {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let registry = VersionRegistry::with_clock(Arc::new(FixedClock(today)));
        registry.register(ApiVersion::major(1), true, false).unwrap();
        registry.register(ApiVersion::major(2), false, true).unwrap();
        Arc::new(registry)
    }

    async fn item(req: Request) -> Json<Value> {
        let version = req
            .negotiated_version()
            .map(|v| v.key.clone())
            .unwrap_or_default();
        Json(json!({
            "success": true,
            "data": {"id": "123", "seen": version, "original": req.original_path()},
            "message": "ok"
        }))
    }

    async fn health(_req: Request) -> &'static str {
        "ok"
    }

    fn client() -> TestClient {
        TestClient::new(
            App::new()
                .layer(VersioningLayer::new(registry()))
                .route("/api/items", get(item))
                .route("/health", get(health)),
        )
    }

    #[test]
    fn test_bypass_matching() {
        let layer = VersioningLayer::new(registry()).bypass("/metrics");
        assert!(layer.is_bypassed("/health"));
        assert!(layer.is_bypassed("/docs/index.html"));
        assert!(layer.is_bypassed("/metrics"));
        assert!(!layer.is_bypassed("/healthz"));
        assert!(!layer.is_bypassed("/api/v1/items"));
    }

    #[tokio::test]
    async fn test_path_version_is_stripped_and_adapted() {
        let response = client().get("/api/v1/items").await;
        response
            .assert_status(200)
            .assert_header("x-api-version", "v1")
            .assert_header("x-api-latest-version", "v2");

        let body: Value = response.json().unwrap();
        assert_eq!(body["status"], "success");
        assert_eq!(body["result"]["seen"], "v1");
        assert_eq!(body["result"]["original"], "/api/v1/items");
        assert!(body.get("success").is_none());
    }

    #[tokio::test]
    async fn test_latest_version_is_untouched() {
        let response = client().get("/api/v2/items").await;
        response.assert_status(200).assert_header("x-api-version-full", "2.0.0");
        let body: Value = response.json().unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["seen"], "v2");
    }

    #[tokio::test]
    async fn test_default_version_without_signal() {
        let response = client().get("/api/items").await;
        response.assert_status(200).assert_header("x-api-version", "v1");
    }

    #[tokio::test]
    async fn test_unsupported_version_uses_default_shape() {
        let response = client().get("/api/v99/items").await;
        response
            .assert_status(400)
            .assert_header("x-api-supported-versions", "v1, v2")
            .assert_no_header("x-api-version");

        // v99 parses but has no adapter; the current shape is kept
        let body: Value = response.json().unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"][0]["code"], "UNSUPPORTED_VERSION");
    }

    #[tokio::test]
    async fn test_unsupported_query_version_falls_back_to_default_shape() {
        let response = client()
            .request(TestRequest::get("/api/items?version=next"))
            .await;
        response.assert_status(400);
        let body: Value = response.json().unwrap();
        assert_eq!(body["status"], "error");
        assert_eq!(body["errors"][0]["error_code"], "UNSUPPORTED_VERSION");
        assert!(body["msg"].as_str().unwrap().contains("v1, v2"));
    }

    #[tokio::test]
    async fn test_bypass_path_skips_negotiation() {
        let response = client().get("/health").await;
        response
            .assert_status(200)
            .assert_no_header("x-api-version");
        assert_eq!(response.text(), "ok");
    }

    struct ForceV2;

    impl MiddlewareLayer for ForceV2 {
        fn call(&self, mut req: Request, next: BoxedNext) -> BoxFuture {
            req.extensions_mut().insert(ExplicitVersion("2".into()));
            next(req)
        }
        fn clone_box(&self) -> Box<dyn MiddlewareLayer> {
            Box::new(ForceV2)
        }
    }

    fn forced_client() -> TestClient {
        TestClient::new(
            App::new()
                .layer(ForceV2)
                .layer(VersioningLayer::new(registry()))
                .route("/api/items", get(item)),
        )
    }

    #[tokio::test]
    async fn test_explicit_version_extension() {
        forced_client()
            .get("/api/items")
            .await
            .assert_status(200)
            .assert_header("x-api-version", "v2");
    }

    #[tokio::test]
    async fn test_explicit_version_still_strips_path_segment() {
        let response = forced_client().get("/api/v1/items").await;
        response
            .assert_status(200)
            .assert_header("x-api-version", "v2");
        let body: Value = response.json().unwrap();
        assert_eq!(body["data"]["seen"], "v2");
        assert_eq!(body["data"]["original"], "/api/v1/items");
    }

    #[test]
    fn test_internal_version_defaults_to_highest_registered() {
        assert_eq!(
            VersioningLayer::new(registry()).internal_version(),
            &ApiVersion::major(2)
        );

        let registry = VersionRegistry::new()
            .with_version(ApiVersion::major(1), true, false)
            .unwrap()
            .with_version(ApiVersion::major(3), false, false)
            .unwrap();
        assert_eq!(
            VersioningLayer::new(Arc::new(registry)).internal_version(),
            &ApiVersion::major(3)
        );

        let legacy_only = VersionRegistry::new()
            .with_version(ApiVersion::major(1), true, true)
            .unwrap();
        assert_eq!(
            VersioningLayer::new(Arc::new(legacy_only)).internal_version(),
            &ApiVersion::major(2)
        );
    }

    #[tokio::test]
    async fn test_pinned_legacy_latest_still_adapts() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let registry = VersionRegistry::with_clock(Arc::new(FixedClock(today)));
        registry.register(ApiVersion::major(1), true, true).unwrap();
        registry.register(ApiVersion::major(2), false, false).unwrap();
        let client = TestClient::new(
            App::new()
                .layer(VersioningLayer::new(Arc::new(registry)))
                .route("/api/items", get(item)),
        );

        let response = client.get("/api/v1/items").await;
        response
            .assert_status(200)
            .assert_header("x-api-latest-version", "v1");
        let body: Value = response.json().unwrap();
        assert_eq!(body["status"], "success");
        assert_eq!(body["result"]["seen"], "v1");
        assert!(body.get("success").is_none());
    }

    #[tokio::test]
    async fn test_removing_latest_keeps_adapting() {
        let registry = registry();
        let client = TestClient::new(
            App::new()
                .layer(VersioningLayer::new(registry.clone()))
                .route("/api/items", get(item)),
        );
        registry.remove("v2").unwrap();

        let response = client.get("/api/v1/items").await;
        response
            .assert_status(200)
            .assert_header("x-api-latest-version", "v1");
        let body: Value = response.json().unwrap();
        assert_eq!(body["status"], "success");
        assert_eq!(body["result"]["seen"], "v1");
        assert!(body.get("success").is_none());
    }

    #[tokio::test]
    async fn test_internal_version_override() {
        let client = TestClient::new(
            App::new()
                .layer(VersioningLayer::new(registry()).with_internal_version(ApiVersion::major(1)))
                .route("/api/items", get(item)),
        );
        let body: Value = client.get("/api/v1/items").await.json().unwrap();
        assert_eq!(body["success"], true);
        assert!(body.get("status").is_none());
    }

    #[tokio::test]
    async fn test_no_stripping_when_disabled() {
        let client = TestClient::new(
            App::new()
                .layer(VersioningLayer::new(registry()).strip_path_version(false))
                .route("/api/items", get(item)),
        );
        client.get("/api/v1/items").await.assert_status(404);
    }
}
