//! Handler wrappers for one-off version behavior
//!
//! Each wrapper takes a [`MethodRouter`] and returns one whose handlers carry
//! the extra behavior, so they compose with plain route registration:
//!
//! ```rust,ignore
//! let app = App::new().route(
//!     "/api/reports",
//!     deprecated(get(reports), DeprecationNotice { recommended: Some("v2".into()), ..Default::default() }),
//! );
//! ```

use crate::error::{VersionError, VersionResult};
use crate::headers::{set, DeprecationNotice, X_API_EXPERIMENTAL};
use crate::middleware::{version_error_response, ExperimentalRoute, RequestVersionExt};
use crate::version::VersionRange;
use std::sync::Arc;
use verso_core::{BoxFuture, BoxedHandler, MethodRouter, Request};

/// Mark every handler deprecated; requests are still served
pub fn deprecated(method_router: MethodRouter, notice: DeprecationNotice) -> MethodRouter {
    let notice = Arc::new(notice);
    method_router.map_handlers(|inner: BoxedHandler| -> BoxedHandler {
        let notice = notice.clone();
        Arc::new(move |req: Request| {
            let inner = inner.clone();
            let notice = notice.clone();
            Box::pin(async move {
                tracing::warn!(
                    method = %req.method(),
                    path = %req.original_path(),
                    since = ?notice.since,
                    "Deprecated endpoint called"
                );
                let mut response = inner(req).await;
                notice.apply(response.headers_mut());
                response
            }) as BoxFuture
        })
    })
}

/// Tag every response with `X-API-Experimental: true`
pub fn experimental(method_router: MethodRouter) -> MethodRouter {
    method_router.map_handlers(|inner: BoxedHandler| -> BoxedHandler {
        Arc::new(move |req: Request| {
            let inner = inner.clone();
            Box::pin(async move {
                let mut response = inner(req).await;
                set(response.headers_mut(), X_API_EXPERIMENTAL, "true");
                response.extensions_mut().insert(ExperimentalRoute);
                response
            }) as BoxFuture
        })
    })
}

/// Reject requests whose negotiated version falls outside `range`
pub fn version_range(method_router: MethodRouter, range: VersionRange) -> MethodRouter {
    let range = Arc::new(range);
    method_router.map_handlers(|inner: BoxedHandler| -> BoxedHandler {
        let range = range.clone();
        Arc::new(move |req: Request| {
            let inner = inner.clone();
            let range = range.clone();
            Box::pin(async move {
                if let Err(err) = check_version_range(&req, &range) {
                    tracing::warn!(
                        method = %req.method(),
                        path = %req.original_path(),
                        error = %err,
                        "Version outside route range"
                    );
                    return version_error_response(&err);
                }
                inner(req).await
            }) as BoxFuture
        })
    })
}

/// Check the request's negotiated version against `range`
///
/// Requests that were never negotiated pass.
pub fn check_version_range(req: &Request, range: &VersionRange) -> VersionResult<()> {
    let Some(negotiated) = req.negotiated_version() else {
        return Ok(());
    };
    if range.contains(&negotiated.version) {
        return Ok(());
    }
    let (min_version, max_version) = range.bounds();
    Err(VersionError::VersionRangeViolation {
        version: negotiated.key.clone(),
        min_version,
        max_version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::NegotiatedVersion;
    use crate::headers::{X_API_DEPRECATED, X_API_RECOMMENDED_VERSION, X_API_SUNSET_DATE};
    use crate::strategy::VersionSource;
    use crate::version::ApiVersion;
    use bytes::Bytes;
    use chrono::NaiveDate;
    use http::StatusCode;
    use verso_core::{get, Router};

    async fn ok(_req: Request) -> &'static str {
        "ok"
    }

    fn request(major: Option<u32>) -> Request {
        let req = http::Request::builder().uri("/r").body(()).unwrap();
        let mut req = Request::from_http_request(req, Bytes::new());
        if let Some(major) = major {
            req.extensions_mut().insert(NegotiatedVersion {
                version: ApiVersion::major(major),
                key: format!("v{}", major),
                source: VersionSource::Query,
                deprecated: false,
                days_until_sunset: None,
            });
        }
        req
    }

    #[tokio::test]
    async fn test_deprecated_adds_headers() {
        let notice = DeprecationNotice {
            since: Some("v2".into()),
            sunset: NaiveDate::from_ymd_opt(2025, 1, 1),
            days_until_sunset: None,
            recommended: Some("v3".into()),
        };
        let router = Router::new().route("/r", deprecated(get(ok), notice));
        let response = router.dispatch(request(Some(2))).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[X_API_DEPRECATED], "true");
        assert_eq!(response.headers()[X_API_SUNSET_DATE], "2025-01-01");
        assert_eq!(response.headers()[X_API_RECOMMENDED_VERSION], "v3");
    }

    #[tokio::test]
    async fn test_experimental_marks_response() {
        let router = Router::new().route("/r", experimental(get(ok)));
        let response = router.dispatch(request(None)).await;
        assert_eq!(response.headers()[X_API_EXPERIMENTAL], "true");
        assert!(response.extensions().get::<ExperimentalRoute>().is_some());
    }

    #[tokio::test]
    async fn test_version_range_guard() {
        let range = VersionRange::from(ApiVersion::major(2)).exclude(ApiVersion::major(3));
        let router = Router::new().route("/r", version_range(get(ok), range));

        assert_eq!(
            router.dispatch(request(Some(1))).await.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(router.dispatch(request(Some(2))).await.status(), StatusCode::OK);
        assert_eq!(
            router.dispatch(request(Some(3))).await.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(router.dispatch(request(None)).await.status(), StatusCode::OK);
    }

    #[test]
    fn test_check_reports_bounds() {
        let range = VersionRange::until(ApiVersion::major(1));
        let err = check_version_range(&request(Some(2)), &range).unwrap_err();
        assert_eq!(
            err,
            VersionError::VersionRangeViolation {
                version: "v2".into(),
                min_version: None,
                max_version: Some("v1".into()),
            }
        );
    }
}
