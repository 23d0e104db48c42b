//! Request tracing middleware
//!
//! Logs request method, path, status code, and duration for each request.

use super::layer::{BoxedNext, MiddlewareLayer};
use crate::handler::BoxFuture;
use crate::request::Request;
use std::time::Instant;
use tracing::{info_span, Instrument, Level};

/// Middleware layer that creates a tracing span for every request
///
/// The span carries `method`, `path`, `status` and `duration_ms`, plus any
/// custom fields configured via [`TracingLayer::with_field`].
///
/// ```rust,ignore
/// App::new()
///     .layer(TracingLayer::new().with_field("service", "announcements"))
///     .route("/", get(handler))
/// ```
#[derive(Clone)]
pub struct TracingLayer {
    level: Level,
    custom_fields: Vec<(String, String)>,
}

impl TracingLayer {
    /// Create a new TracingLayer with default INFO level
    pub fn new() -> Self {
        Self {
            level: Level::INFO,
            custom_fields: Vec::new(),
        }
    }

    /// Create a TracingLayer with a specific log level for successful requests
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            custom_fields: Vec::new(),
        }
    }

    /// Add a custom field reported with every completed request
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_fields.push((key.into(), value.into()));
        self
    }
}

impl Default for TracingLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl MiddlewareLayer for TracingLayer {
    fn call(&self, req: Request, next: BoxedNext) -> BoxFuture {
        let level = self.level;
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let custom_fields = self
            .custom_fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",");

        Box::pin(async move {
            let start = Instant::now();

            let span = info_span!(
                "http_request",
                method = %method,
                path = %path,
                status = tracing::field::Empty,
                duration_ms = tracing::field::Empty,
            );

            let response = next(req).instrument(span.clone()).await;

            let duration_ms = start.elapsed().as_millis() as u64;
            let status = response.status();
            span.record("status", status.as_u16());
            span.record("duration_ms", duration_ms);

            let _enter = span.enter();
            if status.is_client_error() || status.is_server_error() {
                tracing::warn!(
                    method = %method,
                    path = %path,
                    status = status.as_u16(),
                    duration_ms,
                    fields = %custom_fields,
                    "Request failed"
                );
            } else {
                match level {
                    Level::TRACE => tracing::trace!(method = %method, path = %path, status = status.as_u16(), duration_ms, fields = %custom_fields, "Request completed"),
                    Level::DEBUG => tracing::debug!(method = %method, path = %path, status = status.as_u16(), duration_ms, fields = %custom_fields, "Request completed"),
                    Level::INFO => tracing::info!(method = %method, path = %path, status = status.as_u16(), duration_ms, fields = %custom_fields, "Request completed"),
                    Level::WARN => tracing::warn!(method = %method, path = %path, status = status.as_u16(), duration_ms, fields = %custom_fields, "Request completed"),
                    Level::ERROR => tracing::error!(method = %method, path = %path, status = status.as_u16(), duration_ms, fields = %custom_fields, "Request completed"),
                }
            }

            response
        })
    }

    fn clone_box(&self) -> Box<dyn MiddlewareLayer> {
        Box::new(self.clone())
    }
}
