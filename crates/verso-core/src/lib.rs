//! # Verso Core
//!
//! The host engine the Verso versioning layer plugs into: request/response
//! types, boxed handlers, a matchit-backed router, the middleware stack and a
//! hyper server loop.
//!
//! This crate is not meant to be used directly. Use `verso-rs` instead.

mod app;
mod error;
mod handler;
pub mod middleware;
mod request;
mod response;
mod router;
mod server;
#[cfg(any(test, feature = "test-utils"))]
mod test_client;

// Public API
pub use app::{App, AppService};
pub use error::{ApiError, Result};
pub use handler::{into_boxed_handler, BoxFuture, BoxedHandler, Handler};
pub use middleware::{BoxedNext, LayerStack, MiddlewareLayer, TracingLayer};
pub use request::Request;
pub use response::{is_json, IntoResponse, Json, Response};
pub use router::{delete, get, patch, post, put, MethodRouter, RouteConflictError, RouteInfo, Router};
#[cfg(any(test, feature = "test-utils"))]
pub use test_client::{TestClient, TestRequest, TestResponse};
