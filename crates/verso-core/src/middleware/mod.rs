//! Middleware infrastructure for Verso
//!
//! Middleware is added with `App::layer()` and runs around the router
//! dispatch, so a layer may inspect or rewrite the request before a route is
//! matched and post-process the response afterwards.
//!
//! ```rust,ignore
//! App::new()
//!     .layer(TracingLayer::new())
//!     .route("/", get(handler))
//!     .run("127.0.0.1:8080")
//!     .await
//! ```

mod layer;
mod tracing_layer;

pub use layer::{BoxedNext, LayerStack, MiddlewareLayer};
pub use tracing_layer::TracingLayer;
