//! Handler trait and utilities

use crate::request::Request;
use crate::response::{IntoResponse, Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A pinned, boxed, sendable future producing a [`Response`]
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Type-erased handler stored in routers.
///
/// Handlers are reference counted so decorators can wrap them without
/// consuming the original.
pub type BoxedHandler = Arc<dyn Fn(Request) -> BoxFuture + Send + Sync>;

/// Trait representing an async handler function
///
/// Implemented for every `async fn(Request) -> impl IntoResponse`. Handlers
/// read whatever they need (path parameters, the negotiated API version, ...)
/// from the request itself.
pub trait Handler: Clone + Send + Sync + Sized + 'static {
    /// Call the handler with the request
    fn call(self, req: Request) -> BoxFuture;
}

impl<F, Fut, Res> Handler for F
where
    F: Fn(Request) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Res> + Send + 'static,
    Res: IntoResponse,
{
    fn call(self, req: Request) -> BoxFuture {
        Box::pin(async move { self(req).await.into_response() })
    }
}

/// Create a boxed handler from any Handler
pub fn into_boxed_handler<H: Handler>(handler: H) -> BoxedHandler {
    Arc::new(move |req: Request| handler.clone().call(req))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;

    async fn echo_path(req: Request) -> String {
        req.path().to_string()
    }

    #[tokio::test]
    async fn test_boxed_handler_invocation() {
        let handler = into_boxed_handler(echo_path);
        let req = http::Request::builder()
            .uri("/hello")
            .body(())
            .unwrap();
        let response = handler(Request::from_http_request(req, Bytes::new())).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
