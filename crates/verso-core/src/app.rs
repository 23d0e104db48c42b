//! Application builder

use crate::handler::BoxFuture;
use crate::middleware::{BoxedNext, LayerStack, MiddlewareLayer};
use crate::request::Request;
use crate::response::Response;
use crate::router::{MethodRouter, Router};
use crate::server::Server;
use std::sync::Arc;

/// A Verso application: a route table plus the middleware wrapped around it
///
/// ```rust,ignore
/// App::new()
///     .layer(TracingLayer::new())
///     .route("/api/announcements", get(list_announcements))
///     .run("127.0.0.1:8080")
///     .await
/// ```
pub struct App {
    router: Router,
    layers: LayerStack,
}

impl App {
    /// Create an empty application
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            layers: LayerStack::new(),
        }
    }

    /// Create an application from a pre-built router
    pub fn with_router(router: Router) -> Self {
        Self {
            router,
            layers: LayerStack::new(),
        }
    }

    /// Register a route
    pub fn route(mut self, path: &str, method_router: MethodRouter) -> Self {
        self.router = self.router.route(path, method_router);
        self
    }

    /// Add a middleware layer
    ///
    /// Layers run in registration order; the first one added is outermost.
    pub fn layer<L: MiddlewareLayer>(mut self, layer: L) -> Self {
        self.layers.push(Box::new(layer));
        self
    }

    /// The middleware stack applied to every request
    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    /// The route table
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Freeze the application into a shareable request handler
    pub fn into_service(self) -> AppService {
        AppService {
            router: Arc::new(self.router),
            layers: Arc::new(self.layers),
        }
    }

    /// Bind and serve on `addr` until the process exits
    pub async fn run(self, addr: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Server::new(self.into_service()).run(addr).await
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// Frozen, cheaply clonable application
#[derive(Clone)]
pub struct AppService {
    router: Arc<Router>,
    layers: Arc<LayerStack>,
}

impl AppService {
    /// Run a request through the middleware stack and the router
    pub fn handle(&self, req: Request) -> BoxFuture {
        let router = self.router.clone();
        let dispatch: BoxedNext = Arc::new(move |req: Request| {
            let router = router.clone();
            Box::pin(async move { router.dispatch(req).await }) as BoxFuture
        });
        self.layers.execute(req, dispatch)
    }

    /// Convenience wrapper awaiting [`AppService::handle`]
    pub async fn call(&self, req: Request) -> Response {
        self.handle(req).await
    }
}
