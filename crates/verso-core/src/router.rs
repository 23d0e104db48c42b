//! Routing for Verso
//!
//! Paths are registered in `{param}` syntax and stored in a matchit radix
//! tree. Each path owns a [`MethodRouter`] mapping HTTP methods to boxed
//! handlers.

use crate::error::ApiError;
use crate::handler::{into_boxed_handler, BoxedHandler, Handler};
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use http::{header, HeaderValue, Method};
use matchit::Router as MatchitRouter;
use std::collections::HashMap;
use thiserror::Error;

/// Information about a registered route
#[derive(Debug, Clone)]
pub struct RouteInfo {
    /// The path as registered (`{param}` syntax)
    pub path: String,
    /// Methods served on this path
    pub methods: Vec<Method>,
}

/// Raised when two registrations collide in the radix tree
#[derive(Debug, Error)]
#[error("route conflict: '{new_path}' conflicts with existing route '{existing_path}' ({details})")]
pub struct RouteConflictError {
    /// Path that was being registered
    pub new_path: String,
    /// Route already holding the conflicting slot
    pub existing_path: String,
    /// Underlying matchit message
    pub details: String,
}

/// HTTP method router for a single path
#[derive(Clone, Default)]
pub struct MethodRouter {
    handlers: HashMap<Method, BoxedHandler>,
}

impl MethodRouter {
    /// Create a new empty method router
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Add a handler for a specific method
    pub fn on<H: Handler>(mut self, method: Method, handler: H) -> Self {
        self.handlers.insert(method, into_boxed_handler(handler));
        self
    }

    /// Add an already boxed handler for a specific method
    pub fn on_boxed(mut self, method: Method, handler: BoxedHandler) -> Self {
        self.handlers.insert(method, handler);
        self
    }

    /// Chain a GET handler
    pub fn get<H: Handler>(self, handler: H) -> Self {
        self.on(Method::GET, handler)
    }

    /// Chain a POST handler
    pub fn post<H: Handler>(self, handler: H) -> Self {
        self.on(Method::POST, handler)
    }

    /// Chain a PUT handler
    pub fn put<H: Handler>(self, handler: H) -> Self {
        self.on(Method::PUT, handler)
    }

    /// Chain a PATCH handler
    pub fn patch<H: Handler>(self, handler: H) -> Self {
        self.on(Method::PATCH, handler)
    }

    /// Chain a DELETE handler
    pub fn delete<H: Handler>(self, handler: H) -> Self {
        self.on(Method::DELETE, handler)
    }

    /// Wrap every method's handler with `f`
    ///
    /// Decorators use this to add pre/post processing around all handlers of a
    /// path without knowing which methods are registered.
    pub fn map_handlers<F>(mut self, f: F) -> Self
    where
        F: Fn(BoxedHandler) -> BoxedHandler,
    {
        self.handlers = self
            .handlers
            .into_iter()
            .map(|(method, handler)| (method, f(handler)))
            .collect();
        self
    }

    /// Get handler for a method
    pub(crate) fn get_handler(&self, method: &Method) -> Option<&BoxedHandler> {
        self.handlers.get(method)
    }

    /// Methods served by this router, sorted for stable `Allow` headers
    pub fn allowed_methods(&self) -> Vec<Method> {
        let mut methods: Vec<Method> = self.handlers.keys().cloned().collect();
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        methods
    }
}

/// Create a GET route handler
pub fn get<H: Handler>(handler: H) -> MethodRouter {
    MethodRouter::new().get(handler)
}

/// Create a POST route handler
pub fn post<H: Handler>(handler: H) -> MethodRouter {
    MethodRouter::new().post(handler)
}

/// Create a PUT route handler
pub fn put<H: Handler>(handler: H) -> MethodRouter {
    MethodRouter::new().put(handler)
}

/// Create a PATCH route handler
pub fn patch<H: Handler>(handler: H) -> MethodRouter {
    MethodRouter::new().patch(handler)
}

/// Create a DELETE route handler
pub fn delete<H: Handler>(handler: H) -> MethodRouter {
    MethodRouter::new().delete(handler)
}

/// Main router
pub struct Router {
    inner: MatchitRouter<MethodRouter>,
    /// Track registered routes for conflict reporting
    registered_routes: HashMap<String, RouteInfo>,
}

impl Router {
    /// Create a new router
    pub fn new() -> Self {
        Self {
            inner: MatchitRouter::new(),
            registered_routes: HashMap::new(),
        }
    }

    /// Add a route
    ///
    /// # Panics
    ///
    /// Panics if the path conflicts with an already registered route. Route
    /// tables are built at startup, so this surfaces misconfiguration early.
    pub fn route(mut self, path: &str, method_router: MethodRouter) -> Self {
        if let Err(err) = self.try_route(path, method_router) {
            panic!("{}", err);
        }
        self
    }

    /// Add a route, reporting conflicts instead of panicking
    pub fn try_route(
        &mut self,
        path: &str,
        method_router: MethodRouter,
    ) -> Result<(), RouteConflictError> {
        let matchit_path = convert_path_params(path);
        let methods = method_router.allowed_methods();

        match self.inner.insert(matchit_path.clone(), method_router) {
            Ok(()) => {
                self.registered_routes.insert(
                    matchit_path,
                    RouteInfo {
                        path: path.to_string(),
                        methods,
                    },
                );
                Ok(())
            }
            Err(e) => {
                let normalized_new = normalize_path_for_comparison(&matchit_path);
                let existing_path = self
                    .registered_routes
                    .iter()
                    .find(|(registered, _)| {
                        normalize_path_for_comparison(registered) == normalized_new
                    })
                    .map(|(_, info)| info.path.clone())
                    .unwrap_or_else(|| "<unknown>".to_string());

                Err(RouteConflictError {
                    new_path: path.to_string(),
                    existing_path,
                    details: e.to_string(),
                })
            }
        }
    }

    /// All registered routes keyed by their matchit path
    pub fn registered_routes(&self) -> &HashMap<String, RouteInfo> {
        &self.registered_routes
    }

    /// Match a request path and method
    pub(crate) fn match_route(&self, path: &str, method: &Method) -> RouteMatch<'_> {
        match self.inner.at(path) {
            Ok(matched) => {
                let method_router = matched.value;
                match method_router.get_handler(method) {
                    Some(handler) => {
                        let params = matched
                            .params
                            .iter()
                            .map(|(k, v)| (k.to_string(), v.to_string()))
                            .collect();
                        RouteMatch::Found { handler, params }
                    }
                    None => RouteMatch::MethodNotAllowed {
                        allowed: method_router.allowed_methods(),
                    },
                }
            }
            Err(_) => RouteMatch::NotFound,
        }
    }

    /// Route a request to its handler, producing 404/405 responses on misses
    pub async fn dispatch(&self, mut req: Request) -> Response {
        let method = req.method().clone();
        let path = req.path().to_string();

        match self.match_route(&path, &method) {
            RouteMatch::Found { handler, params } => {
                req.set_path_params(params);
                handler(req).await
            }
            RouteMatch::NotFound => {
                ApiError::not_found(format!("No route found for {} {}", method, path))
                    .into_response()
            }
            RouteMatch::MethodNotAllowed { allowed } => {
                let allowed_str: Vec<&str> = allowed.iter().map(|m| m.as_str()).collect();
                let mut response = ApiError::method_not_allowed(format!(
                    "Method {} not allowed for {}",
                    method, path
                ))
                .into_response();

                if let Ok(value) = HeaderValue::from_str(&allowed_str.join(", ")) {
                    response.headers_mut().insert(header::ALLOW, value);
                }
                response
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of route matching
pub(crate) enum RouteMatch<'a> {
    Found {
        handler: &'a BoxedHandler,
        params: HashMap<String, String>,
    },
    NotFound,
    MethodNotAllowed {
        allowed: Vec<Method>,
    },
}

/// Convert {param} style to :param for matchit
fn convert_path_params(path: &str) -> String {
    let mut result = String::with_capacity(path.len());

    for ch in path.chars() {
        match ch {
            '{' => result.push(':'),
            '}' => {}
            _ => result.push(ch),
        }
    }

    result
}

/// Normalize a path for conflict comparison by replacing parameter names with a placeholder
fn normalize_path_for_comparison(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    let mut in_param = false;

    for ch in path.chars() {
        match ch {
            ':' => {
                in_param = true;
                result.push_str(":_");
            }
            '/' => {
                in_param = false;
                result.push('/');
            }
            _ if in_param => {}
            _ => result.push(ch),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::BodyExt;

    async fn hello(_req: Request) -> &'static str {
        "hello"
    }

    async fn echo_id(req: Request) -> String {
        req.path_param("id").cloned().unwrap_or_default()
    }

    fn request(method: Method, path: &str) -> Request {
        let req = http::Request::builder()
            .method(method)
            .uri(path)
            .body(())
            .unwrap();
        Request::from_http_request(req, Bytes::new())
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_convert_path_params() {
        assert_eq!(convert_path_params("/users/{id}"), "/users/:id");
        assert_eq!(
            convert_path_params("/users/{user_id}/posts/{post_id}"),
            "/users/:user_id/posts/:post_id"
        );
        assert_eq!(convert_path_params("/static/path"), "/static/path");
    }

    #[test]
    fn test_normalize_path_for_comparison() {
        assert_eq!(normalize_path_for_comparison("/users/:id"), "/users/:_");
        assert_eq!(
            normalize_path_for_comparison("/users/:id/posts/:post_id"),
            "/users/:_/posts/:_"
        );
    }

    #[tokio::test]
    async fn test_dispatch_with_path_params() {
        let router = Router::new().route("/items/{id}", get(echo_id));
        let response = router.dispatch(request(Method::GET, "/items/42")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "42");
    }

    #[tokio::test]
    async fn test_dispatch_not_found() {
        let router = Router::new().route("/", get(hello));
        let response = router.dispatch(request(Method::GET, "/missing")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_dispatch_method_not_allowed() {
        let router = Router::new().route("/", get(hello).post(hello));
        let response = router.dispatch(request(Method::DELETE, "/")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(header::ALLOW).unwrap(), "GET, POST");
    }

    #[test]
    fn test_conflicting_route_reported() {
        let mut router = Router::new().route("/users/{id}", get(hello));
        let err = router
            .try_route("/users/{user_id}", get(hello))
            .unwrap_err();
        assert_eq!(err.existing_path, "/users/{id}");
    }

    #[tokio::test]
    async fn test_map_handlers_wraps_every_method() {
        let method_router = get(hello).post(hello).map_handlers(|inner| {
            let wrapped: BoxedHandler = std::sync::Arc::new(move |req: Request| {
                let inner = inner.clone();
                Box::pin(async move {
                    let mut response = inner(req).await;
                    response
                        .headers_mut()
                        .insert("x-wrapped", HeaderValue::from_static("yes"));
                    response
                }) as crate::handler::BoxFuture
            });
            wrapped
        });
        let router = Router::new().route("/", method_router);

        for method in [Method::GET, Method::POST] {
            let response = router.dispatch(request(method, "/")).await;
            assert_eq!(response.headers().get("x-wrapped").unwrap(), "yes");
        }
    }
}
