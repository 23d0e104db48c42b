//! Request types for Verso

use bytes::Bytes;
use http::{request::Parts, Extensions, HeaderMap, Method, Uri, Version};
use std::collections::HashMap;

/// HTTP Request wrapper
///
/// Provides access to all parts of an incoming HTTP request.
pub struct Request {
    pub(crate) parts: Parts,
    pub(crate) body: Option<Bytes>,
    pub(crate) path_params: HashMap<String, String>,
}

impl Request {
    /// Create a new request from parts
    pub(crate) fn new(parts: Parts, body: Bytes) -> Self {
        Self {
            parts,
            body: Some(body),
            path_params: HashMap::new(),
        }
    }

    /// Build a request from an `http::Request` and an already collected body
    pub fn from_http_request<B>(req: http::Request<B>, body: Bytes) -> Self {
        let (parts, _) = req.into_parts();
        Self::new(parts, body)
    }

    /// Get the HTTP method
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Get the URI
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Get the HTTP version
    pub fn version(&self) -> Version {
        self.parts.version
    }

    /// Get the headers
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Get request extensions
    pub fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    /// Get mutable extensions
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.parts.extensions
    }

    /// Get the request path
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Replace the request path, keeping the query string.
    ///
    /// Middleware uses this to rewrite the path before routing happens.
    /// Returns `false` (and leaves the URI untouched) if the result is not a
    /// valid URI.
    pub fn set_path(&mut self, path: &str) -> bool {
        let path_and_query = match self.parts.uri.query() {
            Some(query) => format!("{}?{}", path, query),
            None => path.to_string(),
        };

        let mut uri_parts = self.parts.uri.clone().into_parts();
        uri_parts.path_and_query = match path_and_query.parse() {
            Ok(pq) => Some(pq),
            Err(_) => return false,
        };

        match Uri::from_parts(uri_parts) {
            Ok(uri) => {
                self.parts.uri = uri;
                true
            }
            Err(_) => false,
        }
    }

    /// Get the query string
    pub fn query_string(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    /// Parse the query string into a map.
    ///
    /// A malformed query string yields an empty map.
    pub fn query_params(&self) -> HashMap<String, String> {
        self.query_string()
            .and_then(|q| serde_urlencoded::from_str(q).ok())
            .unwrap_or_default()
    }

    /// Take the body bytes (can only be called once)
    pub fn take_body(&mut self) -> Option<Bytes> {
        self.body.take()
    }

    /// Get path parameters
    pub fn path_params(&self) -> &HashMap<String, String> {
        &self.path_params
    }

    /// Get a specific path parameter
    pub fn path_param(&self, name: &str) -> Option<&String> {
        self.path_params.get(name)
    }

    pub(crate) fn set_path_params(&mut self, params: HashMap<String, String>) {
        self.path_params = params;
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("version", &self.parts.version)
            .finish()
    }
}
