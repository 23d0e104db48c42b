//! TestClient for integration testing without network binding
//!
//! Sends simulated HTTP requests through the full middleware and handler
//! pipeline without starting a real server.
//!
//! ```rust,ignore
//! #[tokio::test]
//! async fn test_hello() {
//!     let client = TestClient::new(App::new().route("/", get(hello)));
//!     client.get("/").await.assert_status(200);
//! }
//! ```

use crate::app::{App, AppService};
use crate::request::Request;
use crate::response::Response;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use http_body_util::BodyExt;
use serde::{de::DeserializeOwned, Serialize};

/// Test client for integration testing without network binding
pub struct TestClient {
    service: AppService,
}

impl TestClient {
    /// Create a new test client from an application
    pub fn new(app: App) -> Self {
        Self {
            service: app.into_service(),
        }
    }

    /// Send a GET request
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(TestRequest::get(path)).await
    }

    /// Send a POST request with JSON body
    pub async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> TestResponse {
        self.request(TestRequest::post(path).json(body)).await
    }

    /// Send a request with full control
    pub async fn request(&self, req: TestRequest) -> TestResponse {
        let mut builder = http::Request::builder().method(req.method).uri(req.path);
        for (key, value) in req.headers.iter() {
            builder = builder.header(key, value);
        }

        let http_req = match builder.body(()) {
            Ok(r) => r,
            Err(err) => panic!("invalid test request: {}", err),
        };
        let request = Request::from_http_request(http_req, req.body.unwrap_or_default());

        TestResponse::from_response(self.service.handle(request).await).await
    }
}

/// Test request builder
#[derive(Debug, Clone)]
pub struct TestRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl TestRequest {
    /// Create a new request with the given method and path
    fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Create a GET request
    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    /// Create a POST request
    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    /// Create a PUT request
    pub fn put(path: &str) -> Self {
        Self::new(Method::PUT, path)
    }

    /// Create a DELETE request
    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Add a header to the request
    pub fn header(mut self, key: &str, value: &str) -> Self {
        if let (Ok(name), Ok(val)) = (
            key.parse::<http::header::HeaderName>(),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, val);
        }
        self
    }

    /// Set the request body as JSON
    ///
    /// This automatically sets the Content-Type header to `application/json`.
    pub fn json<T: Serialize>(mut self, body: &T) -> Self {
        if let Ok(bytes) = serde_json::to_vec(body) {
            self.body = Some(Bytes::from(bytes));
            self.headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }
        self
    }

    /// Set the request body as raw bytes
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the Content-Type header
    pub fn content_type(self, content_type: &str) -> Self {
        self.header("content-type", content_type)
    }
}

/// Test response with assertion helpers
#[derive(Debug)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Create a TestResponse from an HTTP response
    async fn from_response(response: Response) -> Self {
        let (parts, body) = response.into_parts();
        let body_bytes = body
            .collect()
            .await
            .map(|b| b.to_bytes())
            .unwrap_or_default();

        Self {
            status: parts.status,
            headers: parts.headers,
            body: body_bytes,
        }
    }

    /// Get the response status code
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a header as a string, if present and valid UTF-8
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|v| v.to_str().ok())
    }

    /// Get the response body as bytes
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Get the response body as a string
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Parse the response body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Assert that the response has the expected status code
    pub fn assert_status(&self, expected: u16) -> &Self {
        assert_eq!(
            self.status.as_u16(),
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    /// Assert that the response has the expected header value
    pub fn assert_header(&self, key: &str, expected: &str) -> &Self {
        let actual = self.header(key).unwrap_or("");
        assert_eq!(
            actual, expected,
            "Expected header '{}' to be '{}', got '{}'",
            key, expected, actual
        );
        self
    }

    /// Assert that a header is absent
    pub fn assert_no_header(&self, key: &str) -> &Self {
        assert!(
            self.headers.get(key).is_none(),
            "Expected header '{}' to be absent, got {:?}",
            key,
            self.headers.get(key)
        );
        self
    }

    /// Assert that the response body contains the expected string
    pub fn assert_body_contains(&self, expected: &str) -> &Self {
        let body = self.text();
        assert!(
            body.contains(expected),
            "Expected body to contain '{}', got '{}'",
            expected,
            body
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Json;
    use crate::router::{get, post};

    async fn hello(_req: Request) -> &'static str {
        "Hello, World!"
    }

    async fn echo(mut req: Request) -> Json<serde_json::Value> {
        let body = req.take_body().unwrap_or_default();
        Json(serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test]
    async fn test_client_get() {
        let client = TestClient::new(App::new().route("/", get(hello)));
        let response = client.get("/").await;
        response.assert_status(200);
        assert_eq!(response.text(), "Hello, World!");
    }

    #[tokio::test]
    async fn test_client_post_json_round_trips_body() {
        let client = TestClient::new(App::new().route("/echo", post(echo)));
        let response = client
            .post_json("/echo", &serde_json::json!({"name": "Test"}))
            .await;
        response
            .assert_status(200)
            .assert_header("content-type", "application/json");
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["name"], "Test");
    }

    #[tokio::test]
    async fn test_client_not_found() {
        let client = TestClient::new(App::new());
        client.get("/nothing").await.assert_status(404);
    }
}
