//! Version extraction strategies
//!
//! Each strategy reads one request signal and yields a version string in
//! short form (`v1`, `v1.2`), or nothing.

use crate::error::VersionError;
use crate::version::normalize_key;
use http::{header, HeaderMap, Method};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use verso_core::Request;

/// Default prefix in front of the version path segment
pub const DEFAULT_PATH_PREFIX: &str = "/api";

/// Default header read by [`VersionStrategy::CustomHeader`]
pub const DEFAULT_VERSION_HEADER: &str = "X-API-Version";

/// Query parameters consulted by [`VersionStrategy::QueryParam`], in order
pub const QUERY_PARAMS: [&str; 2] = ["version", "api_version"];

const VENDOR_MEDIA_MARKER: &str = "vnd.api.";

/// Where a negotiated version came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionSource {
    /// Supplied programmatically by a route-level override
    Explicit,
    /// `/api/v1/...` path segment
    Path,
    /// `version=` parameter of the `Accept` header
    AcceptHeader,
    /// `application/vnd.api.v1+json` content type
    ContentType,
    /// `version` / `api_version` query parameter
    Query,
    /// Dedicated version header such as `X-API-Version`
    CustomHeader,
    /// No signal; the registry default was used
    Default,
}

impl VersionSource {
    /// Stable lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Path => "path",
            Self::AcceptHeader => "header",
            Self::ContentType => "content_type",
            Self::Query => "query",
            Self::CustomHeader => "custom_header",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for VersionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The parts of a request strategies may look at
#[derive(Debug, Clone)]
pub struct RequestSignals<'a> {
    /// Request method, for logging
    pub method: &'a Method,
    /// Request path, before any rewriting
    pub path: &'a str,
    /// Request headers
    pub headers: &'a HeaderMap,
    /// Decoded query parameters
    pub query: HashMap<String, String>,
}

impl<'a> RequestSignals<'a> {
    /// Build signals from raw parts
    pub fn new(
        method: &'a Method,
        path: &'a str,
        headers: &'a HeaderMap,
        query: HashMap<String, String>,
    ) -> Self {
        Self {
            method,
            path,
            headers,
            query,
        }
    }

    /// Build signals from a request
    pub fn from_request(req: &'a Request) -> Self {
        Self::new(req.method(), req.path(), req.headers(), req.query_params())
    }

    fn header(&self, name: &str) -> Option<&'a str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Strategy for extracting an API version from a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionStrategy {
    /// `/api/v<digits>[.<digits>[.<digits>]]/...`
    UrlPath {
        /// Path segments expected before the version segment
        prefix: String,
    },
    /// `Accept: application/json; version=2`
    AcceptHeader,
    /// `Content-Type: application/vnd.api.v2+json`
    ContentType,
    /// `?version=2` or `?api_version=v2`
    QueryParam,
    /// A header carrying only the version, e.g. `X-API-Version: v2`
    CustomHeader {
        /// Header name
        name: String,
    },
}

impl VersionStrategy {
    /// URL path strategy under the default `/api` prefix
    pub fn path() -> Self {
        Self::path_with_prefix(DEFAULT_PATH_PREFIX)
    }

    /// URL path strategy under a custom prefix
    pub fn path_with_prefix(prefix: impl Into<String>) -> Self {
        Self::UrlPath {
            prefix: prefix.into(),
        }
    }

    /// Dedicated header strategy reading `X-API-Version`
    pub fn custom_header() -> Self {
        Self::custom_header_named(DEFAULT_VERSION_HEADER)
    }

    /// Dedicated header strategy with a custom header name
    pub fn custom_header_named(name: impl Into<String>) -> Self {
        Self::CustomHeader { name: name.into() }
    }

    /// Which [`VersionSource`] this strategy reports
    pub fn source(&self) -> VersionSource {
        match self {
            Self::UrlPath { .. } => VersionSource::Path,
            Self::AcceptHeader => VersionSource::AcceptHeader,
            Self::ContentType => VersionSource::ContentType,
            Self::QueryParam => VersionSource::Query,
            Self::CustomHeader { .. } => VersionSource::CustomHeader,
        }
    }

    /// Try to read a version string from the request
    pub fn extract(&self, signals: &RequestSignals<'_>) -> Option<String> {
        match self {
            Self::UrlPath { prefix } => {
                locate_path_version(signals.path, prefix).map(|(key, _, _)| key)
            }
            Self::AcceptHeader => signals
                .header(header::ACCEPT.as_str())
                .and_then(accept_version_param),
            Self::ContentType => signals
                .header(header::CONTENT_TYPE.as_str())
                .and_then(vendor_media_version),
            Self::QueryParam => QUERY_PARAMS
                .iter()
                .filter_map(|name| signals.query.get(*name))
                .find_map(|value| loose_version(value)),
            Self::CustomHeader { name } => signals.header(name).and_then(loose_version),
        }
    }

    /// The request path with the version segment removed, if this is a path
    /// strategy and the path carries one
    pub fn strip_path(&self, path: &str) -> Option<String> {
        match self {
            Self::UrlPath { prefix } => strip_version_segment(path, prefix),
            _ => None,
        }
    }
}

impl Default for VersionStrategy {
    fn default() -> Self {
        Self::path()
    }
}

impl FromStr for VersionStrategy {
    type Err = VersionError;

    /// Parse a configuration name: `path`, `header`, `content_type`,
    /// `query` or `custom_header`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "path" | "url_path" => Ok(Self::path()),
            "header" | "accept" | "accept_header" => Ok(Self::AcceptHeader),
            "content_type" => Ok(Self::ContentType),
            "query" | "query_param" => Ok(Self::QueryParam),
            "custom_header" => Ok(Self::custom_header()),
            other => Err(VersionError::Configuration(format!(
                "unknown version strategy '{}'",
                other
            ))),
        }
    }
}

/// `v` followed by one to three dot-separated digit groups
fn is_version_segment(segment: &str) -> bool {
    let Some(digits) = segment.strip_prefix('v') else {
        return false;
    };
    let groups: Vec<&str> = digits.split('.').collect();
    !groups.is_empty()
        && groups.len() <= 3
        && groups
            .iter()
            .all(|g| !g.is_empty() && g.bytes().all(|b| b.is_ascii_digit()))
}

fn prefix_segments(prefix: &str) -> Vec<&str> {
    prefix.split('/').filter(|s| !s.is_empty()).collect()
}

/// Find the version segment directly after `prefix`.
///
/// Returns the normalized key plus the byte range of the segment (including
/// its leading slash) inside `path`.
fn locate_path_version(path: &str, prefix: &str) -> Option<(String, usize, usize)> {
    let expected = prefix_segments(prefix);
    let mut offset = 0;
    let mut index = 0;

    for segment in path.split('/') {
        let start = offset;
        offset += segment.len() + 1;
        if segment.is_empty() && start == 0 {
            continue;
        }

        if index < expected.len() {
            if segment != expected[index] {
                return None;
            }
            index += 1;
            continue;
        }

        if !is_version_segment(segment) {
            return None;
        }
        let key = normalize_key(segment)?;
        // `start` points at the segment; include the preceding slash
        let seg_start = start.saturating_sub(1);
        return Some((key, seg_start, start + segment.len()));
    }
    None
}

/// Remove the version segment: `/api/v1/items` becomes `/api/items`
pub fn strip_version_segment(path: &str, prefix: &str) -> Option<String> {
    let (_, start, end) = locate_path_version(path, prefix)?;
    let stripped = format!("{}{}", &path[..start], &path[end..]);
    if stripped.is_empty() {
        Some("/".to_string())
    } else {
        Some(stripped)
    }
}

/// `version=<digits...>` parameter inside an Accept-style header
fn accept_version_param(value: &str) -> Option<String> {
    value
        .split(',')
        .flat_map(|media| media.split(';'))
        .filter_map(|param| {
            let (name, raw) = param.trim().split_once('=')?;
            name.trim()
                .eq_ignore_ascii_case("version")
                .then(|| raw.trim().trim_matches('"'))
        })
        .find_map(|raw| {
            let candidate = raw.strip_prefix('v').unwrap_or(raw);
            is_version_segment(&format!("v{}", candidate))
                .then(|| normalize_key(candidate))
                .flatten()
        })
}

/// `vnd.api.v<digits...>+json` vendor media type
fn vendor_media_version(value: &str) -> Option<String> {
    value.split(',').find_map(|media| {
        let start = media.find(VENDOR_MEDIA_MARKER)? + VENDOR_MEDIA_MARKER.len();
        let rest = &media[start..];
        let end = rest.find('+')?;
        let segment = &rest[..end];
        is_version_segment(segment)
            .then(|| normalize_key(segment))
            .flatten()
    })
}

/// A bare number becomes `v<number>`; other parseable forms are normalized;
/// anything else is passed through so the extractor can reject it
fn loose_version(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(normalize_key(trimmed).unwrap_or_else(|| trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    fn extract(strategy: VersionStrategy, path: &str, headers: &HeaderMap) -> Option<String> {
        strategy.extract(&RequestSignals::new(&Method::GET, path, headers, HashMap::new()))
    }

    #[test]
    fn test_path_strategy() {
        let empty = HeaderMap::new();
        let path = VersionStrategy::path();
        assert_eq!(extract(path.clone(), "/api/v1/announcements", &empty).as_deref(), Some("v1"));
        assert_eq!(extract(path.clone(), "/api/v2.1/items/7", &empty).as_deref(), Some("v2.1"));
        assert_eq!(extract(path.clone(), "/api/v1.0.0", &empty).as_deref(), Some("v1"));
        assert_eq!(extract(path.clone(), "/api/announcements", &empty), None);
        assert_eq!(extract(path.clone(), "/other/v1/x", &empty), None);
        assert_eq!(extract(path.clone(), "/api/version/x", &empty), None);
        assert_eq!(extract(path, "/api/v1x/x", &empty), None);

        let bare = VersionStrategy::path_with_prefix("");
        assert_eq!(extract(bare, "/v3/users", &empty).as_deref(), Some("v3"));
    }

    #[test]
    fn test_strip_version_segment() {
        assert_eq!(
            strip_version_segment("/api/v1/announcements", "/api").as_deref(),
            Some("/api/announcements")
        );
        assert_eq!(
            strip_version_segment("/api/v2.1/items/7", "/api").as_deref(),
            Some("/api/items/7")
        );
        assert_eq!(strip_version_segment("/api/v1", "/api").as_deref(), Some("/api"));
        assert_eq!(strip_version_segment("/v1", "").as_deref(), Some("/"));
        assert_eq!(strip_version_segment("/v1/users", "/").as_deref(), Some("/users"));
        assert_eq!(strip_version_segment("/api/items", "/api"), None);
    }

    #[test]
    fn test_accept_header_strategy() {
        let h = headers(&[("accept", "application/json; version=2")]);
        assert_eq!(extract(VersionStrategy::AcceptHeader, "/", &h).as_deref(), Some("v2"));

        let h = headers(&[("accept", "text/html, application/json;q=0.9;version=\"1.1\"")]);
        assert_eq!(extract(VersionStrategy::AcceptHeader, "/", &h).as_deref(), Some("v1.1"));

        let h = headers(&[("accept", "application/json; version=latest")]);
        assert_eq!(extract(VersionStrategy::AcceptHeader, "/", &h), None);

        assert_eq!(extract(VersionStrategy::AcceptHeader, "/", &HeaderMap::new()), None);
    }

    #[test]
    fn test_content_type_strategy() {
        let h = headers(&[("content-type", "application/vnd.api.v2+json")]);
        assert_eq!(extract(VersionStrategy::ContentType, "/", &h).as_deref(), Some("v2"));

        let h = headers(&[("content-type", "application/vnd.api.v1.2+json; charset=utf-8")]);
        assert_eq!(extract(VersionStrategy::ContentType, "/", &h).as_deref(), Some("v1.2"));

        let h = headers(&[("content-type", "application/json")]);
        assert_eq!(extract(VersionStrategy::ContentType, "/", &h), None);
    }

    #[test]
    fn test_query_strategy() {
        let empty = HeaderMap::new();
        let mut query = HashMap::new();
        query.insert("version".to_string(), "2".to_string());
        let signals = RequestSignals::new(&Method::GET, "/api/x", &empty, query);
        assert_eq!(VersionStrategy::QueryParam.extract(&signals).as_deref(), Some("v2"));

        let mut query = HashMap::new();
        query.insert("api_version".to_string(), "v1.1".to_string());
        let signals = RequestSignals::new(&Method::GET, "/api/x", &empty, query);
        assert_eq!(VersionStrategy::QueryParam.extract(&signals).as_deref(), Some("v1.1"));

        let mut query = HashMap::new();
        query.insert("version".to_string(), "next".to_string());
        let signals = RequestSignals::new(&Method::GET, "/api/x", &empty, query);
        assert_eq!(VersionStrategy::QueryParam.extract(&signals).as_deref(), Some("next"));
    }

    #[test]
    fn test_custom_header_strategy() {
        let h = headers(&[("x-api-version", "1")]);
        assert_eq!(
            extract(VersionStrategy::custom_header(), "/", &h).as_deref(),
            Some("v1")
        );
        let h = headers(&[("x-api-version", "  ")]);
        assert_eq!(extract(VersionStrategy::custom_header(), "/", &h), None);
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!("path".parse::<VersionStrategy>().unwrap(), VersionStrategy::path());
        assert_eq!(
            "Content-Type".parse::<VersionStrategy>().unwrap(),
            VersionStrategy::ContentType
        );
        assert_eq!(
            "header".parse::<VersionStrategy>().unwrap(),
            VersionStrategy::AcceptHeader
        );
        assert!("cookie".parse::<VersionStrategy>().is_err());
        assert_eq!(VersionStrategy::QueryParam.source(), VersionSource::Query);
    }
}
