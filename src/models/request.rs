// Intercepted request model
// Author: kelexine (https://github.com/kelexine)

use axum::http::{header, HeaderMap, HeaderName, Method, Uri};
use bytes::Bytes;

/// What kind of resource the page is asking for.
///
/// Mirrors the fetch `destination` of a browser request, collapsed to the
/// variants the gateway's classification cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    Font,
    Other,
}

impl Destination {
    /// Derive the destination from request headers.
    ///
    /// `Sec-Fetch-Dest` wins when present. Otherwise the `Accept` header is used
    /// as a hint: `text/html` means a navigation, `image/*` an image.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        if let Some(dest) = headers
            .get("sec-fetch-dest")
            .and_then(|v| v.to_str().ok())
        {
            return Self::parse(dest);
        }

        let accept = headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if accept.contains("text/html") {
            Destination::Document
        } else if accept.starts_with("image/") {
            Destination::Image
        } else {
            Destination::Other
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "document" | "iframe" | "frame" => Destination::Document,
            "image" => Destination::Image,
            "script" | "worker" | "sharedworker" => Destination::Script,
            "style" => Destination::Style,
            "font" => Destination::Font,
            _ => Destination::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Document => "document",
            Destination::Image => "image",
            Destination::Script => "script",
            Destination::Style => "style",
            Destination::Font => "font",
            Destination::Other => "other",
        }
    }
}

/// Headers that make upstream answer with something other than the full resource.
const CONDITIONAL_HEADERS: [HeaderName; 6] = [
    header::IF_NONE_MATCH,
    header::IF_MODIFIED_SINCE,
    header::IF_MATCH,
    header::IF_UNMODIFIED_SINCE,
    header::IF_RANGE,
    header::RANGE,
];

/// A request intercepted from the page, with its body already buffered.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub method: Method,
    /// Path and query, relative to the upstream origin.
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub destination: Destination,
}

impl GatewayRequest {
    /// Build a request, deriving the destination from its headers.
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        let destination = Destination::from_headers(&headers);
        Self {
            method,
            uri,
            headers,
            body,
            destination,
        }
    }

    /// A bodiless GET for `path`, as issued for precache entries.
    pub fn get(path: &str) -> Self {
        Self {
            method: Method::GET,
            uri: path.parse().unwrap_or_else(|_| Uri::from_static("/")),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            destination: Destination::Other,
        }
    }

    /// Drop the client's validators and range, so upstream answers with the
    /// full representation rather than a 304 or a 206 slice.
    pub fn without_conditionals(mut self) -> Self {
        for name in CONDITIONAL_HEADERS.iter() {
            self.headers.remove(name);
        }
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Path plus query string, as sent upstream.
    pub fn path_and_query(&self) -> &str {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| self.uri.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_without_conditionals_keeps_other_headers() {
        let mut request = GatewayRequest::get("/logo.png");
        request.headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("\"v1\""));
        request.headers.insert(header::RANGE, HeaderValue::from_static("bytes=0-99"));
        request.headers.insert(header::ACCEPT, HeaderValue::from_static("image/*"));

        let request = request.without_conditionals();
        assert_eq!(request.headers.len(), 1);
        assert!(request.headers.contains_key(header::ACCEPT));
    }

    #[test]
    fn test_sec_fetch_dest_takes_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert("sec-fetch-dest", HeaderValue::from_static("image"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/html"));
        assert_eq!(Destination::from_headers(&headers), Destination::Image);
    }

    #[test]
    fn test_accept_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml"),
        );
        assert_eq!(Destination::from_headers(&headers), Destination::Document);

        headers.insert(header::ACCEPT, HeaderValue::from_static("image/avif,image/webp"));
        assert_eq!(Destination::from_headers(&headers), Destination::Image);

        assert_eq!(Destination::from_headers(&HeaderMap::new()), Destination::Other);
    }

    #[test]
    fn test_path_and_query() {
        let req = GatewayRequest::get("/catalog?page=2");
        assert_eq!(req.path(), "/catalog");
        assert_eq!(req.path_and_query(), "/catalog?page=2");
    }
}
