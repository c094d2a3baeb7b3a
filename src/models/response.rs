// Gateway response model
// Author: kelexine (https://github.com/kelexine)

use super::record::ResponseRecord;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use bytes::Bytes;
use chrono::Utc;

/// Response headers that belong to one client or one connection. They are
/// never written into the shared store.
const UNSTORED_HEADERS: [&str; 8] = [
    "set-cookie",
    "set-cookie2",
    "connection",
    "keep-alive",
    "transfer-encoding",
    "te",
    "trailer",
    "upgrade",
];

/// Where a response handed back to the page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Served from the live cache store.
    Cache,
    /// Fetched from upstream while the gateway was in charge of the request.
    Network,
    /// Fabricated by the gateway (404 / 503 fallbacks).
    Synthetic,
    /// Passed through without the gateway intervening.
    Bypass,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Cache => "hit",
            ResponseSource::Network => "miss",
            ResponseSource::Synthetic => "synthetic",
            ResponseSource::Bypass => "bypass",
        }
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl GatewayResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
            source: ResponseSource::Network,
        }
    }

    /// Anything below 400.
    pub fn is_success(&self) -> bool {
        self.status.as_u16() < 400
    }

    /// Whether the response may go into a store shared by every client.
    ///
    /// A 304 or 206 is not the resource itself, and `private`/`no-store`
    /// responses are meant for one client only.
    pub fn is_cacheable(&self) -> bool {
        if !self.is_success()
            || self.status == StatusCode::NOT_MODIFIED
            || self.status == StatusCode::PARTIAL_CONTENT
        {
            return false;
        }

        !self
            .headers
            .get_all(header::CACHE_CONTROL)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(|directive| directive.split('=').next().unwrap_or("").trim().to_ascii_lowercase())
            .any(|directive| directive == "private" || directive == "no-store")
    }

    pub fn with_source(mut self, source: ResponseSource) -> Self {
        self.source = source;
        self
    }

    /// Synthetic 404 returned when neither cache nor network has the resource.
    pub fn not_found() -> Self {
        Self::synthetic(StatusCode::NOT_FOUND, "Not found")
    }

    /// Synthetic 503 returned when the network failed and nothing was cached.
    pub fn offline() -> Self {
        Self::synthetic(StatusCode::SERVICE_UNAVAILABLE, "Offline")
    }

    fn synthetic(status: StatusCode, text: &'static str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        Self {
            status,
            headers,
            body: Bytes::from_static(text.as_bytes()),
            source: ResponseSource::Synthetic,
        }
    }

    /// Snapshot this response for storage.
    pub fn to_record(&self) -> ResponseRecord {
        ResponseRecord {
            body: self.body.clone(),
            status: self.status.as_u16(),
            status_text: self
                .status
                .canonical_reason()
                .unwrap_or_default()
                .to_string(),
            headers: self
                .headers
                .iter()
                .filter(|(name, _)| !UNSTORED_HEADERS.contains(&name.as_str()))
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect(),
            stored_at: Utc::now(),
        }
    }

    /// Rebuild a response from a stored record. Headers that no longer parse are dropped.
    pub fn from_record(record: ResponseRecord) -> Self {
        let mut headers = HeaderMap::with_capacity(record.headers.len());
        for (name, value) in &record.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.append(name, value);
            }
        }

        Self {
            status: StatusCode::from_u16(record.status).unwrap_or(StatusCode::OK),
            headers,
            body: record.body,
            source: ResponseSource::Cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_boundary() {
        let ok = GatewayResponse::new(StatusCode::NOT_MODIFIED, HeaderMap::new(), Bytes::new());
        assert!(ok.is_success());
        let bad = GatewayResponse::new(StatusCode::BAD_REQUEST, HeaderMap::new(), Bytes::new());
        assert!(!bad.is_success());
    }

    #[test]
    fn test_record_keeps_status_and_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/css"));
        let response =
            GatewayResponse::new(StatusCode::OK, headers, Bytes::from_static(b"body{}"));

        let record = response.to_record();
        assert_eq!(record.status, 200);
        assert_eq!(record.status_text, "OK");

        let restored = GatewayResponse::from_record(record);
        assert_eq!(restored.source, ResponseSource::Cache);
        assert_eq!(restored.headers[header::CONTENT_TYPE], "text/css");
        assert_eq!(restored.body, Bytes::from_static(b"body{}"));
    }

    fn with_header(status: StatusCode, name: HeaderName, value: &'static str) -> GatewayResponse {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_static(value));
        GatewayResponse::new(status, headers, Bytes::from_static(b"x"))
    }

    #[test]
    fn test_cacheable_statuses() {
        let ok = GatewayResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::new());
        assert!(ok.is_cacheable());
        for status in [
            StatusCode::NOT_MODIFIED,
            StatusCode::PARTIAL_CONTENT,
            StatusCode::NOT_FOUND,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            let response = GatewayResponse::new(status, HeaderMap::new(), Bytes::new());
            assert!(!response.is_cacheable(), "{} must not be stored", status);
        }
    }

    #[test]
    fn test_private_and_no_store_not_cacheable() {
        let private = with_header(StatusCode::OK, header::CACHE_CONTROL, "private, max-age=60");
        assert!(!private.is_cacheable());
        let no_store = with_header(StatusCode::OK, header::CACHE_CONTROL, "No-Store");
        assert!(!no_store.is_cacheable());
        let public = with_header(StatusCode::OK, header::CACHE_CONTROL, "public, max-age=600");
        assert!(public.is_cacheable());
    }

    #[test]
    fn test_record_drops_cookies() {
        let mut response = with_header(StatusCode::OK, header::SET_COOKIE, "session=abc");
        response
            .headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));

        let record = response.to_record();
        assert_eq!(record.headers, vec![("content-type".to_string(), "image/png".to_string())]);
    }

    #[test]
    fn test_synthetic_responses() {
        assert_eq!(GatewayResponse::not_found().status, StatusCode::NOT_FOUND);
        assert_eq!(GatewayResponse::offline().status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(GatewayResponse::offline().source, ResponseSource::Synthetic);
    }
}
