// Request classification
// Author: kelexine (https://github.com/kelexine)

use crate::models::{Destination, GatewayRequest};
use axum::http::{header, Method};
use phf::phf_set;
use std::fmt;

/// Image file extensions served cache-first, matched case-insensitively.
static IMAGE_EXTENSIONS: phf::Set<&'static str> = phf_set! {
    "jpg", "jpeg", "png", "gif", "webp", "svg", "ico",
};

/// How the gateway serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Serve from cache when present, refresh from the network in the background.
    CacheFirstRefresh,
    /// Race the network against a timer, fall back to cache.
    NetworkFirst,
    /// Serve cache immediately, revalidate in the background.
    StaleWhileRevalidate,
    /// Do not intervene.
    Bypass,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::CacheFirstRefresh => "cache-first-refresh",
            Strategy::NetworkFirst => "network-first-with-timeout",
            Strategy::StaleWhileRevalidate => "stale-while-revalidate",
            Strategy::Bypass => "bypass",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the last path segment ends in a known image extension.
pub fn has_image_extension(path: &str) -> bool {
    let segment = path.rsplit('/').next().unwrap_or(path);
    match segment.rsplit_once('.') {
        Some((_, ext)) => IMAGE_EXTENSIONS.contains(ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

/// Picks a strategy per request. Classification depends only on the request,
/// never on what has been served before.
#[derive(Debug, Clone)]
pub struct Classifier {
    excluded_patterns: Vec<String>,
}

impl Classifier {
    pub fn new(excluded_patterns: Vec<String>) -> Self {
        Self { excluded_patterns }
    }

    /// True when the request targets API, analytics or backend-platform traffic.
    pub fn is_excluded(&self, request: &GatewayRequest) -> bool {
        let host = request
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let target = request.path_and_query();

        self.excluded_patterns
            .iter()
            .any(|pattern| target.contains(pattern.as_str()) || host.contains(pattern.as_str()))
    }

    /// First match wins: filter, then image, then document, then everything else.
    pub fn classify(&self, request: &GatewayRequest) -> Strategy {
        if request.method != Method::GET || self.is_excluded(request) {
            return Strategy::Bypass;
        }

        if request.destination == Destination::Image || has_image_extension(request.path()) {
            Strategy::CacheFirstRefresh
        } else if request.destination == Destination::Document {
            Strategy::NetworkFirst
        } else {
            Strategy::StaleWhileRevalidate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;

    fn classifier() -> Classifier {
        Classifier::new(CacheConfig::default().excluded_patterns)
    }

    #[test]
    fn test_image_extensions_case_insensitive() {
        assert!(has_image_extension("/img/Logo.PNG"));
        assert!(has_image_extension("/favicon.ico"));
        assert!(has_image_extension("/a/b/photo.jpeg"));
        assert!(!has_image_extension("/app.js"));
        assert!(!has_image_extension("/images.d/readme"));
        assert!(!has_image_extension("/"));
    }

    #[test]
    fn test_order_of_rules() {
        let c = classifier();

        // an image extension wins over a document destination
        let req = GatewayRequest::get("/banner.webp").with_destination(Destination::Document);
        assert_eq!(c.classify(&req), Strategy::CacheFirstRefresh);

        let req = GatewayRequest::get("/products/42").with_destination(Destination::Document);
        assert_eq!(c.classify(&req), Strategy::NetworkFirst);

        let req = GatewayRequest::get("/thumb").with_destination(Destination::Image);
        assert_eq!(c.classify(&req), Strategy::CacheFirstRefresh);

        let req = GatewayRequest::get("/static/main.css").with_destination(Destination::Style);
        assert_eq!(c.classify(&req), Strategy::StaleWhileRevalidate);

        let req = GatewayRequest::get("/fonts/inter.woff2").with_destination(Destination::Font);
        assert_eq!(c.classify(&req), Strategy::StaleWhileRevalidate);
    }

    #[test]
    fn test_excluded_paths_bypass() {
        let c = classifier();
        for path in [
            "/api/orders",
            "/__/firebase/init.js",
            "/collect?source=google-analytics",
            "/js/analytics.js",
        ] {
            let req = GatewayRequest::get(path).with_destination(Destination::Script);
            assert_eq!(c.classify(&req), Strategy::Bypass, "{}", path);
        }
    }

    #[test]
    fn test_non_get_bypass() {
        let c = classifier();
        let mut req = GatewayRequest::get("/logo.png");
        req.method = Method::POST;
        assert_eq!(c.classify(&req), Strategy::Bypass);
        req.method = Method::HEAD;
        assert_eq!(c.classify(&req), Strategy::Bypass);
    }
}
