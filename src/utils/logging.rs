//! Structured logging and URL sanitization.
//!
//! This module configures the `tracing` ecosystem for the application,
//! supporting multiple output formats and providing utilities to prevent
//! credentials carried in query strings (storefront backend API keys,
//! auth tokens) from leaking into logs.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::config::LoggingConfig;
use crate::error::{GatewayError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static SANITIZE_URLS: AtomicBool = AtomicBool::new(true);

/// Query parameters whose values are credentials.
static CREDENTIAL_PARAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([?&](?:key|api_key|apikey|token|access_token|id_token|auth|signature)=)[^&#\s]*")
        .expect("credential pattern is valid")
});

/// Initializes the global tracing subscriber for the application.
///
/// Supports two output formats:
/// - `json`: Structured JSON logs for production ingestion.
/// - `pretty` (default): Human-readable, colorized output for development.
///
/// Log levels are controlled via the `RUST_LOG` environment variable or
/// the provided `LoggingConfig`.
pub fn init(config: &LoggingConfig) -> Result<()> {
    SANITIZE_URLS.store(config.sanitize_urls, Ordering::Relaxed);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.format.as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };

    result.map_err(|e| GatewayError::Internal(format!("Failed to initialize logging: {}", e)))
}

/// Replaces credential query parameter values with `[REDACTED]`.
pub fn sanitize(input: &str) -> String {
    CREDENTIAL_PARAM
        .replace_all(input, "${1}[REDACTED]")
        .into_owned()
}

/// Renders a URL for a log line, sanitized unless disabled in config.
pub fn display_url(url: &str) -> String {
    if SANITIZE_URLS.load(Ordering::Relaxed) {
        sanitize(url)
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_api_key() {
        let input = "/v1/projects/shop?key=AIzaSyExample123&alt=json";
        let output = sanitize(input);
        assert_eq!(output, "/v1/projects/shop?key=[REDACTED]&alt=json");
    }

    #[test]
    fn test_sanitize_multiple_tokens() {
        let input = "https://cdn.example/img.png?token=abc&Access_Token=xyz";
        let output = sanitize(input);
        assert!(!output.contains("abc"));
        assert!(!output.contains("xyz"));
        assert_eq!(output.matches("[REDACTED]").count(), 2);
    }

    #[test]
    fn test_sanitize_leaves_plain_urls() {
        let input = "/catalog/shoes?page=2&keyword=red";
        assert_eq!(sanitize(input), input);
    }
}
