//! Configuration data structures for the cachegate proxy.
//!
//! This module defines the schema for the application settings: the listening
//! server, the upstream storefront origin, the cache policy, the storage
//! backend, and logging.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use serde::{Deserialize, Serialize};

/// The root configuration object for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server settings (host, port, workers).
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream origin that cache misses are forwarded to.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Cache versioning, precache and strategy settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Where cache stores are kept.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the built-in HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The IP address or hostname the server should bind to.
    /// Default: `127.0.0.1`
    #[serde(default = "default_host")]
    pub host: String,

    /// The port number the server should listen on.
    /// Default: `8080`
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads for the runtime.
    /// Default: Number of logical CPU cores.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Largest request body accepted from the page, in bytes.
    /// Default: `10485760` (10 MiB)
    #[serde(default = "default_body_limit")]
    pub max_body_bytes: usize,
}

/// Settings for the upstream storefront origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL every proxied path is resolved against.
    /// Default: `http://127.0.0.1:3000`
    #[serde(default = "default_upstream_url")]
    pub base_url: String,

    /// Overall timeout for a single upstream request, in seconds.
    /// This bounds the "unbounded" fetches too; it is not the network-first race timer.
    /// Default: `30`
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Connect timeout in seconds.
    /// Default: `10`
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// Maximum number of idle connections kept per upstream host.
    /// Default: `32`
    #[serde(default = "default_pool_size")]
    pub pool_max_idle_per_host: usize,
}

/// Cache policy. The defaults are the values the storefront ships with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Version-qualified name of the live cache store.
    /// Default: `regala-algo-cache-v1`
    #[serde(default = "default_cache_name")]
    pub name: String,

    /// Paths fetched and stored at install time (all-or-nothing).
    /// Default: `["/", "/index.html"]`
    #[serde(default = "default_precache_assets")]
    pub precache_assets: Vec<String>,

    /// Maximum number of entries kept in the live store.
    /// Default: `100`
    #[serde(default = "default_cache_limit")]
    pub limit: usize,

    /// Race timer for navigation requests, in milliseconds.
    /// Default: `1500`
    #[serde(default = "default_network_timeout_ms")]
    pub network_timeout_ms: u64,

    /// Substrings that exclude a request from caching entirely.
    /// Default: `["/api/", "google-analytics", "firebase", "analytics"]`
    #[serde(default = "default_excluded_patterns")]
    pub excluded_patterns: Vec<String>,

    /// Whether a freshly installed gateway replaces the active one immediately.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub skip_waiting_on_install: bool,
}

/// Which storage backend holds the cache stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Disk,
}

/// Settings for cache persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend (`memory` or `disk`).
    /// Default: `disk`
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,

    /// Root directory for the disk backend.
    /// Default: `~/.cachegate/stores`
    #[serde(default = "default_storage_dir")]
    pub directory: String,
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`).
    /// Default: `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Whether to redact credential query parameters from logged URLs.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub sanitize_urls: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: default_workers(),
            max_body_bytes: default_body_limit(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_url(),
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
            pool_max_idle_per_host: default_pool_size(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: default_cache_name(),
            precache_assets: default_precache_assets(),
            limit: default_cache_limit(),
            network_timeout_ms: default_network_timeout_ms(),
            excluded_patterns: default_excluded_patterns(),
            skip_waiting_on_install: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            directory: default_storage_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            sanitize_urls: true,
        }
    }
}

// Helper functions for serde defaults and shared constants
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_body_limit() -> usize {
    10 * 1024 * 1024
}

fn default_upstream_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_pool_size() -> usize {
    32
}

fn default_cache_name() -> String {
    "regala-algo-cache-v1".to_string()
}

fn default_precache_assets() -> Vec<String> {
    vec!["/".to_string(), "/index.html".to_string()]
}

fn default_cache_limit() -> usize {
    100
}

fn default_network_timeout_ms() -> u64 {
    1500
}

fn default_excluded_patterns() -> Vec<String> {
    ["/api/", "google-analytics", "firebase", "analytics"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_backend() -> StorageBackend {
    StorageBackend::Disk
}

fn default_storage_dir() -> String {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".cachegate")
        .join("stores")
        .to_string_lossy()
        .to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
