// Configuration module
// Author: kelexine (https://github.com/kelexine)

mod models;

pub use models::*;

use crate::cli::Args;
use crate::error::{GatewayError, Result};
use config::{Config, Environment, File};
use std::path::PathBuf;

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. CLI arguments (highest)
    /// 2. Environment variables
    /// 3. Config file
    /// 4. Defaults (lowest)
    pub fn load(args: &Args) -> Result<Self> {
        let path = args
            .config
            .clone()
            .unwrap_or_else(Self::default_config_path);

        let mut config = Self::from_sources(&path.to_string_lossy())?;
        config.apply_args(args);
        config.validate()?;
        Ok(config)
    }

    fn from_sources(path: &str) -> Result<Self> {
        let config = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&Self::default())?)
            // Load from config file if it exists
            .add_source(File::with_name(path).required(false))
            // Override with environment variables (CACHEGATE_CACHE__LIMIT=50)
            .add_source(
                Environment::with_prefix("CACHEGATE")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cache.precache_assets")
                    .with_list_parse_key("cache.excluded_patterns")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| GatewayError::Config(e.to_string()))
    }

    fn apply_args(&mut self, args: &Args) {
        if let Some(upstream) = &args.upstream {
            self.upstream.base_url = upstream.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
    }

    /// Reject settings the gateway cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.cache.name.trim().is_empty() {
            return Err(GatewayError::Config("cache.name must not be empty".into()));
        }
        if self.cache.limit == 0 {
            return Err(GatewayError::Config("cache.limit must be at least 1".into()));
        }
        if self.cache.network_timeout_ms == 0 {
            return Err(GatewayError::Config(
                "cache.network_timeout_ms must be positive".into(),
            ));
        }
        if let Some(bad) = self
            .cache
            .precache_assets
            .iter()
            .find(|p| !p.starts_with('/'))
        {
            return Err(GatewayError::Config(format!(
                "precache asset '{}' must be an absolute path",
                bad
            )));
        }
        url::Url::parse(&self.upstream.base_url).map_err(|e| {
            GatewayError::Config(format!(
                "invalid upstream.base_url '{}': {}",
                self.upstream.base_url, e
            ))
        })?;
        Ok(())
    }

    fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".cachegate")
            .join("config.toml")
    }
}
