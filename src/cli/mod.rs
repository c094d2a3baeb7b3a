// CLI module for cachegate
// Author: kelexine (https://github.com/kelexine)

use clap::Parser;
use std::path::PathBuf;

/// cachegate - caching reverse proxy for the storefront
#[derive(Parser, Debug)]
#[command(name = "cachegate", version, about, long_about = None)]
pub struct Args {
    /// Path to a TOML config file (default: ~/.cachegate/config.toml)
    #[arg(long, env = "CACHEGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Upstream origin base URL, overrides the config file
    #[arg(long)]
    pub upstream: Option<String>,

    /// Port to listen on, overrides the config file
    #[arg(long)]
    pub port: Option<u16>,

    /// Delete every cache store before installing
    #[arg(long)]
    pub clear_cache: bool,
}
