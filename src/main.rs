// cachegate - caching reverse proxy with per-request cache strategies
// Author: kelexine (https://github.com/kelexine)

use anyhow::Result;
use cachegate::cache::open_storage;
use cachegate::cli::Args;
use cachegate::config::AppConfig;
use cachegate::gateway::{ControlMessage, Gateway, Registration};
use cachegate::server::create_router;
use cachegate::upstream::HttpFetcher;
use cachegate::utils::logging;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration
    let config = AppConfig::load(&args)?;

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting cachegate v{}", env!("CARGO_PKG_VERSION"));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.workers.max(1))
        .enable_all()
        .build()?;

    runtime.block_on(run(args, config))
}

async fn run(args: Args, config: AppConfig) -> Result<()> {
    // Phase 3: Open cache storage and the upstream client
    info!(
        "Opening {:?} cache storage at {}",
        config.storage.backend, config.storage.directory
    );
    let storage = open_storage(&config.storage).await?;
    let fetcher = Arc::new(HttpFetcher::new(&config.upstream)?);
    info!("Proxying to upstream {}", fetcher.base_url());

    let registration = Arc::new(Registration::new(storage.clone(), fetcher.clone()));

    if args.clear_cache {
        registration.post_message(ControlMessage::ClearCache, None).await;
    }

    // Phase 4: Install and activate the gateway
    let gateway = Gateway::new(config.cache.clone(), storage, fetcher);
    match registration.register(gateway).await {
        Ok(gateway) => info!(
            "Gateway {} is {:?}",
            gateway.cache_name(),
            gateway.state()
        ),
        Err(e) => {
            error!("Gateway install failed: {}", e);
            warn!("Serving without a cache; every request goes straight upstream");
        }
    }

    // Phase 5: Build and start HTTP server
    let app = create_router(config.clone(), registration);
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Phase 6: Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
