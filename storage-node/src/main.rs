//! Storage node - status and share range server

mod config;
mod error;
mod routes;
mod services;
mod state;

use crate::config::Config;
use crate::services::bucket_counter::BucketCountingCrawler;
use crate::services::share_store::DiskEngine;
use crate::state::AppState;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_env()?;
    if let Some(port) = args.port {
        config.node.port = port;
    }

    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    storage_status::utils::logger::init(log_level)?;

    tracing::info!(
        "Starting storage-node v{} (base_dir: {})",
        env!("CARGO_PKG_VERSION"),
        config.node.base_dir.display()
    );

    std::fs::create_dir_all(config.shares_dir())?;

    // Bucket counter runs for the life of the process
    let cancel = CancellationToken::new();
    let crawler = Arc::new(BucketCountingCrawler::new(
        config.shares_dir(),
        config.crawler.clone(),
    ));
    let crawler_handle = tokio::spawn(crawler.clone().run(cancel.clone()));

    let engine = Arc::new(DiskEngine::new(
        config.node.base_dir.clone(),
        config.storage.reserved_space,
        crawler,
    ));
    let state = Arc::new(AppState::new(engine));
    let app = routes::create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.node.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Status page: http://{}/storage", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    tracing::info!("Shutting down...");
    cancel.cancel();
    if let Err(e) = crawler_handle.await {
        tracing::warn!("Bucket counter task failed: {}", e);
    }
    tracing::info!("Server stopped");

    Ok(())
}

/// Resolves on SIGINT/SIGTERM or when the token is cancelled elsewhere,
/// then stops the crawler so it winds down while connections drain.
async fn shutdown_signal(cancel: CancellationToken) {
    let reason = tokio::select! {
        signal = wait_for_signal() => signal,
        _ = cancel.cancelled() => "cancelled",
    };
    tracing::info!(reason, "Stopping bucket counter and draining connections");
    cancel.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable");
            return interrupt().await;
        }
    };
    tokio::select! {
        signal = interrupt() => signal,
        _ = terminate.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    interrupt().await
}

async fn interrupt() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "SIGINT handler unavailable");
        std::future::pending::<()>().await;
    }
    "SIGINT"
}
