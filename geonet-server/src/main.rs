mod app;
mod config;
mod export;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

/// HTTP front end for street network analysis
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Address to listen on, overrides the configuration file
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Request timeout in seconds
    #[arg(long)]
    request_timeout_secs: Option<u64>,
    /// Number of analyses processed at the same time
    #[arg(long)]
    max_concurrent_analyses: Option<usize>,
    /// Coordinate distance under which line endpoints share a node, in metres
    #[arg(long)]
    snap_tolerance: Option<f64>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = ServerConfig::load(self.config.as_deref())?;
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(secs) = self.request_timeout_secs {
            config.request_timeout_secs = secs;
        }
        if let Some(limit) = self.max_concurrent_analyses {
            config.max_concurrent_analyses = limit;
        }
        if let Some(tolerance) = self.snap_tolerance {
            config.graph.snap_tolerance = tolerance;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config()?;
    let bind = config.bind;
    tracing::info!(
        "starting with timeout {}s, {} concurrent analyses, snap tolerance {} m",
        config.request_timeout_secs,
        config.max_concurrent_analyses,
        config.graph.snap_tolerance
    );

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!("listening on {bind}");

    axum::serve(listener, app::router(config))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
