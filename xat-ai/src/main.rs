//! xat-ai - inference mediator service
//!
//! Receives boundary envelopes on `POST /message`, performs the request
//! against the Ollama-compatible inference service and answers with exactly
//! one envelope. `GET /health` reports uptime and the last failure.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use xat_common::config::{default_config_path, load_toml_config};

use xat_ai::gateway::InferenceBroker;
use xat_ai::AppState;

/// Command-line arguments for xat-ai
#[derive(Parser, Debug)]
#[command(name = "xat-ai")]
#[command(about = "Inference mediator service for the XAT annotation pipeline")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "XAT_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind (overrides the config file)
    #[arg(long, env = "XAT_AI_HOST")]
    host: Option<String>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "XAT_AI_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let toml_config = load_toml_config(&config_path).unwrap_or_else(|e| {
        eprintln!("Ignoring unreadable config {}: {}", config_path.display(), e);
        Default::default()
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("xat_ai={},tower_http=info", toml_config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let host = args.host.unwrap_or(toml_config.broker.host.clone());
    let port = args.port.unwrap_or(toml_config.broker.port);
    let timeout = Duration::from_secs(toml_config.broker.request_timeout_secs.max(1));

    info!("Starting xat-ai inference mediator");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Request timeout: {}s", timeout.as_secs());
    if !toml_config.ai.enabled {
        warn!("The [ai] section is disabled; the mediator still serves requests it receives");
    }

    if toml_config.broker.allowed_services.is_empty() {
        warn!("No allowed_services configured; forwarding to any service URL a caller names");
    } else {
        info!("Allowed services: {}", toml_config.broker.allowed_services.join(", "));
    }

    let broker = InferenceBroker::new(timeout)
        .context("Failed to build HTTP client")?
        .with_allowed_services(&toml_config.broker.allowed_services);
    let app = xat_ai::build_router(AppState::new(broker));

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", host, port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        },
    }
}
