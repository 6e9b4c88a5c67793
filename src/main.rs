//! proxy-gate
//!
//! An IP gatekeeper that sits in front of a service and only lets traffic
//! through when it arrives via a trusted reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                  PROXY GATE                  │
//!                      │                                              │
//!     Client Request   │  ┌─────────┐   ┌──────────┐   ┌──────────┐  │
//!     ─────────────────┼─▶│  http   │──▶│   gate   │──▶│ forwarder│──┼──▶ Upstream
//!                      │  │ server  │   │ registry │   │          │  │
//!                      │  └─────────┘   │  lookup  │   └──────────┘  │
//!                      │                └────┬─────┘                  │
//!                      │          rejected   │   admitted             │
//!                      │        ◀────────────┘   (headers rewritten)  │
//!                      │                                              │
//!                      │  ┌────────────────────────────────────────┐  │
//!                      │  │    refresh loops (one per source)      │  │
//!                      │  │  file:// and http(s):// subnet lists   │  │
//!                      │  └────────────────────────────────────────┘  │
//!                      └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use proxy_gate::config::load_config;
use proxy_gate::http::GateServer;
use proxy_gate::lifecycle::Shutdown;
use proxy_gate::observability::metrics;
use proxy_gate::registry::{spawn_refresh_tasks, TrustRegistry};

#[derive(Parser)]
#[command(name = "proxy-gate", version, about = "Trusted reverse-proxy gatekeeper")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "gate.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "proxy_gate=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(config = %cli.config.display(), "proxy-gate starting");

    let config = load_config(&cli.config)?;

    tracing::info!(
        bind_address = %config.server.bind_address,
        upstream = %config.server.upstream,
        entries = config.map.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Compile the registry. This performs the blocking first fetch of every
    // dynamic source; a bad entry or unreachable source stops us here.
    let registry = Arc::new(TrustRegistry::compile(&config).await?);

    let shutdown = Shutdown::new();
    let refresh_tasks = spawn_refresh_tasks(&registry, &shutdown);

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let server = GateServer::new(&config, registry)?;

    // Subscribe before the signal task exists; a receiver only sees
    // triggers sent after it was created.
    let server_shutdown = shutdown.subscribe();

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
        }
        signal_shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    // The server is down; stop the refresh loops as well.
    shutdown.trigger();
    for task in refresh_tasks {
        let _ = task.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
