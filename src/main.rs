//! proxy-server binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                 PROXY SERVER                 │
//!   POST /proxy        │  ┌────────────┐   ┌───────────────────────┐  │
//!   ───────────────────┼─▶│    auth    │──▶│       forward         │  │
//!   h-api-key: ...     │  │ middleware │   │ request → dispatch ───┼──┼──▶ Target
//!                      │  └────────────┘   │            │          │  │    service
//!   relayed response   │                   │          relay ◀──────┼──┼───
//!   ◀──────────────────┼───────────────────┴───────────────────────┘  │
//!                      │                                              │
//!   GET /health ───────┼─▶ health (no auth)                           │
//!                      │                                              │
//!                      │  config · observability · lifecycle          │
//!                      └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use proxy_server::config;
use proxy_server::observability::{logging, metrics};
use proxy_server::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "proxy-server")]
#[command(about = "Authenticated HTTP forwarding proxy", long_about = None)]
struct Cli {
    /// Optional TOML config file; environment variables override it.
    #[arg(short, long, env = "PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Listening port (overrides PORT).
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind interface (overrides HOST).
    #[arg(long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.listener.port = port;
    }
    if let Some(host) = cli.host {
        config.listener.host = host;
    }

    logging::init_logging(&config.observability);

    tracing::info!("proxy-server v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        api_key_configured = config.auth.api_key.is_some(),
        upstream_timeout_secs = ?config.upstream.timeout_secs,
        max_body_size = config.security.max_body_size,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        if let Err(e) = metrics::init_metrics(addr) {
            tracing::error!(error = %e, "Failed to start metrics endpoint");
        }
    }

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
