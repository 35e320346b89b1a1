//! Tagon page server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ Axum route match ──▶ page pipeline
//!                     (timeout,                            │
//!                      request id,                         ├─ middleware (before, by priority)
//!                      tracing)                            ├─ guards (first denial wins)
//!                                                          ├─ render (component + layout)
//!                                                          └─ middleware (after, reversed)
//!     Client Response
//!     ◀────────────── headers from *_headers ◀─────────────┘
//!
//!     Cross-cutting: config │ observability │ security (JWT) │ admin (/api)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use tagon_router::config::{load_config, TagonConfig};
use tagon_router::observability::{logging::init_logging, metrics};
use tagon_router::HttpServer;

#[derive(Parser)]
#[command(name = "tagon-server", version, about = "Serve a file-convention page tree")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen host.
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the pages directory.
    #[arg(long)]
    pages: Option<String>,

    /// Override the components directory.
    #[arg(long)]
    components: Option<String>,
}

impl Args {
    fn apply(&self, config: &mut TagonConfig) {
        if self.host.is_some() || self.port.is_some() {
            let (current_host, current_port) = config
                .server
                .bind_address
                .rsplit_once(':')
                .unwrap_or(("127.0.0.1", "3000"));
            let host = self.host.as_deref().unwrap_or(current_host);
            let port = self
                .port
                .map(|p| p.to_string())
                .unwrap_or_else(|| current_port.to_string());
            config.server.bind_address = format!("{host}:{port}");
        }
        if let Some(pages) = &self.pages {
            config.pages.pages_dir = pages.clone();
        }
        if let Some(components) = &self.components {
            config.pages.components_dir = components.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => TagonConfig::default(),
    };
    args.apply(&mut config);

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "tagon-server starting");
    tracing::info!(
        bind_address = %config.server.bind_address,
        pages_dir = %config.pages.pages_dir,
        components_dir = %config.pages.components_dir,
        request_timeout_secs = config.server.request_timeout_secs,
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

    // Route errors are fatal before anything is bound.
    let server = match HttpServer::new(config.clone()) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "Route registration failed");
            return Err(e.into());
        }
    };

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
