//! species-dashboard - Read-only browser for stored species
//!
//! Lists the species folders under the storage root and shows each one's
//! image and record. Never writes to the storage root.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use species_common::config;
use species_common::SpeciesStore;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use species_dashboard::{build_router, AppState, DEFAULT_ANALYZER_URL};

/// Command-line arguments for species-dashboard
#[derive(Parser, Debug)]
#[command(name = "species-dashboard")]
#[command(about = "Read-only browser for analyzed species")]
#[command(version)]
struct Args {
    /// Host to bind
    #[arg(long, default_value = "127.0.0.1", env = "SPECIES_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "5731", env = "SPECIES_DASHBOARD_PORT")]
    port: u16,

    /// Storage root for species folders (overrides SPECIES_ROOT_FOLDER and TOML)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, env = "SPECIES_CONFIG")]
    config: Option<PathBuf>,

    /// Analyzer URL for the navigation link
    #[arg(long, default_value = DEFAULT_ANALYZER_URL, env = "SPECIES_ANALYZER_URL")]
    analyzer_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = config::load_toml_config(args.config.as_deref())?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config::log_directive(
            &toml_config,
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting species-dashboard v{}",
        env!("CARGO_PKG_VERSION")
    );

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    info!("Storage root: {}", root_folder.display());
    if !root_folder.is_dir() {
        // Not fatal: the analyzer creates it on first save
        warn!(
            "Storage root {} does not exist yet",
            root_folder.display()
        );
    }

    let mut state = AppState::new(SpeciesStore::new(root_folder));
    state.analyzer_url = args.analyzer_url.clone();

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("Invalid host/port")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("species-dashboard listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
