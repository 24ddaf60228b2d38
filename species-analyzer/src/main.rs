//! species-analyzer - Animal image analysis service
//!
//! Serves the upload form, sends each uploaded image to the inference API
//! and stores the classified species under the storage root.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use species_common::config::{self, TomlConfig};
use species_common::SpeciesStore;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use species_analyzer::services::classifier::{
    ClassifierConfig, OpenAiClassifier, DEFAULT_API_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS,
};
use species_analyzer::{build_router, AppState, DEFAULT_DASHBOARD_URL, DEFAULT_MAX_UPLOAD_BYTES};

/// Command-line arguments for species-analyzer
#[derive(Parser, Debug)]
#[command(name = "species-analyzer")]
#[command(about = "Animal image analysis service")]
#[command(version)]
struct Args {
    /// Host to bind
    #[arg(long, default_value = "127.0.0.1", env = "SPECIES_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "5730", env = "SPECIES_ANALYZER_PORT")]
    port: u16,

    /// Storage root for species folders (overrides SPECIES_ROOT_FOLDER and TOML)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, env = "SPECIES_CONFIG")]
    config: Option<PathBuf>,

    /// Inference model identifier
    #[arg(long, env = "SPECIES_MODEL")]
    model: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "SPECIES_API_BASE_URL")]
    api_base_url: Option<String>,

    /// Dashboard URL for the navigation link
    #[arg(long, default_value = DEFAULT_DASHBOARD_URL, env = "SPECIES_DASHBOARD_URL")]
    dashboard_url: String,
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
        "Starting species-analyzer v{}",
        env!("CARGO_PKG_VERSION")
    );

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    info!("Storage root: {}", root_folder.display());

    let classifier_config = classifier_config(&args, &toml_config)?;
    info!(
        "Inference API: {} (model {})",
        classifier_config.base_url, classifier_config.model
    );
    let classifier = OpenAiClassifier::new(classifier_config)
        .context("Failed to create inference API client")?;

    let mut state = AppState::new(SpeciesStore::new(root_folder), Arc::new(classifier));
    state.max_upload_bytes = toml_config
        .max_upload_bytes
        .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
    state.dashboard_url = args.dashboard_url.clone();

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("Invalid host/port")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("species-analyzer listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// CLI/ENV > TOML > compiled default, per setting
fn classifier_config(args: &Args, toml_config: &TomlConfig) -> Result<ClassifierConfig> {
    let api_key = config::resolve_api_key(toml_config)?;

    let mut classifier_config = ClassifierConfig::new(api_key);
    classifier_config.base_url = args
        .api_base_url
        .clone()
        .or_else(|| toml_config.api_base_url.clone())
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
    classifier_config.model = args
        .model
        .clone()
        .or_else(|| toml_config.model.clone())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());
    classifier_config.timeout = Duration::from_secs(
        toml_config
            .request_timeout_secs
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
    );

    Ok(classifier_config)
}

/// Graceful shutdown signal handler
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
