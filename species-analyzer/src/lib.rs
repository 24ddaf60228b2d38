//! species-analyzer library interface for testing
//!
//! Exposes the router, application state and pipeline services

pub mod api;
pub mod error;
pub mod services;

pub use crate::error::AnalyzeError;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use species_common::SpeciesStore;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::services::SpeciesClassifier;

/// Default upload limit (20 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Default location of the dashboard, linked from the analyzer pages
pub const DEFAULT_DASHBOARD_URL: &str = "http://127.0.0.1:5731/";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Species folders under the storage root
    pub store: SpeciesStore,
    /// Inference client
    pub classifier: Arc<dyn SpeciesClassifier>,
    /// Request body limit for uploads
    pub max_upload_bytes: usize,
    /// Link target for the dashboard navigation entry
    pub dashboard_url: String,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(store: SpeciesStore, classifier: Arc<dyn SpeciesClassifier>) -> Self {
        Self {
            store,
            classifier,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            dashboard_url: DEFAULT_DASHBOARD_URL.to_string(),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .merge(api::ui_routes())
        .merge(api::analyze_routes())
        .merge(api::health_routes())
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
