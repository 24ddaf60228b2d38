//! species-dashboard library - read-only browsing of stored species
//!
//! Every request reads the storage root fresh; nothing is cached.

use axum::Router;
use chrono::{DateTime, Utc};
use species_common::SpeciesStore;
use tower_http::trace::TraceLayer;

pub mod api;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Storage root written by species-analyzer (read-only here)
    pub store: SpeciesStore,
    /// Link target for the analyzer navigation entry
    pub analyzer_url: String,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

/// Default location of the analyzer, linked from the dashboard pages
pub const DEFAULT_ANALYZER_URL: &str = "http://127.0.0.1:5730/";

impl AppState {
    pub fn new(store: SpeciesStore) -> Self {
        Self {
            store,
            analyzer_url: DEFAULT_ANALYZER_URL.to_string(),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/", get(api::dashboard_page))
        .route("/species/:key", get(api::species_page))
        .route("/species/:key/image", get(api::species_image))
        .route("/api/species", get(api::list_species))
        .route("/api/species/:key", get(api::get_species))
        .route("/api/species/:key/download", get(api::download_species))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
