//! HTTP API handlers for species-dashboard

pub mod health;
pub mod species;
pub mod ui;

pub use health::health_routes;
pub use species::{download_species, get_species, list_species, species_image};
pub use ui::{dashboard_page, species_page};
