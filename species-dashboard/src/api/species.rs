//! Stored species API
//!
//! JSON listing, record lookup, raw JSON download and image serving.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use species_common::{FolderKey, Listing, SpeciesRecord, StoreError, StoredRecord};
use tracing::error;

use crate::AppState;

/// Attachment name for downloaded records
pub const DOWNLOAD_FILE_NAME: &str = "species_data.json";

pub const NO_DATA_WARNING: &str = "No data available. Please upload an image first.";
pub const NO_SPECIES_WARNING: &str = "No common names available. Upload an image to add data.";

/// Listing response
#[derive(Debug, Serialize)]
pub struct SpeciesListResponse {
    /// "ok", "missing_root" or "empty"
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<&'static str>,
    pub entries: Vec<SpeciesEntry>,
}

#[derive(Debug, Serialize)]
pub struct SpeciesEntry {
    pub key: String,
    pub display_name: String,
}

impl From<&Listing> for SpeciesListResponse {
    fn from(listing: &Listing) -> Self {
        let (status, warning) = match listing {
            Listing::MissingRoot => ("missing_root", Some(NO_DATA_WARNING)),
            Listing::Empty => ("empty", Some(NO_SPECIES_WARNING)),
            Listing::Entries(_) => ("ok", None),
        };

        Self {
            status,
            warning,
            entries: listing
                .entries()
                .iter()
                .map(|key| SpeciesEntry {
                    key: key.to_string(),
                    display_name: key.display_name(),
                })
                .collect(),
        }
    }
}

/// GET /api/species
///
/// Missing and empty storage roots are warnings, not errors.
pub async fn list_species(
    State(state): State<AppState>,
) -> Result<Json<SpeciesListResponse>, BrowseError> {
    let listing = state.store.browse().await?;
    Ok(Json(SpeciesListResponse::from(&listing)))
}

/// GET /api/species/:key
pub async fn get_species(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<SpeciesRecord>, BrowseError> {
    let key = FolderKey::parse(&key)?;
    let entry = state.store.load(&key).await?;
    match entry.record {
        StoredRecord::Valid(record) => Ok(Json(record)),
        StoredRecord::Missing => Err(BrowseError::NotFound(format!(
            "{} has no stored record",
            key
        ))),
        StoredRecord::Malformed(e) => Err(BrowseError::Storage(format!(
            "stored record for {} is malformed: {}",
            key, e
        ))),
    }
}

/// GET /api/species/:key/download
///
/// Stored JSON byte-for-byte, as an attachment
pub async fn download_species(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, BrowseError> {
    let key = FolderKey::parse(&key)?;
    let json = state.store.read_record_json(&key).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", DOWNLOAD_FILE_NAME),
            ),
        ],
        json,
    )
        .into_response())
}

/// GET /species/:key/image
pub async fn species_image(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, BrowseError> {
    let key = FolderKey::parse(&key)?;
    let bytes = state.store.read_image(&key).await?;

    // Stored as .jpg whatever the upload was
    let content_type = infer::get(&bytes)
        .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .map(|kind| kind.mime_type())
        .unwrap_or("image/jpeg");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        bytes,
    )
        .into_response())
}

/// Browse API errors
#[derive(Debug)]
pub enum BrowseError {
    InvalidKey(String),
    NotFound(String),
    Storage(String),
}

impl BrowseError {
    pub fn status(&self) -> StatusCode {
        match self {
            BrowseError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            BrowseError::NotFound(_) => StatusCode::NOT_FOUND,
            BrowseError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            BrowseError::InvalidKey(key) => format!("Invalid species name: {}", key),
            BrowseError::NotFound(msg) => format!("Not found: {}", msg),
            BrowseError::Storage(msg) => format!("Storage error: {}", msg),
        }
    }
}

impl From<StoreError> for BrowseError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidKey(key) => BrowseError::InvalidKey(key),
            StoreError::EmptyCommonName => BrowseError::InvalidKey(String::new()),
            StoreError::NotFound(key) => BrowseError::NotFound(key),
            other => {
                error!("Failed to read species store: {}", other);
                BrowseError::Storage(other.to_string())
            }
        }
    }
}

impl IntoResponse for BrowseError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message(),
        }));

        (self.status(), body).into_response()
    }
}
