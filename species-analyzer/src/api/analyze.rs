//! Analysis endpoints
//!
//! - `POST /analyze`: multipart form from the upload page, answers with HTML
//! - `POST /api/analyze`: same pipeline, answers with JSON

use axum::{
    extract::{Multipart, State},
    response::{Html, IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use species_common::ui::{notice, NoticeKind};
use species_common::SpeciesRecord;
use tracing::debug;

use crate::api::ui::{render_result_page, render_upload_page};
use crate::error::AnalyzeError;
use crate::services::{analyze_upload, read_upload, IntakeError};
use crate::AppState;

/// JSON analysis response
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub request_id: String,
    /// Folder key the record was stored under
    pub key: String,
    /// Folder path relative to the process working directory
    pub folder: String,
    pub replaced: bool,
    pub record: SpeciesRecord,
}

/// POST /analyze
///
/// A submission without a file re-renders the form and does nothing else.
pub async fn analyze_form(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let upload = match read_upload(&mut multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => {
            debug!("Form submitted without an image");
            let hint = notice(NoticeKind::Warning, "Choose an image to analyze.");
            return Html(render_upload_page(&state, Some(hint))).into_response();
        }
        Err(e) => return error_page(&state, AnalyzeError::from(e)),
    };

    match analyze_upload(&state, &upload).await {
        Ok(analysis) => Html(render_result_page(&state, &analysis)).into_response(),
        Err(e) => error_page(&state, e),
    }
}

fn error_page(state: &AppState, error: AnalyzeError) -> Response {
    let banner = notice(
        NoticeKind::Error,
        &format!("An error occurred: {}", error.user_message()),
    );
    (error.status(), Html(render_upload_page(state, Some(banner)))).into_response()
}

/// POST /api/analyze
pub async fn analyze_json(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AnalyzeError> {
    let upload = read_upload(&mut multipart)
        .await?
        .ok_or(IntakeError::MissingFile)?;

    let analysis = analyze_upload(&state, &upload).await?;

    Ok(Json(AnalyzeResponse {
        request_id: analysis.request_id.to_string(),
        key: analysis.stored.key.to_string(),
        folder: analysis.stored.folder.display().to_string(),
        replaced: analysis.stored.replaced,
        record: analysis.record,
    }))
}

/// Build analysis routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new()
        .route("/analyze", post(analyze_form))
        .route("/api/analyze", post(analyze_json))
}
