//! Error types for species-analyzer
//!
//! Each failure class maps to its own status code and user-facing message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use species_common::StoreError;
use thiserror::Error;

use crate::services::{ClassifyError, IntakeError};

/// Analysis request error
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("Intake failed: {0}")]
    Intake(#[from] IntakeError),

    #[error("Classification failed: {0}")]
    Classify(#[from] ClassifyError),

    #[error("Storage failed: {0}")]
    Store(#[from] StoreError),
}

impl AnalyzeError {
    pub fn status(&self) -> StatusCode {
        match self {
            AnalyzeError::Intake(IntakeError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AnalyzeError::Intake(IntakeError::TooLarge) => StatusCode::PAYLOAD_TOO_LARGE,
            AnalyzeError::Intake(_) => StatusCode::BAD_REQUEST,
            AnalyzeError::Classify(ClassifyError::Refused(_))
            | AnalyzeError::Classify(ClassifyError::Schema(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AnalyzeError::Classify(_) => StatusCode::BAD_GATEWAY,
            AnalyzeError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for JSON responses
    pub fn code(&self) -> &'static str {
        match self {
            AnalyzeError::Intake(IntakeError::Io(_)) => "UPLOAD_IO_ERROR",
            AnalyzeError::Intake(IntakeError::TooLarge) => "UPLOAD_TOO_LARGE",
            AnalyzeError::Intake(_) => "INVALID_UPLOAD",
            AnalyzeError::Classify(ClassifyError::Transport(_)) => "INFERENCE_UNREACHABLE",
            AnalyzeError::Classify(ClassifyError::Auth(_)) => "INFERENCE_AUTH",
            AnalyzeError::Classify(ClassifyError::Api(..)) => "INFERENCE_ERROR",
            AnalyzeError::Classify(ClassifyError::Refused(_)) => "INFERENCE_REFUSED",
            AnalyzeError::Classify(ClassifyError::Schema(_)) => "SCHEMA_MISMATCH",
            AnalyzeError::Store(_) => "STORAGE_ERROR",
        }
    }

    /// Message shown to the user
    pub fn user_message(&self) -> String {
        match self {
            AnalyzeError::Intake(IntakeError::Io(e)) => {
                format!("The upload could not be prepared for analysis: {}", e)
            }
            AnalyzeError::Intake(e) => format!("The upload was rejected: {}", e),
            AnalyzeError::Classify(ClassifyError::Transport(e)) => {
                format!("Could not reach the inference service: {}", e)
            }
            AnalyzeError::Classify(ClassifyError::Auth(_)) => {
                "The inference service rejected the configured API key.".to_string()
            }
            AnalyzeError::Classify(ClassifyError::Api(status, msg)) => {
                format!("The inference service returned an error (HTTP {}): {}", status, msg)
            }
            AnalyzeError::Classify(ClassifyError::Refused(msg)) => {
                format!("The model declined to classify this image: {}", msg)
            }
            AnalyzeError::Classify(ClassifyError::Schema(msg)) => format!(
                "The inference service returned data that does not fit the species schema: {}",
                msg
            ),
            AnalyzeError::Store(e) => format!("The species record could not be saved: {}", e),
        }
    }
}

impl IntoResponse for AnalyzeError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.user_message(),
            }
        }));

        (self.status(), body).into_response()
    }
}
