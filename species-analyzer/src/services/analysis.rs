//! One analysis request: encode, classify, persist
//!
//! The store is only touched after a successful classification, so a failed
//! request never creates a species folder.

use std::time::Instant;

use species_common::{SpeciesRecord, StoredSpecies};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AnalyzeError;
use crate::services::intake::{EncodedImage, ImageUpload};
use crate::AppState;

/// Outcome of a successful analysis
#[derive(Debug, Clone)]
pub struct Analysis {
    pub request_id: Uuid,
    pub record: SpeciesRecord,
    pub stored: StoredSpecies,
    /// Payload that was sent to the classifier, reused for the preview
    pub image: EncodedImage,
}

pub async fn analyze_upload(
    state: &AppState,
    upload: &ImageUpload,
) -> Result<Analysis, AnalyzeError> {
    let request_id = Uuid::new_v4();
    let started = Instant::now();

    let result = run(state, upload, request_id).await;

    match &result {
        Ok(analysis) => info!(
            %request_id,
            key = %analysis.stored.key,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis complete"
        ),
        Err(e) => {
            warn!(
                %request_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %e,
                "Analysis failed"
            );
            *state.last_error.write().await = Some(e.to_string());
        }
    }

    result
}

async fn run(
    state: &AppState,
    upload: &ImageUpload,
    request_id: Uuid,
) -> Result<Analysis, AnalyzeError> {
    let image = upload.encode().await?;
    info!(
        %request_id,
        file_name = %upload.file_name,
        mime_type = image.mime_type,
        image_bytes = image.byte_len,
        "Classifying uploaded image"
    );

    let record = state.classifier.classify(&image).await?;
    let stored = state.store.save(&record, &upload.bytes).await?;

    Ok(Analysis {
        request_id,
        record,
        stored,
        image,
    })
}
