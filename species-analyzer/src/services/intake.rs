//! Image intake
//!
//! Pulls the single image file out of a multipart upload, spools it to a
//! per-request temporary file and produces the base64 payload sent to the
//! inference API. Image content is not validated.

use std::io::Write;
use std::path::Path;

use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;
use tracing::debug;

/// Multipart field carrying the image
pub const IMAGE_FIELD: &str = "image";

/// Accepted file extensions (compared case-insensitively)
pub const ACCEPTED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Intake errors
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("No image file was uploaded")]
    MissingFile,

    #[error("Unsupported file type {0:?} (expected jpg, jpeg, png or webp)")]
    UnsupportedExtension(String),

    #[error("Only one image can be uploaded at a time")]
    TooManyFiles,

    #[error("Upload exceeds the size limit")]
    TooLarge,

    #[error("Malformed upload: {0}")]
    Multipart(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MultipartError> for IntakeError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            IntakeError::TooLarge
        } else {
            IntakeError::Multipart(err.body_text())
        }
    }
}

/// One uploaded image file
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Image ready for transport: MIME type plus base64 payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: &'static str,
    pub base64: String,
    pub byte_len: usize,
}

impl EncodedImage {
    /// `data:<mime>;base64,<payload>`
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Lower-cased extension of `file_name`, if any
pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

pub fn is_accepted_extension(file_name: &str) -> bool {
    extension_of(file_name)
        .map(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Read the image field from a multipart form
///
/// Returns `Ok(None)` when the form was submitted without a file; the
/// caller treats that as a no-op. Fields other than [`IMAGE_FIELD`] are
/// ignored.
pub async fn read_upload(multipart: &mut Multipart) -> Result<Option<ImageUpload>, IntakeError> {
    let mut upload: Option<ImageUpload> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;

        // Browsers send an empty part when no file was picked
        if file_name.is_empty() && bytes.is_empty() {
            continue;
        }

        if upload.is_some() {
            return Err(IntakeError::TooManyFiles);
        }

        if !is_accepted_extension(&file_name) {
            return Err(IntakeError::UnsupportedExtension(
                extension_of(&file_name).unwrap_or_default(),
            ));
        }

        if bytes.is_empty() {
            debug!(file_name = %file_name, "Ignoring empty upload");
            continue;
        }

        upload = Some(ImageUpload { file_name, bytes });
    }

    Ok(upload)
}

impl ImageUpload {
    /// MIME type sniffed from content, else derived from the extension
    pub fn mime_type(&self) -> &'static str {
        infer::get(&self.bytes)
            .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
            .map(|kind| kind.mime_type())
            .unwrap_or_else(|| match extension_of(&self.file_name).as_deref() {
                Some("png") => "image/png",
                Some("webp") => "image/webp",
                _ => "image/jpeg",
            })
    }

    /// Spool to a temporary file owned by this call and base64-encode it
    ///
    /// The temporary file is deleted when encoding finishes, so concurrent
    /// uploads never share a path.
    pub async fn encode(&self) -> Result<EncodedImage, IntakeError> {
        let bytes = self.bytes.clone();
        let base64 = tokio::task::spawn_blocking(move || spool_and_encode(&bytes))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;

        Ok(EncodedImage {
            mime_type: self.mime_type(),
            base64,
            byte_len: self.bytes.len(),
        })
    }
}

fn spool_and_encode(bytes: &[u8]) -> std::io::Result<String> {
    let mut spool = tempfile::Builder::new()
        .prefix("species-upload-")
        .tempfile()?;
    spool.write_all(bytes)?;
    spool.flush()?;

    let spooled = std::fs::read(spool.path())?;
    Ok(STANDARD.encode(spooled))
}
