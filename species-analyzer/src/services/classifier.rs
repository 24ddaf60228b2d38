//! Species classifier client
//!
//! Sends one image to an OpenAI-compatible chat-completions endpoint with a
//! strict `json_schema` response format and turns the reply into a validated
//! [`SpeciesRecord`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use species_common::species::SCHEMA_NAME;
use species_common::SpeciesRecord;
use thiserror::Error;

use crate::services::intake::EncodedImage;

pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-2024-08-06";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const SYSTEM_PROMPT: &str = "Extract the event information.";
pub const USER_PROMPT: &str = "What's in this image?";
const USER_AGENT: &str = concat!("species-lens/", env!("CARGO_PKG_VERSION"));

/// Classifier errors
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Inference API rejected the credentials (HTTP {0})")]
    Auth(u16),

    #[error("Inference API error {0}: {1}")]
    Api(u16, String),

    #[error("Model refused the request: {0}")]
    Refused(String),

    #[error("Response does not match the species schema: {0}")]
    Schema(String),
}

/// Turns an encoded image into a species record
#[async_trait]
pub trait SpeciesClassifier: Send + Sync {
    async fn classify(&self, image: &EncodedImage) -> Result<SpeciesRecord, ClassifyError>;
}

/// Connection settings for [`OpenAiClassifier`]
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl ClassifierConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_API_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
pub struct JsonSchemaFormat {
    pub name: &'static str,
    pub strict: bool,
    pub schema: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Build the chat-completions request for one image
pub fn build_request(model: &str, image: &EncodedImage) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage {
                role: "system",
                content: MessageContent::Text(SYSTEM_PROMPT.to_string()),
            },
            ChatMessage {
                role: "user",
                content: MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: USER_PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image.data_url(),
                        },
                    },
                ]),
            },
        ],
        response_format: ResponseFormat {
            kind: "json_schema",
            json_schema: JsonSchemaFormat {
                name: SCHEMA_NAME,
                strict: true,
                schema: SpeciesRecord::json_schema(),
            },
        },
    }
}

/// Extract and validate the record from a successful completion body
pub fn parse_completion(body: &str) -> Result<SpeciesRecord, ClassifyError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ClassifyError::Schema(format!("unreadable completion: {}", e)))?;

    let message = response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| ClassifyError::Schema("completion has no choices".to_string()))?;

    if let Some(refusal) = message.refusal.filter(|r| !r.trim().is_empty()) {
        return Err(ClassifyError::Refused(refusal));
    }

    let content = message
        .content
        .ok_or_else(|| ClassifyError::Schema("completion has no content".to_string()))?;

    let record: SpeciesRecord =
        serde_json::from_str(&content).map_err(|e| ClassifyError::Schema(e.to_string()))?;
    record
        .validate()
        .map_err(|e| ClassifyError::Schema(e.to_string()))?;

    Ok(record)
}

/// Map a non-success response to an error
fn api_error(status: StatusCode, body: &str) -> ClassifyError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return ClassifyError::Auth(status.as_u16());
    }

    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    ClassifyError::Api(status.as_u16(), message)
}

/// OpenAI-compatible structured-output client
pub struct OpenAiClassifier {
    http_client: reqwest::Client,
    config: ClassifierConfig,
}

impl OpenAiClassifier {
    pub fn new(config: ClassifierConfig) -> Result<Self, ClassifyError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClassifyError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl SpeciesClassifier for OpenAiClassifier {
    async fn classify(&self, image: &EncodedImage) -> Result<SpeciesRecord, ClassifyError> {
        let request = build_request(&self.config.model, image);

        tracing::debug!(
            model = %self.config.model,
            mime_type = image.mime_type,
            image_bytes = image.byte_len,
            "Querying inference API"
        );

        let response = self
            .http_client
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassifyError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClassifyError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        let record = parse_completion(&body)?;

        tracing::info!(
            common_name = %record.common_name,
            binomial = %record.binomial,
            "Inference API classification successful"
        );

        Ok(record)
    }
}
