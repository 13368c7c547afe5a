//! AI job-description extraction — the single point of entry for all model
//! calls in the service.
//!
//! Treated as an opaque collaborator: one request, one structured answer, no
//! retry. Callers decide how to degrade when it fails.

use axum::{extract::State, Json};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::errors::{ApiResponse, AppError};
use crate::state::AppState;

pub mod prompts;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const MODEL: &str = "gpt-4o-mini";
const TEMPERATURE: f32 = 0.2;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("model returned empty content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Structured fields pulled out of a free-text job description. Fields the
/// model cannot find come back as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedJobFields {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub seniority_level: String,
    #[serde(default)]
    pub employment_type: String,
    #[serde(default)]
    pub workplace_type: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub from_salary: String,
    #[serde(default)]
    pub to_salary: String,
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub compensation: String,
    #[serde(default)]
    pub job_description_ai: String,
    #[serde(default)]
    pub skills_required: Vec<String>,
}

/// Client for the extraction endpoint.
#[derive(Clone)]
pub struct ExtractorClient {
    client: Client,
    api_key: String,
}

impl ExtractorClient {
    pub fn new(api_key: String) -> Self {
        ExtractorClient {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    /// Extracts structured fields from `job_description`. Single attempt;
    /// the client's own timeout governs failure.
    pub async fn extract(&self, job_description: &str) -> Result<ExtractedJobFields, ExtractError> {
        let prompt =
            prompts::EXTRACT_PROMPT_TEMPLATE.replace("{job_description}", job_description);
        let request_body = ChatRequest {
            model: MODEL,
            temperature: TEMPERATURE,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompts::EXTRACT_SYSTEM,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
        };

        let response = self
            .client
            .post(OPENAI_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ExtractError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .ok_or(ExtractError::EmptyContent)?;

        debug!(chars = content.len(), "extraction response received");
        serde_json::from_str(strip_json_fences(content)).map_err(ExtractError::Parse)
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences the model sometimes
/// wraps its output in.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub job_description: String,
}

/// POST /api/v1/extract-job
pub async fn handle_extract(
    State(state): State<AppState>,
    Json(req): Json<ExtractRequest>,
) -> Result<Json<ApiResponse<ExtractedJobFields>>, AppError> {
    if req.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "Job description is required".to_string(),
        ));
    }
    let fields = state.extractor.extract(&req.job_description).await?;
    Ok(Json(ApiResponse::ok(fields)))
}
