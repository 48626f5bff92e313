//! Google Gemini `generateContent` client

use std::fmt;

use faultscope_core::{GenerationConfig, ModelClient, ModelError, ResponseFormat};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    api_key: SecretString,
    http: Client,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl GeminiClient {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            base_url: GEMINI_BASE_URL.to_string(),
            api_key,
            http: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    fn generate_url(&self, model: &str) -> String {
        let model = model.trim();
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model.strip_prefix("models/").unwrap_or(model)
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfigBody,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfigBody {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

impl From<&GenerationConfig> for GenerationConfigBody {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            response_mime_type: match config.response_format {
                ResponseFormat::Json => Some("application/json"),
                ResponseFormat::Text => None,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorResponse {
    error: GoogleErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

fn is_blocked_finish_reason(reason: &str) -> bool {
    matches!(
        reason,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII"
    )
}

/// Maps a non-success HTTP answer onto the fallback taxonomy.
fn classify_status(status: StatusCode, body: &str) -> ModelError {
    let detail = serde_json::from_str::<GoogleErrorResponse>(body)
        .ok()
        .map(|response| response.error);
    let provider_status = detail
        .as_ref()
        .and_then(|detail| detail.status.clone())
        .unwrap_or_default();
    let message = match detail {
        Some(detail) => format!("HTTP {}: {}", status.as_u16(), detail.message),
        None => format!("HTTP {}: {}", status.as_u16(), body.trim()),
    };

    if status == StatusCode::TOO_MANY_REQUESTS || provider_status == "RESOURCE_EXHAUSTED" {
        ModelError::RateLimited(message)
    } else if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        // Unknown or retired revision: the next model may still exist.
        || status == StatusCode::NOT_FOUND
        || provider_status == "NOT_FOUND"
    {
        ModelError::Transient(message)
    } else {
        ModelError::Fatal(message)
    }
}

fn classify_transport(err: reqwest::Error) -> ModelError {
    let err = err.without_url();
    if err.is_builder() {
        ModelError::Fatal(err.to_string())
    } else {
        ModelError::Transient(err.to_string())
    }
}

fn candidate_text(response: GenerateContentResponse) -> Result<String, ModelError> {
    let Some(candidate) = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
    else {
        return match response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
        {
            Some(reason) => Err(ModelError::Fatal(format!("Prompt blocked: {reason}"))),
            None => Err(ModelError::Transient(
                "No candidates in response".to_string(),
            )),
        };
    };

    let text = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if !text.trim().is_empty() {
        return Ok(text);
    }

    match candidate.finish_reason {
        Some(reason) if is_blocked_finish_reason(&reason) => Err(ModelError::Fatal(format!(
            "Generation blocked: {reason}"
        ))),
        _ => Err(ModelError::Transient("Empty response text".to_string())),
    }
}

#[async_trait::async_trait]
impl ModelClient for GeminiClient {
    async fn invoke(
        &self,
        model: &str,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, ModelError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![TextPart { text: prompt }],
            }],
            generation_config: config.into(),
        };

        tracing::debug!(model = %model, prompt_chars = prompt.len(), "calling gemini");

        let response = self
            .http
            .post(self.generate_url(model))
            .header(API_KEY_HEADER, self.api_key.expose_secret().as_str())
            .json(&request)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_transport)?;
        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        let response = serde_json::from_str::<GenerateContentResponse>(&body).map_err(|err| {
            ModelError::Transient(format!("Unreadable response body: {err}"))
        })?;

        candidate_text(response)
    }
}
