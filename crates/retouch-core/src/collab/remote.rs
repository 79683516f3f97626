//! Gemini-style `generateContent` client for image edits and suggestions.
//!
//! Transport is blocking `reqwest`; the editor already runs collaborator
//! calls on worker threads. Errors are classified into the four
//! [`CollaboratorError`] categories, and transient failures (429, 5xx,
//! transport) are retried with exponential backoff.

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::ModelConfig;
use crate::consts::RETRY_BASE_DELAY_MS;

use super::{
    parse_suggestions, CollaboratorError, EditRequest, EditResponse, ImageEditModel,
    SuggestionModel, SuggestionRequest,
};

const SUGGESTION_INSTRUCTION: &str = "Suggest three short, concrete edit instructions for this \
     image, each under ten words. Respond only with a JSON array of strings.";

/// Finish reasons that mean the output was withheld for safety.
const BLOCKED_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "IMAGE_SAFETY",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
    "RECITATION",
];

pub struct GeminiClient {
    http: Client,
    config: ModelConfig,
}

impl GeminiClient {
    pub fn new(config: ModelConfig) -> Result<Self, CollaboratorError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CollaboratorError::InvalidConfiguration(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn api_key(&self) -> Result<String, CollaboratorError> {
        match std::env::var(&self.config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(CollaboratorError::InvalidConfiguration(format!(
                "API key missing: set {}",
                self.config.api_key_env
            ))),
        }
    }

    fn generate(&self, model: &str, body: &Value) -> Result<Value, CollaboratorError> {
        let key = self.api_key()?;
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            model
        );

        let mut attempt = 0;
        loop {
            match self.send_once(&url, &key, body) {
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    let delay = backoff(attempt);
                    debug!(
                        "Model request failed ({e}), retry {}/{} after {delay:?}",
                        attempt + 1,
                        self.config.max_retries
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    fn send_once(&self, url: &str, key: &str, body: &Value) -> Result<Value, CollaboratorError> {
        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", key)
            .json(body)
            .send()
            .map_err(|e| CollaboratorError::Transport(classify_transport(&e)))?;

        let status = resp.status();
        if !status.is_success() {
            // Gateways often answer errors with HTML or an empty body.
            let payload = resp.json::<Value>().unwrap_or(Value::Null);
            return Err(classify_status(status.as_u16(), &payload));
        }
        resp.json()
            .map_err(|e| CollaboratorError::MalformedResponse(format!("invalid JSON: {e}")))
    }
}

impl ImageEditModel for GeminiClient {
    fn edit(&self, request: &EditRequest) -> Result<EditResponse, CollaboratorError> {
        let body = json!({
            "contents": [{
                "parts": [
                    { "inline_data": { "mime_type": request.media_type, "data": request.image_base64 } },
                    { "text": request.instruction },
                ]
            }],
            "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] },
        });
        let payload = self.generate(&self.config.edit_model, &body)?;
        extract_image(&payload)
    }
}

impl SuggestionModel for GeminiClient {
    fn suggest(&self, request: &SuggestionRequest) -> Result<Vec<String>, CollaboratorError> {
        let body = json!({
            "contents": [{
                "parts": [
                    { "inline_data": { "mime_type": request.media_type, "data": request.image_base64 } },
                    { "text": SUGGESTION_INSTRUCTION },
                ]
            }],
            "generationConfig": { "responseMimeType": "application/json" },
        });
        let payload = self.generate(&self.config.suggestion_model, &body)?;
        let text = first_parts(&payload)?
            .iter()
            .find_map(|part| part.get("text").and_then(Value::as_str))
            .ok_or_else(|| CollaboratorError::MalformedResponse("no text in response".into()))?;
        let value: Value = serde_json::from_str(strip_code_fence(text)).map_err(|_| {
            CollaboratorError::MalformedResponse("response was not a sequence of strings".into())
        })?;
        parse_suggestions(&value)
    }
}

/// Pull the first inline image out of a `generateContent` response.
pub fn extract_image(payload: &Value) -> Result<EditResponse, CollaboratorError> {
    let parts = first_parts(payload)?;
    for part in parts {
        let inline = part.get("inlineData").or_else(|| part.get("inline_data"));
        if let Some(inline) = inline {
            let data = inline.get("data").and_then(Value::as_str);
            let media_type = inline
                .get("mimeType")
                .or_else(|| inline.get("mime_type"))
                .and_then(Value::as_str);
            if let (Some(data), Some(media_type)) = (data, media_type) {
                if media_type.trim().is_empty() {
                    return Err(CollaboratorError::MalformedResponse(
                        "returned image has no media type".into(),
                    ));
                }
                return Ok(EditResponse {
                    image_base64: data.to_string(),
                    media_type: media_type.to_string(),
                });
            }
        }
    }

    // A text-only answer usually explains a refusal; surface it.
    let text: Vec<&str> = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    let detail = if text.is_empty() {
        "no image was returned".to_string()
    } else {
        format!("no image was returned: {}", text.join(" "))
    };
    Err(CollaboratorError::MalformedResponse(detail))
}

/// Parts of the first candidate, after checking for safety blocks.
fn first_parts(payload: &Value) -> Result<&Vec<Value>, CollaboratorError> {
    if let Some(reason) = payload
        .pointer("/promptFeedback/blockReason")
        .and_then(Value::as_str)
    {
        return Err(CollaboratorError::PolicyRejection(format!(
            "prompt blocked ({reason})"
        )));
    }

    let candidate = payload
        .pointer("/candidates/0")
        .ok_or_else(|| CollaboratorError::MalformedResponse("no candidates returned".into()))?;

    if let Some(reason) = candidate.get("finishReason").and_then(Value::as_str) {
        if BLOCKED_FINISH_REASONS.contains(&reason) {
            return Err(CollaboratorError::PolicyRejection(format!(
                "output blocked ({reason})"
            )));
        }
    }

    candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| CollaboratorError::MalformedResponse("candidate has no content".into()))
}

/// Map a non-2xx response to an error category.
pub fn classify_status(status: u16, payload: &Value) -> CollaboratorError {
    let message = payload
        .pointer("/error/message")
        .and_then(Value::as_str)
        .unwrap_or("request failed")
        .to_string();
    let detail = format!("HTTP {status}: {message}");
    let lower = message.to_lowercase();

    match status {
        401 | 403 | 404 => CollaboratorError::InvalidConfiguration(detail),
        400 if lower.contains("api key") || lower.contains("credential") => {
            CollaboratorError::InvalidConfiguration(detail)
        }
        400 if lower.contains("safety") || lower.contains("policy") => {
            CollaboratorError::PolicyRejection(detail)
        }
        429 | 500..=599 => CollaboratorError::Transport(detail),
        _ => {
            warn!(status, "Unclassified model error");
            CollaboratorError::MalformedResponse(detail)
        }
    }
}

fn classify_transport(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timed out: {error}")
    } else if error.is_connect() {
        format!("connection failed: {error}")
    } else {
        error.to_string()
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(RETRY_BASE_DELAY_MS.saturating_mul(1 << attempt.min(6)))
}

/// Models sometimes wrap JSON in a Markdown code fence.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}
