//! Gemini Provider
//!
//! Implements `LlmProvider`, `ImageModel`, and `EmbeddingProvider` against
//! the Gemini REST API (`generateContent` / `embedContent`).
//!
//! ## Endpoints
//!
//! - POST `{base}/models/{model}:generateContent` - chat completion; image
//!   generation uses the same endpoint with `responseModalities: ["IMAGE"]`
//! - POST `{base}/models/{model}:embedContent` - text embedding with
//!   explicit `taskType` and `outputDimensionality`
//!
//! Transient failures (429, 5xx, connection errors) are retried with
//! exponential backoff; safety blocks and schema mismatches are surfaced
//! immediately.

use std::time::Duration;

use async_trait::async_trait;
use backoff::ExponentialBackoff;
use base64::Engine;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::embeddings::{EmbeddingError, EmbeddingIntent, EmbeddingProvider, EmbeddingResult};
use crate::provider::{ImageModel, LlmProvider};
use crate::types::{parse_http_error, ImageAttachment, LlmError, LlmResult};

/// Default Gemini API base URL.
const GEMINI_DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Overall per-call retry budget.
const RETRY_BUDGET: Duration = Duration::from_secs(60);

/// HTTP timeout for a single request. Image generation is slow.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Finish reasons that indicate a provider-side safety block.
const SAFETY_FINISH_REASONS: &[&str] = &["SAFETY", "PROHIBITED_CONTENT", "IMAGE_SAFETY"];

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Configuration for the Gemini providers.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    /// Override for testing; defaults to the public API.
    pub base_url: Option<String>,
    /// Chat/critique model, e.g. "gemini-2.0-flash"
    pub model: String,
    /// Image generation model, e.g. "gemini-2.5-flash-image"
    pub image_model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl GeminiConfig {
    fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(GEMINI_DEFAULT_BASE_URL)
    }
}

fn retry_policy() -> ExponentialBackoff {
    ExponentialBackoff {
        max_elapsed_time: Some(RETRY_BUDGET),
        ..ExponentialBackoff::default()
    }
}

fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[allow(dead_code)]
    mime_type: Option<String>,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

impl GenerateContentResponse {
    /// Surface a provider-side safety block, if any.
    fn safety_block(&self) -> Option<String> {
        if let Some(feedback) = &self.prompt_feedback {
            if let Some(reason) = &feedback.block_reason {
                return Some(format!("prompt blocked: {}", reason));
            }
        }
        for candidate in &self.candidates {
            if let Some(reason) = &candidate.finish_reason {
                if SAFETY_FINISH_REASONS.contains(&reason.as_str()) {
                    return Some(format!("response blocked: {}", reason));
                }
            }
        }
        None
    }

    /// Concatenated text of the first candidate.
    fn text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let parts = &candidate.content.as_ref()?.parts;
        let text: String = parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("");
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Base64 payload of the first inline image part, if any.
    fn inline_image(&self) -> Option<&str> {
        let candidate = self.candidates.first()?;
        candidate
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|p| p.inline_data.as_ref().map(|d| d.data.as_str()))
    }
}

// ---------------------------------------------------------------------------
// GeminiProvider (chat + image generation)
// ---------------------------------------------------------------------------

/// Gemini chat-completion and image-generation provider.
pub struct GeminiProvider {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            client: build_client(),
        }
    }

    fn generate_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url(),
            model
        )
    }

    /// POST `body` to `url` once; no retry.
    async fn post_once(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> LlmResult<GenerateContentResponse> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(parse_http_error(status.as_u16(), &text, "gemini"));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| LlmError::malformed(format!("invalid generateContent body: {}", e)))?;

        if let Some(reason) = parsed.safety_block() {
            return Err(LlmError::SafetyRejected { message: reason });
        }
        Ok(parsed)
    }

    /// POST with exponential backoff on transient errors.
    async fn post_with_retry(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> LlmResult<GenerateContentResponse> {
        backoff::future::retry_notify(
            retry_policy(),
            || async {
                self.post_once(url, &body).await.map_err(|e| {
                    if e.is_retryable() {
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
            },
            |err, delay: Duration| {
                warn!(error = %err, delay_ms = delay.as_millis() as u64, "retrying gemini call");
            },
        )
        .await
    }

    fn completion_body(
        &self,
        system: &str,
        user: &str,
        image: Option<&ImageAttachment>,
    ) -> serde_json::Value {
        let mut parts = vec![serde_json::json!({ "text": user })];
        if let Some(image) = image {
            let encoded = base64::engine::general_purpose::STANDARD.encode(&image.data);
            parts.push(serde_json::json!({
                "inlineData": {
                    "mimeType": image.mime_type,
                    "data": encoded,
                }
            }));
        }
        serde_json::json!({
            "systemInstruction": { "parts": [{ "text": system }] },
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "temperature": self.config.temperature,
                "maxOutputTokens": self.config.max_output_tokens,
            },
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, system: &str, user: &str) -> LlmResult<String> {
        let url = self.generate_url(&self.config.model);
        let body = self.completion_body(system, user, None);
        debug!(model = %self.config.model, "gemini completion request");
        let response = self.post_with_retry(&url, body).await?;
        response
            .text()
            .ok_or_else(|| LlmError::malformed("no text in completion response"))
    }

    async fn complete_with_image(
        &self,
        system: &str,
        user: &str,
        image: &ImageAttachment,
    ) -> LlmResult<String> {
        let url = self.generate_url(&self.config.model);
        let body = self.completion_body(system, user, Some(image));
        debug!(model = %self.config.model, image_bytes = image.data.len(), "gemini multimodal request");
        let response = self.post_with_retry(&url, body).await?;
        response
            .text()
            .ok_or_else(|| LlmError::malformed("no text in multimodal response"))
    }
}

#[async_trait]
impl ImageModel for GeminiProvider {
    fn model(&self) -> &str {
        &self.config.image_model
    }

    async fn generate(
        &self,
        positive_prompt: &str,
        negative_prompt: Option<&str>,
    ) -> LlmResult<Vec<u8>> {
        // The generateContent image API has no separate negative-prompt
        // field; it is carried as an instruction in the text prompt.
        let full_prompt = match negative_prompt {
            Some(negative) if !negative.is_empty() => {
                format!("{}\n\nNegative prompt: {}", positive_prompt, negative)
            }
            _ => positive_prompt.to_string(),
        };

        let url = self.generate_url(&self.config.image_model);
        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": full_prompt }] }],
            "generationConfig": {
                "responseModalities": ["IMAGE"],
            },
        });

        debug!(model = %self.config.image_model, "gemini image generation request");
        let response = self.post_with_retry(&url, body).await?;
        let encoded = response
            .inline_image()
            .ok_or_else(|| LlmError::malformed("no image payload in response"))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| LlmError::malformed(format!("invalid base64 image payload: {}", e)))
    }
}

// ---------------------------------------------------------------------------
// GeminiEmbeddingProvider
// ---------------------------------------------------------------------------

/// Gemini text embedding provider.
///
/// The dimension is fixed at construction time and sent explicitly in every
/// request via `outputDimensionality`.
pub struct GeminiEmbeddingProvider {
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
    client: reqwest::Client,
}

impl GeminiEmbeddingProvider {
    pub fn new(api_key: String, model: String, dimension: usize) -> Self {
        Self {
            api_key,
            base_url: GEMINI_DEFAULT_BASE_URL.to_string(),
            model,
            dimension,
            client: build_client(),
        }
    }

    /// Override the base URL (for tests against a local stub).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn embed_url(&self) -> String {
        format!("{}/models/{}:embedContent", self.base_url, self.model)
    }

    fn request_body(&self, text: &str, intent: EmbeddingIntent) -> serde_json::Value {
        let mut body = serde_json::json!({
            "content": { "parts": [{ "text": text }] },
            "taskType": intent.task_type(),
            "outputDimensionality": self.dimension,
        });
        // Titles are only meaningful for document-intent embeddings.
        if intent == EmbeddingIntent::Document {
            body["title"] = serde_json::json!("Coloring Page Concept");
        }
        body
    }

    async fn embed_once(&self, body: &serde_json::Value) -> EmbeddingResult<Vec<f32>> {
        let response = self
            .client
            .post(self.embed_url())
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| EmbeddingError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => EmbeddingError::AuthenticationFailed { message: text },
                429 => EmbeddingError::RateLimited { message: text },
                code @ 500..=599 => EmbeddingError::ServerError {
                    message: text,
                    status: Some(code),
                },
                code => EmbeddingError::ServerError {
                    message: text,
                    status: Some(code),
                },
            });
        }

        let parsed: EmbedContentResponse =
            response.json().await.map_err(|e| EmbeddingError::ParseError {
                message: format!("invalid embedContent body: {}", e),
            })?;

        if parsed.embedding.values.len() != self.dimension {
            return Err(EmbeddingError::ParseError {
                message: format!(
                    "expected {}-dimensional vector, got {}",
                    self.dimension,
                    parsed.embedding.values.len()
                ),
            });
        }
        Ok(parsed.embedding.values)
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str, intent: EmbeddingIntent) -> EmbeddingResult<Vec<f32>> {
        let body = self.request_body(text, intent);
        backoff::future::retry_notify(
            retry_policy(),
            || async {
                self.embed_once(&body).await.map_err(|e| {
                    if e.is_retryable() {
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
            },
            |err, delay: Duration| {
                warn!(error = %err, delay_ms = delay.as_millis() as u64, "retrying gemini embedding call");
            },
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
