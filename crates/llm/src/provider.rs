//! Provider Traits and the Decode Boundary
//!
//! `LlmProvider` covers chat-style completions (text, and text + image for
//! the critic). `ImageModel` covers opaque image generation. Both return raw
//! strings/bytes; structured output is obtained by passing the raw text
//! through `decode_json`, which is the single place model output is trusted
//! to become typed data.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::types::{ImageAttachment, LlmError, LlmResult};

/// Chat completion provider.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for identification and logging.
    fn name(&self) -> &'static str;

    /// The model in use.
    fn model(&self) -> &str;

    /// Send a system + user prompt and get the complete text response.
    async fn complete(&self, system: &str, user: &str) -> LlmResult<String>;

    /// Send a system + user prompt with an attached image and get the
    /// complete text response. Requires a multimodal model.
    async fn complete_with_image(
        &self,
        system: &str,
        user: &str,
        image: &ImageAttachment,
    ) -> LlmResult<String>;
}

/// Opaque image generation: prompts in, encoded image bytes out.
#[async_trait]
pub trait ImageModel: Send + Sync {
    /// The image model in use.
    fn model(&self) -> &str;

    /// Generate one image. Fails with `SafetyRejected` on provider/safety
    /// rejection and `MalformedResponse` when no image payload is returned.
    async fn generate(&self, positive_prompt: &str, negative_prompt: Option<&str>)
        -> LlmResult<Vec<u8>>;
}

/// Decode a model response into a typed value.
///
/// Models frequently wrap JSON in markdown code fences or surround it with
/// prose; this strips fences and trims to the outermost JSON object before
/// parsing. Anything that still fails to parse is a `MalformedResponse`.
pub fn decode_json<T: DeserializeOwned>(raw: &str) -> LlmResult<T> {
    let candidate = extract_json_object(raw)
        .ok_or_else(|| LlmError::malformed("no JSON object found in model response"))?;
    serde_json::from_str(candidate).map_err(|e| {
        LlmError::malformed(format!(
            "response does not match expected schema: {} (payload: {})",
            e,
            truncate(candidate, 200)
        ))
    })
}

/// Locate the outermost `{ ... }` span in the raw text.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
