//! LLM Provider Types
//!
//! Error taxonomy and shared request/response types for LLM providers.

use thiserror::Error;

/// Errors returned by LLM and image-generation providers.
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    /// Authentication failed (invalid or missing API key)
    #[error("authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// The requested model was not found or is not available
    #[error("model not found: {model}")]
    ModelNotFound { model: String },

    /// Rate limit exceeded
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<u32>,
    },

    /// The provider rejected the request (4xx other than auth/rate)
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// The provider returned a 5xx error
    #[error("server error (HTTP {status:?}): {message}")]
    ServerError {
        message: String,
        status: Option<u16>,
    },

    /// Network/connection failure
    #[error("network error: {message}")]
    NetworkError { message: String },

    /// The provider blocked the request or response on safety grounds
    #[error("safety rejection: {message}")]
    SafetyRejected { message: String },

    /// The model produced output that does not match the expected schema.
    /// Never coerced; callers decide whether to re-prompt or fail.
    #[error("malformed model response: {message}")]
    MalformedResponse { message: String },

    /// Any other error
    #[error("{message}")]
    Other { message: String },
}

/// Result alias for LLM operations.
pub type LlmResult<T> = Result<T, LlmError>;

impl LlmError {
    /// Whether the operation should be retried with backoff.
    ///
    /// Only transport-level failures are retryable; safety rejections and
    /// malformed responses are not transient.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited { .. }
                | LlmError::ServerError { .. }
                | LlmError::NetworkError { .. }
        )
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        LlmError::MalformedResponse {
            message: msg.into(),
        }
    }

    pub fn network(msg: impl Into<String>) -> Self {
        LlmError::NetworkError {
            message: msg.into(),
        }
    }

    pub fn other(msg: impl Into<String>) -> Self {
        LlmError::Other {
            message: msg.into(),
        }
    }
}

/// Map an HTTP error status to an `LlmError`.
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 | 403 => LlmError::AuthenticationFailed {
            message: format!("{}: HTTP {}: {}", provider, status, body),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("{}: HTTP {}: {}", provider, status, body),
        },
    }
}

/// An image handed to a multimodal completion call.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    /// MIME type, e.g. "image/png"
    pub mime_type: String,
    /// Raw image bytes (base64-encoded at the wire boundary)
    pub data: Vec<u8>,
}

impl ImageAttachment {
    pub fn png(data: Vec<u8>) -> Self {
        Self {
            mime_type: "image/png".to_string(),
            data,
        }
    }
}
