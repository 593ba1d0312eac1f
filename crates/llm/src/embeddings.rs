//! Embedding Provider Abstraction
//!
//! Embedding is a distinct responsibility from chat completion, so it gets
//! its own trait rather than extending `LlmProvider`. The `EmbeddingIntent`
//! parameter distinguishes query-time from document-indexing-time embedding,
//! enabling asymmetric retrieval; the algorithm is the provider's concern.

use async_trait::async_trait;
use thiserror::Error;

/// Why the embedding is being computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingIntent {
    /// Searching: embedding a candidate description to query the index
    Query,
    /// Indexing: embedding a description being persisted
    Document,
}

impl EmbeddingIntent {
    /// The task-type string Gemini-family embedding APIs expect.
    pub fn task_type(&self) -> &'static str {
        match self {
            EmbeddingIntent::Query => "RETRIEVAL_QUERY",
            EmbeddingIntent::Document => "RETRIEVAL_DOCUMENT",
        }
    }
}

/// Errors from embedding operations.
#[derive(Error, Debug, Clone)]
pub enum EmbeddingError {
    #[error("authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("rate limited: {message}")]
    RateLimited { message: String },

    #[error("network error: {message}")]
    NetworkError { message: String },

    #[error("server error (HTTP {status:?}): {message}")]
    ServerError {
        message: String,
        status: Option<u16>,
    },

    #[error("parse error: {message}")]
    ParseError { message: String },

    #[error("invalid config: {message}")]
    InvalidConfig { message: String },
}

impl EmbeddingError {
    /// Whether this error is transient and the operation should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EmbeddingError::RateLimited { .. }
                | EmbeddingError::NetworkError { .. }
                | EmbeddingError::ServerError { .. }
        )
    }
}

/// Result alias for embedding operations.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Converts free text into a fixed-dimension vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Fixed output dimension of this provider.
    fn dimension(&self) -> usize;

    /// Embed one text with the given intent.
    async fn embed(&self, text: &str, intent: EmbeddingIntent) -> EmbeddingResult<Vec<f32>>;
}
