//! Pipeline Error Types
//!
//! Maps the run-level taxonomy onto the lower crates' errors: transient
//! provider errors are already retried inside `colorit-llm` and never reach
//! this layer; what does reach it is fatal to the run (generation,
//! optimization, missing tools) or expected control flow (quality rejection,
//! which the production loop bounds rather than raising).

use thiserror::Error;

use colorit_core::CoreError;
use colorit_llm::{EmbeddingError, LlmError};
use colorit_store::StoreError;

/// Errors surfaced by the production pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Ideation could not produce a sufficiently novel concept within the
    /// brainstorm attempt bound
    #[error("ideation failed: {0}")]
    Ideation(String),

    /// The image provider returned no usable image payload
    #[error("generation failed: {0}")]
    Generation(String),

    /// The vectorize/optimize transform failed
    #[error("optimization failed: {0}")]
    Optimization(String),

    /// A required external tool is absent; fails fast before artifact work
    #[error("missing dependency: {0}")]
    MissingDependency(String),

    /// The critique stage failed to produce a verdict
    #[error("critique failed: {0}")]
    Critique(String),

    /// Artifact storage failure
    #[error("artifact store error: {0}")]
    Artifact(String),

    /// LLM provider errors (post-retry)
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Embedding provider errors (post-retry)
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Concept store errors
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Domain validation errors
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// File system errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    pub fn ideation(msg: impl Into<String>) -> Self {
        Self::Ideation(msg.into())
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    pub fn optimization(msg: impl Into<String>) -> Self {
        Self::Optimization(msg.into())
    }

    pub fn missing_dependency(msg: impl Into<String>) -> Self {
        Self::MissingDependency(msg.into())
    }

    pub fn critique(msg: impl Into<String>) -> Self {
        Self::Critique(msg.into())
    }

    pub fn artifact(msg: impl Into<String>) -> Self {
        Self::Artifact(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
