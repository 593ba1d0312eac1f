//! Color It Daily LLM
//!
//! Provider abstractions for the three model-backed capabilities the
//! pipeline needs:
//!
//! - `LlmProvider` - structured-output chat completion, with and without an
//!   attached image (the critic "looks" at artifacts)
//! - `ImageModel` - opaque image generation (prompt in, PNG bytes out)
//! - `EmbeddingProvider` - text to fixed-dimension vector, with explicit
//!   query/document intent for asymmetric retrieval
//!
//! Every model response crosses a strict decode-and-validate boundary
//! (`decode_json`); malformed output is a distinct error kind, never
//! silently coerced. Transient provider errors are retried with exponential
//! backoff inside this crate, invisibly to pipeline logic.

pub mod embeddings;
pub mod gemini;
pub mod provider;
pub mod types;

pub use embeddings::{EmbeddingError, EmbeddingIntent, EmbeddingProvider, EmbeddingResult};
pub use gemini::{GeminiConfig, GeminiEmbeddingProvider, GeminiProvider};
pub use provider::{decode_json, ImageModel, LlmProvider};
pub use types::{ImageAttachment, LlmError, LlmResult};
