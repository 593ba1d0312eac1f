//! Color It Daily Core
//!
//! Foundation crate for the Color It Daily production pipeline:
//!
//! - `error` - Core error types shared across the workspace
//! - `models` - Domain models (Concept, StyledPrompt, ProductionRecord, ...)
//! - `stage` - The uniform `PipelineStage` trait that all pipeline stages implement
//!
//! This crate is intentionally lightweight (serde + thiserror + chrono only)
//! so that every other workspace member can depend on it.

pub mod error;
pub mod models;
pub mod stage;

pub use error::{CoreError, CoreResult};
pub use models::{
    CompositionStrategy, Concept, CritiqueResult, CritiqueStatus, HistoryEntry, HistorySummary,
    ProductionRecord, RenderedArtifact, StyledPrompt,
};
pub use stage::PipelineStage;
