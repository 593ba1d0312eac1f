//! Color It Daily Pipeline
//!
//! The daily production pipeline: a creative director proposes one novel
//! concept (calendar-aware, history-aware, de-duplicated against past
//! concepts by embedding similarity), then a bounded loop styles it, renders
//! it, and critiques it until an artifact passes quality review or the
//! retry budget runs out. Only passing artifacts are ever published.
//!
//! Stages share the `PipelineStage` shape from `colorit-core` and are
//! composed by an explicit driver (`ProductionLoop`, `Publisher`); there is
//! no stage hierarchy.

pub mod artifacts;
pub mod calendar;
pub mod critic;
pub mod error;
pub mod generator;
pub mod ideation;
pub mod observances;
pub mod production;
pub mod publisher;
pub mod stylist;

pub use artifacts::{ArtifactStore, LocalArtifactStore};
pub use calendar::{events, CalendarContext, Season};
pub use critic::{Critic, CritiqueInput, CritiqueOutcome};
pub use error::{PipelineError, PipelineResult};
pub use generator::{Generator, ImageOptimizer, PotraceOptimizer, CANVAS_HEIGHT, CANVAS_WIDTH};
pub use ideation::{CreativeDirector, IdeationConfig};
pub use production::{ProductionLoop, ProductionOutcome, DEFAULT_MAX_CYCLES};
pub use publisher::Publisher;
pub use stylist::{select_style, StyleRule, Stylist, StylingInput};
