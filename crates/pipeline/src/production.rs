//! Production Loop
//!
//! The bounded retry state machine at the heart of the pipeline:
//!
//! ```text
//! Styling -> Rendering -> Critiquing -> { Published | Retrying | Exhausted }
//! ```
//!
//! Each cycle styles the same immutable concept (feedback from cycle *i* is
//! visible only to the styling of cycle *i+1*), renders exactly one
//! artifact, and critiques exactly that artifact. A PASS terminates the
//! loop; a REJECT retries until the cycle bound is reached, at which point
//! the exhaustion is reported with the last feedback attached. Generation
//! and optimization errors abort the whole run.

use std::sync::Arc;

use tracing::{info, warn};

use colorit_core::models::{Concept, ProductionRecord, RenderedArtifact, StyledPrompt};
use colorit_core::stage::PipelineStage;

use crate::critic::{CritiqueInput, CritiqueOutcome};
use crate::error::{PipelineError, PipelineResult};
use crate::stylist::StylingInput;

/// Default cycle bound: the initial attempt plus one feedback-driven retry.
pub const DEFAULT_MAX_CYCLES: usize = 2;

pub type StylingStage =
    Arc<dyn PipelineStage<Input = StylingInput, Output = StyledPrompt, Error = PipelineError>>;
pub type RenderingStage =
    Arc<dyn PipelineStage<Input = StyledPrompt, Output = RenderedArtifact, Error = PipelineError>>;
pub type CritiqueStage =
    Arc<dyn PipelineStage<Input = CritiqueInput, Output = CritiqueOutcome, Error = PipelineError>>;

/// Terminal result of a production run.
#[derive(Debug, Clone)]
pub enum ProductionOutcome {
    /// Some cycle passed critique; the record was published by the critic.
    Published(ProductionRecord),
    /// Every cycle was rejected. Nothing was published.
    Exhausted {
        cycles: usize,
        last_feedback: String,
    },
}

impl ProductionOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, ProductionOutcome::Published(_))
    }
}

/// One state of the loop. Data the next transition needs rides along.
enum LoopState {
    Styling {
        cycle: usize,
        feedback: Option<String>,
    },
    Rendering {
        cycle: usize,
        styled: StyledPrompt,
    },
    Critiquing {
        cycle: usize,
        styled: StyledPrompt,
        artifact: RenderedArtifact,
    },
}

/// Drives the Styling -> Rendering -> Critiquing cycle to a terminal state.
pub struct ProductionLoop {
    stylist: StylingStage,
    generator: RenderingStage,
    critic: CritiqueStage,
    max_cycles: usize,
}

impl ProductionLoop {
    pub fn new(stylist: StylingStage, generator: RenderingStage, critic: CritiqueStage) -> Self {
        Self {
            stylist,
            generator,
            critic,
            max_cycles: DEFAULT_MAX_CYCLES,
        }
    }

    pub fn with_max_cycles(mut self, max_cycles: usize) -> Self {
        self.max_cycles = max_cycles.max(1);
        self
    }

    /// Verify every stage's external dependencies before any work begins.
    pub async fn preflight(&self) -> PipelineResult<()> {
        self.stylist.preflight().await?;
        self.generator.preflight().await?;
        self.critic.preflight().await?;
        Ok(())
    }

    /// Run the loop for one concept.
    pub async fn run(&self, concept: Concept) -> PipelineResult<ProductionOutcome> {
        let mut state = LoopState::Styling {
            cycle: 1,
            feedback: None,
        };

        loop {
            state = match state {
                LoopState::Styling { cycle, feedback } => {
                    info!(cycle, max = self.max_cycles, "styling");
                    let input = match feedback {
                        None => StylingInput::initial(concept.clone()),
                        Some(f) => StylingInput::with_feedback(concept.clone(), f),
                    };
                    let styled = self.stylist.run(input).await?;
                    LoopState::Rendering { cycle, styled }
                }

                LoopState::Rendering { cycle, styled } => {
                    info!(cycle, "rendering");
                    let artifact = self.generator.run(styled.clone()).await?;
                    LoopState::Critiquing {
                        cycle,
                        styled,
                        artifact,
                    }
                }

                LoopState::Critiquing {
                    cycle,
                    styled,
                    artifact,
                } => {
                    info!(cycle, "critiquing");
                    let outcome = self.critic.run(CritiqueInput { styled, artifact }).await?;

                    if outcome.result.is_pass() {
                        let record = outcome.record.ok_or_else(|| {
                            PipelineError::internal(
                                "critique passed but produced no published record",
                            )
                        })?;
                        info!(cycle, id = %record.id, "run published");
                        return Ok(ProductionOutcome::Published(record));
                    }

                    let feedback = outcome.result.feedback;
                    if cycle < self.max_cycles {
                        warn!(cycle, %feedback, "rejected, retrying");
                        LoopState::Styling {
                            cycle: cycle + 1,
                            feedback: Some(feedback),
                        }
                    } else {
                        warn!(cycle, %feedback, "rejected, retries exhausted");
                        return Ok(ProductionOutcome::Exhausted {
                            cycles: cycle,
                            last_feedback: feedback,
                        });
                    }
                }
            };
        }
    }
}
