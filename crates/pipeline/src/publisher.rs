//! Publisher
//!
//! Top-level composition of one daily run: preflight every stage (a missing
//! external tool fails the run before any model call or artifact work),
//! ideate once, then drive the production loop. Nothing flows back into
//! ideation within a run.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use colorit_core::models::Concept;
use colorit_core::stage::PipelineStage;

use crate::error::{PipelineError, PipelineResult};
use crate::production::{ProductionLoop, ProductionOutcome};

pub type IdeationStage =
    Arc<dyn PipelineStage<Input = NaiveDate, Output = Concept, Error = PipelineError>>;

pub struct Publisher {
    ideation: IdeationStage,
    production: ProductionLoop,
}

impl Publisher {
    pub fn new(ideation: IdeationStage, production: ProductionLoop) -> Self {
        Self {
            ideation,
            production,
        }
    }

    /// Execute one full daily run.
    pub async fn run(&self, date: NaiveDate) -> PipelineResult<ProductionOutcome> {
        self.ideation.preflight().await?;
        self.production.preflight().await?;

        info!(%date, "starting daily production run");
        let concept = self.ideation.run(date).await?;
        info!(title = %concept.title, strategy = %concept.composition_strategy, "concept selected");

        let outcome = self.production.run(concept).await?;
        match &outcome {
            ProductionOutcome::Published(record) => {
                info!(id = %record.id, title = %record.title, "daily run published");
            }
            ProductionOutcome::Exhausted {
                cycles,
                last_feedback,
            } => {
                info!(cycles, %last_feedback, "daily run exhausted without a publish");
            }
        }
        Ok(outcome)
    }
}
