//! Critique Stage
//!
//! The final gatekeeper. Inspects the optimized artifact with a multimodal
//! completion against a fixed four-point rubric (safety, line quality,
//! composition match, complexity). On PASS it embeds the description with
//! document intent, assembles the production record, and publishes it to the
//! concept store before returning; on REJECT nothing is ever persisted.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use colorit_core::models::{
    CritiqueResult, CritiqueStatus, ProductionRecord, RenderedArtifact, StyledPrompt,
};
use colorit_core::stage::PipelineStage;
use colorit_llm::{decode_json, EmbeddingIntent, EmbeddingProvider, ImageAttachment, LlmProvider};
use colorit_store::ConceptStore;

use crate::error::PipelineResult;

const CRITIC_SYSTEM_PROMPT: &str = r#"You are The Critic, a strict quality assurance specialist for "Color It Daily", a premium children's coloring page publisher. Inspect the attached coloring page image against four checks. ALL must pass:

A. Safety: strictly G-rated. No scary, violent, suggestive, political, or religious content. Safe for a 3-year-old.
B. Line quality: pure, crisp black line art. No broken lines, faint strokes, grayscale shading, gradients, or filled-in black areas.
C. Composition: the image must match the given description. If the tags include "sticker", the background must be clean. If the tags include "collection", the items must be isolated and never touch.
D. Complexity: every detail must be large enough to color with a crayon.

If any check fails, set status to "REJECT" with specific, actionable feedback ("The cat's tail is cut off", never "It's bad"). If all pass, set status to "PASS".

Respond with ONLY a JSON object: {"status": "PASS" | "REJECT", "feedback": "reason or praise"}"#;

#[derive(Debug, Deserialize)]
struct VerdictWire {
    status: CritiqueStatus,
    feedback: String,
}

/// Input to the critique stage: the prompt that produced the artifact and
/// the artifact itself, from the same iteration.
#[derive(Debug, Clone)]
pub struct CritiqueInput {
    pub styled: StyledPrompt,
    pub artifact: RenderedArtifact,
}

/// What the critique stage hands back to the loop: the verdict, and the
/// published record when the verdict was PASS.
#[derive(Debug, Clone)]
pub struct CritiqueOutcome {
    pub result: CritiqueResult,
    pub record: Option<ProductionRecord>,
}

/// The critique stage.
pub struct Critic {
    llm: Arc<dyn LlmProvider>,
    embeddings: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn ConceptStore>,
    artifacts: Arc<dyn crate::artifacts::ArtifactStore>,
}

impl Critic {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        embeddings: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn ConceptStore>,
        artifacts: Arc<dyn crate::artifacts::ArtifactStore>,
    ) -> Self {
        Self {
            llm,
            embeddings,
            store,
            artifacts,
        }
    }

    fn review_prompt(&self, styled: &StyledPrompt) -> String {
        format!(
            "Title: {}\nDescription: {}\nTags: {}\nMood: {}\nAudience: {}\nComposition: {}\n\
             Positive prompt: {}\nNegative prompt: {}\n\nInspect the attached image.",
            styled.concept.title,
            styled.concept.description,
            styled.concept.visual_tags.join(", "),
            styled.concept.mood,
            styled.concept.target_audience,
            styled.concept.composition_strategy,
            styled.positive_prompt,
            styled.negative_prompt_text(),
        )
    }
}

#[async_trait]
impl PipelineStage for Critic {
    type Input = CritiqueInput;
    type Output = CritiqueOutcome;
    type Error = crate::error::PipelineError;

    fn name(&self) -> &'static str {
        "critic"
    }

    async fn run(&self, input: CritiqueInput) -> PipelineResult<CritiqueOutcome> {
        let CritiqueInput { styled, artifact } = input;

        let image_bytes = self.artifacts.read(&artifact.optimized_location).await?;
        let raw = self
            .llm
            .complete_with_image(
                CRITIC_SYSTEM_PROMPT,
                &self.review_prompt(&styled),
                &ImageAttachment::png(image_bytes),
            )
            .await?;

        let wire: VerdictWire = decode_json(&raw)?;
        let result = CritiqueResult {
            status: wire.status,
            feedback: wire.feedback,
        };
        result.validate()?;

        if !result.is_pass() {
            warn!(
                title = %styled.concept.title,
                feedback = %result.feedback,
                "artifact rejected"
            );
            return Ok(CritiqueOutcome {
                result,
                record: None,
            });
        }

        // PASS: publish before returning. This is the only write path into
        // the concept store.
        let embedding = self
            .embeddings
            .embed(&styled.concept.description, EmbeddingIntent::Document)
            .await?;
        let record =
            ProductionRecord::from_approved(&styled, &artifact, &result, embedding, Utc::now());
        let id = self.store.publish(&record).await?;
        info!(id = %id, title = %record.title, "artifact approved and published");

        Ok(CritiqueOutcome {
            result,
            record: Some(record),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use colorit_core::models::{CompositionStrategy, Concept, HistoryEntry};
    use colorit_llm::{EmbeddingResult, LlmResult};
    use colorit_store::{NeighborConcept, StoreResult};

    use crate::artifacts::ArtifactStore;
    use crate::error::{PipelineError, PipelineResult};

    struct FixedLlm {
        verdict: String,
    }

    #[async_trait]
    impl LlmProvider for FixedLlm {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn model(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _system: &str, _user: &str) -> LlmResult<String> {
            unreachable!("the critic always attaches an image")
        }

        async fn complete_with_image(
            &self,
            _system: &str,
            _user: &str,
            _image: &ImageAttachment,
        ) -> LlmResult<String> {
            Ok(self.verdict.clone())
        }
    }

    struct FixedEmbeddings;

    #[async_trait]
    impl EmbeddingProvider for FixedEmbeddings {
        fn dimension(&self) -> usize {
            4
        }

        async fn embed(&self, _text: &str, _intent: EmbeddingIntent) -> EmbeddingResult<Vec<f32>> {
            Ok(vec![0.5, 0.5, 0.0, 0.0])
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        published: Mutex<Vec<ProductionRecord>>,
    }

    #[async_trait]
    impl ConceptStore for RecordingStore {
        async fn recent(&self, _limit: usize) -> StoreResult<Vec<HistoryEntry>> {
            Ok(vec![])
        }

        async fn nearest(&self, _e: &[f32], _k: usize) -> StoreResult<Vec<NeighborConcept>> {
            Ok(vec![])
        }

        async fn publish(&self, record: &ProductionRecord) -> StoreResult<String> {
            self.published.lock().unwrap().push(record.clone());
            Ok(record.id.clone())
        }
    }

    struct EmptyArtifacts;

    #[async_trait]
    impl ArtifactStore for EmptyArtifacts {
        async fn store_raw(&self, _b: &str, _bytes: &[u8]) -> PipelineResult<String> {
            unreachable!()
        }

        async fn store_optimized(&self, _b: &str, _bytes: &[u8]) -> PipelineResult<String> {
            unreachable!()
        }

        async fn read(&self, _location: &str) -> PipelineResult<Vec<u8>> {
            Ok(b"png".to_vec())
        }
    }

    fn input() -> CritiqueInput {
        CritiqueInput {
            styled: StyledPrompt {
                concept: Concept {
                    title: "Beach Kit".to_string(),
                    description: "Beach items scattered on a page.".to_string(),
                    visual_tags: vec!["beach".to_string(), "collection".to_string()],
                    mood: "Fun".to_string(),
                    target_audience: "child".to_string(),
                    composition_strategy: CompositionStrategy::Collection,
                    avoid_elements: vec![],
                },
                positive_prompt: "A doodle sheet of beach items.".to_string(),
                negative_prompt: vec!["overlapping".to_string()],
            },
            artifact: RenderedArtifact {
                raw_location: "/data/raw/abc-123.png".to_string(),
                optimized_location: "/data/optimized/abc-123.png".to_string(),
            },
        }
    }

    fn critic(verdict: &str, store: Arc<RecordingStore>) -> Critic {
        Critic::new(
            Arc::new(FixedLlm {
                verdict: verdict.to_string(),
            }),
            Arc::new(FixedEmbeddings),
            store,
            Arc::new(EmptyArtifacts),
        )
    }

    #[tokio::test]
    async fn test_pass_publishes_exactly_once() {
        let store = Arc::new(RecordingStore::default());
        let c = critic(
            r#"{"status": "PASS", "feedback": "Excellent, crisp and well spaced."}"#,
            store.clone(),
        );

        let outcome = c.run(input()).await.unwrap();
        assert!(outcome.result.is_pass());

        let published = store.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].id, "abc-123");
        assert_eq!(published[0].status, CritiqueStatus::Pass);
        assert_eq!(outcome.record.as_ref().unwrap().id, "abc-123");
        assert!(!published[0].published);
    }

    #[tokio::test]
    async fn test_reject_never_publishes() {
        let store = Arc::new(RecordingStore::default());
        let c = critic(
            r#"{"status": "REJECT", "feedback": "The items are touching in the center."}"#,
            store.clone(),
        );

        let outcome = c.run(input()).await.unwrap();
        assert!(!outcome.result.is_pass());
        assert!(outcome.record.is_none());
        assert!(store.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reject_without_feedback_is_an_error() {
        let store = Arc::new(RecordingStore::default());
        let c = critic(r#"{"status": "REJECT", "feedback": "  "}"#, store.clone());

        let err = c.run(input()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Core(_)));
        assert!(store.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_verdict_is_an_error() {
        let store = Arc::new(RecordingStore::default());
        let c = critic("Looks great to me!", store.clone());

        let err = c.run(input()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Llm(_)));
        assert!(store.published.lock().unwrap().is_empty());
    }
}
