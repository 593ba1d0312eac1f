//! Ideation Stage (Creative Director)
//!
//! Proposes exactly one concept for a date. Draws on the calendar context
//! and recent history, enforces the rotation constraint (never repeat the
//! most recent composition strategy), and gates every candidate through the
//! semantic de-duplication check: query-embed the description, pull the
//! nearest prior concepts, and ask the model whether any of them is the
//! same subject performing the same action. Duplicates are discarded and
//! brainstorming continues with the rejected titles excluded, up to a
//! bounded number of attempts.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info, warn};

use colorit_core::models::{Concept, HistorySummary};
use colorit_core::stage::PipelineStage;
use colorit_llm::{decode_json, EmbeddingIntent, EmbeddingProvider, LlmProvider};
use colorit_store::{ConceptStore, NeighborConcept};

use crate::calendar;
use crate::error::{PipelineError, PipelineResult};

/// Ideation tunables.
#[derive(Debug, Clone)]
pub struct IdeationConfig {
    /// How many recent records to show the director.
    pub history_limit: usize,
    /// How many nearest neighbors to check a candidate against.
    pub neighbor_count: usize,
    /// Cosine distance below which a neighbor is close enough to warrant
    /// the semantic-duplicate judgment.
    pub similarity_threshold: f32,
    /// Hard cap on brainstorm attempts before the run fails.
    pub max_brainstorm_attempts: usize,
}

impl Default for IdeationConfig {
    fn default() -> Self {
        Self {
            history_limit: 3,
            neighbor_count: 5,
            similarity_threshold: 0.25,
            max_brainstorm_attempts: 5,
        }
    }
}

const DIRECTOR_SYSTEM_PROMPT: &str = r#"You are the Creative Director for "Color It Daily", a premium children's coloring page publisher. Conceptualize exactly ONE daily coloring page that is fresh, timely, and delightful.

Audience: children ages 3-10 unless stated otherwise. Tone: whimsical, playful, innocent. STRICTLY CHILD-SAFE: never propose violence, weapons, horror, scary monsters, suggestive themes, or political/religious symbols. Concepts must be visualizable as thick line art.

Rotate variety: do not repeat the category or the composition of the most recent page.

Composition strategies:
- "sticker": one central character, minimal context. Tags should include "simple" or "sticker".
- "scene": a character performing an action in a setting. Tags should include "scenery" or "nature".
- "collection": 5-8 distinct related items, not touching. Tag "collection".
- "mandala": centered, symmetric, radiating design. Tags should include "mandala" or "symmetry".
- "action": dynamic pose, movement. Tags should include "action" or "dynamic".

Respond with ONLY a JSON object:
{
  "title": "Short, catchy title",
  "description": "Visual description. If a collection, list the items. If a scene, describe the setting.",
  "visual_tags": ["four", "short", "tags", "max"],
  "mood": "Playful | Calm | Dreamy | Energetic | Adventure | Fun | Happy",
  "target_audience": "child",
  "composition_strategy": "sticker | scene | collection | mandala | action",
  "avoid_elements": ["things the artist must not draw"]
}"#;

const JUDGE_SYSTEM_PROMPT: &str = r#"You compare a new coloring page concept against previously published ones. Two concepts are duplicates only when they show the SAME SUBJECT performing the SAME ACTION. A fox sitting in snow and a fox riding a bicycle are NOT duplicates; two pages of a penguin sliding on ice ARE.

Respond with ONLY a JSON object: {"duplicate": true|false, "reason": "one sentence"}"#;

#[derive(Debug, Deserialize)]
struct DuplicateVerdict {
    duplicate: bool,
    #[serde(default)]
    reason: String,
}

/// The ideation stage.
pub struct CreativeDirector {
    llm: Arc<dyn LlmProvider>,
    embeddings: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn ConceptStore>,
    config: IdeationConfig,
}

impl CreativeDirector {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        embeddings: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn ConceptStore>,
        config: IdeationConfig,
    ) -> Self {
        Self {
            llm,
            embeddings,
            store,
            config,
        }
    }

    /// Propose one sufficiently novel concept for the date.
    pub async fn propose(&self, date: NaiveDate) -> PipelineResult<Concept> {
        let context = calendar::events(date);
        let history = HistorySummary::new(self.store.recent(self.config.history_limit).await?);
        debug!(
            date = %date,
            history_len = history.entries.len(),
            "gathered ideation context"
        );

        let mut rejected_titles: Vec<String> = Vec::new();

        for attempt in 1..=self.config.max_brainstorm_attempts {
            let user_prompt = self.brainstorm_prompt(&context, &history, &rejected_titles);
            let raw = self
                .llm
                .complete(DIRECTOR_SYSTEM_PROMPT, &user_prompt)
                .await?;
            let concept: Concept = decode_json(&raw)?;
            concept.validate()?;

            // Rotation constraint: skipped entirely on an empty history.
            if let Some(recent) = history.most_recent() {
                if recent.composition_strategy == Some(concept.composition_strategy) {
                    warn!(
                        attempt,
                        title = %concept.title,
                        strategy = %concept.composition_strategy,
                        "candidate repeats the most recent composition, discarding"
                    );
                    rejected_titles.push(concept.title);
                    continue;
                }
            }

            match self.duplicate_of(&concept).await? {
                Some(neighbor) => {
                    info!(
                        attempt,
                        title = %concept.title,
                        duplicate_of = %neighbor.title,
                        "candidate judged a semantic duplicate, discarding"
                    );
                    rejected_titles.push(concept.title);
                }
                None => {
                    info!(attempt, title = %concept.title, "concept accepted");
                    return Ok(concept);
                }
            }
        }

        Err(PipelineError::ideation(format!(
            "no sufficiently novel concept after {} brainstorm attempts (rejected: {})",
            self.config.max_brainstorm_attempts,
            rejected_titles.join(", ")
        )))
    }

    fn brainstorm_prompt(
        &self,
        context: &calendar::CalendarContext,
        history: &HistorySummary,
        rejected_titles: &[String],
    ) -> String {
        let mut sections = vec![
            context.render(),
            format!("Recently published:\n{}", history.render().join("\n")),
        ];
        if let Some(recent) = history.most_recent() {
            if let Some(strategy) = recent.composition_strategy {
                sections.push(format!(
                    "The most recent page used the \"{}\" composition. Pick a DIFFERENT \
                     composition strategy and a different category today.",
                    strategy
                ));
            }
        }
        if !rejected_titles.is_empty() {
            sections.push(format!(
                "These ideas were already rejected as too similar to past pages, propose \
                 something clearly different: {}",
                rejected_titles.join(", ")
            ));
        }
        sections.join("\n\n")
    }

    /// Run the semantic de-duplication gate. Returns the offending neighbor
    /// when the candidate is judged a duplicate.
    async fn duplicate_of(&self, concept: &Concept) -> PipelineResult<Option<NeighborConcept>> {
        let embedding = self
            .embeddings
            .embed(&concept.description, EmbeddingIntent::Query)
            .await?;
        let neighbors = self
            .store
            .nearest(&embedding, self.config.neighbor_count)
            .await?;

        let close: Vec<&NeighborConcept> = neighbors
            .iter()
            .filter(|n| n.distance <= self.config.similarity_threshold)
            .collect();
        if close.is_empty() {
            return Ok(None);
        }

        let listing = close
            .iter()
            .map(|n| format!("- \"{}\": {}", n.title, n.description))
            .collect::<Vec<_>>()
            .join("\n");
        let user_prompt = format!(
            "New concept: \"{}\": {}\n\nPublished concepts:\n{}\n\nIs the new concept a \
             duplicate of any published one?",
            concept.title, concept.description, listing
        );

        let raw = self.llm.complete(JUDGE_SYSTEM_PROMPT, &user_prompt).await?;
        let verdict: DuplicateVerdict = decode_json(&raw)?;
        if verdict.duplicate {
            debug!(reason = %verdict.reason, "duplicate verdict");
            // Attribute the duplicate to the closest neighbor for reporting.
            Ok(close.first().map(|n| (*n).clone()))
        } else {
            Ok(None)
        }
    }
}

#[async_trait]
impl PipelineStage for CreativeDirector {
    type Input = NaiveDate;
    type Output = Concept;
    type Error = PipelineError;

    fn name(&self) -> &'static str {
        "creative-director"
    }

    async fn run(&self, date: NaiveDate) -> PipelineResult<Concept> {
        self.propose(date).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use colorit_core::models::{CompositionStrategy, HistoryEntry, ProductionRecord};
    use colorit_llm::{EmbeddingError, EmbeddingResult, ImageAttachment, LlmResult};
    use colorit_store::StoreResult;

    struct ScriptedLlm {
        responses: Mutex<VecDeque<String>>,
    }

    impl ScriptedLlm {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _system: &str, _user: &str) -> LlmResult<String> {
            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("script exhausted"))
        }

        async fn complete_with_image(
            &self,
            _system: &str,
            _user: &str,
            _image: &ImageAttachment,
        ) -> LlmResult<String> {
            unreachable!("ideation never sends images")
        }
    }

    struct FixedEmbeddings;

    #[async_trait]
    impl EmbeddingProvider for FixedEmbeddings {
        fn dimension(&self) -> usize {
            4
        }

        async fn embed(&self, _text: &str, _intent: EmbeddingIntent) -> EmbeddingResult<Vec<f32>> {
            Ok(vec![1.0, 0.0, 0.0, 0.0])
        }
    }

    struct StubStore {
        history: Vec<HistoryEntry>,
        neighbors: Vec<NeighborConcept>,
    }

    #[async_trait]
    impl ConceptStore for StubStore {
        async fn recent(&self, limit: usize) -> StoreResult<Vec<HistoryEntry>> {
            Ok(self.history.iter().take(limit).cloned().collect())
        }

        async fn nearest(&self, _e: &[f32], _k: usize) -> StoreResult<Vec<NeighborConcept>> {
            Ok(self.neighbors.clone())
        }

        async fn publish(&self, _record: &ProductionRecord) -> StoreResult<String> {
            unreachable!("ideation never publishes")
        }
    }

    fn concept_json(title: &str, strategy: &str) -> String {
        format!(
            r#"{{"title": "{}", "description": "A penguin sliding down an icy hill.",
                 "visual_tags": ["penguin", "winter", "simple"], "mood": "Playful",
                 "target_audience": "child", "composition_strategy": "{}",
                 "avoid_elements": []}}"#,
            title, strategy
        )
    }

    fn close_neighbor() -> NeighborConcept {
        NeighborConcept {
            id: "old-1".to_string(),
            title: "Sliding Penguin".to_string(),
            description: "A penguin sliding on ice.".to_string(),
            visual_tags: vec!["penguin".to_string()],
            distance: 0.05,
        }
    }

    fn director(llm: ScriptedLlm, store: StubStore, config: IdeationConfig) -> CreativeDirector {
        CreativeDirector::new(
            Arc::new(llm),
            Arc::new(FixedEmbeddings),
            Arc::new(store),
            config,
        )
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 5).unwrap()
    }

    #[tokio::test]
    async fn test_empty_history_accepts_first_novel_concept() {
        // No history, no neighbors: one brainstorm call, no judgment call.
        let llm = ScriptedLlm::new(vec![&concept_json("Penguin Slide", "sticker")]);
        let store = StubStore {
            history: vec![],
            neighbors: vec![],
        };
        let d = director(llm, store, IdeationConfig::default());

        let concept = d.propose(date()).await.unwrap();
        assert_eq!(concept.title, "Penguin Slide");
    }

    #[tokio::test]
    async fn test_rotation_constraint_discards_repeated_composition() {
        let llm = ScriptedLlm::new(vec![
            &concept_json("Penguin Slide", "sticker"),
            &concept_json("Penguin Picnic", "scene"),
        ]);
        let store = StubStore {
            history: vec![HistoryEntry {
                title: "Space Cat".to_string(),
                visual_tags: vec!["space".to_string()],
                composition_strategy: Some(CompositionStrategy::Sticker),
            }],
            neighbors: vec![],
        };
        let d = director(llm, store, IdeationConfig::default());

        let concept = d.propose(date()).await.unwrap();
        assert_eq!(concept.title, "Penguin Picnic");
        assert_eq!(concept.composition_strategy, CompositionStrategy::Scene);
    }

    #[tokio::test]
    async fn test_semantic_duplicate_is_discarded() {
        // Candidate 1 is judged a duplicate of a close neighbor; candidate 2
        // passes judgment.
        let llm = ScriptedLlm::new(vec![
            &concept_json("Sliding Penguin Again", "sticker"),
            r#"{"duplicate": true, "reason": "Same penguin, same slide."}"#,
            &concept_json("Robot Baker", "sticker"),
            r#"{"duplicate": false, "reason": "Different subject and action."}"#,
        ]);
        let store = StubStore {
            history: vec![],
            neighbors: vec![close_neighbor()],
        };
        let d = director(llm, store, IdeationConfig::default());

        let concept = d.propose(date()).await.unwrap();
        assert_eq!(concept.title, "Robot Baker");
    }

    #[tokio::test]
    async fn test_distant_neighbors_skip_the_judgment_call() {
        let mut far = close_neighbor();
        far.distance = 0.9;
        // Only one scripted response: a judgment call would panic the script.
        let llm = ScriptedLlm::new(vec![&concept_json("Penguin Slide", "sticker")]);
        let store = StubStore {
            history: vec![],
            neighbors: vec![far],
        };
        let d = director(llm, store, IdeationConfig::default());

        assert!(d.propose(date()).await.is_ok());
    }

    #[tokio::test]
    async fn test_brainstorm_attempts_are_bounded() {
        let llm = ScriptedLlm::new(vec![
            &concept_json("Idea One", "sticker"),
            r#"{"duplicate": true, "reason": "dup"}"#,
            &concept_json("Idea Two", "scene"),
            r#"{"duplicate": true, "reason": "dup"}"#,
        ]);
        let store = StubStore {
            history: vec![],
            neighbors: vec![close_neighbor()],
        };
        let config = IdeationConfig {
            max_brainstorm_attempts: 2,
            ..Default::default()
        };
        let d = director(llm, store, config);

        let err = d.propose(date()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Ideation(_)));
        assert!(err.to_string().contains("Idea Two"));
    }

    #[tokio::test]
    async fn test_malformed_brainstorm_is_not_coerced() {
        let llm = ScriptedLlm::new(vec!["I would suggest drawing a nice penguin."]);
        let store = StubStore {
            history: vec![],
            neighbors: vec![],
        };
        let d = director(llm, store, IdeationConfig::default());

        let err = d.propose(date()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Llm(_)));
    }
}
