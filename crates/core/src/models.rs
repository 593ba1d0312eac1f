//! Domain Models
//!
//! The data that flows through the daily production pipeline, strictly
//! downstream:
//!
//! ```text
//! Concept -> StyledPrompt -> RenderedArtifact -> CritiqueResult -> ProductionRecord
//! ```
//!
//! A `Concept` is immutable once handed to styling. `StyledPrompt` echoes the
//! full concept (enforced structurally by embedding it) and only adds prompt
//! fields. A `ProductionRecord` is the persisted superset, created exactly once
//! per successful run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

// ============================================================================
// Concept
// ============================================================================

/// The layout archetype for one coloring page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionStrategy {
    /// Single central character, minimal context
    Sticker,
    /// A character performing an action in a setting
    Scene,
    /// Multiple isolated, non-touching items ("I Spy" page)
    Collection,
    /// Centered, radially symmetric design
    Mandala,
    /// Dynamic pose, movement
    Action,
}

impl std::fmt::Display for CompositionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompositionStrategy::Sticker => write!(f, "sticker"),
            CompositionStrategy::Scene => write!(f, "scene"),
            CompositionStrategy::Collection => write!(f, "collection"),
            CompositionStrategy::Mandala => write!(f, "mandala"),
            CompositionStrategy::Action => write!(f, "action"),
        }
    }
}

impl std::str::FromStr for CompositionStrategy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sticker" => Ok(CompositionStrategy::Sticker),
            "scene" => Ok(CompositionStrategy::Scene),
            "collection" | "mandala_collection" => Ok(CompositionStrategy::Collection),
            "mandala" => Ok(CompositionStrategy::Mandala),
            "action" => Ok(CompositionStrategy::Action),
            other => Err(CoreError::validation(format!(
                "unknown composition strategy: {}",
                other
            ))),
        }
    }
}

/// The creative brief for one coloring page.
///
/// Produced by the ideation stage, consumed by styling. Immutable for the
/// remainder of the run; retries restyle the same concept, they never
/// change it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    /// Short, catchy title
    pub title: String,
    /// Free-text visual description of the subject
    pub description: String,
    /// Key visual elements, in priority order
    pub visual_tags: Vec<String>,
    /// Emotional tone (e.g. "Playful", "Calm", "Energetic")
    pub mood: String,
    /// "child" or "adult"
    pub target_audience: String,
    /// Layout archetype the stylist must honor
    pub composition_strategy: CompositionStrategy,
    /// Elements the generator must avoid (fed into the negative prompt)
    #[serde(default)]
    pub avoid_elements: Vec<String>,
}

impl Concept {
    /// Validate the fields the downstream stages rely on.
    pub fn validate(&self) -> CoreResult<()> {
        if self.title.trim().is_empty() {
            return Err(CoreError::validation("concept title is empty"));
        }
        if self.description.trim().is_empty() {
            return Err(CoreError::validation("concept description is empty"));
        }
        if self.target_audience.trim().is_empty() {
            return Err(CoreError::validation("concept target_audience is empty"));
        }
        Ok(())
    }

    /// Whether any visual tag matches `tag` (case-insensitive).
    pub fn has_tag(&self, tag: &str) -> bool {
        self.visual_tags
            .iter()
            .any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Whether the mood matches `mood` (case-insensitive).
    pub fn has_mood(&self, mood: &str) -> bool {
        self.mood.eq_ignore_ascii_case(mood)
    }

    /// Whether this concept targets the adult audience.
    pub fn is_adult(&self) -> bool {
        self.target_audience.eq_ignore_ascii_case("adult")
    }
}

// ============================================================================
// StyledPrompt
// ============================================================================

/// A concept plus the generation prompts derived from it.
///
/// The originating concept is embedded whole, so every concept field is
/// echoed unchanged by construction. Regenerated on every loop iteration;
/// critique feedback may alter the prompts, never the concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyledPrompt {
    /// The unmodified originating concept
    #[serde(flatten)]
    pub concept: Concept,
    /// Natural-language prompt for the image model
    pub positive_prompt: String,
    /// Forbidden visual elements, in order
    pub negative_prompt: Vec<String>,
}

impl StyledPrompt {
    /// The negative prompt as a single comma-joined string, the form most
    /// image APIs accept.
    pub fn negative_prompt_text(&self) -> String {
        self.negative_prompt.join(", ")
    }
}

// ============================================================================
// RenderedArtifact
// ============================================================================

/// The stored outputs of one rendering pass.
///
/// Both locations are opaque URIs, immutable once produced. A retry produces
/// a new artifact; it never mutates this one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedArtifact {
    /// Location of the raw generated image
    pub raw_location: String,
    /// Location of the vector-traced, print-ready image
    pub optimized_location: String,
}

impl RenderedArtifact {
    /// The stable record identifier derived from the optimized location:
    /// the file stem of its final path segment. Using the same id for the
    /// metadata row and the vector row lets them be joined without a
    /// separate key-generation step.
    pub fn record_id(&self) -> String {
        record_id_from_location(&self.optimized_location)
    }
}

/// Derive a record id from an artifact location.
///
/// `"/data/optimized/abc-123.png"` -> `"abc-123"`.
pub fn record_id_from_location(location: &str) -> String {
    let basename = location
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(location);
    match basename.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem.to_string(),
        _ => basename.to_string(),
    }
}

// ============================================================================
// CritiqueResult
// ============================================================================

/// Verdict of the critique stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CritiqueStatus {
    Pass,
    Reject,
}

/// Output of the critique stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CritiqueResult {
    pub status: CritiqueStatus,
    /// Actionable feedback; mandatory and non-empty on reject.
    pub feedback: String,
}

impl CritiqueResult {
    /// Enforce the reject-requires-feedback invariant.
    pub fn validate(&self) -> CoreResult<()> {
        if self.status == CritiqueStatus::Reject && self.feedback.trim().is_empty() {
            return Err(CoreError::validation(
                "critique rejected without actionable feedback",
            ));
        }
        Ok(())
    }

    pub fn is_pass(&self) -> bool {
        self.status == CritiqueStatus::Pass
    }
}

// ============================================================================
// ProductionRecord
// ============================================================================

/// The persisted, published unit: concept + prompts + artifact locations +
/// critique outcome + description embedding.
///
/// Created exactly once per successful run. The `published` flag stays false
/// until the downstream migration job republishes the record into the
/// relational store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionRecord {
    /// Stable id derived from the optimized artifact location
    pub id: String,
    pub title: String,
    pub description: String,
    pub visual_tags: Vec<String>,
    pub mood: String,
    pub target_audience: String,
    pub composition_strategy: CompositionStrategy,
    pub positive_prompt: String,
    pub negative_prompt: Vec<String>,
    pub raw_location: String,
    pub optimized_location: String,
    pub status: CritiqueStatus,
    pub feedback: String,
    pub published_date: DateTime<Utc>,
    /// Document-intent embedding of the description
    pub embedding: Vec<f32>,
    /// Flipped to true by the migration job, never by the pipeline
    pub published: bool,
}

impl ProductionRecord {
    /// Assemble a record from the stage outputs of a passing iteration.
    pub fn from_approved(
        styled: &StyledPrompt,
        artifact: &RenderedArtifact,
        critique: &CritiqueResult,
        embedding: Vec<f32>,
        published_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: artifact.record_id(),
            title: styled.concept.title.clone(),
            description: styled.concept.description.clone(),
            visual_tags: styled.concept.visual_tags.clone(),
            mood: styled.concept.mood.clone(),
            target_audience: styled.concept.target_audience.clone(),
            composition_strategy: styled.concept.composition_strategy,
            positive_prompt: styled.positive_prompt.clone(),
            negative_prompt: styled.negative_prompt.clone(),
            raw_location: artifact.raw_location.clone(),
            optimized_location: artifact.optimized_location.clone(),
            status: critique.status,
            feedback: critique.feedback.clone(),
            published_date,
            embedding,
            published: false,
        }
    }
}

// ============================================================================
// HistorySummary
// ============================================================================

/// A single recent-history entry: just enough for rotation and prompting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub title: String,
    pub visual_tags: Vec<String>,
    pub composition_strategy: Option<CompositionStrategy>,
}

/// Read-only projection of the most recent production records, newest first.
/// Used only as prompting context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub entries: Vec<HistoryEntry>,
}

impl HistorySummary {
    pub fn new(entries: Vec<HistoryEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recently published entry, if any.
    pub fn most_recent(&self) -> Option<&HistoryEntry> {
        self.entries.first()
    }

    /// One-line-per-entry rendering for the ideation prompt.
    pub fn render(&self) -> Vec<String> {
        if self.entries.is_empty() {
            return vec!["No history found. You are free to pick any category.".to_string()];
        }
        self.entries
            .iter()
            .map(|e| format!("Title: {} | Tags: {}", e.title, e.visual_tags.join(", ")))
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_concept() -> Concept {
        Concept {
            title: "Baby T-Rex".to_string(),
            description: "A cute baby T-Rex smiling and standing on its hind legs.".to_string(),
            visual_tags: vec![
                "dinosaur".to_string(),
                "cute".to_string(),
                "sticker".to_string(),
            ],
            mood: "Playful".to_string(),
            target_audience: "child".to_string(),
            composition_strategy: CompositionStrategy::Sticker,
            avoid_elements: vec!["scary teeth".to_string()],
        }
    }

    #[test]
    fn test_concept_validate_rejects_empty_title() {
        let mut concept = sample_concept();
        concept.title = "  ".to_string();
        assert!(concept.validate().is_err());
    }

    #[test]
    fn test_concept_tag_and_mood_matching_is_case_insensitive() {
        let concept = sample_concept();
        assert!(concept.has_tag("CUTE"));
        assert!(concept.has_mood("playful"));
        assert!(!concept.has_tag("mandala"));
    }

    #[test]
    fn test_composition_strategy_round_trip() {
        for s in [
            CompositionStrategy::Sticker,
            CompositionStrategy::Scene,
            CompositionStrategy::Collection,
            CompositionStrategy::Mandala,
            CompositionStrategy::Action,
        ] {
            let parsed: CompositionStrategy = s.to_string().parse().unwrap();
            assert_eq!(parsed, s);
        }
        assert!("spiral".parse::<CompositionStrategy>().is_err());
    }

    #[test]
    fn test_styled_prompt_echoes_concept_unchanged() {
        let concept = sample_concept();
        let styled = StyledPrompt {
            concept: concept.clone(),
            positive_prompt: "A die-cut sticker design of a baby T-Rex.".to_string(),
            negative_prompt: vec!["shading".to_string(), "background".to_string()],
        };
        assert_eq!(styled.concept, concept);
        assert_eq!(styled.negative_prompt_text(), "shading, background");
    }

    #[test]
    fn test_record_id_from_location() {
        assert_eq!(
            record_id_from_location("/data/optimized/abc-123.png"),
            "abc-123"
        );
        assert_eq!(record_id_from_location("plain.webp"), "plain");
        assert_eq!(record_id_from_location("no-extension"), "no-extension");
    }

    #[test]
    fn test_critique_reject_requires_feedback() {
        let bad = CritiqueResult {
            status: CritiqueStatus::Reject,
            feedback: " ".to_string(),
        };
        assert!(bad.validate().is_err());

        let good = CritiqueResult {
            status: CritiqueStatus::Reject,
            feedback: "The items are touching in the center.".to_string(),
        };
        assert!(good.validate().is_ok());

        let pass = CritiqueResult {
            status: CritiqueStatus::Pass,
            feedback: String::new(),
        };
        assert!(pass.validate().is_ok());
    }

    #[test]
    fn test_critique_status_serde_uppercase() {
        let json = serde_json::to_string(&CritiqueStatus::Pass).unwrap();
        assert_eq!(json, "\"PASS\"");
        let parsed: CritiqueStatus = serde_json::from_str("\"REJECT\"").unwrap();
        assert_eq!(parsed, CritiqueStatus::Reject);
    }

    #[test]
    fn test_production_record_from_approved() {
        let concept = sample_concept();
        let styled = StyledPrompt {
            concept,
            positive_prompt: "positive".to_string(),
            negative_prompt: vec!["shading".to_string()],
        };
        let artifact = RenderedArtifact {
            raw_location: "/data/raw/abc-123.png".to_string(),
            optimized_location: "/data/optimized/abc-123.png".to_string(),
        };
        let critique = CritiqueResult {
            status: CritiqueStatus::Pass,
            feedback: "Excellent.".to_string(),
        };
        let record = ProductionRecord::from_approved(
            &styled,
            &artifact,
            &critique,
            vec![0.1, 0.2],
            Utc::now(),
        );

        assert_eq!(record.id, "abc-123");
        assert_eq!(record.title, styled.concept.title);
        assert_eq!(record.positive_prompt, "positive");
        assert_eq!(record.status, CritiqueStatus::Pass);
        assert!(!record.published);
    }

    #[test]
    fn test_history_summary_render_empty_and_populated() {
        let empty = HistorySummary::default();
        assert!(empty.is_empty());
        assert!(empty.render()[0].contains("No history"));

        let summary = HistorySummary::new(vec![HistoryEntry {
            title: "Space Cat".to_string(),
            visual_tags: vec!["space".to_string(), "animal".to_string()],
            composition_strategy: Some(CompositionStrategy::Sticker),
        }]);
        assert_eq!(summary.render(), vec!["Title: Space Cat | Tags: space, animal"]);
        assert_eq!(summary.most_recent().unwrap().title, "Space Cat");
    }
}
