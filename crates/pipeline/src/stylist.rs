//! Styling Stage
//!
//! Turns a concept into generation prompts. Pure and deterministic: the same
//! concept and feedback always select the same style rule and produce the
//! same prompts. The rule table is first-match-wins in a fixed priority
//! order, with a coarser parallel set for the adult audience.

use async_trait::async_trait;
use tracing::debug;

use colorit_core::models::{Concept, StyledPrompt};
use colorit_core::stage::PipelineStage;

use crate::error::{PipelineError, PipelineResult};

/// Input to the styling stage: the concept plus feedback from the previous
/// iteration's critique, if any.
#[derive(Debug, Clone)]
pub struct StylingInput {
    pub concept: Concept,
    pub feedback: Option<String>,
}

impl StylingInput {
    pub fn initial(concept: Concept) -> Self {
        Self {
            concept,
            feedback: None,
        }
    }

    pub fn with_feedback(concept: Concept, feedback: String) -> Self {
        Self {
            concept,
            feedback: Some(feedback),
        }
    }
}

/// The style archetypes a concept can be rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleRule {
    /// Stained-glass segmentation for butterflies, snowflakes, leaves
    Mosaic,
    /// Radial symmetry, repeating elements
    Mandala,
    /// Rounded proportions, big eyes, soft curves
    Kawaii,
    /// Bold comic style, action poses, speed lines
    DynamicComic,
    /// Soft hand-drawn scene with sparse environmental context
    Storybook,
    /// High-impact die-cut sticker, thick outer contour, no background
    Sticker,
    /// Adult: precise scientific-illustration ink work
    Botanical,
    /// Adult: intricate meditative radial patterns
    ZenMandala,
}

/// Select the style rule for a concept. First matching rule wins.
pub fn select_style(concept: &Concept) -> StyleRule {
    if concept.is_adult() {
        let zen_tags = ["abstract", "pattern", "mandala", "symmetry", "geometry"];
        if zen_tags.iter().any(|t| concept.has_tag(t)) {
            return StyleRule::ZenMandala;
        }
        return StyleRule::Botanical;
    }

    let mosaic_tags = ["butterfly", "snowflake", "leaf", "abstract"];
    if mosaic_tags.iter().any(|t| concept.has_tag(t)) {
        return StyleRule::Mosaic;
    }

    let mandala_tags = ["mandala", "symmetry", "flower", "snowflake"];
    if mandala_tags.iter().any(|t| concept.has_tag(t)) {
        return StyleRule::Mandala;
    }

    let kawaii_tags = ["cute", "baby", "sweet", "chibi"];
    if concept.has_mood("fun")
        || concept.has_mood("happy")
        || kawaii_tags.iter().any(|t| concept.has_tag(t))
    {
        return StyleRule::Kawaii;
    }

    let comic_tags = ["sports", "hero", "vehicle", "car", "train", "plane"];
    if concept.has_mood("energetic")
        || concept.has_mood("adventure")
        || comic_tags.iter().any(|t| concept.has_tag(t))
    {
        return StyleRule::DynamicComic;
    }

    let storybook_tags = ["nature", "scenery", "forest"];
    if concept.has_mood("calm")
        || concept.has_mood("dreamy")
        || storybook_tags.iter().any(|t| concept.has_tag(t))
    {
        return StyleRule::Storybook;
    }

    StyleRule::Sticker
}

impl StyleRule {
    /// Narrative instruction shaping the subject/action clause.
    fn narrative(&self) -> &'static str {
        match self {
            StyleRule::Mosaic => {
                "Design this like a simple stained-glass window, dividing the large shapes \
                 into smaller distinct segments with thick lines"
            }
            StyleRule::Mandala => {
                "Compose this as a centered, radially symmetric design with repeating \
                 elements radiating outward"
            }
            StyleRule::Kawaii => {
                "Use a kawaii aesthetic with rounded proportions, large expressive eyes, \
                 and soft bouncy curves instead of sharp angles"
            }
            StyleRule::DynamicComic => {
                "Draft this in a bold comic-book style with a dynamic pose and speed lines \
                 to convey motion"
            }
            StyleRule::Storybook => {
                "Illustrate this as a soft, hand-drawn storybook page with simple \
                 environmental context grounding the character"
            }
            StyleRule::Sticker => {
                "Depict the subject as a high-impact die-cut sticker with an ultra-thick \
                 outer contour isolating it from the white background"
            }
            StyleRule::Botanical => {
                "Render this as a scientific illustration with fine, precise ink lines \
                 tracing the texture of fur, feathers, or leaves"
            }
            StyleRule::ZenMandala => {
                "Construct the image from radial symmetry and intricate geometric patterns \
                 designed for meditative coloring, filling the entire page"
            }
        }
    }

    /// Closing technical-constraint clause.
    fn constraint(&self) -> &'static str {
        match self {
            StyleRule::Mosaic => {
                "Focus on closed shapes and symmetry; avoid tiny details and keep every \
                 segment chunky enough for markers."
            }
            StyleRule::Mandala => {
                "Keep the design balanced around the center and every region large enough \
                 to color."
            }
            StyleRule::Kawaii => {
                "Prioritize roundness and cuteness over anatomical accuracy, with simple \
                 rounded line weights."
            }
            StyleRule::DynamicComic => {
                "Use sharp, confident lines for energy and keep limbs and props clearly \
                 separated for coloring."
            }
            StyleRule::Storybook => {
                "Use fluid, organic line work that feels friendly, keeping the background \
                 sparse and uncluttered."
            }
            StyleRule::Sticker => {
                "Focus on a strong silhouette, keep internal details minimal and large, and \
                 avoid all background elements."
            }
            StyleRule::Botanical => {
                "Use clean, unshaded strokes throughout; no hatching that reads as gray."
            }
            StyleRule::ZenMandala => {
                "Keep every pattern cell a closed shape with a clear boundary."
            }
        }
    }

    /// Forbidden visual elements for this style, in order.
    fn negatives(&self) -> &'static [&'static str] {
        match self {
            StyleRule::Mosaic => &[
                "tiny details",
                "open shapes",
                "shading",
                "grayscale",
                "texture",
                "realism",
            ],
            StyleRule::Mandala => &[
                "asymmetry",
                "tiny details",
                "broken lines",
                "shading",
                "grayscale",
            ],
            StyleRule::Kawaii => &[
                "realistic",
                "anatomical",
                "sharp edges",
                "scary",
                "angry",
                "detailed fur",
                "shading",
                "grayscale",
                "complex background",
            ],
            StyleRule::DynamicComic => &[
                "static",
                "thin lines",
                "blurry",
                "messy sketch",
                "shading",
                "grayscale",
                "realistic",
                "background clutter",
            ],
            StyleRule::Storybook => &[
                "shading",
                "heavy blacks",
                "scary",
                "sharp angles",
                "grayscale",
                "realism",
                "photo",
                "intricate patterns",
                "dark atmosphere",
            ],
            StyleRule::Sticker => &[
                "background",
                "scenery",
                "thin lines",
                "complex details",
                "shading",
                "grayscale",
                "texture",
                "sketchy",
                "small parts",
            ],
            StyleRule::Botanical => &[
                "shading",
                "grayscale",
                "cartoonish",
                "thick childish lines",
                "blurry",
            ],
            StyleRule::ZenMandala => &[
                "asymmetry",
                "open shapes",
                "shading",
                "grayscale",
                "figurative scenes",
            ],
        }
    }
}

/// The styling stage.
pub struct Stylist;

impl Stylist {
    pub fn new() -> Self {
        Self
    }

    /// Build the full prompt pair for a concept. Deterministic.
    pub fn build(&self, input: &StylingInput) -> PipelineResult<StyledPrompt> {
        let concept = &input.concept;
        concept.validate()?;

        let rule = select_style(concept);
        debug!(title = %concept.title, ?rule, "selected style rule");

        let audience = if concept.is_adult() {
            "adults"
        } else {
            "young children"
        };

        // [Medium definition]. [Subject action, with feedback woven in].
        // [Artistic constraints].
        let medium = format!(
            "A pristine, black-and-white coloring page designed for {}.",
            audience
        );

        let mut subject = format!(
            "{}: {}",
            rule.narrative(),
            concept.description.trim_end_matches('.')
        );
        if let Some(feedback) = input.feedback.as_deref() {
            subject.push_str(&format!(", {}", corrective_clause(feedback)));
        }
        subject.push('.');

        let closer = "The image uses thick, uniform black lines on a pure white background \
                      with absolutely no shading, texture, or grayscale fill.";
        let positive_prompt = format!("{} {} {} {}", medium, subject, rule.constraint(), closer);

        let mut negative_prompt: Vec<String> =
            rule.negatives().iter().map(|s| s.to_string()).collect();
        for avoid in &concept.avoid_elements {
            if !negative_prompt.iter().any(|n| n.eq_ignore_ascii_case(avoid)) {
                negative_prompt.push(avoid.clone());
            }
        }

        Ok(StyledPrompt {
            concept: concept.clone(),
            positive_prompt,
            negative_prompt,
        })
    }
}

impl Default for Stylist {
    fn default() -> Self {
        Self::new()
    }
}

/// Translate critique feedback into a corrective drawing instruction that
/// sits inside the subject clause rather than dangling at the end.
fn corrective_clause(feedback: &str) -> String {
    let lower = feedback.to_lowercase();
    if lower.contains("filled") || lower.contains("shading") || lower.contains("grayscale") {
        "with every region defined only by its outline and no filled or shaded areas".to_string()
    } else if lower.contains("broken") || lower.contains("faint") {
        "rendered with heavy, continuous strokes so no line is broken or faint".to_string()
    } else if lower.contains("touch") || lower.contains("overlap") {
        "with every item fully separated by white space, never touching or overlapping"
            .to_string()
    } else if lower.contains("scary")
        || lower.contains("angry")
        || lower.contains("frighten")
    {
        "drawn with a round, friendly, gentle expression".to_string()
    } else if lower.contains("small") || lower.contains("tiny") || lower.contains("detail") {
        "with large, simple shapes coarse enough for a crayon".to_string()
    } else {
        format!("taking care to correct this issue: {}", feedback.trim())
    }
}

#[async_trait]
impl PipelineStage for Stylist {
    type Input = StylingInput;
    type Output = StyledPrompt;
    type Error = PipelineError;

    fn name(&self) -> &'static str {
        "stylist"
    }

    async fn run(&self, input: StylingInput) -> PipelineResult<StyledPrompt> {
        self.build(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colorit_core::models::CompositionStrategy;

    fn concept(tags: &[&str], mood: &str, audience: &str) -> Concept {
        Concept {
            title: "Test Page".to_string(),
            description: "A fox sitting in the snow.".to_string(),
            visual_tags: tags.iter().map(|s| s.to_string()).collect(),
            mood: mood.to_string(),
            target_audience: audience.to_string(),
            composition_strategy: CompositionStrategy::Sticker,
            avoid_elements: vec![],
        }
    }

    #[test]
    fn test_rule_priority_order() {
        // Mosaic outranks mandala when both trigger on "snowflake".
        assert_eq!(
            select_style(&concept(&["snowflake"], "Calm", "child")),
            StyleRule::Mosaic
        );
        assert_eq!(
            select_style(&concept(&["flower"], "Calm", "child")),
            StyleRule::Mandala
        );
        assert_eq!(
            select_style(&concept(&["cute"], "Neutral", "child")),
            StyleRule::Kawaii
        );
        assert_eq!(
            select_style(&concept(&["vehicle"], "Neutral", "child")),
            StyleRule::DynamicComic
        );
        assert_eq!(
            select_style(&concept(&["forest"], "Neutral", "child")),
            StyleRule::Storybook
        );
        assert_eq!(
            select_style(&concept(&["dinosaur"], "Neutral", "child")),
            StyleRule::Sticker
        );
    }

    #[test]
    fn test_mandala_tags_never_fall_through_to_sticker() {
        let c = concept(&["mandala", "symmetry"], "Calm", "child");
        assert_eq!(select_style(&c), StyleRule::Mandala);
    }

    #[test]
    fn test_mood_triggers() {
        assert_eq!(
            select_style(&concept(&[], "Happy", "child")),
            StyleRule::Kawaii
        );
        assert_eq!(
            select_style(&concept(&[], "Adventure", "child")),
            StyleRule::DynamicComic
        );
        assert_eq!(
            select_style(&concept(&[], "Dreamy", "child")),
            StyleRule::Storybook
        );
    }

    #[test]
    fn test_adult_rule_set() {
        assert_eq!(
            select_style(&concept(&["abstract"], "Calm", "adult")),
            StyleRule::ZenMandala
        );
        assert_eq!(
            select_style(&concept(&["bird"], "Calm", "adult")),
            StyleRule::Botanical
        );
    }

    #[tokio::test]
    async fn test_styling_is_deterministic() {
        let stylist = Stylist::new();
        let input = StylingInput::initial(concept(&["cute", "fox"], "Playful", "child"));
        let a = stylist.run(input.clone()).await.unwrap();
        let b = stylist.run(input).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_concept_fields_are_echoed_unchanged() {
        let stylist = Stylist::new();
        let c = concept(&["nature"], "Calm", "child");
        let styled = stylist.run(StylingInput::initial(c.clone())).await.unwrap();
        assert_eq!(styled.concept, c);
        assert!(!styled.positive_prompt.is_empty());
        assert!(!styled.negative_prompt.is_empty());
    }

    #[tokio::test]
    async fn test_feedback_is_woven_into_the_prompt() {
        let stylist = Stylist::new();
        let c = concept(&["fox"], "Playful", "child");

        let plain = stylist
            .run(StylingInput::initial(c.clone()))
            .await
            .unwrap();
        let corrected = stylist
            .run(StylingInput::with_feedback(
                c,
                "The scarf is filled in solid black.".to_string(),
            ))
            .await
            .unwrap();

        assert_ne!(plain.positive_prompt, corrected.positive_prompt);
        assert!(corrected
            .positive_prompt
            .contains("defined only by its outline"));
        // Woven into the subject clause, not appended after the closer.
        assert!(corrected.positive_prompt.ends_with("grayscale fill."));
    }

    #[tokio::test]
    async fn test_avoid_elements_extend_negative_prompt() {
        let stylist = Stylist::new();
        let mut c = concept(&["dinosaur"], "Playful", "child");
        c.avoid_elements = vec!["scary teeth".to_string(), "shading".to_string()];
        let styled = stylist.run(StylingInput::initial(c)).await.unwrap();

        assert!(styled.negative_prompt.iter().any(|n| n == "scary teeth"));
        // Duplicates from the style list are not repeated.
        assert_eq!(
            styled
                .negative_prompt
                .iter()
                .filter(|n| n.as_str() == "shading")
                .count(),
            1
        );
    }
}
