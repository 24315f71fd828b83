use serde::{Deserialize, Serialize};

/// Difficulty level claimed by a recipe, as parsed from the hunter's
/// structured output. Recipes with unparseable difficulty carry `None`
/// and score the documented neutral default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Some(Difficulty::Beginner),
            "intermediate" => Some(Difficulty::Intermediate),
            "advanced" => Some(Difficulty::Advanced),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

/// One raw recipe produced by the hunter stage, normalized to flat fields
/// before it ever reaches the ranking engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeCandidate {
    pub title: String,
    /// Canonical identifier within a run. Candidates sharing a URL are
    /// deduplicated first-seen by the ranking engine's filter phase.
    pub url: String,
    pub source: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    /// Techniques the recipe exercises ("deglazing", "kneading", ...).
    #[serde(default)]
    pub techniques: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_estimate: Option<String>,
    /// Relevance score reported by the search provider, in [0, 1].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_score: Option<f64>,
}

/// A candidate together with its computed ranking score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate: RecipeCandidate,
    pub score: f64,
}

/// The candidate fields projected into a final card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub title: String,
    pub url: String,
    pub source: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_estimate: Option<String>,
}

impl From<&RecipeCandidate> for RecipeSummary {
    fn from(c: &RecipeCandidate) -> Self {
        Self {
            title: c.title.clone(),
            url: c.url.clone(),
            source: c.source.clone(),
            author: c.author.clone(),
            published_date: c.published_date.clone(),
            difficulty: c.difficulty,
            time_estimate: c.time_estimate.clone(),
        }
    }
}

/// Estimated per-serving nutrition for a card. All values are estimates
/// from the enrichment boundary; `None` means the estimate was unavailable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutritionEstimate {
    pub calories: Option<u32>,
    pub protein_g: Option<u32>,
    pub carbs_g: Option<u32>,
    pub fat_g: Option<u32>,
    pub fiber_g: Option<u32>,
    pub sodium_mg: Option<u32>,
    pub servings: u32,
    pub disclaimer: String,
}

impl NutritionEstimate {
    /// The documented default when estimation fails or is skipped.
    pub fn unavailable(servings: u32) -> Self {
        Self {
            calories: None,
            protein_g: None,
            carbs_g: None,
            fat_g: None,
            fiber_g: None,
            sodium_mg: None,
            servings,
            disclaimer: "Nutrition data unavailable".to_string(),
        }
    }
}

/// One selected, enriched recipe returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeCard {
    pub recipe: RecipeSummary,
    /// Opaque rationale text from the enrichment boundary. Guaranteed
    /// non-empty (a deterministic fallback is substituted otherwise).
    pub reasoning: String,
    pub technique_highlights: Vec<String>,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<NutritionEstimate>,
}

/// Comparison between the two leading cards.
///
/// `NotApplicable` is the documented sentinel for selections smaller than
/// two; callers never need to index a second element to find out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Comparison {
    SideBySide {
        first_focus: String,
        second_focus: String,
        /// Up to 3 techniques both leading cards share.
        shared_techniques: Vec<String>,
    },
    NotApplicable,
}

impl Comparison {
    pub fn is_applicable(&self) -> bool {
        matches!(self, Comparison::SideBySide { .. })
    }
}

/// How the run ended from the caller's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// At least one card was produced.
    Complete,
    /// Retries and both filter passes were exhausted without producing a
    /// single card. Not an error; the metadata explains what happened.
    NotFound,
}

/// Bookkeeping attached to every report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub search_calls: u32,
    pub llm_calls: u32,
    pub retry_count: u32,
    pub warnings: Vec<String>,
    pub elapsed_ms: u64,
}

/// The caller-facing result of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchReport {
    pub outcome: Outcome,
    pub cards: Vec<RecipeCard>,
    pub comparison: Comparison,
    pub metadata: ReportMetadata,
}
