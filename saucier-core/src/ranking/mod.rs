//! Deterministic ranking and diversity selection over recipe candidates.
//!
//! This module is pure and synchronous: given the same candidates, params,
//! and config it always produces the same selection. All external-service
//! interaction happens in the stages that surround it.
//!
//! The engine runs three phases:
//! 1. filter — exclusions, URL dedup, dietary constraints (with a relaxed
//!    second pass when over-filtering would starve the selection)
//! 2. score — a weighted sum of five independently-capped terms
//! 3. select — diversity-aware top-K with a backfill pass
//!
//! An empty selection is a legitimate result here. Turning it into a
//! retry (orchestrator) or a not-found outcome (report) is the caller's
//! job, never the engine's.

mod filter;
mod score;
mod select;

pub use filter::{FilterOutcome, MIN_FILTER_SURVIVORS};
pub use score::score_candidate;
pub use select::compare_leading;

use serde::{Deserialize, Serialize};

use crate::state::SkillLevel;
use crate::types::{Comparison, RecipeCandidate, ScoredCandidate};

/// Default stop words removed from titles before the shared-key-word test.
const DEFAULT_STOP_WORDS: &[&str] = &[
    "with", "and", "the", "in", "for", "to", "recipe", "easy", "simple", "best", "a", "an", "how",
    "make", "homemade",
];

/// Tunable knobs for the selection phase.
///
/// The similarity thresholds are heuristics, not derived from a model;
/// they live here rather than at call sites so a deployment can tune them
/// per dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Number of cards to select. 3 is authoritative across the engine and
    /// the caller-facing contract.
    pub top_k: usize,
    /// Two titles sharing at least this many non-stop-word tokens are
    /// considered the same dish.
    pub min_shared_tokens: usize,
    /// Overlap ratio (shared / smaller token set) above which two titles
    /// are considered the same dish.
    pub max_overlap_ratio: f64,
    /// Words ignored when tokenizing titles.
    pub stop_words: Vec<String>,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            min_shared_tokens: 2,
            max_overlap_ratio: 0.3,
            stop_words: DEFAULT_STOP_WORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// The request-derived inputs the engine needs.
#[derive(Debug, Clone)]
pub struct RankingParams<'a> {
    pub learning_goal: &'a str,
    pub skill_level: SkillLevel,
    pub dietary_restrictions: &'a [String],
    pub excluded_urls: &'a [String],
}

/// Everything the engine produces for one run.
#[derive(Debug, Clone)]
pub struct Selection {
    /// All surviving candidates with their scores, sorted descending.
    pub scored: Vec<ScoredCandidate>,
    /// The diverse top-K, at most `config.top_k` entries.
    pub selected: Vec<ScoredCandidate>,
    /// Comparison of the two leading selections, from their technique tags.
    pub comparison: Comparison,
    /// True when the dietary filter had to be relaxed to keep at least
    /// [`MIN_FILTER_SURVIVORS`] candidates alive.
    pub relaxed_filter: bool,
}

/// Filter, score, and select candidates.
pub fn select(
    candidates: &[RecipeCandidate],
    params: &RankingParams<'_>,
    config: &RankingConfig,
) -> Selection {
    let FilterOutcome { survivors, relaxed } = filter::apply(candidates, params);

    let mut scored: Vec<ScoredCandidate> = survivors
        .into_iter()
        .map(|candidate| {
            let score = score::score_candidate(&candidate, params);
            ScoredCandidate { candidate, score }
        })
        .collect();

    // Stable sort: candidates with equal scores keep first-seen order.
    // Scores are finite by construction, so the comparison never falls
    // through to Equal for NaN reasons.
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let selected = select::diverse_top_k(&scored, config);

    let leading: Vec<(String, Vec<String>)> = selected
        .iter()
        .map(|s| (s.candidate.title.clone(), s.candidate.techniques.clone()))
        .collect();
    let comparison = select::compare_leading(&leading);

    tracing::debug!(
        candidates = candidates.len(),
        scored = scored.len(),
        selected = selected.len(),
        relaxed,
        "ranking complete"
    );

    Selection {
        scored,
        selected,
        comparison,
        relaxed_filter: relaxed,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::types::RecipeCandidate;

    /// Minimal candidate for engine tests.
    pub fn candidate(title: &str, url: &str) -> RecipeCandidate {
        RecipeCandidate {
            title: title.to_string(),
            url: url.to_string(),
            source: "Test Kitchen".to_string(),
            author: "Unknown".to_string(),
            published_date: None,
            difficulty: None,
            techniques: Vec::new(),
            ingredients: Vec::new(),
            instructions: Vec::new(),
            time_estimate: None,
            search_score: None,
        }
    }
}
