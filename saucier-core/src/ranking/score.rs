//! Score phase: a weighted sum of five independently-capped terms.
//!
//! Every term substitutes a documented default for missing or malformed
//! input, so the total is always a finite f64. The sum itself is not
//! clamped; a hard skill mismatch can push it negative.

use std::sync::LazyLock;

use chrono::{Datelike, Utc};
use regex::Regex;

use crate::state::SkillLevel;
use crate::types::{Difficulty, RecipeCandidate};

use super::RankingParams;

/// Canonical techniques per learning goal. Goals outside the table fall
/// back to matching on the goal's own words.
fn canonical_techniques(goal: &str) -> Option<&'static [&'static str]> {
    match goal.trim().to_lowercase().as_str() {
        "pan sauces" => Some(&["deglazing", "emulsification", "reduction", "mounting butter"]),
        "bread baking" => Some(&["kneading", "proofing", "scoring", "fermentation"]),
        "knife skills" => Some(&["julienne", "brunoise", "chiffonade", "dicing"]),
        "roasting" => Some(&["searing", "basting", "temperature control", "resting"]),
        "pasta" => Some(&["dough making", "rolling", "shaping", "sauce pairing"]),
        _ => None,
    }
}

/// Learning-value term, capped at 30: 10 points per canonical technique
/// that appears as a substring of any candidate tag.
pub fn learning_value_term(goal: &str, techniques: &[String]) -> f64 {
    let goal_lower = goal.to_lowercase();
    let tags: Vec<String> = techniques.iter().map(|t| t.to_lowercase()).collect();

    let matches = match canonical_techniques(&goal_lower) {
        Some(keywords) => keywords
            .iter()
            .filter(|kw| tags.iter().any(|tag| tag.contains(*kw)))
            .count(),
        None => goal_lower
            .split_whitespace()
            .filter(|word| tags.iter().any(|tag| tag.contains(word)))
            .count(),
    };

    f64::min(matches as f64 * 10.0, 30.0)
}

/// Skill-match term in −10..=25: exact match 25, one level off 8 or 12/3
/// depending on direction, two levels off −10. Unrecognized difficulty
/// scores the neutral default 10.
pub fn skill_match_term(skill: SkillLevel, difficulty: Option<Difficulty>) -> f64 {
    let Some(difficulty) = difficulty else {
        return 10.0;
    };

    match (skill, difficulty) {
        (SkillLevel::Beginner, Difficulty::Beginner) => 25.0,
        (SkillLevel::Beginner, Difficulty::Intermediate) => 8.0,
        (SkillLevel::Beginner, Difficulty::Advanced) => -10.0,
        (SkillLevel::Intermediate, Difficulty::Beginner) => 3.0,
        (SkillLevel::Intermediate, Difficulty::Intermediate) => 25.0,
        (SkillLevel::Intermediate, Difficulty::Advanced) => 12.0,
        (SkillLevel::Advanced, Difficulty::Beginner) => -10.0,
        (SkillLevel::Advanced, Difficulty::Intermediate) => 8.0,
        (SkillLevel::Advanced, Difficulty::Advanced) => 25.0,
    }
}

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19|20)\d{2}\b").expect("year regex is valid"));

fn extract_year(published: &str) -> Option<i32> {
    YEAR_RE.find(published).and_then(|m| m.as_str().parse().ok())
}

/// Recency term, banded by publication year relative to now: this year or
/// last 20, two years back 15, three 10, older 5. No parseable year
/// contributes the neutral 10.
pub fn recency_term(published: Option<&str>) -> f64 {
    let year = published.and_then(extract_year);
    let Some(year) = year else {
        return 10.0;
    };

    let age = (Utc::now().year() - year).max(0);
    match age {
        0 | 1 => 20.0,
        2 => 15.0,
        3 => 10.0,
        _ => 5.0,
    }
}

/// Source-relevance term, capped at 15: the search provider's relevance
/// score scaled up. Absent or non-finite scores default to 0.5.
pub fn source_relevance_term(search_score: Option<f64>) -> f64 {
    let score = search_score
        .filter(|s| s.is_finite())
        .unwrap_or(0.5)
        .clamp(0.0, 1.0);
    score * 15.0
}

/// Tag-diversity term: 10 for three or more technique tags, 5 for exactly
/// two, otherwise 0.
pub fn tag_diversity_term(techniques: &[String]) -> f64 {
    match techniques.len() {
        n if n >= 3 => 10.0,
        2 => 5.0,
        _ => 0.0,
    }
}

/// Total score for one candidate: the unclamped sum of the five terms.
pub fn score_candidate(candidate: &RecipeCandidate, params: &RankingParams<'_>) -> f64 {
    learning_value_term(params.learning_goal, &candidate.techniques)
        + skill_match_term(params.skill_level, candidate.difficulty)
        + recency_term(candidate.published_date.as_deref())
        + source_relevance_term(candidate.search_score)
        + tag_diversity_term(&candidate.techniques)
}
