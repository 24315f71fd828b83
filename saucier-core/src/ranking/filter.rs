//! Filter phase: exclusions, URL dedup, dietary constraints.

use std::collections::HashSet;

use crate::types::RecipeCandidate;

use super::RankingParams;

/// If the dietary pass leaves fewer survivors than this, it is re-run with
/// constraints relaxed to empty. A documented fallback, not a failure.
pub const MIN_FILTER_SURVIVORS: usize = 2;

/// Result of the filter phase.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub survivors: Vec<RecipeCandidate>,
    /// True when the relaxed second pass was taken.
    pub relaxed: bool,
}

/// Forbidden ingredient terms per dietary restriction. Unknown restrictions
/// forbid nothing rather than failing the run.
fn forbidden_terms(restriction: &str) -> &'static [&'static str] {
    const MEAT: &[&str] = &["chicken", "beef", "pork", "fish", "meat"];
    const VEGAN: &[&str] = &[
        "chicken", "beef", "pork", "fish", "meat", "egg", "dairy", "milk", "cheese", "butter",
    ];
    const GLUTEN: &[&str] = &["flour", "wheat", "bread", "pasta"];

    match restriction.trim().to_lowercase().as_str() {
        "vegetarian" => MEAT,
        "vegan" => VEGAN,
        "gluten-free" => GLUTEN,
        _ => &[],
    }
}

/// Flat lowercase text searched for forbidden terms: ingredients plus
/// technique tags, already normalized to strings at the hunter boundary.
fn searchable_text(candidate: &RecipeCandidate) -> String {
    let mut text = candidate.ingredients.join(" ");
    text.push(' ');
    text.push_str(&candidate.techniques.join(" "));
    text.to_lowercase()
}

fn violates_restrictions(candidate: &RecipeCandidate, restrictions: &[String]) -> bool {
    if restrictions.is_empty() {
        return false;
    }
    let text = searchable_text(candidate);
    restrictions.iter().any(|restriction| {
        forbidden_terms(restriction)
            .iter()
            .any(|term| text.contains(term))
    })
}

/// Run the full filter phase.
///
/// Order matters: exclusions and dedup happen once; only the dietary pass
/// is re-run when it over-filters.
pub fn apply(candidates: &[RecipeCandidate], params: &RankingParams<'_>) -> FilterOutcome {
    let mut seen_urls: HashSet<&str> = HashSet::new();
    let eligible: Vec<&RecipeCandidate> = candidates
        .iter()
        .filter(|c| !params.excluded_urls.iter().any(|url| url == &c.url))
        .filter(|c| seen_urls.insert(c.url.as_str()))
        .collect();

    let survivors: Vec<RecipeCandidate> = eligible
        .iter()
        .filter(|c| !violates_restrictions(c, params.dietary_restrictions))
        .map(|c| (*c).clone())
        .collect();

    if survivors.len() >= MIN_FILTER_SURVIVORS || params.dietary_restrictions.is_empty() {
        return FilterOutcome {
            survivors,
            relaxed: false,
        };
    }

    tracing::debug!(
        survivors = survivors.len(),
        "dietary filter left too few candidates, relaxing constraints"
    );

    FilterOutcome {
        survivors: eligible.into_iter().cloned().collect(),
        relaxed: true,
    }
}
