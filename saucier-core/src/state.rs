//! Pipeline state threaded through every stage of one research run.
//!
//! The state is exclusively owned by its run: the orchestrator creates it,
//! passes it `&mut` to each stage in sequence, and consumes it into a
//! [`ResearchReport`] at the end. Nothing here is shared across runs.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{
    Comparison, Outcome, RecipeCandidate, RecipeCard, ReportMetadata, ResearchReport,
    ScoredCandidate,
};

/// Maximum number of times the orchestrator may loop back to the planning
/// stage when the hunt comes up short.
pub const MAX_RETRIES: u32 = 2;

/// Minimum candidate count below which the retry edge fires.
pub const MIN_CANDIDATES: usize = 2;

/// The requester's cooking skill level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl SkillLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillLevel::Beginner => "beginner",
            SkillLevel::Intermediate => "intermediate",
            SkillLevel::Advanced => "advanced",
        }
    }

    /// Parse leniently; unrecognized input defaults to intermediate, the
    /// same default the intent boundary applies upstream.
    pub fn parse_or_default(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "beginner" => SkillLevel::Beginner,
            "advanced" => SkillLevel::Advanced,
            _ => SkillLevel::Intermediate,
        }
    }
}

/// Hint carried in state that tells the planner how wide to cast its net.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    Initial,
    Broadened,
}

/// Validated input for one research run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub learning_goal: String,
    pub skill_level: SkillLevel,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    /// URLs the caller has already seen and does not want again.
    #[serde(default)]
    pub excluded_urls: Vec<String>,
    /// Free-text constraints ("minimal oil", "quick") fed to query planning.
    #[serde(default)]
    pub constraints: Vec<String>,
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("learning goal must not be empty")]
    EmptyGoal,
}

impl ResearchRequest {
    pub fn new(learning_goal: impl Into<String>, skill_level: SkillLevel) -> Self {
        Self {
            learning_goal: learning_goal.into(),
            skill_level,
            dietary_restrictions: Vec::new(),
            excluded_urls: Vec::new(),
            constraints: Vec::new(),
        }
    }

    fn validate(&self) -> Result<(), RequestError> {
        if self.learning_goal.trim().is_empty() {
            return Err(RequestError::EmptyGoal);
        }
        Ok(())
    }
}

/// The single mutable record threaded through every stage.
///
/// Stage contracts (reads → writes):
/// - planner: goal, skill, diet, constraints, strategy → `search_queries`
/// - hunter: `search_queries` → `candidates`
/// - personalize: `candidates`, inputs → `scored`, `final_cards`, `comparison`
/// - nutrition: `final_cards` → `final_cards[*].nutrition`
///
/// All stages may append to `warnings` and bump the call counters.
#[derive(Debug)]
pub struct ResearchState {
    pub request: ResearchRequest,

    pub strategy: SearchStrategy,
    retry_count: u32,

    pub search_queries: Vec<String>,
    pub candidates: Vec<RecipeCandidate>,
    pub scored: Vec<ScoredCandidate>,
    pub final_cards: Vec<RecipeCard>,
    pub comparison: Comparison,

    pub warnings: Vec<String>,
    pub search_calls: u32,
    pub llm_calls: u32,
    started_at: Instant,
}

impl ResearchState {
    /// Create the state for one run with all derived fields at their zero
    /// value. Fails only on an empty learning goal.
    pub fn new(request: ResearchRequest) -> Result<Self, RequestError> {
        request.validate()?;
        Ok(Self {
            request,
            strategy: SearchStrategy::Initial,
            retry_count: 0,
            search_queries: Vec::new(),
            candidates: Vec::new(),
            scored: Vec::new(),
            final_cards: Vec::new(),
            comparison: Comparison::NotApplicable,
            warnings: Vec::new(),
            search_calls: 0,
            llm_calls: 0,
            started_at: Instant::now(),
        })
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Record one retry. The counter only moves up and saturates at
    /// [`MAX_RETRIES`]; callers gate on [`crate::graph::route_after_hunt`]
    /// so the saturation arm is never hit in practice.
    pub fn record_retry(&mut self) {
        if self.retry_count < MAX_RETRIES {
            self.retry_count += 1;
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(warning = %message, "pipeline warning");
        self.warnings.push(message);
    }

    /// Consume the state into the caller-facing report.
    pub fn into_report(self) -> ResearchReport {
        let outcome = if self.final_cards.is_empty() {
            Outcome::NotFound
        } else {
            Outcome::Complete
        };
        ResearchReport {
            outcome,
            cards: self.final_cards,
            comparison: self.comparison,
            metadata: ReportMetadata {
                search_calls: self.search_calls,
                llm_calls: self.llm_calls,
                retry_count: self.retry_count,
                warnings: self.warnings,
                elapsed_ms: self.started_at.elapsed().as_millis() as u64,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_goal() {
        let request = ResearchRequest::new("   ", SkillLevel::Beginner);
        assert!(ResearchState::new(request).is_err());
    }

    #[test]
    fn retry_counter_is_monotonic_and_bounded() {
        let request = ResearchRequest::new("pan sauces", SkillLevel::Beginner);
        let mut state = ResearchState::new(request).unwrap();

        assert_eq!(state.retry_count(), 0);
        state.record_retry();
        assert_eq!(state.retry_count(), 1);
        state.record_retry();
        state.record_retry();
        state.record_retry();
        assert_eq!(state.retry_count(), MAX_RETRIES);
    }

    #[test]
    fn empty_selection_reports_not_found() {
        let request = ResearchRequest::new("pan sauces", SkillLevel::Beginner);
        let state = ResearchState::new(request).unwrap();
        let report = state.into_report();
        assert_eq!(report.outcome, Outcome::NotFound);
        assert!(report.cards.is_empty());
        assert_eq!(report.comparison, Comparison::NotApplicable);
    }

    #[test]
    fn skill_level_parses_leniently() {
        assert_eq!(
            SkillLevel::parse_or_default("Beginner"),
            SkillLevel::Beginner
        );
        assert_eq!(
            SkillLevel::parse_or_default("chef de cuisine"),
            SkillLevel::Intermediate
        );
    }
}
