//! Pipeline orchestrator: a small finite-state machine over named stages
//! with one conditional edge.
//!
//! ```text
//! Plan ──► Hunt ──► (decision) ──► Personalize ──► Nutrition ──► End
//!  ▲                    │
//!  └────── retry ◄──────┘   (bounded by MAX_RETRIES)
//! ```
//!
//! The decision after Hunt is the only branch point and is evaluated
//! exactly once per Hunt completion. Because [`route_after_hunt`] returns
//! `Retry` only while `retry_count < MAX_RETRIES` and every retry
//! increments the monotonic counter, the Plan/Hunt pair runs at most
//! `MAX_RETRIES + 1` times and the loop always terminates.

use thiserror::Error;
use tracing::{info_span, Instrument};

use crate::stages::{ResearchStage, StageError};
use crate::state::{
    ResearchRequest, ResearchState, RequestError, SearchStrategy, MAX_RETRIES, MIN_CANDIDATES,
};
use crate::types::ResearchReport;

/// Stages of one pipeline run, in the order they chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Plan,
    Hunt,
    Personalize,
    Nutrition,
    End,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Plan => "plan",
            Stage::Hunt => "hunt",
            Stage::Personalize => "personalize",
            Stage::Nutrition => "nutrition",
            Stage::End => "end",
        }
    }
}

/// Outcome of the single conditional edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Loop back to planning with a broadened strategy.
    Retry,
    /// Proceed to personalization.
    Advance,
}

/// The decision function for the conditional edge after Hunt.
///
/// Pure: inspects the candidate count and the retry counter, nothing
/// else, and mutates nothing. The orchestrator applies the retry side
/// effects (strategy, counter, warning) when this returns `Retry`.
pub fn route_after_hunt(state: &ResearchState) -> Route {
    if state.candidates.len() < MIN_CANDIDATES && state.retry_count() < MAX_RETRIES {
        Route::Retry
    } else {
        Route::Advance
    }
}

/// Error from a pipeline run. Business conditions (no candidates, empty
/// selection) are never errors; they surface through the report's outcome.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestError),

    #[error("stage {stage} failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: StageError,
    },
}

/// Owns the four stages and drives the state machine.
pub struct ResearchPipeline {
    planner: Box<dyn ResearchStage>,
    hunter: Box<dyn ResearchStage>,
    personalizer: Box<dyn ResearchStage>,
    nutritionist: Box<dyn ResearchStage>,
}

impl ResearchPipeline {
    /// Wire a pipeline from explicit stage implementations. Production
    /// code goes through [`crate::build_pipeline`]; tests inject stubs
    /// here.
    pub fn from_stages(
        planner: Box<dyn ResearchStage>,
        hunter: Box<dyn ResearchStage>,
        personalizer: Box<dyn ResearchStage>,
        nutritionist: Box<dyn ResearchStage>,
    ) -> Self {
        Self {
            planner,
            hunter,
            personalizer,
            nutritionist,
        }
    }

    /// Run one research request to completion.
    ///
    /// Returns `Err` only for an invalid request or a stage fault; an
    /// unproductive run returns `Ok` with `Outcome::NotFound` in the
    /// report.
    pub async fn run(&self, request: ResearchRequest) -> Result<ResearchReport, PipelineError> {
        let mut state = ResearchState::new(request)?;
        let mut stage = Stage::Plan;

        while stage != Stage::End {
            stage = match stage {
                Stage::Plan => {
                    self.execute_stage(self.planner.as_ref(), &mut state).await?;
                    Stage::Hunt
                }
                Stage::Hunt => {
                    self.execute_stage(self.hunter.as_ref(), &mut state).await?;
                    match route_after_hunt(&state) {
                        Route::Retry => {
                            let count = state.candidates.len();
                            state.strategy = SearchStrategy::Broadened;
                            state.record_retry();
                            state.warn(format!(
                                "Low recipe count ({count}), retrying with broader search"
                            ));
                            Stage::Plan
                        }
                        Route::Advance => Stage::Personalize,
                    }
                }
                Stage::Personalize => {
                    self.execute_stage(self.personalizer.as_ref(), &mut state)
                        .await?;
                    Stage::Nutrition
                }
                Stage::Nutrition => {
                    self.execute_stage(self.nutritionist.as_ref(), &mut state)
                        .await?;
                    Stage::End
                }
                Stage::End => Stage::End,
            };
        }

        Ok(state.into_report())
    }

    async fn execute_stage(
        &self,
        stage: &dyn ResearchStage,
        state: &mut ResearchState,
    ) -> Result<(), PipelineError> {
        let meta = stage.metadata();
        let result = stage
            .execute(state)
            .instrument(info_span!("pipeline_stage", stage = meta.name))
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(e) if meta.continues_on_failure => {
                tracing::warn!(stage = meta.name, error = %e, "stage failed, continuing");
                state.warn(format!("{} failed: {e}", meta.name));
                Ok(())
            }
            Err(source) => Err(PipelineError::Stage {
                stage: meta.name,
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::stages::StageMetadata;
    use crate::state::SkillLevel;
    use crate::types::{Outcome, RecipeCandidate};

    /// Stage stub that counts invocations and optionally produces
    /// candidates or fails.
    struct StubStage {
        name: &'static str,
        continues_on_failure: bool,
        calls: Arc<AtomicU32>,
        candidates_per_run: usize,
        fail: bool,
    }

    impl StubStage {
        fn new(name: &'static str) -> (Self, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            (
                Self {
                    name,
                    continues_on_failure: false,
                    calls: calls.clone(),
                    candidates_per_run: 0,
                    fail: false,
                },
                calls,
            )
        }

        fn with_candidates(mut self, count: usize) -> Self {
            self.candidates_per_run = count;
            self
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }

        fn tolerated(mut self) -> Self {
            self.continues_on_failure = true;
            self
        }
    }

    #[async_trait]
    impl ResearchStage for StubStage {
        fn metadata(&self) -> StageMetadata {
            StageMetadata {
                name: self.name,
                description: "stub",
                continues_on_failure: self.continues_on_failure,
            }
        }

        async fn execute(&self, state: &mut ResearchState) -> Result<(), StageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StageError::Internal("stub failure".to_string()));
            }
            state.candidates = (0..self.candidates_per_run)
                .map(|i| RecipeCandidate {
                    title: format!("Dish {i}"),
                    url: format!("https://stub.test/{i}"),
                    source: "Stub".to_string(),
                    author: "Unknown".to_string(),
                    published_date: None,
                    difficulty: None,
                    techniques: Vec::new(),
                    ingredients: Vec::new(),
                    instructions: Vec::new(),
                    time_estimate: None,
                    search_score: None,
                })
                .collect();
            Ok(())
        }
    }

    fn request() -> ResearchRequest {
        ResearchRequest::new("pan sauces", SkillLevel::Beginner)
    }

    fn pipeline_with_hunter(hunter: StubStage) -> (ResearchPipeline, Arc<AtomicU32>) {
        let (planner, planner_calls) = StubStage::new("plan_queries");
        let (personalizer, _) = StubStage::new("personalize");
        let (nutritionist, _) = StubStage::new("analyze_nutrition");
        (
            ResearchPipeline::from_stages(
                Box::new(planner),
                Box::new(hunter),
                Box::new(personalizer),
                Box::new(nutritionist),
            ),
            planner_calls,
        )
    }

    #[test]
    fn routing_table() {
        let mut state = ResearchState::new(request()).unwrap();

        // Zero candidates, fresh run: retry.
        assert_eq!(route_after_hunt(&state), Route::Retry);

        // Budget exhausted: advance regardless of candidate count.
        state.record_retry();
        state.record_retry();
        assert_eq!(route_after_hunt(&state), Route::Advance);
    }

    #[tokio::test]
    async fn barren_search_terminates_after_retry_budget() {
        let (hunter, hunter_calls) = StubStage::new("hunt_recipes");
        let (pipeline, planner_calls) = pipeline_with_hunter(hunter.with_candidates(0));

        let report = pipeline.run(request()).await.unwrap();

        // Entry pair ran MAX_RETRIES + 1 times, then the run advanced.
        assert_eq!(planner_calls.load(Ordering::SeqCst), MAX_RETRIES + 1);
        assert_eq!(hunter_calls.load(Ordering::SeqCst), MAX_RETRIES + 1);
        assert_eq!(report.metadata.retry_count, MAX_RETRIES);
        assert_eq!(report.outcome, Outcome::NotFound);
        assert!(report.cards.is_empty());
        // One warning per retry.
        assert_eq!(report.metadata.warnings.len(), MAX_RETRIES as usize);
    }

    #[tokio::test]
    async fn productive_hunt_advances_without_retry() {
        let (hunter, hunter_calls) = StubStage::new("hunt_recipes");
        let (pipeline, planner_calls) = pipeline_with_hunter(hunter.with_candidates(3));

        let report = pipeline.run(request()).await.unwrap();

        assert_eq!(planner_calls.load(Ordering::SeqCst), 1);
        assert_eq!(hunter_calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.metadata.retry_count, 0);
        assert!(report.metadata.warnings.is_empty());
    }

    #[tokio::test]
    async fn stage_fault_propagates() {
        let (hunter, _) = StubStage::new("hunt_recipes");
        let (planner, _) = StubStage::new("plan_queries");
        let (personalizer, _) = StubStage::new("personalize");
        let (nutritionist, _) = StubStage::new("analyze_nutrition");

        let pipeline = ResearchPipeline::from_stages(
            Box::new(planner),
            Box::new(hunter.with_candidates(3)),
            Box::new(personalizer.failing()),
            Box::new(nutritionist),
        );

        let err = pipeline.run(request()).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Stage {
                stage: "personalize",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn tolerated_stage_failure_becomes_warning() {
        let (hunter, _) = StubStage::new("hunt_recipes");
        let (planner, _) = StubStage::new("plan_queries");
        let (personalizer, _) = StubStage::new("personalize");
        let (nutritionist, nutrition_calls) = StubStage::new("analyze_nutrition");

        let pipeline = ResearchPipeline::from_stages(
            Box::new(planner),
            Box::new(hunter.with_candidates(3)),
            Box::new(personalizer),
            Box::new(nutritionist.failing().tolerated()),
        );

        let report = pipeline.run(request()).await.unwrap();
        assert_eq!(nutrition_calls.load(Ordering::SeqCst), 1);
        assert!(report
            .metadata
            .warnings
            .iter()
            .any(|w| w.contains("analyze_nutrition failed")));
    }

    #[tokio::test]
    async fn invalid_request_is_rejected_up_front() {
        let (hunter, _) = StubStage::new("hunt_recipes");
        let (pipeline, _) = pipeline_with_hunter(hunter);

        let err = pipeline
            .run(ResearchRequest::new("  ", SkillLevel::Beginner))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRequest(_)));
    }
}
