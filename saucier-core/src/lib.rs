//! Recipe research pipeline.
//!
//! One run takes a learning goal ("pan sauces"), a skill level, and
//! optional dietary constraints, then drives a staged pipeline: plan
//! search queries, hunt for recipes on the web, deterministically rank
//! and select a diverse top set, and enrich the winners with rationale
//! and nutrition estimates. An unproductive hunt loops back to planning
//! with a broadened strategy, at most [`state::MAX_RETRIES`] times.
//!
//! External services (LLM completions, web search) sit behind the
//! [`llm::LlmProvider`] and [`search::SearchProvider`] traits; everything
//! between those boundaries is deterministic and testable with the fake
//! implementations.

pub mod config;
pub mod graph;
pub mod llm;
pub mod ranking;
pub mod search;
pub mod stages;
pub mod state;
pub mod types;

use std::sync::Arc;

pub use config::{ConfigError, ResearchConfig};
pub use graph::{route_after_hunt, PipelineError, ResearchPipeline, Route, Stage};
pub use state::{
    ResearchRequest, ResearchState, SearchStrategy, SkillLevel, MAX_RETRIES, MIN_CANDIDATES,
};
pub use types::{
    Comparison, Difficulty, NutritionEstimate, Outcome, RecipeCandidate, RecipeCard,
    RecipeSummary, ReportMetadata, ResearchReport, ScoredCandidate,
};

use llm::LlmProvider;
use search::SearchProvider;
use stages::{NutritionAnalyzerStage, PersonalizationStage, QueryPlannerStage, RecipeHunterStage};

/// Wire a production pipeline from providers and config.
pub fn build_pipeline(
    llm: Arc<dyn LlmProvider>,
    search: Arc<dyn SearchProvider>,
    config: ResearchConfig,
) -> ResearchPipeline {
    let config = Arc::new(config);
    ResearchPipeline::from_stages(
        Box::new(QueryPlannerStage::new(llm.clone(), config.clone())),
        Box::new(RecipeHunterStage::new(search, llm.clone(), config.clone())),
        Box::new(PersonalizationStage::new(llm.clone(), config)),
        Box::new(NutritionAnalyzerStage::new(llm)),
    )
}

/// Wire a pipeline entirely from environment variables.
///
/// Provider selection and credentials follow
/// [`llm::create_provider_from_env`] and
/// [`search::create_search_provider_from_env`]; tunables follow
/// [`ResearchConfig::from_env`].
pub fn build_pipeline_from_env() -> Result<ResearchPipeline, PipelineSetupError> {
    let llm: Arc<dyn LlmProvider> = Arc::from(llm::create_cached_provider_from_env()?);
    let search: Arc<dyn SearchProvider> = Arc::from(search::create_search_provider_from_env()?);
    let config = ResearchConfig::from_env()?;
    Ok(build_pipeline(llm, search, config))
}

/// Error wiring a pipeline from the environment.
#[derive(Debug, thiserror::Error)]
pub enum PipelineSetupError {
    #[error("LLM provider: {0}")]
    Llm(#[from] llm::LlmError),

    #[error("search provider: {0}")]
    Search(#[from] search::SearchError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),
}
