//! Pipeline stages and the trait that binds them.
//!
//! Each stage reads and writes a declared slice of [`ResearchState`]
//! (documented on the state struct). Stages that talk to external services
//! degrade to defaults and warnings on business failures; only programming
//! or infrastructure faults surface as [`StageError`].

mod hunter;
mod nutrition;
mod personalize;
mod planner;

pub use hunter::RecipeHunterStage;
pub use nutrition::NutritionAnalyzerStage;
pub use personalize::PersonalizationStage;
pub use planner::QueryPlannerStage;

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::LlmError;
use crate::search::SearchError;
use crate::state::ResearchState;

/// Metadata about a pipeline stage.
#[derive(Debug, Clone)]
pub struct StageMetadata {
    /// Unique identifier ("plan_queries", "hunt_recipes", ...)
    pub name: &'static str,
    pub description: &'static str,
    /// If true, an `Err` from this stage is downgraded to a warning and
    /// the pipeline keeps going.
    pub continues_on_failure: bool,
}

/// Error raised by a stage. These are faults, not business conditions:
/// "no candidates found" is state, not an error.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("search call failed: {0}")]
    Search(#[from] SearchError),

    #[error("{0}")]
    Internal(String),
}

/// The trait every pipeline stage implements.
#[async_trait]
pub trait ResearchStage: Send + Sync {
    fn metadata(&self) -> StageMetadata;

    async fn execute(&self, state: &mut ResearchState) -> Result<(), StageError>;
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;
    use crate::config::ResearchConfig;
    use crate::llm::FakeProvider;
    use crate::search::FakeSearch;

    #[test]
    fn stage_names_are_unique() {
        let llm: Arc<dyn crate::llm::LlmProvider> = Arc::new(FakeProvider::default());
        let search: Arc<dyn crate::search::SearchProvider> = Arc::new(FakeSearch::new());
        let config = Arc::new(ResearchConfig::default());

        let stages: Vec<Box<dyn ResearchStage>> = vec![
            Box::new(QueryPlannerStage::new(llm.clone(), config.clone())),
            Box::new(RecipeHunterStage::new(
                search,
                llm.clone(),
                config.clone(),
            )),
            Box::new(PersonalizationStage::new(llm.clone(), config)),
            Box::new(NutritionAnalyzerStage::new(llm)),
        ];

        let names: Vec<&str> = stages.iter().map(|s| s.metadata().name).collect();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(
            names.len(),
            unique.len(),
            "Duplicate stage names detected! Names: {:?}",
            names
        );
    }
}
