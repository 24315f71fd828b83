//! Query planner stage: turns the learning goal into search queries.
//!
//! The planner is the stage the retry edge re-enters. On a broadened
//! retry it reframes its prompt to cast a wider net; on any LLM failure
//! it falls back to a deterministic query set so the hunt always has
//! something to work with.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ResearchConfig;
use crate::llm::{strip_code_fences, LlmProvider};
use crate::state::{ResearchState, SearchStrategy};

use super::{ResearchStage, StageError, StageMetadata};

pub struct QueryPlannerStage {
    llm: Arc<dyn LlmProvider>,
    config: Arc<ResearchConfig>,
}

impl QueryPlannerStage {
    pub const NAME: &'static str = "plan_queries";

    pub fn new(llm: Arc<dyn LlmProvider>, config: Arc<ResearchConfig>) -> Self {
        Self { llm, config }
    }

    fn build_prompt(&self, state: &ResearchState) -> String {
        let strategy_instruction = match state.strategy {
            SearchStrategy::Broadened => {
                "IMPORTANT: Previous search found insufficient results. Broaden your queries by:\n\
                 - Using more general terms (e.g., \"pan sauce\" -> \"sauce techniques\")\n\
                 - Including related techniques\n\
                 - Adding beginner-friendly variations if the original was too advanced\n\
                 - Still targeting ACTUAL DISH RECIPES, not technique tutorials"
            }
            SearchStrategy::Initial => {
                "Generate specific, targeted queries for ACTUAL RECIPE DISHES that teach this skill.\n\
                 - Each query should find a COMPLETE RECIPE for a dish\n\
                 - Include dish names + technique + skill level\n\
                 - MAXIMIZE VARIETY: each query must use different ingredients, proteins, or flavor profiles\n\
                 - Avoid near-identical variations (not both \"red wine pan sauce\" and \"red wine reduction\")"
            }
        };

        let mut goal = state.request.learning_goal.clone();
        if !state.request.dietary_restrictions.is_empty() {
            goal = format!("{} {}", state.request.dietary_restrictions.join(" "), goal);
        }
        if !state.request.constraints.is_empty() {
            goal = format!("{} ({})", goal, state.request.constraints.join(", "));
        }

        format!(
            "You are a culinary education expert. Given a learning goal and skill level,\n\
             generate 3-5 specific search queries that will find RECIPE DISHES (not technique\n\
             guides) teaching this skill.\n\n\
             Learning Goal: {goal}\n\
             Skill Level: {skill}\n\n\
             {strategy_instruction}\n\n\
             Return ONLY a JSON array of search queries, nothing else.\n\
             Example: [\"crispy pan-fried chicken cutlet recipe\", \"shallow fried pork schnitzel beginner\"]",
            skill = state.request.skill_level.as_str(),
        )
    }

    /// Deterministic queries used when the LLM boundary fails.
    fn fallback_queries(state: &ResearchState) -> Vec<String> {
        let goal = state.request.learning_goal.trim();
        let skill = state.request.skill_level.as_str();
        match state.strategy {
            SearchStrategy::Initial => vec![
                format!("{goal} recipe"),
                format!("{skill} {goal} recipe"),
                format!("classic {goal} recipe"),
            ],
            SearchStrategy::Broadened => vec![
                format!("{goal} recipe"),
                format!("easy {goal} ideas"),
                format!("{goal} for home cooks"),
                format!("simple {goal} dinner recipe"),
            ],
        }
    }

    /// Parse the model's JSON array, tolerating the usual misbehavior:
    /// code fences, or a plain comma/newline separated list.
    fn parse_queries(response: &str) -> Vec<String> {
        let cleaned = strip_code_fences(response);

        if let Ok(queries) = serde_json::from_str::<Vec<String>>(cleaned) {
            return queries
                .into_iter()
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty())
                .collect();
        }

        cleaned
            .replace(['[', ']'], "")
            .split([',', '\n'])
            .map(|q| q.trim().trim_matches(['"', '\'']).to_string())
            .filter(|q| !q.is_empty())
            .collect()
    }
}

#[async_trait]
impl ResearchStage for QueryPlannerStage {
    fn metadata(&self) -> StageMetadata {
        StageMetadata {
            name: Self::NAME,
            description: "Generate search queries from the learning goal",
            continues_on_failure: false,
        }
    }

    async fn execute(&self, state: &mut ResearchState) -> Result<(), StageError> {
        let prompt = self.build_prompt(state);

        let mut queries = match self.llm.complete(&prompt).await {
            Ok(response) => {
                state.llm_calls += 1;
                Self::parse_queries(&response)
            }
            Err(e) => {
                state.warn(format!("Query planning failed, using fallback queries: {e}"));
                Vec::new()
            }
        };

        if queries.is_empty() {
            queries = Self::fallback_queries(state);
        }
        queries.truncate(self.config.max_queries.max(1) + 2);

        tracing::debug!(
            count = queries.len(),
            strategy = ?state.strategy,
            "planned search queries"
        );

        state.search_queries = queries;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::FakeProvider;
    use crate::state::{ResearchRequest, SkillLevel};

    fn state_with_goal(goal: &str) -> ResearchState {
        ResearchState::new(ResearchRequest::new(goal, SkillLevel::Beginner)).unwrap()
    }

    #[tokio::test]
    async fn parses_json_array_response() {
        let llm = Arc::new(FakeProvider::with_response(
            "search queries",
            r#"["lemon butter pan sauce chicken recipe", "balsamic pan sauce pork recipe"]"#,
        ));
        let stage = QueryPlannerStage::new(llm, Arc::new(ResearchConfig::default()));

        let mut state = state_with_goal("pan sauces");
        stage.execute(&mut state).await.unwrap();

        assert_eq!(state.search_queries.len(), 2);
        assert_eq!(state.llm_calls, 1);
        assert!(state.warnings.is_empty());
    }

    #[tokio::test]
    async fn recovers_from_unparseable_response() {
        let llm = Arc::new(FakeProvider::with_response(
            "search queries",
            "lemon butter chicken recipe\nbalsamic pork recipe",
        ));
        let stage = QueryPlannerStage::new(llm, Arc::new(ResearchConfig::default()));

        let mut state = state_with_goal("pan sauces");
        stage.execute(&mut state).await.unwrap();

        assert_eq!(
            state.search_queries,
            vec!["lemon butter chicken recipe", "balsamic pork recipe"]
        );
    }

    #[tokio::test]
    async fn llm_failure_falls_back_to_deterministic_queries() {
        let llm = Arc::new(FakeProvider::new()); // errors on every prompt
        let stage = QueryPlannerStage::new(llm, Arc::new(ResearchConfig::default()));

        let mut state = state_with_goal("bread baking");
        stage.execute(&mut state).await.unwrap();

        assert!(!state.search_queries.is_empty());
        assert!(state.search_queries[0].contains("bread baking"));
        assert_eq!(state.warnings.len(), 1);
        assert_eq!(state.llm_calls, 0);
    }

    #[tokio::test]
    async fn broadened_strategy_changes_prompt_and_fallback() {
        let llm = Arc::new(FakeProvider::new());
        let stage = QueryPlannerStage::new(llm, Arc::new(ResearchConfig::default()));

        let mut state = state_with_goal("pan sauces");
        state.strategy = SearchStrategy::Broadened;
        let prompt = stage.build_prompt(&state);
        assert!(prompt.contains("Broaden your queries"));

        stage.execute(&mut state).await.unwrap();
        assert!(state.search_queries.len() >= 4);
    }
}
