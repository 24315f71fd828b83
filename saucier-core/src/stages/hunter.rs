//! Recipe hunter stage: runs the planned queries through the search
//! provider and parses result snippets into structured candidates.
//!
//! This is the normalization boundary: whatever shape the model returns,
//! candidates leave this stage with flat string lists, or not at all.
//! Per-query and per-hit failures become warnings, never stage errors.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::config::ResearchConfig;
use crate::llm::{strip_code_fences, LlmProvider};
use crate::search::{SearchHit, SearchProvider};
use crate::state::ResearchState;
use crate::types::{Difficulty, RecipeCandidate};

use super::{ResearchStage, StageError, StageMetadata};

pub struct RecipeHunterStage {
    search: Arc<dyn SearchProvider>,
    llm: Arc<dyn LlmProvider>,
    config: Arc<ResearchConfig>,
}

/// The shape the snippet-parsing prompt asks the model for.
#[derive(Debug, Deserialize)]
struct ParsedRecipe {
    title: String,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    techniques: Vec<String>,
    #[serde(default)]
    ingredients: Vec<String>,
    #[serde(default)]
    instructions: Vec<String>,
    #[serde(default)]
    time_estimate: Option<String>,
}

impl RecipeHunterStage {
    pub const NAME: &'static str = "hunt_recipes";

    pub fn new(
        search: Arc<dyn SearchProvider>,
        llm: Arc<dyn LlmProvider>,
        config: Arc<ResearchConfig>,
    ) -> Self {
        Self {
            search,
            llm,
            config,
        }
    }

    fn parse_prompt(hit: &SearchHit) -> String {
        format!(
            "Extract recipe information from this search result and return ONLY valid JSON.\n\n\
             Title: {title}\n\
             Content: {content}\n\n\
             Return this exact JSON format:\n\
             {{\n\
               \"title\": \"Recipe title\",\n\
               \"difficulty\": \"beginner|intermediate|advanced\",\n\
               \"techniques\": [\"technique1\", \"technique2\"],\n\
               \"ingredients\": [\"ingredient1\", \"ingredient2\"],\n\
               \"instructions\": [\"Step 1\", \"Step 2\"],\n\
               \"time_estimate\": \"X minutes\"\n\
             }}\n\n\
             If information is missing, make reasonable inferences from the content.\n\
             Return ONLY the JSON object, nothing else.",
            title = hit.title,
            content = hit.content,
        )
    }

    /// Parse one search hit into a candidate via the LLM boundary.
    /// Returns `None` (after recording a warning) when the hit is unusable
    /// or the model output does not parse.
    async fn parse_candidate(
        &self,
        hit: &SearchHit,
        state: &mut ResearchState,
    ) -> Option<RecipeCandidate> {
        if hit.url.is_empty() || hit.content.is_empty() {
            return None;
        }

        let response = match self.llm.complete(&Self::parse_prompt(hit)).await {
            Ok(response) => {
                state.llm_calls += 1;
                response
            }
            Err(e) => {
                state.warn(format!("Recipe parsing error for {}: {e}", hit.url));
                return None;
            }
        };

        let parsed: ParsedRecipe = match serde_json::from_str(strip_code_fences(&response)) {
            Ok(parsed) => parsed,
            Err(e) => {
                state.warn(format!("JSON parse error for {}: {e}", hit.url));
                return None;
            }
        };

        Some(RecipeCandidate {
            title: parsed.title,
            url: hit.url.clone(),
            source: source_label(&hit.url),
            author: "Unknown".to_string(),
            published_date: hit.published_date.clone(),
            difficulty: parsed.difficulty.as_deref().and_then(Difficulty::parse),
            techniques: parsed.techniques,
            ingredients: parsed.ingredients,
            instructions: parsed.instructions,
            time_estimate: parsed.time_estimate,
            search_score: hit.score,
        })
    }
}

#[async_trait]
impl ResearchStage for RecipeHunterStage {
    fn metadata(&self) -> StageMetadata {
        StageMetadata {
            name: Self::NAME,
            description: "Search the web and parse hits into candidates",
            continues_on_failure: false,
        }
    }

    async fn execute(&self, state: &mut ResearchState) -> Result<(), StageError> {
        let queries: Vec<String> = state
            .search_queries
            .iter()
            .take(self.config.max_queries)
            .cloned()
            .collect();

        let mut found: Vec<RecipeCandidate> = Vec::new();

        'queries: for query in &queries {
            let search_query = format!("{query} recipe");
            state.search_calls += 1;

            let hits = match self.search.search(&search_query, &self.config.search).await {
                Ok(hits) => hits,
                Err(e) => {
                    state.warn(format!("Search failed for '{query}': {e}"));
                    continue;
                }
            };

            for hit in hits.iter().take(self.config.hits_per_query) {
                if let Some(candidate) = self.parse_candidate(hit, state).await {
                    found.push(candidate);
                }
                if found.len() >= self.config.max_candidates {
                    break 'queries;
                }
            }
        }

        tracing::debug!(
            queries = queries.len(),
            candidates = found.len(),
            "hunt complete"
        );

        // Replace, don't accumulate: on retry the previous attempt's
        // candidates were already judged insufficient.
        state.candidates = found;
        Ok(())
    }
}

/// Human-readable source label for a recipe URL.
fn source_label(url: &str) -> String {
    let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_lowercase)) else {
        return "Unknown".to_string();
    };
    let domain = host.strip_prefix("www.").unwrap_or(&host);

    match domain {
        "seriouseats.com" => "Serious Eats".to_string(),
        "bonappetit.com" => "Bon Appetit".to_string(),
        "foodnetwork.com" => "Food Network".to_string(),
        "allrecipes.com" => "Allrecipes".to_string(),
        "epicurious.com" => "Epicurious".to_string(),
        "kingarthurbaking.com" => "King Arthur Baking".to_string(),
        "nytimes.com" | "cooking.nytimes.com" => "NY Times Cooking".to_string(),
        other => {
            let label = other.split('.').next().unwrap_or(other);
            let mut chars = label.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => "Unknown".to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::FakeProvider;
    use crate::search::{fake_hit, FakeSearch};
    use crate::state::{ResearchRequest, SkillLevel};

    const PARSED_JSON: &str = r#"{
        "title": "Lemon Butter Chicken",
        "difficulty": "beginner",
        "techniques": ["deglazing", "reduction"],
        "ingredients": ["chicken", "butter", "lemon"],
        "instructions": ["Sear", "Deglaze"],
        "time_estimate": "30 minutes"
    }"#;

    fn state_with_queries(queries: &[&str]) -> ResearchState {
        let mut state =
            ResearchState::new(ResearchRequest::new("pan sauces", SkillLevel::Beginner)).unwrap();
        state.search_queries = queries.iter().map(|q| q.to_string()).collect();
        state
    }

    #[tokio::test]
    async fn parses_hits_into_candidates() {
        let mut search = FakeSearch::new();
        search.add_hits(
            "lemon",
            vec![fake_hit(
                "Lemon Butter Chicken",
                "https://www.seriouseats.com/lemon-butter-chicken",
                "Sear chicken, deglaze with stock, mount butter.",
            )],
        );
        let llm = Arc::new(FakeProvider::with_response(
            "Extract recipe information",
            PARSED_JSON,
        ));

        let stage = RecipeHunterStage::new(
            Arc::new(search),
            llm,
            Arc::new(ResearchConfig::default()),
        );
        let mut state = state_with_queries(&["lemon butter pan sauce"]);
        stage.execute(&mut state).await.unwrap();

        assert_eq!(state.candidates.len(), 1);
        let candidate = &state.candidates[0];
        assert_eq!(candidate.title, "Lemon Butter Chicken");
        assert_eq!(candidate.source, "Serious Eats");
        assert_eq!(candidate.difficulty, Some(Difficulty::Beginner));
        assert_eq!(state.search_calls, 1);
        assert_eq!(state.llm_calls, 1);
    }

    #[tokio::test]
    async fn search_failure_yields_warning_and_zero_candidates() {
        // FakeSearch with no registered hits returns empty, so model a
        // hard failure with an erroring provider instead.
        #[derive(Debug)]
        struct BrokenSearch;

        #[async_trait]
        impl SearchProvider for BrokenSearch {
            async fn search(
                &self,
                _query: &str,
                _options: &crate::search::SearchOptions,
            ) -> Result<Vec<SearchHit>, crate::search::SearchError> {
                Err(crate::search::SearchError::RequestFailed(
                    "connection reset".to_string(),
                ))
            }

            fn provider_name(&self) -> &'static str {
                "broken"
            }
        }

        let stage = RecipeHunterStage::new(
            Arc::new(BrokenSearch),
            Arc::new(FakeProvider::default()),
            Arc::new(ResearchConfig::default()),
        );
        let mut state = state_with_queries(&["pan sauce"]);
        stage.execute(&mut state).await.unwrap();

        assert!(state.candidates.is_empty());
        assert_eq!(state.warnings.len(), 1);
        assert!(state.warnings[0].contains("Search failed"));
    }

    #[tokio::test]
    async fn unparseable_model_output_is_skipped_with_warning() {
        let mut search = FakeSearch::new();
        search.add_hits(
            "pan sauce",
            vec![fake_hit("Some Dish", "https://a.test/1", "snippet text")],
        );
        let llm = Arc::new(FakeProvider::with_response(
            "Extract recipe information",
            "this is not json",
        ));

        let stage = RecipeHunterStage::new(
            Arc::new(search),
            llm,
            Arc::new(ResearchConfig::default()),
        );
        let mut state = state_with_queries(&["pan sauce"]);
        stage.execute(&mut state).await.unwrap();

        assert!(state.candidates.is_empty());
        assert_eq!(state.warnings.len(), 1);
        assert!(state.warnings[0].contains("JSON parse error"));
    }

    #[tokio::test]
    async fn stops_at_max_candidates() {
        let mut search = FakeSearch::new();
        let hits: Vec<SearchHit> = (0..5)
            .map(|i| {
                fake_hit(
                    &format!("Dish {i}"),
                    &format!("https://a.test/{i}"),
                    "snippet",
                )
            })
            .collect();
        search.add_hits("pan sauce", hits);

        let llm = Arc::new(FakeProvider::with_response(
            "Extract recipe information",
            PARSED_JSON,
        ));
        let config = ResearchConfig {
            max_candidates: 2,
            hits_per_query: 5,
            ..ResearchConfig::default()
        };

        let stage = RecipeHunterStage::new(Arc::new(search), llm, Arc::new(config));
        let mut state = state_with_queries(&["pan sauce one", "pan sauce two"]);
        stage.execute(&mut state).await.unwrap();

        assert_eq!(state.candidates.len(), 2);
        // Second query never ran.
        assert_eq!(state.search_calls, 1);
    }

    #[test]
    fn source_labels() {
        assert_eq!(
            source_label("https://www.seriouseats.com/pan-sauce"),
            "Serious Eats"
        );
        assert_eq!(
            source_label("https://cooking.nytimes.com/recipes/1"),
            "NY Times Cooking"
        );
        assert_eq!(
            source_label("https://www.smittenkitchen.com/2024/01/x"),
            "Smittenkitchen"
        );
        assert_eq!(source_label("not a url"), "Unknown");
    }
}
