//! Personalization stage: runs the ranking engine over the hunted
//! candidates, then asks the LLM boundary for a learning-focused rationale
//! per selected recipe.
//!
//! The selection itself is fully deterministic; only the rationale text
//! comes from the model, and it degrades to a deterministic sentence when
//! the model misbehaves.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::ResearchConfig;
use crate::llm::{strip_code_fences, LlmProvider};
use crate::ranking::{self, compare_leading, RankingParams};
use crate::state::ResearchState;
use crate::types::{RecipeCard, RecipeSummary, ScoredCandidate};

use super::{ResearchStage, StageError, StageMetadata};

pub struct PersonalizationStage {
    llm: Arc<dyn LlmProvider>,
    config: Arc<ResearchConfig>,
}

#[derive(Debug, Deserialize)]
struct Rationale {
    reasoning: String,
    #[serde(default)]
    technique_highlights: Vec<String>,
}

impl PersonalizationStage {
    pub const NAME: &'static str = "personalize";

    pub fn new(llm: Arc<dyn LlmProvider>, config: Arc<ResearchConfig>) -> Self {
        Self { llm, config }
    }

    fn rationale_prompt(selected: &ScoredCandidate, state: &ResearchState) -> String {
        format!(
            "You are a professional chef and culinary educator. Explain concisely why this\n\
             recipe is perfect for the user's learning goals.\n\n\
             User context:\n\
             - Skill level: {skill}\n\
             - Learning goal: {goal}\n\n\
             Recipe:\n\
             - Title: {title}\n\
             - Techniques: {techniques}\n\
             - Difficulty: {difficulty}\n\n\
             Generate:\n\
             1. \"why this recipe\" (2-3 sentences, learning-focused and encouraging)\n\
             2. Key technique highlights (3-4 bullet points, specific skills they'll practice)\n\n\
             Return ONLY valid JSON with no markdown:\n\
             {{\n\
               \"reasoning\": \"Your 2-3 sentence explanation here\",\n\
               \"technique_highlights\": [\"Specific technique 1\", \"Specific technique 2\"]\n\
             }}",
            skill = state.request.skill_level.as_str(),
            goal = state.request.learning_goal,
            title = selected.candidate.title,
            techniques = selected.candidate.techniques.join(", "),
            difficulty = selected
                .candidate
                .difficulty
                .map(|d| d.as_str())
                .unwrap_or("unknown"),
        )
    }

    /// Deterministic rationale used when the model call or parse fails.
    fn fallback_rationale(selected: &ScoredCandidate) -> Rationale {
        let techniques = &selected.candidate.techniques;
        let reasoning = if techniques.is_empty() {
            "This recipe teaches essential cooking skills.".to_string()
        } else {
            format!("This recipe teaches {}.", techniques.join(", "))
        };
        Rationale {
            reasoning,
            technique_highlights: techniques.iter().take(3).cloned().collect(),
        }
    }

    async fn rationale_for(
        &self,
        selected: &ScoredCandidate,
        state: &mut ResearchState,
    ) -> Rationale {
        let prompt = Self::rationale_prompt(selected, state);
        let response = match self.llm.complete(&prompt).await {
            Ok(response) => {
                state.llm_calls += 1;
                response
            }
            Err(e) => {
                state.warn(format!(
                    "Rationale generation failed for {}: {e}",
                    selected.candidate.url
                ));
                return Self::fallback_rationale(selected);
            }
        };

        match serde_json::from_str::<Rationale>(strip_code_fences(&response)) {
            Ok(rationale) if !rationale.reasoning.trim().is_empty() => rationale,
            _ => Self::fallback_rationale(selected),
        }
    }
}

#[async_trait]
impl ResearchStage for PersonalizationStage {
    fn metadata(&self) -> StageMetadata {
        StageMetadata {
            name: Self::NAME,
            description: "Filter, score, and select recipes with rationale",
            continues_on_failure: false,
        }
    }

    async fn execute(&self, state: &mut ResearchState) -> Result<(), StageError> {
        let params = RankingParams {
            learning_goal: &state.request.learning_goal,
            skill_level: state.request.skill_level,
            dietary_restrictions: &state.request.dietary_restrictions,
            excluded_urls: &state.request.excluded_urls,
        };
        let selection = ranking::select(&state.candidates, &params, &self.config.ranking);

        if selection.relaxed_filter {
            state.warn(
                "Too few recipes satisfied the dietary restrictions; selection drawn from all candidates",
            );
        }

        let selected = selection.selected.clone();
        state.scored = selection.scored;

        let mut cards = Vec::with_capacity(selected.len());
        for item in &selected {
            let rationale = self.rationale_for(item, state).await;
            cards.push(RecipeCard {
                recipe: RecipeSummary::from(&item.candidate),
                reasoning: rationale.reasoning,
                technique_highlights: rationale.technique_highlights,
                score: (item.score * 10.0).round() / 10.0,
                nutrition: None,
            });
        }

        state.comparison = compare_leading(
            &cards
                .iter()
                .map(|c| (c.recipe.title.clone(), c.technique_highlights.clone()))
                .collect::<Vec<_>>(),
        );
        state.final_cards = cards;

        tracing::debug!(cards = state.final_cards.len(), "personalization complete");
        Ok(())
    }
}
