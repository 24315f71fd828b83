//! Nutrition analyzer stage: annotates final cards with estimated
//! per-serving nutrition via the LLM boundary.
//!
//! Purely additive: the cards are complete before this stage runs, and a
//! failed estimate leaves the documented "unavailable" default on the card
//! instead of failing anything. The stage is marked `continues_on_failure`
//! so even a wholesale fault cannot take down the run.

use std::sync::Arc;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use crate::llm::{strip_code_fences, LlmProvider};
use crate::state::ResearchState;
use crate::types::NutritionEstimate;

use super::{ResearchStage, StageError, StageMetadata};

const DEFAULT_SERVINGS: u32 = 4;

pub struct NutritionAnalyzerStage {
    llm: Arc<dyn LlmProvider>,
}

/// The shape the nutrition prompt asks the model for. Missing fields
/// deserialize to `None` rather than failing the estimate.
#[derive(Debug, Deserialize)]
struct ParsedNutrition {
    calories: Option<u32>,
    protein_g: Option<u32>,
    carbs_g: Option<u32>,
    fat_g: Option<u32>,
    fiber_g: Option<u32>,
    sodium_mg: Option<u32>,
    servings: Option<u32>,
    disclaimer: Option<String>,
}

impl NutritionAnalyzerStage {
    pub const NAME: &'static str = "analyze_nutrition";

    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    fn prompt(title: &str, ingredients: &[String], servings: u32) -> String {
        format!(
            "You are a nutritionist. Estimate the nutritional information PER SERVING for\n\
             this recipe.\n\n\
             Recipe: {title}\n\
             Estimated Servings: {servings}\n\
             Ingredients: {ingredients}\n\n\
             Provide reasonable estimates based on typical portion sizes and cooking methods.\n\n\
             Return ONLY valid JSON with no markdown:\n\
             {{\n\
               \"calories\": 450,\n\
               \"protein_g\": 25,\n\
               \"carbs_g\": 35,\n\
               \"fat_g\": 18,\n\
               \"fiber_g\": 5,\n\
               \"sodium_mg\": 600,\n\
               \"servings\": {servings},\n\
               \"disclaimer\": \"Estimated values - actual nutrition may vary\"\n\
             }}",
            ingredients = ingredients
                .iter()
                .take(15)
                .cloned()
                .collect::<Vec<_>>()
                .join(", "),
        )
    }

    async fn estimate(
        &self,
        title: &str,
        ingredients: &[String],
        servings: u32,
        state: &mut ResearchState,
    ) -> NutritionEstimate {
        let response = match self.llm.complete(&Self::prompt(title, ingredients, servings)).await {
            Ok(response) => {
                state.llm_calls += 1;
                response
            }
            Err(e) => {
                state.warn(format!("Nutrition estimation failed for {title}: {e}"));
                return NutritionEstimate::unavailable(servings);
            }
        };

        match serde_json::from_str::<ParsedNutrition>(strip_code_fences(&response)) {
            Ok(parsed) => NutritionEstimate {
                calories: parsed.calories,
                protein_g: parsed.protein_g,
                carbs_g: parsed.carbs_g,
                fat_g: parsed.fat_g,
                fiber_g: parsed.fiber_g,
                sodium_mg: parsed.sodium_mg,
                servings: parsed.servings.unwrap_or(servings),
                disclaimer: parsed
                    .disclaimer
                    .unwrap_or_else(|| "Estimated values - actual nutrition may vary".to_string()),
            },
            Err(e) => {
                state.warn(format!("Nutrition parse error for {title}: {e}"));
                NutritionEstimate::unavailable(servings)
            }
        }
    }
}

static SERVINGS_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"serves?\s+(\d+)",
        r"(\d+)\s+servings?",
        r"makes\s+(\d+)\s+portions?",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("servings regex is valid"))
    .collect()
});

/// Estimate servings from recipe text, defaulting to 4.
fn estimate_servings(instructions: &[String], ingredients: &[String]) -> u32 {
    let text = format!(
        "{} {}",
        instructions.join(" ").to_lowercase(),
        ingredients.join(" ").to_lowercase()
    );

    for re in SERVINGS_RES.iter() {
        if let Some(captures) = re.captures(&text) {
            if let Some(n) = captures.get(1).and_then(|m| m.as_str().parse().ok()) {
                return n;
            }
        }
    }

    DEFAULT_SERVINGS
}

#[async_trait]
impl ResearchStage for NutritionAnalyzerStage {
    fn metadata(&self) -> StageMetadata {
        StageMetadata {
            name: Self::NAME,
            description: "Estimate per-serving nutrition for final cards",
            continues_on_failure: true,
        }
    }

    async fn execute(&self, state: &mut ResearchState) -> Result<(), StageError> {
        // Snapshot what each estimate needs up front; the loop below needs
        // the state mutably for counters and warnings.
        struct Job {
            index: usize,
            title: String,
            ingredients: Vec<String>,
            servings: u32,
        }

        let jobs: Vec<Job> = state
            .final_cards
            .iter()
            .enumerate()
            .map(|(index, card)| {
                let full = state
                    .candidates
                    .iter()
                    .find(|c| c.url == card.recipe.url);
                match full {
                    Some(candidate) => Job {
                        index,
                        title: candidate.title.clone(),
                        ingredients: candidate.ingredients.clone(),
                        servings: estimate_servings(&candidate.instructions, &candidate.ingredients),
                    },
                    None => Job {
                        index,
                        title: card.recipe.title.clone(),
                        ingredients: Vec::new(),
                        servings: DEFAULT_SERVINGS,
                    },
                }
            })
            .collect();

        for job in jobs {
            let nutrition = if job.ingredients.is_empty() {
                NutritionEstimate::unavailable(job.servings)
            } else {
                self.estimate(&job.title, &job.ingredients, job.servings, state)
                    .await
            };
            state.final_cards[job.index].nutrition = Some(nutrition);
        }

        tracing::debug!(cards = state.final_cards.len(), "nutrition analysis complete");
        Ok(())
    }
}
