//! Fake LLM provider for testing.
//!
//! Returns deterministic responses based on prompt substring matching, so
//! tests run without network access or API costs.

use super::{LlmError, LlmProvider};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// A fake LLM provider for testing.
///
/// Responses are matched by checking if the prompt contains a registered
/// substring (case-insensitive). If nothing matches, the default response
/// is returned, or an error if no default is set.
#[derive(Debug)]
pub struct FakeProvider {
    /// Map of prompt substring -> response
    responses: RwLock<HashMap<String, String>>,
    default_response: Option<String>,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self {
            responses: RwLock::new(HashMap::new()),
            default_response: Some("{}".to_string()),
        }
    }
}

impl FakeProvider {
    /// Create a FakeProvider with no registered responses.
    pub fn new() -> Self {
        Self {
            responses: RwLock::new(HashMap::new()),
            default_response: None,
        }
    }

    /// Create a FakeProvider returning `response` for prompts containing a
    /// substring.
    pub fn with_response(prompt_contains: &str, response: &str) -> Self {
        let mut provider = Self::new();
        provider.add_response(prompt_contains, response);
        provider
    }

    /// Register a response for prompts containing a substring.
    pub fn add_response(&mut self, prompt_contains: &str, response: &str) {
        self.responses
            .write()
            .unwrap()
            .insert(prompt_contains.to_string(), response.to_string());
    }

    /// Set the response used when no pattern matches.
    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = Some(response.to_string());
        self
    }

    /// A provider pre-loaded with plausible responses for every prompt the
    /// pipeline issues, keyed on phrases unique to each prompt template.
    pub fn with_research_responses() -> Self {
        let mut provider = Self::new();

        // Query planner response
        provider.add_response(
            "search queries",
            r#"["lemon butter pan sauce chicken recipe", "mushroom cream pan sauce steak recipe", "balsamic pan sauce pork recipe"]"#,
        );

        // Hunter snippet-parsing response
        provider.add_response(
            "Extract recipe information",
            r#"{
                "title": "Lemon Butter Chicken",
                "difficulty": "beginner",
                "techniques": ["deglazing", "emulsification", "reduction"],
                "ingredients": ["chicken breast", "butter", "lemon", "stock"],
                "instructions": ["Sear the chicken", "Deglaze the pan", "Mount the butter"],
                "time_estimate": "30 minutes"
            }"#,
        );

        // Personalization rationale response
        provider.add_response(
            "why this recipe",
            r#"{
                "reasoning": "This recipe is a gentle introduction to pan sauces with plenty of room to practice deglazing.",
                "technique_highlights": ["Deglazing with stock", "Mounting butter", "Reducing to nappe"]
            }"#,
        );

        // Nutrition estimate response
        provider.add_response(
            "nutritionist",
            r#"{
                "calories": 450,
                "protein_g": 25,
                "carbs_g": 35,
                "fat_g": 18,
                "fiber_g": 5,
                "sodium_mg": 600,
                "servings": 4,
                "disclaimer": "Estimated values - actual nutrition may vary"
            }"#,
        );

        provider
    }
}

#[async_trait]
impl LlmProvider for FakeProvider {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let responses = self.responses.read().unwrap();

        let prompt_lower = prompt.to_lowercase();
        for (pattern, response) in responses.iter() {
            if prompt_lower.contains(&pattern.to_lowercase()) {
                return Ok(response.clone());
            }
        }

        match &self.default_response {
            Some(response) => Ok(response.clone()),
            None => Err(LlmError::RequestFailed(format!(
                "FakeProvider: No response configured for prompt (first 100 chars): {}",
                &prompt[..prompt.len().min(100)]
            ))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}
