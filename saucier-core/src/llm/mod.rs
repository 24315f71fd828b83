//! LLM provider boundary.
//!
//! Every stage that needs model output (query planning, snippet parsing,
//! rationale generation, nutrition estimates) goes through [`LlmProvider`].
//! Providers are stateless and thread-safe; the pipeline owns one provider
//! for the whole run. Tests inject [`FakeProvider`].

mod caching;
mod fake;
mod openrouter;

pub use caching::CachingProvider;
pub use fake::FakeProvider;
pub use openrouter::OpenRouterProvider;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Error type for LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Cache error: {0}")]
    CacheError(String),
}

/// Trait for LLM providers.
///
/// Implementations make one completion call per prompt and return the raw
/// model text. Parsing (and the decision of what to do when parsing fails)
/// stays with the calling stage.
#[async_trait]
pub trait LlmProvider: Send + Sync + fmt::Debug {
    /// Send a prompt to the model and get its text response.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    /// Provider name ("openrouter", "fake").
    fn provider_name(&self) -> &'static str;

    /// Model name ("openai/gpt-4o-mini", "fake-model").
    fn model_name(&self) -> &str;
}

/// Build a provider from environment variables.
///
/// - `SAUCIER_LLM_PROVIDER`: "openrouter" | "fake" (default: "fake")
/// - `OPENROUTER_API_KEY`: API key, required for "openrouter"
/// - `SAUCIER_LLM_MODEL`: model name (default: "openai/gpt-4o-mini")
/// - `SAUCIER_LLM_BASE_URL`: API base (default: "https://openrouter.ai/api/v1")
pub fn create_provider_from_env() -> Result<Box<dyn LlmProvider>, LlmError> {
    let provider = std::env::var("SAUCIER_LLM_PROVIDER").unwrap_or_else(|_| "fake".to_string());

    match provider.as_str() {
        "fake" => Ok(Box::new(FakeProvider::with_research_responses())),
        "openrouter" => {
            let api_key = std::env::var("OPENROUTER_API_KEY")
                .map_err(|_| LlmError::NotConfigured("OPENROUTER_API_KEY not set".to_string()))?;
            let model = std::env::var("SAUCIER_LLM_MODEL")
                .unwrap_or_else(|_| "openai/gpt-4o-mini".to_string());
            let base_url = std::env::var("SAUCIER_LLM_BASE_URL")
                .unwrap_or_else(|_| "https://openrouter.ai/api/v1".to_string());
            Ok(Box::new(OpenRouterProvider::new(api_key, model, base_url)))
        }
        other => Err(LlmError::NotConfigured(format!(
            "Unknown provider: {}",
            other
        ))),
    }
}

/// Build a provider wrapped in the disk cache.
///
/// Cache directory comes from `SAUCIER_LLM_CACHE_DIR`, defaulting to
/// `~/.saucier/llm-cache`.
pub fn create_cached_provider_from_env() -> Result<Box<dyn LlmProvider>, LlmError> {
    let inner = create_provider_from_env()?;

    let cache_dir = std::env::var("SAUCIER_LLM_CACHE_DIR")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".saucier").join("llm-cache"))
                .unwrap_or_else(|| std::path::PathBuf::from(".cache/llm"))
        });

    Ok(Box::new(CachingProvider::new(inner, cache_dir)))
}

/// Strip a markdown code fence from model output, if present.
///
/// Models routinely wrap JSON in ```json fences despite instructions not
/// to; every JSON-parsing call site runs its response through this first.
pub fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening fence line.
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_plain_fences() {
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn strips_json_tagged_fences() {
        assert_eq!(strip_code_fences("```json\n[1,2]\n```"), "[1,2]");
    }

    #[test]
    fn leaves_unfenced_output_alone() {
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }
}
