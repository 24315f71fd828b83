//! Web-search provider boundary.
//!
//! The hunter stage consumes this trait; the real implementation is Tavily.
//! A failed search contributes zero hits and a warning, never a dead run.

mod fake;
mod tavily;

pub use fake::{fake_hit, FakeSearch};
pub use tavily::TavilyProvider;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Error type for search operations.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    RequestFailed(String),

    #[error("Search API returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse search response: {0}")]
    ParseError(String),

    #[error("Search provider not configured: {0}")]
    NotConfigured(String),
}

/// One result from a search provider. `content` is the snippet the hunter
/// hands to the LLM for structured parsing.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub content: String,
    pub published_date: Option<String>,
    /// Provider-reported relevance in [0, 1], when given.
    pub score: Option<f64>,
}

/// Per-query options.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub max_results: usize,
    /// Restrict to results published within this many days, if supported.
    pub recency_days: Option<u32>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: 5,
            recency_days: Some(730),
        }
    }
}

/// Trait for search providers.
#[async_trait]
pub trait SearchProvider: Send + Sync + fmt::Debug {
    /// Run one query and return its hits in provider rank order.
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, SearchError>;

    /// Provider name ("tavily", "fake").
    fn provider_name(&self) -> &'static str;
}

/// Build a search provider from environment variables.
///
/// - `SAUCIER_SEARCH_PROVIDER`: "tavily" | "fake" (default: "fake")
/// - `TAVILY_API_KEY`: API key, required for "tavily"
pub fn create_search_provider_from_env() -> Result<Box<dyn SearchProvider>, SearchError> {
    let provider = std::env::var("SAUCIER_SEARCH_PROVIDER").unwrap_or_else(|_| "fake".to_string());

    match provider.as_str() {
        "fake" => Ok(Box::new(FakeSearch::default())),
        "tavily" => {
            let api_key = std::env::var("TAVILY_API_KEY")
                .map_err(|_| SearchError::NotConfigured("TAVILY_API_KEY not set".to_string()))?;
            Ok(Box::new(TavilyProvider::new(api_key)))
        }
        other => Err(SearchError::NotConfigured(format!(
            "Unknown provider: {}",
            other
        ))),
    }
}
