//! Tavily search provider.

use super::{SearchError, SearchHit, SearchOptions, SearchProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

/// Search provider backed by the Tavily API.
#[derive(Debug)]
pub struct TavilyProvider {
    api_key: String,
    client: reqwest::Client,
}

impl TavilyProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    max_results: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    days: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
    published_date: Option<String>,
    score: Option<f64>,
}

#[async_trait]
impl SearchProvider for TavilyProvider {
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let request = TavilyRequest {
            api_key: &self.api_key,
            query,
            search_depth: "advanced",
            max_results: options.max_results,
            days: options.recency_days,
        };

        let response = self
            .client
            .post(TAVILY_ENDPOINT)
            .json(&request)
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        if status != 200 {
            return Err(SearchError::ApiError {
                status,
                message: body,
            });
        }

        let response: TavilyResponse =
            serde_json::from_str(&body).map_err(|e| SearchError::ParseError(e.to_string()))?;

        Ok(response
            .results
            .into_iter()
            .map(|r| SearchHit {
                title: r.title,
                url: r.url,
                content: r.content,
                published_date: r.published_date,
                score: r.score,
            })
            .collect())
    }

    fn provider_name(&self) -> &'static str {
        "tavily"
    }
}
