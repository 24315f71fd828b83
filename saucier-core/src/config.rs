//! Pipeline configuration from environment variables.

use std::env;

use thiserror::Error;

use crate::ranking::RankingConfig;
use crate::search::SearchOptions;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },
}

/// Tunables for one pipeline deployment.
///
/// The retry budget and the minimum-candidate threshold are contract
/// constants ([`crate::state::MAX_RETRIES`], [`crate::state::MIN_CANDIDATES`])
/// and intentionally not configurable here.
#[derive(Debug, Clone)]
pub struct ResearchConfig {
    /// How many planner queries the hunter issues per attempt.
    pub max_queries: usize,
    /// How many hits per query get parsed into candidates.
    pub hits_per_query: usize,
    /// Stop hunting once this many candidates are gathered.
    pub max_candidates: usize,
    /// Options forwarded to the search provider.
    pub search: SearchOptions,
    pub ranking: RankingConfig,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_queries: 3,
            hits_per_query: 2,
            max_candidates: 6,
            search: SearchOptions::default(),
            ranking: RankingConfig::default(),
        }
    }
}

impl ResearchConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// Optional:
    /// - `SAUCIER_MAX_QUERIES`: queries per hunt attempt (default: 3)
    /// - `SAUCIER_HITS_PER_QUERY`: hits parsed per query (default: 2)
    /// - `SAUCIER_MAX_CANDIDATES`: hunt stops at this many (default: 6)
    /// - `SAUCIER_TOP_K`: cards to select (default: 3)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = parse_var("SAUCIER_MAX_QUERIES")? {
            config.max_queries = v;
        }
        if let Some(v) = parse_var("SAUCIER_HITS_PER_QUERY")? {
            config.hits_per_query = v;
        }
        if let Some(v) = parse_var("SAUCIER_MAX_CANDIDATES")? {
            config.max_candidates = v;
        }
        if let Some(v) = parse_var("SAUCIER_TOP_K")? {
            config.ranking.top_k = v;
        }

        Ok(config)
    }
}

fn parse_var(var: &str) -> Result<Option<usize>, ConfigError> {
    match env::var(var) {
        Ok(value) => match value.parse() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(ConfigError::InvalidValue {
                var: var.to_string(),
                value,
            }),
        },
        Err(_) => Ok(None),
    }
}
