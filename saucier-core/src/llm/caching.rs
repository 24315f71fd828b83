//! Caching wrapper for LLM providers.
//!
//! Wraps any [`LlmProvider`] to cache responses on disk, keyed by provider,
//! model, and prompt hash. Re-running the same research request replays
//! model output instead of paying for it twice.

use super::{LlmError, LlmProvider};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;

/// Cached LLM response metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub provider: String,
    pub model: String,
    pub prompt_hash: String,
    pub cached_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedResponse {
    metadata: CacheMetadata,
    response: String,
}

/// A caching wrapper around any LLM provider.
///
/// Same prompt to the same model always returns the cached response.
/// Caching is best-effort: cache write failures are logged and the live
/// response is returned anyway.
#[derive(Debug)]
pub struct CachingProvider {
    inner: Box<dyn LlmProvider>,
    cache_dir: PathBuf,
}

impl CachingProvider {
    pub fn new(inner: Box<dyn LlmProvider>, cache_dir: PathBuf) -> Self {
        Self { inner, cache_dir }
    }

    /// SHA-256 of the prompt, truncated to 32 hex chars for filenames.
    fn cache_key(&self, prompt: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(prompt.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..16])
    }

    fn provider_cache_dir(&self) -> PathBuf {
        self.cache_dir
            .join(self.inner.provider_name())
            .join(self.inner.model_name().replace(['/', ':'], "_"))
    }

    fn cache_path(&self, prompt_hash: &str) -> PathBuf {
        self.provider_cache_dir()
            .join(format!("{}.json", prompt_hash))
    }

    fn get_cached(&self, prompt_hash: &str) -> Option<String> {
        let path = self.cache_path(prompt_hash);
        let content = fs::read_to_string(&path).ok()?;
        let cached: CachedResponse = serde_json::from_str(&content).ok()?;
        tracing::debug!(
            provider = self.inner.provider_name(),
            model = self.inner.model_name(),
            prompt_hash = prompt_hash,
            "LLM cache hit"
        );
        Some(cached.response)
    }

    fn save_to_cache(&self, prompt_hash: &str, response: &str) -> Result<(), LlmError> {
        let dir = self.provider_cache_dir();
        fs::create_dir_all(&dir).map_err(|e| LlmError::CacheError(e.to_string()))?;

        let cached = CachedResponse {
            metadata: CacheMetadata {
                provider: self.inner.provider_name().to_string(),
                model: self.inner.model_name().to_string(),
                prompt_hash: prompt_hash.to_string(),
                cached_at: Utc::now(),
            },
            response: response.to_string(),
        };

        let content = serde_json::to_string_pretty(&cached)
            .map_err(|e| LlmError::CacheError(e.to_string()))?;
        fs::write(self.cache_path(prompt_hash), content)
            .map_err(|e| LlmError::CacheError(e.to_string()))?;

        Ok(())
    }

    /// Number of cached responses for this provider/model pair.
    pub fn cached_responses(&self) -> usize {
        let dir = self.provider_cache_dir();
        let Ok(entries) = fs::read_dir(&dir) else {
            return 0;
        };
        entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map(|x| x == "json").unwrap_or(false))
            .count()
    }
}

#[async_trait]
impl LlmProvider for CachingProvider {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let prompt_hash = self.cache_key(prompt);

        if let Some(cached) = self.get_cached(&prompt_hash) {
            return Ok(cached);
        }

        tracing::debug!(
            provider = self.inner.provider_name(),
            model = self.inner.model_name(),
            prompt_hash = %prompt_hash,
            "LLM cache miss, calling provider"
        );

        let response = self.inner.complete(prompt).await?;

        if let Err(e) = self.save_to_cache(&prompt_hash, &response) {
            tracing::warn!(error = %e, "Failed to cache LLM response");
        }

        Ok(response)
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}
