//! Fake search provider for testing.

use super::{SearchError, SearchHit, SearchOptions, SearchProvider};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

/// A fake search provider for testing.
///
/// Hits are matched by checking if the query contains a registered
/// substring (case-insensitive). Unmatched queries return no hits, so the
/// default instance models a search that never finds anything — exactly
/// what the retry-exhaustion tests need.
#[derive(Debug, Default)]
pub struct FakeSearch {
    hits: RwLock<HashMap<String, Vec<SearchHit>>>,
    calls: AtomicU32,
}

impl FakeSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register hits for queries containing a substring.
    pub fn add_hits(&mut self, query_contains: &str, hits: Vec<SearchHit>) {
        self.hits
            .write()
            .unwrap()
            .insert(query_contains.to_string(), hits);
    }

    /// How many queries this provider has served.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

/// Build a plausible hit for tests.
pub fn fake_hit(title: &str, url: &str, content: &str) -> SearchHit {
    SearchHit {
        title: title.to_string(),
        url: url.to_string(),
        content: content.to_string(),
        published_date: Some("2025-03-01".to_string()),
        score: Some(0.9),
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, SearchError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        let hits = self.hits.read().unwrap();
        let query_lower = query.to_lowercase();
        for (pattern, matched) in hits.iter() {
            if query_lower.contains(&pattern.to_lowercase()) {
                let mut matched = matched.clone();
                matched.truncate(options.max_results);
                return Ok(matched);
            }
        }

        Ok(Vec::new())
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
