//! Keyword retrieval of curated question/answer examples.
//!
//! Reviewer ratings describe the generated answer, not the curated one, so a
//! poorly rated example is still a good one to learn from. Matching never
//! looks at ratings.

use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::db::ExampleStore;
use crate::error::Result;
use crate::models::{SimilarQuery, TrainingExample};
use crate::utils::{is_search_stop_word, words};

pub const MAX_QUERY_TERMS: usize = 5;
const MIN_TERM_LEN: usize = 3;

/// Search terms for a free-text question: stop words and words shorter than
/// three characters removed, first five kept. Falls back to the trimmed raw
/// query when nothing survives.
pub fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for word in words(query) {
        if word.chars().count() < MIN_TERM_LEN || is_search_stop_word(&word) {
            continue;
        }
        if !terms.contains(&word) {
            terms.push(word);
        }
        if terms.len() == MAX_QUERY_TERMS {
            break;
        }
    }

    if terms.is_empty() {
        let raw = query.trim();
        if !raw.is_empty() {
            terms.push(raw.to_string());
        }
    }
    terms
}

pub struct ExampleMatcher {
    store: Arc<dyn ExampleStore>,
}

impl ExampleMatcher {
    pub fn new(store: Arc<dyn ExampleStore>) -> Self {
        Self { store }
    }

    pub async fn find_similar(
        &self,
        query: &str,
        options: &SimilarQuery,
    ) -> Result<Vec<TrainingExample>> {
        let started = Instant::now();
        let terms = query_terms(query);
        if terms.is_empty() || options.limit <= 0 {
            return Ok(Vec::new());
        }

        let examples = self
            .store
            .find_matching(&terms, options.status, options.limit)
            .await?;

        debug!(
            terms = ?terms,
            status = %options.status,
            matches = examples.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Similar examples resolved"
        );
        Ok(examples)
    }
}
