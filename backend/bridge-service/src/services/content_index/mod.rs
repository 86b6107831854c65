//! Content index: classification on write, ranked retrieval on read.

pub mod prompt;

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::db::{ContentStore, ThresholdSource};
use crate::error::Result;
use crate::models::{
    ContentDocument, ContentSearchResult, ContentType, Engagement, IndexedContent, SearchOptions,
    TrustTier,
};
use crate::services::trust::classify;
use crate::utils::hours_before;

pub use prompt::{
    format_content, format_content_block, is_popular_content_query, is_recent_activity_query,
};

pub const MAX_PAGE_SIZE: i64 = 100;
pub const DEFAULT_QUERY_LIMIT: usize = 8;

const RECENT_WINDOW_HOURS: i64 = 48;
const POPULAR_MIN_SP: i64 = 5;
const RELATED_SEARCH_LIMIT: i64 = 3;

pub struct ContentIndex {
    store: Arc<dyn ContentStore>,
    thresholds: Arc<dyn ThresholdSource>,
}

impl ContentIndex {
    pub fn new(store: Arc<dyn ContentStore>, thresholds: Arc<dyn ThresholdSource>) -> Self {
        Self { store, thresholds }
    }

    /// Classify and store a document, replacing any earlier row for the same
    /// (type, id). Thresholds are re-read on every call.
    pub async fn upsert(
        &self,
        document: ContentDocument,
        engagement: Engagement,
    ) -> Result<IndexedContent> {
        let thresholds = self.thresholds.thresholds().await?;
        let engagement = engagement.clamped();
        let tier = classify(&engagement, &thresholds);
        let content = IndexedContent::from_document(document, engagement, tier, Utc::now());

        self.store.upsert(&content).await?;
        debug!(
            content_type = %content.content_type,
            content_id = %content.content_id,
            trust_tier = %tier,
            "Indexed content"
        );
        Ok(content)
    }

    /// Drop a row; absent rows are not an error.
    pub async fn remove(&self, content_type: ContentType, content_id: &str) -> Result<bool> {
        let removed = self.store.remove(content_type, content_id).await?;
        if removed {
            info!(content_type = %content_type, content_id = content_id, "Removed content from index");
        }
        Ok(removed)
    }

    pub async fn get(
        &self,
        content_type: ContentType,
        content_id: &str,
    ) -> Result<Option<IndexedContent>> {
        self.store.get(content_type, content_id).await
    }

    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<ContentSearchResult>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let options = SearchOptions {
            limit: options.limit.clamp(1, MAX_PAGE_SIZE),
            offset: options.offset.max(0),
            ..options.clone()
        };
        let results = self.store.search(query.trim(), &options).await?;

        debug!(
            query = query,
            results = results.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Content search completed"
        );
        Ok(results)
    }

    pub async fn high_support(&self, min_sp: i64, limit: i64) -> Result<Vec<IndexedContent>> {
        self.store
            .high_support(min_sp.max(0), limit.clamp(1, MAX_PAGE_SIZE))
            .await
    }

    pub async fn recent(&self, hours: i64, limit: i64) -> Result<Vec<IndexedContent>> {
        let since = hours_before(Utc::now(), hours);
        self.store.recent(since, limit.clamp(1, MAX_PAGE_SIZE)).await
    }

    /// Content to ground an answer to `query`, chosen by the question's intent:
    /// recent activity, popular content, or plain search.
    pub async fn content_for_query(&self, query: &str, limit: usize) -> Result<Vec<IndexedContent>> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE as usize);
        let primary_limit = limit as i64;

        if is_recent_activity_query(query) {
            let recent = self.recent(RECENT_WINDOW_HOURS, primary_limit).await?;
            let related = self
                .search(query, &SearchOptions {
                    limit: RELATED_SEARCH_LIMIT,
                    ..SearchOptions::default()
                })
                .await?;
            return Ok(merge_unique(recent, related, limit));
        }

        if is_popular_content_query(query) {
            let popular = self.high_support(POPULAR_MIN_SP, primary_limit).await?;
            let related = self
                .search(query, &SearchOptions {
                    min_trust_tier: Some(TrustTier::Medium),
                    limit: RELATED_SEARCH_LIMIT,
                    ..SearchOptions::default()
                })
                .await?;
            return Ok(merge_unique(popular, related, limit));
        }

        let results = self
            .search(query, &SearchOptions {
                limit: primary_limit,
                ..SearchOptions::default()
            })
            .await?;
        Ok(results.into_iter().map(|r| r.content).collect())
    }

    /// `content_for_query` rendered as a prompt block
    pub async fn prompt_block_for_query(&self, query: &str, limit: usize) -> Result<String> {
        let items = self.content_for_query(query, limit).await?;
        Ok(format_content_block(&items))
    }
}

fn merge_unique(
    primary: Vec<IndexedContent>,
    related: Vec<ContentSearchResult>,
    limit: usize,
) -> Vec<IndexedContent> {
    let mut seen: HashSet<(ContentType, String)> = primary
        .iter()
        .map(|c| (c.content_type, c.content_id.clone()))
        .collect();
    let mut combined = primary;
    for result in related {
        if seen.insert((result.content.content_type, result.content.content_id.clone())) {
            combined.push(result.content);
        }
    }
    combined.truncate(limit);
    combined
}
