//! Content index storage
//!
//! One row per (content_type, content_id). Full-text matching is delegated to
//! PostgreSQL (`tsvector` over title, summary and full text); the in-memory
//! store approximates it with term containment so the service can be embedded
//! and tested without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::error;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    ContentSearchResult, ContentType, Engagement, IndexedContent, SearchOptions, TrustTier,
};
use crate::utils::{is_search_stop_word, occurrences, words};

/// Searchable content storage
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Insert or overwrite the row for `(content_type, content_id)`
    async fn upsert(&self, content: &IndexedContent) -> Result<()>;

    /// Delete a row. Returns whether a row existed.
    async fn remove(&self, content_type: ContentType, content_id: &str) -> Result<bool>;

    async fn get(&self, content_type: ContentType, content_id: &str)
        -> Result<Option<IndexedContent>>;

    /// Ranked full-text search: trust tier, then support points, then text rank
    async fn search(&self, query: &str, options: &SearchOptions)
        -> Result<Vec<ContentSearchResult>>;

    /// Items with at least `min_sp` support points, most supported first
    async fn high_support(&self, min_sp: i64, limit: i64) -> Result<Vec<IndexedContent>>;

    /// Items created after `since`, newest first
    async fn recent(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<IndexedContent>>;
}

/// Compare two results by the fixed search order.
pub fn search_order(a: &ContentSearchResult, b: &ContentSearchResult) -> Ordering {
    b.content
        .trust_tier
        .rank()
        .cmp(&a.content.trust_tier.rank())
        .then_with(|| {
            b.content
                .engagement
                .total_support_points
                .cmp(&a.content.engagement.total_support_points)
        })
        .then_with(|| b.rank.partial_cmp(&a.rank).unwrap_or(Ordering::Equal))
}

// ============================================
// PostgreSQL
// ============================================

pub struct PostgresContentStore {
    pool: PgPool,
}

impl PostgresContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CONTENT_COLUMNS: &str = r#"
    content_type, content_id, url, title, summary, keywords, full_text,
    vote_score, rating_avg, reply_count, participant_count, total_sp, sp_allocator_count,
    trust_tier, author_id, created_at, indexed_at
"#;

#[async_trait]
impl ContentStore for PostgresContentStore {
    async fn upsert(&self, content: &IndexedContent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bridge_content_index (
                content_type, content_id, url, title, summary, keywords, full_text,
                vote_score, rating_avg, reply_count, participant_count, total_sp,
                sp_allocator_count, trust_tier, author_id, created_at, indexed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (content_type, content_id) DO UPDATE SET
                url = EXCLUDED.url,
                title = EXCLUDED.title,
                summary = EXCLUDED.summary,
                keywords = EXCLUDED.keywords,
                full_text = EXCLUDED.full_text,
                vote_score = EXCLUDED.vote_score,
                rating_avg = EXCLUDED.rating_avg,
                reply_count = EXCLUDED.reply_count,
                participant_count = EXCLUDED.participant_count,
                total_sp = EXCLUDED.total_sp,
                sp_allocator_count = EXCLUDED.sp_allocator_count,
                trust_tier = EXCLUDED.trust_tier,
                author_id = EXCLUDED.author_id,
                indexed_at = EXCLUDED.indexed_at
            "#,
        )
        .bind(content.content_type.as_str())
        .bind(&content.content_id)
        .bind(&content.url)
        .bind(&content.title)
        .bind(&content.summary)
        .bind(&content.keywords)
        .bind(&content.full_text)
        .bind(content.engagement.vote_score)
        .bind(content.engagement.rating_avg)
        .bind(content.engagement.reply_count)
        .bind(content.engagement.participant_count)
        .bind(content.engagement.total_support_points)
        .bind(content.engagement.support_point_allocator_count)
        .bind(content.trust_tier.as_str())
        .bind(content.author_id)
        .bind(content.created_at)
        .bind(content.indexed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                content_type = %content.content_type,
                content_id = %content.content_id,
                "Failed to upsert indexed content: {}", e
            );
            AppError::from(e)
        })?;

        Ok(())
    }

    async fn remove(&self, content_type: ContentType, content_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM bridge_content_index WHERE content_type = $1 AND content_id = $2",
        )
        .bind(content_type.as_str())
        .bind(content_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get(
        &self,
        content_type: ContentType,
        content_id: &str,
    ) -> Result<Option<IndexedContent>> {
        let sql = format!(
            "SELECT {} FROM bridge_content_index WHERE content_type = $1 AND content_id = $2",
            CONTENT_COLUMNS
        );
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(content_type.as_str())
            .bind(content_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(IndexedContent::try_from).transpose()
    }

    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<ContentSearchResult>> {
        let types: Option<Vec<String>> = options
            .types
            .as_ref()
            .map(|ts| ts.iter().map(|t| t.as_str().to_string()).collect());
        let tiers: Vec<String> = options
            .min_trust_tier
            .unwrap_or(TrustTier::Unvalidated)
            .at_or_above()
            .iter()
            .map(|t| t.as_str().to_string())
            .collect();

        let sql = format!(
            r#"
            SELECT {}, ts_rank(search_vector, plainto_tsquery('english', $1)) AS rank
            FROM bridge_content_index
            WHERE search_vector @@ plainto_tsquery('english', $1)
              AND ($2::text[] IS NULL OR content_type = ANY($2))
              AND trust_tier = ANY($3)
            ORDER BY
                CASE trust_tier
                    WHEN 'consensus' THEN 5
                    WHEN 'high' THEN 4
                    WHEN 'medium' THEN 3
                    WHEN 'low' THEN 2
                    ELSE 1
                END DESC,
                total_sp DESC,
                rank DESC
            LIMIT $4 OFFSET $5
            "#,
            CONTENT_COLUMNS
        );

        let rows = sqlx::query_as::<_, RankedContentRow>(&sql)
            .bind(query)
            .bind(types)
            .bind(tiers)
            .bind(options.limit.max(0))
            .bind(options.offset.max(0))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!(query = %query, "Content search failed: {}", e);
                AppError::from(e)
            })?;

        rows.into_iter()
            .map(|row| {
                let rank = row.rank;
                Ok(ContentSearchResult {
                    content: IndexedContent::try_from(row.content)?,
                    rank,
                })
            })
            .collect()
    }

    async fn high_support(&self, min_sp: i64, limit: i64) -> Result<Vec<IndexedContent>> {
        let sql = format!(
            r#"
            SELECT {} FROM bridge_content_index
            WHERE total_sp >= $1
            ORDER BY total_sp DESC, sp_allocator_count DESC
            LIMIT $2
            "#,
            CONTENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(min_sp)
            .bind(limit.max(0))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(IndexedContent::try_from).collect()
    }

    async fn recent(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<IndexedContent>> {
        let sql = format!(
            r#"
            SELECT {} FROM bridge_content_index
            WHERE created_at >= $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
            CONTENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(since)
            .bind(limit.max(0))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(IndexedContent::try_from).collect()
    }
}

// Database row representation
#[derive(sqlx::FromRow)]
struct ContentRow {
    content_type: String,
    content_id: String,
    url: String,
    title: String,
    summary: Option<String>,
    keywords: Vec<String>,
    full_text: Option<String>,
    vote_score: i64,
    rating_avg: Option<f64>,
    reply_count: i64,
    participant_count: i64,
    total_sp: i64,
    sp_allocator_count: i64,
    trust_tier: String,
    author_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    indexed_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct RankedContentRow {
    #[sqlx(flatten)]
    content: ContentRow,
    rank: f32,
}

impl TryFrom<ContentRow> for IndexedContent {
    type Error = AppError;

    fn try_from(row: ContentRow) -> Result<Self> {
        Ok(IndexedContent {
            content_type: row.content_type.parse()?,
            content_id: row.content_id,
            url: row.url,
            title: row.title,
            summary: row.summary,
            keywords: row.keywords,
            full_text: row.full_text,
            engagement: Engagement {
                vote_score: row.vote_score,
                rating_avg: row.rating_avg,
                reply_count: row.reply_count,
                participant_count: row.participant_count,
                total_support_points: row.total_sp,
                support_point_allocator_count: row.sp_allocator_count,
            },
            trust_tier: row.trust_tier.parse()?,
            author_id: row.author_id,
            created_at: row.created_at,
            indexed_at: row.indexed_at,
        })
    }
}

// ============================================
// In-memory
// ============================================

#[derive(Default)]
pub struct InMemoryContentStore {
    rows: RwLock<HashMap<(ContentType, String), IndexedContent>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

/// Search terms as PostgreSQL's `plainto_tsquery` would see them, minus stemming.
fn query_terms(query: &str) -> Vec<String> {
    words(query)
        .into_iter()
        .filter(|w| !is_search_stop_word(w))
        .collect()
}

/// Every term must appear; title hits weigh more than summary or body hits.
fn text_rank(content: &IndexedContent, terms: &[String]) -> Option<f32> {
    let title = content.title.to_lowercase();
    let summary = content.summary.as_deref().unwrap_or_default().to_lowercase();
    let body = content.full_text.as_deref().unwrap_or_default().to_lowercase();

    let mut rank = 0.0f32;
    for term in terms {
        let hits = (
            occurrences(&title, term),
            occurrences(&summary, term),
            occurrences(&body, term),
        );
        if hits == (0, 0, 0) {
            return None;
        }
        rank += hits.0 as f32 * 1.0 + hits.1 as f32 * 0.4 + hits.2 as f32 * 0.1;
    }
    Some(rank)
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn upsert(&self, content: &IndexedContent) -> Result<()> {
        let key = (content.content_type, content.content_id.clone());
        let mut rows = self.rows.write().await;
        let mut row = content.clone();
        if let Some(existing) = rows.get(&key) {
            row.created_at = existing.created_at;
        }
        rows.insert(key, row);
        Ok(())
    }

    async fn remove(&self, content_type: ContentType, content_id: &str) -> Result<bool> {
        let key = (content_type, content_id.to_string());
        Ok(self.rows.write().await.remove(&key).is_some())
    }

    async fn get(
        &self,
        content_type: ContentType,
        content_id: &str,
    ) -> Result<Option<IndexedContent>> {
        let key = (content_type, content_id.to_string());
        Ok(self.rows.read().await.get(&key).cloned())
    }

    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<ContentSearchResult>> {
        let terms = query_terms(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let min_tier = options.min_trust_tier.unwrap_or(TrustTier::Unvalidated);

        let rows = self.rows.read().await;
        let mut results: Vec<ContentSearchResult> = rows
            .values()
            .filter(|c| {
                options
                    .types
                    .as_ref()
                    .map(|types| types.contains(&c.content_type))
                    .unwrap_or(true)
            })
            .filter(|c| c.trust_tier >= min_tier)
            .filter_map(|c| {
                text_rank(c, &terms).map(|rank| ContentSearchResult {
                    content: c.clone(),
                    rank,
                })
            })
            .collect();

        results.sort_by(search_order);

        Ok(results
            .into_iter()
            .skip(options.offset.max(0) as usize)
            .take(options.limit.max(0) as usize)
            .collect())
    }

    async fn high_support(&self, min_sp: i64, limit: i64) -> Result<Vec<IndexedContent>> {
        let rows = self.rows.read().await;
        let mut items: Vec<IndexedContent> = rows
            .values()
            .filter(|c| c.engagement.total_support_points >= min_sp)
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            b.engagement
                .total_support_points
                .cmp(&a.engagement.total_support_points)
                .then_with(|| {
                    b.engagement
                        .support_point_allocator_count
                        .cmp(&a.engagement.support_point_allocator_count)
                })
        });
        items.truncate(limit.max(0) as usize);
        Ok(items)
    }

    async fn recent(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<IndexedContent>> {
        let rows = self.rows.read().await;
        let mut items: Vec<IndexedContent> = rows
            .values()
            .filter(|c| c.created_at >= since)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items.truncate(limit.max(0) as usize);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, title: &str, tier: TrustTier, sp: i64) -> IndexedContent {
        IndexedContent {
            content_type: ContentType::ForumPost,
            content_id: id.to_string(),
            url: format!("/forum/posts/{}", id),
            title: title.to_string(),
            summary: None,
            keywords: Vec::new(),
            full_text: None,
            engagement: Engagement {
                total_support_points: sp,
                ..Default::default()
            },
            trust_tier: tier,
            author_id: None,
            created_at: Utc::now(),
            indexed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn upsert_overwrites_same_identity() {
        let store = InMemoryContentStore::new();
        store.upsert(&item("1", "Garden plan", TrustTier::Low, 0)).await.unwrap();
        store.upsert(&item("1", "Garden plan v2", TrustTier::High, 30)).await.unwrap();
        assert_eq!(store.len().await, 1);
        let row = store.get(ContentType::ForumPost, "1").await.unwrap().unwrap();
        assert_eq!(row.title, "Garden plan v2");
    }

    #[tokio::test]
    async fn search_orders_by_tier_then_support_then_rank() {
        let store = InMemoryContentStore::new();
        store.upsert(&item("a", "garden", TrustTier::Medium, 50)).await.unwrap();
        store.upsert(&item("b", "garden garden", TrustTier::High, 1)).await.unwrap();
        store.upsert(&item("c", "garden", TrustTier::High, 9)).await.unwrap();
        store.upsert(&item("d", "garden garden", TrustTier::High, 9)).await.unwrap();

        let results = store.search("garden", &SearchOptions::default()).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.content.content_id.as_str()).collect();
        assert_eq!(ids, vec!["d", "c", "b", "a"]);
    }

    #[tokio::test]
    async fn search_applies_filters_and_paging() {
        let store = InMemoryContentStore::new();
        store.upsert(&item("a", "tool library", TrustTier::Low, 0)).await.unwrap();
        store.upsert(&item("b", "tool library", TrustTier::High, 0)).await.unwrap();

        let opts = SearchOptions {
            min_trust_tier: Some(TrustTier::Medium),
            ..Default::default()
        };
        let results = store.search("the tool library", &opts).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content.content_id, "b");

        let opts = SearchOptions {
            types: Some(vec![ContentType::Proposal]),
            ..Default::default()
        };
        assert!(store.search("tool", &opts).await.unwrap().is_empty());

        let opts = SearchOptions {
            offset: 1,
            ..Default::default()
        };
        assert_eq!(store.search("tool", &opts).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remove_missing_row_is_not_an_error() {
        let store = InMemoryContentStore::new();
        assert!(!store.remove(ContentType::Doc, "missing").await.unwrap());
    }
}
