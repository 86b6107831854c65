//! Recommendation lifecycle storage
//!
//! Status only moves forward (pending -> shown -> acted_on, pending|shown -> dismissed).
//! Mutations on unknown ids are no-ops that return `Ok(None)`. A mutation the
//! state machine forbids leaves the row untouched and returns it as stored.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::utils::days_before;
use crate::models::{
    Recommendation, RecommendationFilter, RecommendationStats, RecommendationStatus,
};

#[async_trait]
pub trait RecommendationStore: Send + Sync {
    /// Upsert by id
    async fn save(&self, batch: &[Recommendation]) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<Recommendation>>;

    /// Pending items under their nudge cap, most relevant first
    async fn get_active(&self, member_id: Uuid, limit: i64) -> Result<Vec<Recommendation>>;

    /// All items for a member, newest first
    async fn list_for_member(
        &self,
        member_id: Uuid,
        filter: &RecommendationFilter,
    ) -> Result<Vec<Recommendation>>;

    /// Move to `next` if the state machine allows it from the stored status
    async fn transition(
        &self,
        id: Uuid,
        next: RecommendationStatus,
    ) -> Result<Option<Recommendation>>;

    /// Bump the nudge counter unless it already reached `max_nudges` or the item is terminal
    async fn increment_nudge(&self, id: Uuid) -> Result<Option<Recommendation>>;

    /// Delete terminal items created more than `older_than_days` ago
    async fn cleanup(&self, older_than_days: i64) -> Result<u64>;

    async fn has_pending(&self, member_id: Uuid) -> Result<bool>;

    /// Status counts and mean relevance for items created in the last `since_days`
    async fn statistics(&self, since_days: i64) -> Result<RecommendationStats>;

    async fn mark_shown(&self, id: Uuid) -> Result<Option<Recommendation>> {
        self.transition(id, RecommendationStatus::Shown).await
    }

    async fn mark_acted_on(&self, id: Uuid) -> Result<Option<Recommendation>> {
        self.transition(id, RecommendationStatus::ActedOn).await
    }

    async fn mark_dismissed(&self, id: Uuid) -> Result<Option<Recommendation>> {
        self.transition(id, RecommendationStatus::Dismissed).await
    }
}

/// Statuses from which `next` is reachable in one step.
fn allowed_sources(next: RecommendationStatus) -> Vec<String> {
    [
        RecommendationStatus::Pending,
        RecommendationStatus::Shown,
        RecommendationStatus::ActedOn,
        RecommendationStatus::Dismissed,
    ]
    .into_iter()
    .filter(|s| s.can_transition_to(next))
    .map(|s| s.as_str().to_string())
    .collect()
}

fn days_to_i32(days: i64) -> i32 {
    days.clamp(0, i32::MAX as i64) as i32
}

// ============================================
// PostgreSQL
// ============================================

pub struct PostgresRecommendationStore {
    pool: PgPool,
}

impl PostgresRecommendationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const RECOMMENDATION_COLUMNS: &str = r#"
    id, member_id, rec_type, title, description, target_id, target_url,
    relevance_score, matched_interests, city_context, reward_points, urgency,
    status, nudge_count, max_nudges, created_at, updated_at,
    shown_at, acted_on_at, dismissed_at
"#;

#[async_trait]
impl RecommendationStore for PostgresRecommendationStore {
    async fn save(&self, batch: &[Recommendation]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for rec in batch {
            sqlx::query(
                r#"
                INSERT INTO bridge_recommendations (
                    id, member_id, rec_type, title, description, target_id, target_url,
                    relevance_score, matched_interests, city_context, reward_points, urgency,
                    status, nudge_count, max_nudges, created_at, updated_at,
                    shown_at, acted_on_at, dismissed_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                        $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
                ON CONFLICT (id) DO UPDATE SET
                    title = EXCLUDED.title,
                    description = EXCLUDED.description,
                    target_url = EXCLUDED.target_url,
                    relevance_score = EXCLUDED.relevance_score,
                    matched_interests = EXCLUDED.matched_interests,
                    reward_points = EXCLUDED.reward_points,
                    urgency = EXCLUDED.urgency,
                    status = CASE
                        WHEN bridge_recommendations.status = EXCLUDED.status
                          OR (bridge_recommendations.status = 'pending'
                              AND EXCLUDED.status IN ('shown', 'dismissed'))
                          OR (bridge_recommendations.status = 'shown'
                              AND EXCLUDED.status IN ('acted_on', 'dismissed'))
                        THEN EXCLUDED.status
                        ELSE bridge_recommendations.status
                    END,
                    nudge_count = GREATEST(bridge_recommendations.nudge_count, EXCLUDED.nudge_count),
                    max_nudges = EXCLUDED.max_nudges,
                    updated_at = EXCLUDED.updated_at,
                    shown_at = COALESCE(bridge_recommendations.shown_at, EXCLUDED.shown_at),
                    acted_on_at = COALESCE(bridge_recommendations.acted_on_at, EXCLUDED.acted_on_at),
                    dismissed_at = COALESCE(bridge_recommendations.dismissed_at, EXCLUDED.dismissed_at)
                "#,
            )
            .bind(rec.id)
            .bind(rec.member_id)
            .bind(rec.rec_type.as_str())
            .bind(&rec.title)
            .bind(&rec.description)
            .bind(&rec.target_id)
            .bind(&rec.target_url)
            .bind(rec.relevance_score)
            .bind(&rec.matched_interests)
            .bind(&rec.city_context)
            .bind(rec.reward_points)
            .bind(rec.urgency.as_str())
            .bind(rec.status.as_str())
            .bind(rec.nudge_count)
            .bind(rec.max_nudges)
            .bind(rec.created_at)
            .bind(rec.updated_at)
            .bind(rec.shown_at)
            .bind(rec.acted_on_at)
            .bind(rec.dismissed_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!(recommendation_id = %rec.id, "Failed to save recommendation: {}", e);
                AppError::from(e)
            })?;
        }

        tx.commit().await?;
        debug!(count = batch.len(), "Saved recommendations");
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Recommendation>> {
        let sql = format!(
            "SELECT {} FROM bridge_recommendations WHERE id = $1",
            RECOMMENDATION_COLUMNS
        );
        let row = sqlx::query_as::<_, RecommendationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Recommendation::try_from).transpose()
    }

    async fn get_active(&self, member_id: Uuid, limit: i64) -> Result<Vec<Recommendation>> {
        let sql = format!(
            r#"
            SELECT {} FROM bridge_recommendations
            WHERE member_id = $1
              AND status = 'pending'
              AND nudge_count < max_nudges
            ORDER BY relevance_score DESC, created_at DESC
            LIMIT $2
            "#,
            RECOMMENDATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, RecommendationRow>(&sql)
            .bind(member_id)
            .bind(limit.max(0))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!(member_id = %member_id, "Failed to load active recommendations: {}", e);
                AppError::from(e)
            })?;

        rows.into_iter().map(Recommendation::try_from).collect()
    }

    async fn list_for_member(
        &self,
        member_id: Uuid,
        filter: &RecommendationFilter,
    ) -> Result<Vec<Recommendation>> {
        let sql = format!(
            r#"
            SELECT {} FROM bridge_recommendations
            WHERE member_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR rec_type = $3)
            ORDER BY created_at DESC
            LIMIT $4
            "#,
            RECOMMENDATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, RecommendationRow>(&sql)
            .bind(member_id)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.rec_type.map(|t| t.as_str()))
            .bind(filter.limit.unwrap_or(50).max(0))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Recommendation::try_from).collect()
    }

    async fn transition(
        &self,
        id: Uuid,
        next: RecommendationStatus,
    ) -> Result<Option<Recommendation>> {
        let sql = format!(
            r#"
            UPDATE bridge_recommendations
            SET status = $2,
                updated_at = NOW(),
                shown_at = CASE WHEN $2 = 'shown' THEN NOW() ELSE shown_at END,
                acted_on_at = CASE WHEN $2 = 'acted_on' THEN NOW() ELSE acted_on_at END,
                dismissed_at = CASE WHEN $2 = 'dismissed' THEN NOW() ELSE dismissed_at END
            WHERE id = $1 AND status = ANY($3)
            RETURNING {}
            "#,
            RECOMMENDATION_COLUMNS
        );
        let row = sqlx::query_as::<_, RecommendationRow>(&sql)
            .bind(id)
            .bind(next.as_str())
            .bind(allowed_sources(next))
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Recommendation::try_from(row).map(Some),
            None => {
                debug!(recommendation_id = %id, next = %next, "Transition not applied");
                self.get(id).await
            }
        }
    }

    async fn increment_nudge(&self, id: Uuid) -> Result<Option<Recommendation>> {
        let sql = format!(
            r#"
            UPDATE bridge_recommendations
            SET nudge_count = nudge_count + 1, updated_at = NOW()
            WHERE id = $1
              AND nudge_count < max_nudges
              AND status IN ('pending', 'shown')
            RETURNING {}
            "#,
            RECOMMENDATION_COLUMNS
        );
        let row = sqlx::query_as::<_, RecommendationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Recommendation::try_from(row).map(Some),
            None => self.get(id).await,
        }
    }

    async fn cleanup(&self, older_than_days: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM bridge_recommendations
            WHERE status IN ('acted_on', 'dismissed')
              AND created_at < NOW() - make_interval(days => $1)
            "#,
        )
        .bind(days_to_i32(older_than_days))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(older_than_days, "Recommendation cleanup failed: {}", e);
            AppError::from(e)
        })?;

        Ok(result.rows_affected())
    }

    async fn has_pending(&self, member_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM bridge_recommendations
                WHERE member_id = $1 AND status = 'pending'
            )
            "#,
        )
        .bind(member_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn statistics(&self, since_days: i64) -> Result<RecommendationStats> {
        let row: (i64, i64, i64, i64, i64, f64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE status = 'pending'),
                COUNT(*) FILTER (WHERE status = 'shown'),
                COUNT(*) FILTER (WHERE status = 'acted_on'),
                COUNT(*) FILTER (WHERE status = 'dismissed'),
                COALESCE(AVG(relevance_score), 0)::float8
            FROM bridge_recommendations
            WHERE created_at > NOW() - make_interval(days => $1)
            "#,
        )
        .bind(days_to_i32(since_days))
        .fetch_one(&self.pool)
        .await?;

        Ok(RecommendationStats {
            total: row.0,
            pending: row.1,
            shown: row.2,
            acted_on: row.3,
            dismissed: row.4,
            average_relevance: row.5,
        })
    }
}

// Database row representation
#[derive(sqlx::FromRow)]
struct RecommendationRow {
    id: Uuid,
    member_id: Uuid,
    rec_type: String,
    title: String,
    description: String,
    target_id: String,
    target_url: Option<String>,
    relevance_score: i32,
    matched_interests: Vec<String>,
    city_context: String,
    reward_points: i32,
    urgency: String,
    status: String,
    nudge_count: i32,
    max_nudges: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    shown_at: Option<DateTime<Utc>>,
    acted_on_at: Option<DateTime<Utc>>,
    dismissed_at: Option<DateTime<Utc>>,
}

impl TryFrom<RecommendationRow> for Recommendation {
    type Error = AppError;

    fn try_from(row: RecommendationRow) -> Result<Self> {
        Ok(Recommendation {
            id: row.id,
            member_id: row.member_id,
            rec_type: row.rec_type.parse()?,
            title: row.title,
            description: row.description,
            target_id: row.target_id,
            target_url: row.target_url,
            relevance_score: row.relevance_score,
            matched_interests: row.matched_interests,
            city_context: row.city_context,
            reward_points: row.reward_points,
            urgency: row.urgency.parse()?,
            status: row.status.parse()?,
            nudge_count: row.nudge_count,
            max_nudges: row.max_nudges,
            created_at: row.created_at,
            updated_at: row.updated_at,
            shown_at: row.shown_at,
            acted_on_at: row.acted_on_at,
            dismissed_at: row.dismissed_at,
        })
    }
}

// ============================================
// In-memory
// ============================================

#[derive(Default)]
pub struct InMemoryRecommendationStore {
    rows: RwLock<HashMap<Uuid, Recommendation>>,
}

impl InMemoryRecommendationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Cleanup against an explicit clock
    pub async fn cleanup_at(&self, older_than_days: i64, now: DateTime<Utc>) -> u64 {
        let cutoff = days_before(now, older_than_days);
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, r| !(r.status.is_terminal() && r.created_at < cutoff));
        (before - rows.len()) as u64
    }
}

#[async_trait]
impl RecommendationStore for InMemoryRecommendationStore {
    async fn save(&self, batch: &[Recommendation]) -> Result<()> {
        let mut rows = self.rows.write().await;
        for rec in batch {
            match rows.get_mut(&rec.id) {
                Some(existing) => existing.merge_from(rec.clone()),
                None => {
                    rows.insert(rec.id, rec.clone());
                }
            }
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Recommendation>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn get_active(&self, member_id: Uuid, limit: i64) -> Result<Vec<Recommendation>> {
        let rows = self.rows.read().await;
        let mut items: Vec<Recommendation> = rows
            .values()
            .filter(|r| r.member_id == member_id && r.is_active())
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            b.relevance_score
                .cmp(&a.relevance_score)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        items.truncate(limit.max(0) as usize);
        Ok(items)
    }

    async fn list_for_member(
        &self,
        member_id: Uuid,
        filter: &RecommendationFilter,
    ) -> Result<Vec<Recommendation>> {
        let rows = self.rows.read().await;
        let mut items: Vec<Recommendation> = rows
            .values()
            .filter(|r| r.member_id == member_id)
            .filter(|r| filter.status.map(|s| r.status == s).unwrap_or(true))
            .filter(|r| filter.rec_type.map(|t| r.rec_type == t).unwrap_or(true))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items.truncate(filter.limit.unwrap_or(50).max(0) as usize);
        Ok(items)
    }

    async fn transition(
        &self,
        id: Uuid,
        next: RecommendationStatus,
    ) -> Result<Option<Recommendation>> {
        let mut rows = self.rows.write().await;
        Ok(rows.get_mut(&id).map(|rec| {
            rec.transition(next, Utc::now());
            rec.clone()
        }))
    }

    async fn increment_nudge(&self, id: Uuid) -> Result<Option<Recommendation>> {
        let mut rows = self.rows.write().await;
        Ok(rows.get_mut(&id).map(|rec| {
            if !rec.status.is_terminal() && rec.nudge_count < rec.max_nudges {
                rec.nudge_count += 1;
                rec.updated_at = Utc::now();
            }
            rec.clone()
        }))
    }

    async fn cleanup(&self, older_than_days: i64) -> Result<u64> {
        Ok(self.cleanup_at(older_than_days, Utc::now()).await)
    }

    async fn has_pending(&self, member_id: Uuid) -> Result<bool> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .any(|r| r.member_id == member_id && r.status == RecommendationStatus::Pending))
    }

    async fn statistics(&self, since_days: i64) -> Result<RecommendationStats> {
        let cutoff = days_before(Utc::now(), since_days);
        let rows = self.rows.read().await;
        let mut stats = RecommendationStats::default();
        let mut score_sum = 0i64;

        for rec in rows.values().filter(|r| r.created_at > cutoff) {
            stats.total += 1;
            score_sum += rec.relevance_score as i64;
            match rec.status {
                RecommendationStatus::Pending => stats.pending += 1,
                RecommendationStatus::Shown => stats.shown += 1,
                RecommendationStatus::ActedOn => stats.acted_on += 1,
                RecommendationStatus::Dismissed => stats.dismissed += 1,
            }
        }
        if stats.total > 0 {
            stats.average_relevance = score_sum as f64 / stats.total as f64;
        }
        Ok(stats)
    }
}
