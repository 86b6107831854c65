//! Curated question/answer examples

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::error;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{ExampleRatings, ExampleStatus, TrainingExample};
use crate::utils::escape_like;

#[async_trait]
pub trait ExampleStore: Send + Sync {
    async fn create(&self, example: &TrainingExample) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<TrainingExample>>;

    /// Record reviewer ratings of the generated answer and mark the example reviewed
    async fn rate(&self, id: Uuid, ratings: ExampleRatings) -> Result<Option<TrainingExample>>;

    async fn set_ideal_response(&self, id: Uuid, ideal: &str) -> Result<Option<TrainingExample>>;

    async fn set_status(&self, id: Uuid, status: ExampleStatus)
        -> Result<Option<TrainingExample>>;

    /// Examples in `status` with a non-empty ideal answer whose question,
    /// generated answer or ideal answer contains any of `terms`
    /// (case-insensitive), newest first. Ratings are deliberately ignored.
    async fn find_matching(
        &self,
        terms: &[String],
        status: ExampleStatus,
        limit: i64,
    ) -> Result<Vec<TrainingExample>>;
}

// ============================================
// PostgreSQL
// ============================================

pub struct PostgresExampleStore {
    pool: PgPool,
}

impl PostgresExampleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const EXAMPLE_COLUMNS: &str = r#"
    id, question, bridge_response, helpfulness_rating, accuracy_rating, tone_rating,
    ideal_response, training_status, quality_score, created_at, updated_at
"#;

#[async_trait]
impl ExampleStore for PostgresExampleStore {
    async fn create(&self, example: &TrainingExample) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bridge_training_examples (
                id, question, bridge_response, helpfulness_rating, accuracy_rating,
                tone_rating, ideal_response, training_status, quality_score,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(example.id)
        .bind(&example.question)
        .bind(&example.bridge_response)
        .bind(example.helpfulness_rating)
        .bind(example.accuracy_rating)
        .bind(example.tone_rating)
        .bind(&example.ideal_response)
        .bind(example.status.as_str())
        .bind(example.quality_score)
        .bind(example.created_at)
        .bind(example.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<TrainingExample>> {
        let sql = format!(
            "SELECT {} FROM bridge_training_examples WHERE id = $1 AND deleted_at IS NULL",
            EXAMPLE_COLUMNS
        );
        let row = sqlx::query_as::<_, ExampleRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TrainingExample::try_from).transpose()
    }

    async fn rate(&self, id: Uuid, ratings: ExampleRatings) -> Result<Option<TrainingExample>> {
        let r = ratings.clamped();
        let sql = format!(
            r#"
            UPDATE bridge_training_examples
            SET helpfulness_rating = $2,
                accuracy_rating = $3,
                tone_rating = $4,
                quality_score = $5,
                training_status = 'reviewed',
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {}
            "#,
            EXAMPLE_COLUMNS
        );
        let row = sqlx::query_as::<_, ExampleRow>(&sql)
            .bind(id)
            .bind(r.helpfulness)
            .bind(r.accuracy)
            .bind(r.tone)
            .bind(r.quality_score())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TrainingExample::try_from).transpose()
    }

    async fn set_ideal_response(&self, id: Uuid, ideal: &str) -> Result<Option<TrainingExample>> {
        let sql = format!(
            r#"
            UPDATE bridge_training_examples
            SET ideal_response = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {}
            "#,
            EXAMPLE_COLUMNS
        );
        let row = sqlx::query_as::<_, ExampleRow>(&sql)
            .bind(id)
            .bind(ideal)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TrainingExample::try_from).transpose()
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: ExampleStatus,
    ) -> Result<Option<TrainingExample>> {
        let sql = format!(
            r#"
            UPDATE bridge_training_examples
            SET training_status = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {}
            "#,
            EXAMPLE_COLUMNS
        );
        let row = sqlx::query_as::<_, ExampleRow>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TrainingExample::try_from).transpose()
    }

    async fn find_matching(
        &self,
        terms: &[String],
        status: ExampleStatus,
        limit: i64,
    ) -> Result<Vec<TrainingExample>> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let patterns: Vec<String> = terms
            .iter()
            .map(|t| format!("%{}%", escape_like(t)))
            .collect();

        let sql = format!(
            r#"
            SELECT {} FROM bridge_training_examples
            WHERE training_status = $1
              AND deleted_at IS NULL
              AND ideal_response IS NOT NULL
              AND btrim(ideal_response) <> ''
              AND (
                  question ILIKE ANY($2)
                  OR bridge_response ILIKE ANY($2)
                  OR ideal_response ILIKE ANY($2)
              )
            ORDER BY created_at DESC
            LIMIT $3
            "#,
            EXAMPLE_COLUMNS
        );
        let rows = sqlx::query_as::<_, ExampleRow>(&sql)
            .bind(status.as_str())
            .bind(&patterns)
            .bind(limit.max(0))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!(status = %status, "Example lookup failed: {}", e);
                AppError::from(e)
            })?;

        rows.into_iter().map(TrainingExample::try_from).collect()
    }
}

// Database row representation
#[derive(sqlx::FromRow)]
struct ExampleRow {
    id: Uuid,
    question: String,
    bridge_response: String,
    helpfulness_rating: Option<i16>,
    accuracy_rating: Option<i16>,
    tone_rating: Option<i16>,
    ideal_response: Option<String>,
    training_status: String,
    quality_score: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ExampleRow> for TrainingExample {
    type Error = AppError;

    fn try_from(row: ExampleRow) -> Result<Self> {
        Ok(TrainingExample {
            id: row.id,
            question: row.question,
            bridge_response: row.bridge_response,
            helpfulness_rating: row.helpfulness_rating,
            accuracy_rating: row.accuracy_rating,
            tone_rating: row.tone_rating,
            ideal_response: row.ideal_response,
            status: row.training_status.parse()?,
            quality_score: row.quality_score,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ============================================
// In-memory
// ============================================

#[derive(Default)]
pub struct InMemoryExampleStore {
    rows: RwLock<HashMap<Uuid, TrainingExample>>,
}

impl InMemoryExampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn update<F>(&self, id: Uuid, f: F) -> Option<TrainingExample>
    where
        F: FnOnce(&mut TrainingExample) + Send,
    {
        let mut rows = self.rows.write().await;
        rows.get_mut(&id).map(|ex| {
            f(ex);
            ex.updated_at = Utc::now();
            ex.clone()
        })
    }
}

#[async_trait]
impl ExampleStore for InMemoryExampleStore {
    async fn create(&self, example: &TrainingExample) -> Result<()> {
        self.rows.write().await.insert(example.id, example.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<TrainingExample>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn rate(&self, id: Uuid, ratings: ExampleRatings) -> Result<Option<TrainingExample>> {
        let r = ratings.clamped();
        Ok(self
            .update(id, move |ex| {
                ex.helpfulness_rating = Some(r.helpfulness);
                ex.accuracy_rating = Some(r.accuracy);
                ex.tone_rating = Some(r.tone);
                ex.quality_score = Some(r.quality_score());
                ex.status = ExampleStatus::Reviewed;
            })
            .await)
    }

    async fn set_ideal_response(&self, id: Uuid, ideal: &str) -> Result<Option<TrainingExample>> {
        let ideal = ideal.to_string();
        Ok(self.update(id, move |ex| ex.ideal_response = Some(ideal)).await)
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: ExampleStatus,
    ) -> Result<Option<TrainingExample>> {
        Ok(self.update(id, move |ex| ex.status = status).await)
    }

    async fn find_matching(
        &self,
        terms: &[String],
        status: ExampleStatus,
        limit: i64,
    ) -> Result<Vec<TrainingExample>> {
        let needles: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
        if needles.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self.rows.read().await;
        let mut matches: Vec<TrainingExample> = rows
            .values()
            .filter(|ex| ex.status == status && ex.has_ideal_response())
            .filter(|ex| {
                let fields = [
                    ex.question.to_lowercase(),
                    ex.bridge_response.to_lowercase(),
                    ex.ideal_response.as_deref().unwrap_or_default().to_lowercase(),
                ];
                needles
                    .iter()
                    .any(|n| fields.iter().any(|field| field.contains(n.as_str())))
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matches.truncate(limit.max(0) as usize);
        Ok(matches)
    }
}
