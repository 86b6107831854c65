//! Administrator-managed settings (trust thresholds)

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::Result;
use crate::models::TrustThresholds;

const TRUST_THRESHOLDS_KEY: &str = "trust_thresholds";

/// Source of the thresholds the classifier reads on each evaluation
#[async_trait]
pub trait ThresholdSource: Send + Sync {
    async fn thresholds(&self) -> Result<TrustThresholds>;

    async fn update_thresholds(&self, thresholds: &TrustThresholds) -> Result<()>;
}

pub struct PostgresSettingsStore {
    pool: PgPool,
}

impl PostgresSettingsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ThresholdSource for PostgresSettingsStore {
    async fn thresholds(&self) -> Result<TrustThresholds> {
        let value: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT value FROM bridge_settings WHERE key = $1")
                .bind(TRUST_THRESHOLDS_KEY)
                .fetch_optional(&self.pool)
                .await?;

        let Some(value) = value else {
            return Ok(TrustThresholds::default());
        };

        match serde_json::from_value::<TrustThresholds>(value) {
            Ok(thresholds) => Ok(thresholds.sanitized()),
            Err(e) => {
                warn!("Stored trust thresholds are malformed, using defaults: {}", e);
                Ok(TrustThresholds::default())
            }
        }
    }

    async fn update_thresholds(&self, thresholds: &TrustThresholds) -> Result<()> {
        let value = serde_json::to_value(thresholds.sanitized())?;
        sqlx::query(
            r#"
            INSERT INTO bridge_settings (key, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            "#,
        )
        .bind(TRUST_THRESHOLDS_KEY)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Thresholds held in process memory
#[derive(Default)]
pub struct InMemorySettingsStore {
    thresholds: RwLock<TrustThresholds>,
}

impl InMemorySettingsStore {
    pub fn new(thresholds: TrustThresholds) -> Self {
        Self {
            thresholds: RwLock::new(thresholds),
        }
    }
}

#[async_trait]
impl ThresholdSource for InMemorySettingsStore {
    async fn thresholds(&self) -> Result<TrustThresholds> {
        Ok(*self.thresholds.read().await)
    }

    async fn update_thresholds(&self, thresholds: &TrustThresholds) -> Result<()> {
        *self.thresholds.write().await = thresholds.sanitized();
        Ok(())
    }
}
