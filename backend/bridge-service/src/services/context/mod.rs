//! Member and city context, cached per key with independent lifetimes.

pub mod cache;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::config::CacheConfig;
use crate::error::Result;
use crate::models::{CityContext, CityKey, UserContext};

pub use cache::{CacheOutcome, TtlCache};

/// Builds fresh context snapshots from the platform's data
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContextSource: Send + Sync {
    async fn load_user_context(&self, member_id: Uuid) -> Result<UserContext>;

    async fn load_city_context(&self, city: &str, region: &str) -> Result<CityContext>;

    /// Members seen within the window, oldest id first
    async fn active_members(&self, within_days: i64, limit: i64) -> Result<Vec<Uuid>>;
}

/// Raw activity counts that feed the engagement score
#[derive(Debug, Clone, Default)]
pub struct ActivitySignals {
    pub posts_count: i64,
    pub comments_count: i64,
    pub group_count: i64,
    pub events_attended: i64,
    pub last_active_at: Option<DateTime<Utc>>,
    pub onboarding_complete: bool,
}

/// 0-100 summary of how involved a member is.
pub fn engagement_score(signals: &ActivitySignals, now: DateTime<Utc>) -> i32 {
    let mut score = 0i64;
    score += (signals.posts_count.max(0) * 2).min(20);
    score += signals.comments_count.max(0).min(15);
    score += (signals.group_count.max(0) * 5).min(20);
    score += (signals.events_attended.max(0) * 3).min(15);

    if let Some(last_active) = signals.last_active_at {
        let days = (now - last_active).num_seconds() as f64 / 86_400.0;
        score += if days < 1.0 {
            15
        } else if days < 7.0 {
            10
        } else if days < 30.0 {
            5
        } else {
            0
        };
    }

    if signals.onboarding_complete {
        score += 15;
    }

    score.min(100) as i32
}

/// Cached access to context snapshots. Construct one per application and share it.
pub struct ContextService {
    source: Arc<dyn ContextSource>,
    users: TtlCache<Uuid, UserContext>,
    cities: TtlCache<CityKey, CityContext>,
}

impl ContextService {
    pub fn new(source: Arc<dyn ContextSource>, config: &CacheConfig) -> Self {
        Self {
            source,
            users: TtlCache::with_limits(
                "user_context",
                config.user_context_ttl(),
                config.user_context_max_entries,
            ),
            cities: TtlCache::with_limits(
                "city_context",
                config.city_context_ttl(),
                config.city_context_max_entries,
            ),
        }
    }

    pub async fn user_context(&self, member_id: Uuid) -> Result<Arc<UserContext>> {
        let source = self.source.clone();
        let (ctx, outcome) = self
            .users
            .get_or_load(&member_id, || async move {
                source.load_user_context(member_id).await
            })
            .await?;
        debug!(member_id = %member_id, outcome = outcome.as_str(), "User context resolved");
        Ok(ctx)
    }

    pub async fn city_context(&self, city: &str, region: &str) -> Result<Arc<CityContext>> {
        let key = CityKey::new(city, region);
        let source = self.source.clone();
        let (ctx, outcome) = self
            .cities
            .get_or_load(&key, || async move {
                source.load_city_context(city, region).await
            })
            .await?;
        debug!(city = %key, outcome = outcome.as_str(), "City context resolved");
        Ok(ctx)
    }

    /// Uncached; the batch generator calls this once per run
    pub async fn active_members(&self, within_days: i64, limit: i64) -> Result<Vec<Uuid>> {
        self.source.active_members(within_days, limit).await
    }

    /// Drop a member's snapshot, e.g. after they edit their profile
    pub fn invalidate_user(&self, member_id: Uuid) {
        self.users.invalidate(&member_id);
    }

    pub fn invalidate_city(&self, city: &str, region: &str) {
        self.cities.invalidate(&CityKey::new(city, region));
    }

    pub fn clear(&self) {
        self.users.clear();
        self.cities.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use chrono::Duration as ChronoDuration;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn user_context_is_cached_within_ttl() {
        let member = Uuid::new_v4();
        let mut source = MockContextSource::new();
        source
            .expect_load_user_context()
            .with(eq(member))
            .times(1)
            .returning(|id| Ok(UserContext::new(id)));

        let service = ContextService::new(Arc::new(source), &CacheConfig::default());
        let first = service.user_context(member).await.unwrap();
        let second = service.user_context(member).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn city_rebuild_failure_serves_stale_snapshot() {
        let mut source = MockContextSource::new();
        let mut calls = 0;
        source
            .expect_load_city_context()
            .times(2)
            .returning(move |city, region| {
                calls += 1;
                if calls == 1 {
                    Ok(CityContext::new(city, region))
                } else {
                    Err(AppError::Database("connection refused".into()))
                }
            });

        let config = CacheConfig {
            user_context_ttl_secs: 0,
            city_context_ttl_secs: 0,
            ..CacheConfig::default()
        };
        let service = ContextService::new(Arc::new(source), &config);
        let fresh = service.city_context("Portland", "OR").await.unwrap();
        let stale = service.city_context("Portland", "OR").await.unwrap();
        assert_eq!(fresh.city, stale.city);
    }

    #[tokio::test]
    async fn user_failure_without_cache_propagates() {
        let mut source = MockContextSource::new();
        source
            .expect_load_user_context()
            .returning(|id| Err(AppError::NotFound(format!("member {}", id))));

        let service = ContextService::new(Arc::new(source), &CacheConfig::default());
        let err = service.user_context(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn engagement_score_formula() {
        let now = Utc::now();
        let signals = ActivitySignals {
            posts_count: 4,
            comments_count: 30,
            group_count: 2,
            events_attended: 1,
            last_active_at: Some(now - ChronoDuration::hours(3)),
            onboarding_complete: true,
        };
        // 8 + 15 + 10 + 3 + 15 + 15
        assert_eq!(engagement_score(&signals, now), 66);

        let maxed = ActivitySignals {
            posts_count: 100,
            comments_count: 100,
            group_count: 100,
            events_attended: 100,
            last_active_at: Some(now),
            onboarding_complete: true,
        };
        assert_eq!(engagement_score(&maxed, now), 100);
        assert_eq!(engagement_score(&ActivitySignals::default(), now), 0);
    }
}
