//! Recommendation Generator Background Job
//!
//! Periodically fills the queue for recently active members who have nothing
//! pending. A failure for one member is counted and the batch moves on.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use uuid::Uuid;

use super::JobResult;
use crate::error::Result;
use crate::metrics::recommendations as metrics;
use crate::services::RecommendationService;

const JOB_NAME: &str = "generate";

/// Members seen within this many days are candidates
const ACTIVE_WINDOW_DAYS: i64 = 7;

/// Members generated in parallel, to keep pool usage bounded
const CONCURRENT_MEMBERS: usize = 8;

pub async fn start_recommendation_generator(
    service: Arc<RecommendationService>,
    interval: Duration,
    initial_delay: Duration,
    batch_size: i64,
) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        initial_delay_secs = initial_delay.as_secs(),
        batch_size = batch_size,
        "Starting recommendation generator background job"
    );

    // Let the server come up before the first batch
    sleep(initial_delay).await;

    loop {
        let result = run_generation_batch(&service, batch_size).await;
        if result.success {
            tracing::info!(
                users_processed = result.users_processed,
                recommendations_generated = result.recommendations_generated,
                errors = result.errors,
                duration_ms = result.duration.as_millis() as u64,
                "Recommendation generation batch completed"
            );
        } else {
            tracing::warn!(
                errors = result.errors,
                error_messages = ?result.error_messages,
                duration_ms = result.duration.as_millis() as u64,
                "Recommendation generation batch failed"
            );
        }

        sleep(interval).await;
    }
}

/// Generate for up to `batch_size` active members without pending recommendations.
pub async fn run_generation_batch(service: &RecommendationService, batch_size: i64) -> JobResult {
    let started = Instant::now();
    let mut result = JobResult::default();

    let candidates = match service
        .context()
        .active_members(ACTIVE_WINDOW_DAYS, batch_size.max(1))
        .await
    {
        Ok(ids) => ids,
        Err(e) => {
            result.record_error(format!("failed to list active members: {}", e));
            result.duration = started.elapsed();
            metrics::record_job_run(JOB_NAME, "error");
            metrics::record_job_duration(JOB_NAME, result.duration);
            return result;
        }
    };

    let outcomes: Vec<(Uuid, Result<Option<usize>>)> = stream::iter(candidates)
        .map(|member_id| async move { (member_id, generate_if_idle(service, member_id).await) })
        .buffer_unordered(CONCURRENT_MEMBERS)
        .collect()
        .await;

    for (member_id, outcome) in outcomes {
        match outcome {
            Ok(Some(generated)) => {
                result.users_processed += 1;
                result.recommendations_generated += generated;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(member_id = %member_id, error = %e, "Generation failed for member");
                result.record_error(format!("member {}: {}", member_id, e));
            }
        }
    }

    result.success = true;
    result.duration = started.elapsed();
    metrics::record_job_run(JOB_NAME, "success");
    metrics::record_job_duration(JOB_NAME, result.duration);
    result
}

/// `None` when the member still has pending items
async fn generate_if_idle(service: &RecommendationService, member_id: Uuid) -> Result<Option<usize>> {
    if service.has_pending(member_id).await? {
        return Ok(None);
    }
    let recs = service.generate_for_member(member_id).await?;
    Ok(Some(recs.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::db::{InMemoryRecommendationStore, RecommendationStore};
    use crate::error::AppError;
    use crate::models::{CityContext, GroupSummary, UserContext};
    use crate::services::context::{ContextService, MockContextSource};
    use chrono::{Duration as ChronoDuration, Utc};

    fn city() -> CityContext {
        let mut city = CityContext::new("Portland", "OR");
        city.active_groups = vec![GroupSummary {
            id: Uuid::new_v4(),
            name: "Housing Circle".into(),
            member_count: 40,
            category: "housing".into(),
            topics: vec!["housing".into()],
            is_active: true,
            last_activity_at: Utc::now() - ChronoDuration::days(2),
        }];
        city
    }

    #[tokio::test]
    async fn batch_skips_members_with_pending_and_counts_failures() {
        let ready = Uuid::new_v4();
        let already_queued = Uuid::new_v4();
        let broken = Uuid::new_v4();

        let mut source = MockContextSource::new();
        source
            .expect_active_members()
            .returning(move |_, _| Ok(vec![ready, already_queued, broken]));
        source.expect_load_user_context().returning(move |id| {
            if id == broken {
                return Err(AppError::NotFound(format!("member {}", id)));
            }
            let mut user = UserContext::new(id);
            user.city = Some("Portland".into());
            user.region = Some("OR".into());
            user.explicit_interests = vec!["housing".into()];
            Ok(user)
        });
        source
            .expect_load_city_context()
            .returning(|_, _| Ok(city()));

        let store = Arc::new(InMemoryRecommendationStore::new());
        let context = Arc::new(ContextService::new(Arc::new(source), &CacheConfig::default()));
        let service = RecommendationService::new(store.clone(), context, 5);

        let seeded = service.generate_for_member(already_queued).await.unwrap();
        assert!(!seeded.is_empty());

        let result = run_generation_batch(&service, 100).await;
        assert!(result.success);
        assert_eq!(result.users_processed, 1);
        assert!(result.recommendations_generated > 0);
        assert_eq!(result.errors, 1);
        assert_eq!(result.error_messages.len(), 1);
        assert!(store.has_pending(ready).await.unwrap());
    }

    #[tokio::test]
    async fn listing_failure_marks_batch_unsuccessful() {
        let mut source = MockContextSource::new();
        source
            .expect_active_members()
            .returning(|_, _| Err(AppError::ServiceUnavailable("pool closed".into())));
        let context = Arc::new(ContextService::new(Arc::new(source), &CacheConfig::default()));
        let service =
            RecommendationService::new(Arc::new(InMemoryRecommendationStore::new()), context, 5);

        let result = run_generation_batch(&service, 10).await;
        assert!(!result.success);
        assert_eq!(result.errors, 1);
    }
}
