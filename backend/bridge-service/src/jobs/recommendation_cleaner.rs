//! Recommendation Cleaner Background Job
//!
//! Permanently deletes acted-on and dismissed recommendations once they are
//! older than the retention window. Pending and shown items are never touched.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

use crate::error::Result;
use crate::metrics::recommendations as metrics;
use crate::services::RecommendationService;

const JOB_NAME: &str = "cleanup";

pub async fn start_recommendation_cleaner(
    service: Arc<RecommendationService>,
    interval: Duration,
    retention_days: i64,
) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        retention_days = retention_days,
        "Starting recommendation cleaner background job"
    );

    loop {
        sleep(interval).await;

        let cycle_start = Instant::now();
        match run_cleanup_cycle(&service, retention_days).await {
            Ok(deleted) => {
                tracing::info!(
                    deleted = deleted,
                    duration_ms = cycle_start.elapsed().as_millis() as u64,
                    "Recommendation cleanup cycle completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    duration_ms = cycle_start.elapsed().as_millis() as u64,
                    "Recommendation cleanup failed"
                );
            }
        }
    }
}

/// One cleanup pass. Returns the number of rows deleted.
pub async fn run_cleanup_cycle(service: &RecommendationService, retention_days: i64) -> Result<u64> {
    let cycle_start = Instant::now();
    let outcome = service.cleanup(retention_days).await;
    metrics::record_job_duration(JOB_NAME, cycle_start.elapsed());

    let status = if outcome.is_ok() { "success" } else { "error" };
    metrics::record_job_run(JOB_NAME, status);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::db::InMemoryRecommendationStore;
    use crate::services::context::{ContextService, MockContextSource};

    #[tokio::test]
    async fn cycle_on_empty_store_deletes_nothing() {
        let context = Arc::new(ContextService::new(
            Arc::new(MockContextSource::new()),
            &CacheConfig::default(),
        ));
        let service =
            RecommendationService::new(Arc::new(InMemoryRecommendationStore::new()), context, 5);
        assert_eq!(run_cleanup_cycle(&service, 30).await.unwrap(), 0);
    }
}
