//! Recommendation service: generation for a member plus lifecycle transitions.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::RecommendationStore;
use crate::error::Result;
use crate::metrics::recommendations as metrics;
use crate::models::{
    Recommendation, RecommendationFilter, RecommendationStats, RecommendationStatus,
};
use crate::services::context::ContextService;
use crate::services::generator;

pub struct RecommendationService {
    store: Arc<dyn RecommendationStore>,
    context: Arc<ContextService>,
    max_results: usize,
}

impl RecommendationService {
    pub fn new(
        store: Arc<dyn RecommendationStore>,
        context: Arc<ContextService>,
        max_results: usize,
    ) -> Self {
        Self {
            store,
            context,
            max_results,
        }
    }

    pub fn store(&self) -> &Arc<dyn RecommendationStore> {
        &self.store
    }

    pub fn context(&self) -> &Arc<ContextService> {
        &self.context
    }

    pub async fn has_pending(&self, member_id: Uuid) -> Result<bool> {
        self.store.has_pending(member_id).await
    }

    /// Build fresh recommendations for a member and persist them.
    ///
    /// Members without a known city get none: every candidate is local.
    pub async fn generate_for_member(&self, member_id: Uuid) -> Result<Vec<Recommendation>> {
        let started = Instant::now();
        let user = self.context.user_context(member_id).await?;

        let (Some(city), Some(region)) = (user.city.as_deref(), user.region.as_deref()) else {
            debug!(member_id = %member_id, "Member has no city, skipping generation");
            return Ok(Vec::new());
        };

        let city_ctx = self.context.city_context(city, region).await?;
        let recs = generator::generate(&user, &city_ctx, self.max_results);
        self.store.save(&recs).await?;

        for rec in &recs {
            metrics::record_generated(rec.rec_type.as_str());
        }
        info!(
            member_id = %member_id,
            city = city,
            generated = recs.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Generated recommendations"
        );
        Ok(recs)
    }

    pub async fn active(&self, member_id: Uuid, limit: i64) -> Result<Vec<Recommendation>> {
        self.store.get_active(member_id, limit).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Recommendation>> {
        self.store.get(id).await
    }

    pub async fn list(
        &self,
        member_id: Uuid,
        filter: &RecommendationFilter,
    ) -> Result<Vec<Recommendation>> {
        self.store.list_for_member(member_id, filter).await
    }

    pub async fn transition(
        &self,
        id: Uuid,
        next: RecommendationStatus,
    ) -> Result<Option<Recommendation>> {
        let updated = self.store.transition(id, next).await?;
        if let Some(rec) = &updated {
            debug!(id = %id, requested = %next, status = %rec.status, "Recommendation transition");
        }
        Ok(updated)
    }

    pub async fn nudge(&self, id: Uuid) -> Result<Option<Recommendation>> {
        self.store.increment_nudge(id).await
    }

    pub async fn cleanup(&self, older_than_days: i64) -> Result<u64> {
        let deleted = self.store.cleanup(older_than_days).await?;
        metrics::record_deleted(deleted);
        Ok(deleted)
    }

    pub async fn statistics(&self, since_days: i64) -> Result<RecommendationStats> {
        self.store.statistics(since_days).await
    }
}
