//! Generation and lifecycle through the public service API.

use async_trait::async_trait;
use bridge_service::config::CacheConfig;
use bridge_service::db::{InMemoryRecommendationStore, RecommendationStore};
use bridge_service::error::{AppError, Result};
use bridge_service::jobs::run_generation_batch;
use bridge_service::models::{
    CityContext, EventSummary, GroupMembership, GroupSummary, RecommendationStatus, UserContext,
};
use bridge_service::services::generator::generate_at;
use bridge_service::services::scoring::EMIT_THRESHOLD;
use bridge_service::services::{ContextService, ContextSource, RecommendationService};
use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

struct FixedContext {
    users: HashMap<Uuid, UserContext>,
    city: CityContext,
}

#[async_trait]
impl ContextSource for FixedContext {
    async fn load_user_context(&self, member_id: Uuid) -> Result<UserContext> {
        self.users
            .get(&member_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("member {}", member_id)))
    }

    async fn load_city_context(&self, _city: &str, _region: &str) -> Result<CityContext> {
        Ok(self.city.clone())
    }

    async fn active_members(&self, _within_days: i64, limit: i64) -> Result<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = self.users.keys().copied().collect();
        ids.sort();
        ids.truncate(limit.max(0) as usize);
        Ok(ids)
    }
}

fn group(name: &str, category: &str, topics: &[&str], members: i64, now: DateTime<Utc>) -> GroupSummary {
    GroupSummary {
        id: Uuid::new_v4(),
        name: name.to_string(),
        member_count: members,
        category: category.to_string(),
        topics: topics.iter().map(|t| t.to_string()).collect(),
        is_active: true,
        last_activity_at: now - Duration::days(1),
    }
}

fn event(title: &str, topics: &[&str], in_days: i64, rsvps: i64, now: DateTime<Utc>) -> EventSummary {
    EventSummary {
        id: Uuid::new_v4(),
        title: title.to_string(),
        date: now + Duration::days(in_days),
        location: "Central Library".to_string(),
        category: "meetup".to_string(),
        topics: topics.iter().map(|t| t.to_string()).collect(),
        rsvp_count: rsvps,
    }
}

fn portland(now: DateTime<Utc>) -> CityContext {
    let mut city = CityContext::new("Portland", "OR");
    city.active_groups = vec![
        group("Housing Justice", "housing", &["housing", "tenants"], 42, now),
        group("Garden Share", "environment", &["gardening"], 18, now),
        group("Chess Night", "games", &["chess"], 3, now),
    ];
    city.upcoming_events = vec![
        event("Tenant Rights Workshop", &["housing"], 2, 25, now),
        event("Board Game Social", &["games"], 20, 4, now),
    ];
    city.total_group_members = 63;
    city.trending_topics = vec!["housing".to_string()];
    city
}

fn member(city: bool) -> UserContext {
    let mut user = UserContext::new(Uuid::new_v4());
    if city {
        user.city = Some("Portland".to_string());
        user.region = Some("OR".to_string());
    }
    user.explicit_interests = vec!["housing".to_string()];
    user.engagement_score = 55;
    user
}

fn service(users: Vec<UserContext>, store: Arc<InMemoryRecommendationStore>) -> RecommendationService {
    let source = FixedContext {
        users: users.into_iter().map(|u| (u.member_id, u)).collect(),
        city: portland(Utc::now()),
    };
    let context = Arc::new(ContextService::new(Arc::new(source), &CacheConfig::default()));
    RecommendationService::new(store, context, 5)
}

#[test]
fn generation_respects_threshold_cap_and_order() {
    let now = Utc::now();
    let user = member(true);
    let recs = generate_at(&user, &portland(now), 5, now);

    assert!(!recs.is_empty());
    assert!(recs.len() <= 5);
    assert!(recs.iter().all(|r| r.relevance_score >= EMIT_THRESHOLD));
    assert!(recs
        .windows(2)
        .all(|w| w[0].relevance_score >= w[1].relevance_score));
    assert!(recs.iter().all(|r| r.status == RecommendationStatus::Pending));
}

#[test]
fn joined_groups_are_not_recommended() {
    let now = Utc::now();
    let city = portland(now);
    let mut user = member(true);
    let housing = &city.active_groups[0];
    user.group_memberships.push(GroupMembership {
        group_id: housing.id,
        group_name: housing.name.clone(),
        joined_at: now - Duration::days(40),
    });

    let recs = generate_at(&user, &city, 5, now);
    assert!(recs.iter().all(|r| r.target_id != housing.id.to_string()));
}

#[tokio::test]
async fn active_list_honours_nudge_cap_and_terminal_states() {
    let store = Arc::new(InMemoryRecommendationStore::new());
    let user = member(true);
    let member_id = user.member_id;
    let service = service(vec![user], store.clone());

    let recs = service.generate_for_member(member_id).await.unwrap();
    assert!(recs.len() >= 2);
    let first = recs[0].clone();
    let second = recs[1].clone();

    for _ in 0..first.max_nudges + 2 {
        service.nudge(first.id).await.unwrap();
    }
    let capped = service.get(first.id).await.unwrap().unwrap();
    assert_eq!(capped.nudge_count, capped.max_nudges);

    let active = service.active(member_id, 100).await.unwrap();
    assert!(active.iter().all(|r| r.nudge_count < r.max_nudges));
    assert!(active.iter().all(|r| r.id != first.id));

    service
        .transition(second.id, RecommendationStatus::Dismissed)
        .await
        .unwrap();
    for next in [
        RecommendationStatus::Pending,
        RecommendationStatus::Shown,
        RecommendationStatus::ActedOn,
    ] {
        let row = service.transition(second.id, next).await.unwrap().unwrap();
        assert_eq!(row.status, RecommendationStatus::Dismissed);
    }

    assert!(service
        .transition(Uuid::new_v4(), RecommendationStatus::Shown)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn batch_generation_fills_members_without_pending_items() {
    let store = Arc::new(InMemoryRecommendationStore::new());
    let with_city = member(true);
    let without_city = member(false);
    let ids = (with_city.member_id, without_city.member_id);
    let service = service(vec![with_city, without_city], store.clone());

    let result = run_generation_batch(&service, 100).await;
    assert!(result.success);
    assert_eq!(result.errors, 0);
    assert_eq!(result.users_processed, 2);
    assert!(store.has_pending(ids.0).await.unwrap());
    assert!(!store.has_pending(ids.1).await.unwrap());

    // Nothing new while items are still pending
    let again = run_generation_batch(&service, 100).await;
    assert_eq!(again.recommendations_generated, 0);
}

proptest! {
    #[test]
    fn generated_scores_stay_in_range(
        members in proptest::collection::vec(0i64..300, 1..6),
        engagement in 0i32..=100,
        days_out in proptest::collection::vec(0i64..40, 0..4),
    ) {
        let now = Utc::now();
        let mut city = CityContext::new("Portland", "OR");
        city.active_groups = members
            .iter()
            .map(|m| group("Group", "housing", &["housing", "transit"], *m, now))
            .collect();
        city.upcoming_events = days_out
            .iter()
            .map(|d| event("Event", &["transit"], *d, 12, now))
            .collect();
        city.total_group_members = members.iter().sum();

        let mut user = member(true);
        user.engagement_score = engagement;

        for rec in generate_at(&user, &city, 5, now) {
            prop_assert!(rec.relevance_score >= EMIT_THRESHOLD);
            prop_assert!(rec.relevance_score <= 100);
        }
    }
}

fn status_strategy() -> impl Strategy<Value = RecommendationStatus> {
    prop_oneof![
        Just(RecommendationStatus::Pending),
        Just(RecommendationStatus::Shown),
        Just(RecommendationStatus::ActedOn),
        Just(RecommendationStatus::Dismissed),
    ]
}

proptest! {
    #[test]
    fn terminal_status_never_changes(steps in proptest::collection::vec(status_strategy(), 1..12)) {
        let store = InMemoryRecommendationStore::new();
        let now = Utc::now();
        let rec = generate_at(&member(true), &portland(now), 1, now).remove(0);
        tokio_test::block_on(store.save(&[rec.clone()])).unwrap();

        let mut terminal: Option<RecommendationStatus> = None;
        for next in steps {
            let row = tokio_test::block_on(store.transition(rec.id, next)).unwrap().unwrap();
            if let Some(reached) = terminal {
                prop_assert_eq!(row.status, reached);
            } else if row.status.is_terminal() {
                terminal = Some(row.status);
            }
        }
    }
}
