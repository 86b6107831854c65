// ============================================
// Recommendation Generator
// ============================================
//
// infer interests -> score every candidate -> keep >= 40 -> rank -> materialize
//
// Candidates:
// - city groups the member has not joined
// - upcoming city events
// - the three best activities for the city's size bracket
//
// Nothing is persisted here; callers save the result through the
// recommendation store.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::models::{
    CityContext, EventSummary, GroupSummary, Recommendation, RecommendationStatus,
    RecommendationType, UserContext, Urgency,
};
use crate::services::activities::{activities_for_city, Activity};
use crate::services::interest::infer_interests;
use crate::services::scoring::{
    days_until, Candidate, RelevanceScore, Scorer, ScoringContext,
};
use crate::services::templates;

/// Activities considered per city, after ranking
pub const MAX_ACTIVITY_CANDIDATES: usize = 3;

const GROUP_REWARD_POINTS: i32 = 50;
const GROUP_MAX_NUDGES: i32 = 3;
const EVENT_REWARD_POINTS: i32 = 25;
const EVENT_MAX_NUDGES: i32 = 2;
const ACTIVITY_MAX_NUDGES: i32 = 2;

const DEFAULT_GROUP_INTEREST: &str = "community building";
const DEFAULT_EVENT_INTEREST: &str = "community";

/// Generate up to `max_results` recommendations, best first.
pub fn generate(user: &UserContext, city: &CityContext, max_results: usize) -> Vec<Recommendation> {
    generate_at(user, city, max_results, Utc::now())
}

/// Same as [`generate`] with an explicit clock.
pub fn generate_at(
    user: &UserContext,
    city: &CityContext,
    max_results: usize,
    now: DateTime<Utc>,
) -> Vec<Recommendation> {
    let interests = infer_interests(user, now);
    let ctx = ScoringContext {
        user,
        city,
        interests: &interests,
        now,
    };

    let mut pool = score_candidates(&ctx);
    pool.retain(|(_, scored)| scored.is_recommendable());
    pool.sort_by(|a, b| b.1.score.cmp(&a.1.score));
    pool.truncate(max_results);

    pool.into_iter()
        .map(|(candidate, scored)| materialize(candidate, scored, &ctx))
        .collect()
}

/// Every candidate with its score, before the emit cut
pub fn score_candidates<'a>(ctx: &ScoringContext<'a>) -> Vec<(Candidate<'a>, RelevanceScore)> {
    let joined: HashSet<Uuid> = ctx
        .user
        .group_memberships
        .iter()
        .map(|m| m.group_id)
        .collect();

    let mut pool: Vec<(Candidate<'a>, RelevanceScore)> = Vec::new();

    for group in ctx.city.active_groups.iter().filter(|g| !joined.contains(&g.id)) {
        let candidate = Candidate::Group(group);
        pool.push((candidate, candidate.score(ctx)));
    }

    for event in &ctx.city.upcoming_events {
        let candidate = Candidate::Event(event);
        pool.push((candidate, candidate.score(ctx)));
    }

    let mut activities: Vec<(Candidate<'a>, RelevanceScore)> =
        activities_for_city(ctx.city.total_group_members)
            .iter()
            .map(|activity| {
                let candidate = Candidate::Activity(activity);
                (candidate, candidate.score(ctx))
            })
            .collect();
    activities.sort_by(|a, b| b.1.score.cmp(&a.1.score));
    activities.truncate(MAX_ACTIVITY_CANDIDATES);
    pool.extend(activities);

    pool
}

fn materialize(
    candidate: Candidate<'_>,
    scored: RelevanceScore,
    ctx: &ScoringContext<'_>,
) -> Recommendation {
    let draft = match candidate {
        Candidate::Group(group) => group_draft(group, &scored, ctx),
        Candidate::Event(event) => event_draft(event, &scored, ctx),
        Candidate::Activity(activity) => activity_draft(activity, ctx),
    };

    Recommendation {
        id: Uuid::new_v4(),
        member_id: ctx.user.member_id,
        rec_type: candidate.recommendation_type(),
        title: draft.title,
        description: draft.description,
        target_id: draft.target_id,
        target_url: draft.target_url,
        relevance_score: scored.score,
        matched_interests: scored.matched_interests,
        city_context: ctx.city.city.clone(),
        reward_points: draft.reward_points,
        urgency: draft.urgency,
        status: RecommendationStatus::Pending,
        nudge_count: 0,
        max_nudges: draft.max_nudges,
        created_at: ctx.now,
        updated_at: ctx.now,
        shown_at: None,
        acted_on_at: None,
        dismissed_at: None,
    }
}

struct Draft {
    title: String,
    description: String,
    target_id: String,
    target_url: Option<String>,
    reward_points: i32,
    urgency: Urgency,
    max_nudges: i32,
}

fn describe(rec_type: RecommendationType, vars: HashMap<&str, String>) -> String {
    templates::fill(templates::default_for(rec_type).text, &vars)
}

fn group_draft(group: &GroupSummary, scored: &RelevanceScore, ctx: &ScoringContext<'_>) -> Draft {
    let interest = scored
        .matched_interests
        .first()
        .map(String::as_str)
        .unwrap_or(DEFAULT_GROUP_INTEREST);

    let vars = HashMap::from([
        ("interest", interest.to_string()),
        ("city", ctx.city.city.clone()),
        ("groupName", group.name.clone()),
        ("memberCount", group.member_count.to_string()),
        ("rewardPoints", GROUP_REWARD_POINTS.to_string()),
    ]);

    let urgency = match scored.score {
        s if s >= 70 => Urgency::High,
        s if s >= 50 => Urgency::Medium,
        _ => Urgency::Low,
    };

    Draft {
        title: format!("Join \"{}\"", group.name),
        description: describe(RecommendationType::LocalGroup, vars),
        target_id: group.id.to_string(),
        target_url: Some(format!("/groups/{}", group.id)),
        reward_points: GROUP_REWARD_POINTS,
        urgency,
        max_nudges: GROUP_MAX_NUDGES,
    }
}

fn event_draft(event: &EventSummary, scored: &RelevanceScore, ctx: &ScoringContext<'_>) -> Draft {
    let interest = scored
        .matched_interests
        .first()
        .map(String::as_str)
        .unwrap_or(DEFAULT_EVENT_INTEREST);

    let vars = HashMap::from([
        ("date", event.date.format("%b %-d, %Y").to_string()),
        ("eventTitle", event.title.clone()),
        ("location", event.location.clone()),
        ("topics", event.topics.join(", ")),
        ("userInterest", interest.to_string()),
        ("rsvpCount", event.rsvp_count.to_string()),
        ("rewardPoints", EVENT_REWARD_POINTS.to_string()),
    ]);

    let urgency = if days_until(event.date, ctx.now) <= 7 {
        Urgency::High
    } else {
        Urgency::Medium
    };

    Draft {
        title: format!("Attend \"{}\"", event.title),
        description: describe(RecommendationType::Event, vars),
        target_id: event.id.to_string(),
        target_url: Some(format!("/events/{}", event.id)),
        reward_points: EVENT_REWARD_POINTS,
        urgency,
        max_nudges: EVENT_MAX_NUDGES,
    }
}

fn activity_draft(activity: &Activity, ctx: &ScoringContext<'_>) -> Draft {
    let vars = HashMap::from([
        ("memberCount", ctx.city.total_group_members.to_string()),
        ("city", ctx.city.city.clone()),
        ("activityName", activity.name.to_string()),
        ("difficulty", activity.difficulty.to_string()),
        ("timeCommitment", activity.time_commitment.to_string()),
        ("description", activity.description.to_string()),
        ("rewardPoints", activity.reward_points.to_string()),
    ]);

    Draft {
        title: format!("Try \"{}\"", activity.name),
        description: describe(RecommendationType::Activity, vars),
        target_id: activity.slug(),
        target_url: None,
        reward_points: activity.reward_points,
        urgency: Urgency::Low,
        max_nudges: ACTIVITY_MAX_NUDGES,
    }
}
