// ============================================
// Relevance Scoring
// ============================================
//
// Scores a candidate (group, event or activity) against a member's inferred
// interests and the current state of their city. Every scorer is pure,
// clamps to [0, 100] and reports at most three matched interests in the
// order they were found.
//
// Only candidates scoring at least EMIT_THRESHOLD become recommendations.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{
    CityContext, EventSummary, GroupSummary, InterestScore, RecommendationType, UserContext,
};
use crate::services::activities::{Activity, Difficulty};
use crate::utils::overlaps;

/// Minimum score for a candidate to be recommended
pub const EMIT_THRESHOLD: i32 = 40;
pub const MAX_MATCHED_INTERESTS: usize = 3;

const GROUP_INTEREST_WEIGHT: f64 = 0.5;
const GROUP_CATEGORY_BONUS: i32 = 20;
const GROUP_ACTIVE_DAYS: f64 = 7.0;

const EVENT_INTEREST_WEIGHT: f64 = 0.6;

const ACTIVITY_BASE: i32 = 20;
const ACTIVITY_EXPLICIT_MATCH: i32 = 30;
const ACTIVITY_IMPLICIT_MAX: f64 = 25.0;
const ACTIVITY_TREND_MATCH: i32 = 15;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Everything a scorer may look at
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub user: &'a UserContext,
    pub city: &'a CityContext,
    /// Output of interest inference, highest score first
    pub interests: &'a [InterestScore],
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RelevanceScore {
    pub score: i32,
    pub matched_interests: Vec<String>,
    pub reasons: Vec<String>,
}

impl RelevanceScore {
    pub fn is_recommendable(&self) -> bool {
        self.score >= EMIT_THRESHOLD
    }

    fn add_match(&mut self, topic: &str) {
        if !self.matched_interests.iter().any(|m| m == topic) {
            self.matched_interests.push(topic.to_string());
        }
    }

    fn finish(mut self, raw: i32) -> Self {
        self.score = raw.clamp(0, 100);
        self.matched_interests.truncate(MAX_MATCHED_INTERESTS);
        self
    }
}

/// A scoring rule for one kind of candidate
pub trait Scorer {
    fn score(&self, ctx: &ScoringContext<'_>) -> RelevanceScore;
}

/// A group, event or activity under evaluation
#[derive(Debug, Clone, Copy)]
pub enum Candidate<'a> {
    Group(&'a GroupSummary),
    Event(&'a EventSummary),
    Activity(&'a Activity),
}

impl Candidate<'_> {
    pub fn recommendation_type(&self) -> RecommendationType {
        match self {
            Candidate::Group(_) => RecommendationType::LocalGroup,
            Candidate::Event(_) => RecommendationType::Event,
            Candidate::Activity(_) => RecommendationType::Activity,
        }
    }
}

impl Scorer for Candidate<'_> {
    fn score(&self, ctx: &ScoringContext<'_>) -> RelevanceScore {
        match self {
            Candidate::Group(group) => group.score(ctx),
            Candidate::Event(event) => event.score(ctx),
            Candidate::Activity(activity) => activity.score(ctx),
        }
    }
}

/// First inferred interest overlapping `topic`
fn matching_interest<'a>(interests: &'a [InterestScore], topic: &str) -> Option<&'a InterestScore> {
    interests.iter().find(|i| overlaps(&i.topic, topic))
}

fn weighted(score: i32, weight: f64) -> i32 {
    (score as f64 * weight).round() as i32
}

/// Whole days until `at`, rounded up
pub fn days_until(at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    ((at - now).num_seconds() as f64 / SECONDS_PER_DAY).ceil() as i64
}

impl Scorer for GroupSummary {
    fn score(&self, ctx: &ScoringContext<'_>) -> RelevanceScore {
        let mut out = RelevanceScore::default();
        let mut raw = 0;

        for topic in &self.topics {
            if let Some(interest) = matching_interest(ctx.interests, topic) {
                raw += weighted(interest.score, GROUP_INTEREST_WEIGHT);
                out.add_match(&interest.topic);
            }
        }

        let category = self.category.to_lowercase();
        let explicit = ctx
            .user
            .explicit_interests
            .iter()
            .find(|e| !e.is_empty() && category.contains(&e.to_lowercase()));
        if let Some(interest) = explicit {
            raw += GROUP_CATEGORY_BONUS;
            out.add_match(interest);
            out.reasons.push(format!("Focused on {}", interest));
        }

        if self.member_count < 5 {
            raw -= 10;
        }
        if self.member_count > 100 {
            raw -= 5;
        }

        let idle_days = (ctx.now - self.last_activity_at).num_seconds() as f64 / SECONDS_PER_DAY;
        if idle_days < GROUP_ACTIVE_DAYS {
            raw += 10;
            out.reasons.push("Active this week".to_string());
        }

        out.finish(raw)
    }
}

impl Scorer for EventSummary {
    fn score(&self, ctx: &ScoringContext<'_>) -> RelevanceScore {
        let mut out = RelevanceScore::default();
        let mut raw = 0;

        for topic in &self.topics {
            if let Some(interest) = matching_interest(ctx.interests, topic) {
                raw += weighted(interest.score, EVENT_INTEREST_WEIGHT);
                out.add_match(&interest.topic);
            }
        }

        let days = days_until(self.date, ctx.now);
        if days <= 3 {
            raw += 20;
            out.reasons.push("Happening in the next few days".to_string());
        } else if days <= 7 {
            raw += 10;
            out.reasons.push("Happening this week".to_string());
        }

        if self.rsvp_count > 20 {
            raw += 10;
        } else if self.rsvp_count > 10 {
            raw += 5;
        }

        out.finish(raw)
    }
}

/// Points for how well an activity's difficulty suits a member's engagement.
///
/// | engagement | easy | medium | hard |
/// |------------|------|--------|------|
/// | >= 70      | 0    | 15     | 20   |
/// | 40-69      | 15   | 20     | 0    |
/// | < 40       | 20   | 0      | 0    |
pub fn engagement_match(difficulty: Difficulty, engagement_score: i32) -> i32 {
    match (engagement_score, difficulty) {
        (e, Difficulty::Hard) if e >= 70 => 20,
        (e, Difficulty::Medium) if e >= 70 => 15,
        (e, _) if e >= 70 => 0,
        (e, Difficulty::Medium) if e >= 40 => 20,
        (e, Difficulty::Easy) if e >= 40 => 15,
        (e, _) if e >= 40 => 0,
        (_, Difficulty::Easy) => 20,
        _ => 0,
    }
}

/// Advisory prerequisite check; never excludes an activity.
pub fn prerequisite_match(activity: &Activity, ctx: &ScoringContext<'_>) -> (i32, String) {
    if activity.prerequisites.is_empty() {
        return (15, "No prerequisites needed".to_string());
    }

    let has = |name: &str| {
        activity
            .prerequisites
            .iter()
            .any(|p| p.eq_ignore_ascii_case(name))
    };
    let has_groups = !ctx.city.active_groups.is_empty();

    if has("coordinator") && ctx.user.engagement_score >= 60 {
        return (10, "Your engagement suggests you could coordinate this".to_string());
    }
    if has("venue_access") && has_groups {
        return (10, "Existing groups can likely provide a venue".to_string());
    }
    if has("storage_space") && has_groups {
        return (10, "Storage may be available through existing groups".to_string());
    }

    (5, format!("May require: {}", activity.prerequisites.join(", ")))
}

impl Scorer for Activity {
    fn score(&self, ctx: &ScoringContext<'_>) -> RelevanceScore {
        let mut out = RelevanceScore::default();
        let mut raw = ACTIVITY_BASE;

        let name = self.name.to_lowercase();
        let description = self.description.to_lowercase();
        let mentions = |topic: &str| {
            let topic = topic.to_lowercase();
            !topic.is_empty() && (name.contains(&topic) || description.contains(&topic))
        };

        if let Some(interest) = ctx.user.explicit_interests.iter().find(|e| mentions(e.as_str())) {
            raw += ACTIVITY_EXPLICIT_MATCH;
            out.add_match(interest);
            out.reasons.push(format!("Matches your interest in {}", interest));
        } else if let Some(interest) = ctx
            .user
            .implicit_interests
            .iter()
            .filter(|i| mentions(i.topic.as_str()))
            .max_by_key(|i| i.score)
        {
            let score = interest.score.clamp(0, 100) as f64;
            raw += (score / 100.0 * ACTIVITY_IMPLICIT_MAX).round() as i32;
            out.add_match(&interest.topic);
            out.reasons.push(format!("Related to your activity around {}", interest.topic));
        }

        let engagement = engagement_match(self.difficulty, ctx.user.engagement_score);
        if engagement > 0 {
            raw += engagement;
            out.reasons
                .push(format!("A good fit for a {} activity", self.difficulty));
        }

        if let Some(topic) = ctx.city.trending_topics.iter().find(|t| mentions(t.as_str())) {
            raw += ACTIVITY_TREND_MATCH;
            out.reasons.push(format!("{} is trending in your city", topic));
        }

        let (points, reason) = prerequisite_match(self, ctx);
        raw += points;
        out.reasons.push(reason);

        out.finish(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InterestSource;
    use crate::services::activities::{activities_for, CitySize};
    use chrono::Duration;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn interest(topic: &str, score: i32, source: InterestSource) -> InterestScore {
        InterestScore {
            topic: topic.to_string(),
            score,
            derived_from: source,
            last_updated: Utc::now(),
        }
    }

    fn group(topics: &[&str], members: i64, idle_days: i64, now: DateTime<Utc>) -> GroupSummary {
        GroupSummary {
            id: Uuid::new_v4(),
            name: "Test Group".into(),
            member_count: members,
            category: "housing".into(),
            topics: topics.iter().map(|t| t.to_string()).collect(),
            is_active: true,
            last_activity_at: now - Duration::days(idle_days),
        }
    }

    fn event(topics: &[&str], in_days: i64, rsvps: i64, now: DateTime<Utc>) -> EventSummary {
        EventSummary {
            id: Uuid::new_v4(),
            title: "Test Event".into(),
            date: now + Duration::days(in_days),
            location: "Library".into(),
            category: "meetup".into(),
            topics: topics.iter().map(|t| t.to_string()).collect(),
            rsvp_count: rsvps,
        }
    }

    fn ctx<'a>(
        user: &'a UserContext,
        city: &'a CityContext,
        interests: &'a [InterestScore],
        now: DateTime<Utc>,
    ) -> ScoringContext<'a> {
        ScoringContext {
            user,
            city,
            interests,
            now,
        }
    }

    #[test]
    fn engagement_table_rewards_hard_for_engaged_members() {
        assert_eq!(engagement_match(Difficulty::Easy, 80), 0);
        assert_eq!(engagement_match(Difficulty::Medium, 80), 15);
        assert_eq!(engagement_match(Difficulty::Hard, 80), 20);
        assert_eq!(engagement_match(Difficulty::Easy, 55), 15);
        assert_eq!(engagement_match(Difficulty::Medium, 55), 20);
        assert_eq!(engagement_match(Difficulty::Hard, 55), 0);
        assert_eq!(engagement_match(Difficulty::Easy, 10), 20);
        assert_eq!(engagement_match(Difficulty::Hard, 10), 0);
    }

    #[test]
    fn group_scoring_combines_topics_category_size_and_recency() {
        let now = Utc::now();
        let mut user = UserContext::new(Uuid::new_v4());
        user.explicit_interests = vec!["housing".into()];
        let city = CityContext::new("Portland", "OR");
        let interests = vec![
            interest("housing", 95, InterestSource::Profile),
            interest("cooperative", 57, InterestSource::Profile),
        ];
        let g = group(&["cooperative housing", "legal"], 20, 2, now);
        let scored = g.score(&ctx(&user, &city, &interests, now));

        // 48 (housing) + 20 (category) + 10 (recent)
        assert_eq!(scored.score, 78);
        assert_eq!(scored.matched_interests, vec!["housing".to_string()]);
    }

    #[test]
    fn small_idle_group_clamps_at_zero() {
        let now = Utc::now();
        let user = UserContext::new(Uuid::new_v4());
        let city = CityContext::new("Portland", "OR");
        let g = group(&["knitting"], 2, 30, now);
        assert_eq!(g.score(&ctx(&user, &city, &[], now)).score, 0);
    }

    #[test]
    fn event_proximity_and_rsvps() {
        let now = Utc::now();
        let user = UserContext::new(Uuid::new_v4());
        let city = CityContext::new("Portland", "OR");
        let interests = vec![interest("climate", 80, InterestSource::Profile)];

        let soon = event(&["climate action"], 2, 25, now);
        // 48 + 20 + 10
        assert_eq!(soon.score(&ctx(&user, &city, &interests, now)).score, 78);

        let next_week = event(&["climate action"], 6, 12, now);
        // 48 + 10 + 5
        assert_eq!(next_week.score(&ctx(&user, &city, &interests, now)).score, 63);

        let later = event(&["climate action"], 20, 0, now);
        assert_eq!(later.score(&ctx(&user, &city, &interests, now)).score, 48);
    }

    #[test]
    fn matched_interests_are_capped_at_three() {
        let now = Utc::now();
        let user = UserContext::new(Uuid::new_v4());
        let city = CityContext::new("Portland", "OR");
        let interests: Vec<_> = ["a1", "b2", "c3", "d4"]
            .iter()
            .map(|t| interest(t, 50, InterestSource::Post))
            .collect();
        let e = event(&["a1", "b2", "c3", "d4"], 20, 0, now);
        let scored = e.score(&ctx(&user, &city, &interests, now));
        assert_eq!(scored.matched_interests.len(), 3);
        assert_eq!(scored.score, 100);
    }

    #[test]
    fn activity_explicit_interest_wins_over_implicit() {
        let now = Utc::now();
        let mut user = UserContext::new(Uuid::new_v4());
        user.explicit_interests = vec!["housing".into()];
        user.engagement_score = 80;
        let city = CityContext::new("Portland", "OR");
        let interests = vec![interest("cooperative", 90, InterestSource::Post)];
        let activity = &activities_for(CitySize::Medium)[1];

        let scored = activity.score(&ctx(&user, &city, &interests, now));
        // 20 base + 30 explicit + 20 hard/engaged + 5 prerequisites
        assert_eq!(scored.score, 75);
        assert_eq!(scored.matched_interests, vec!["housing".to_string()]);
    }

    #[test]
    fn activity_implicit_match_scales_to_twenty_five() {
        let now = Utc::now();
        let mut user = UserContext::new(Uuid::new_v4());
        user.engagement_score = 10;
        user.implicit_interests = vec![
            interest("garden", 60, InterestSource::Post),
            interest("gardening", 80, InterestSource::FeedView),
        ];
        let mut city = CityContext::new("Portland", "OR");
        city.trending_topics = vec!["food".into()];
        let activity = &activities_for(CitySize::Small)[1];

        let scored = activity.score(&ctx(&user, &city, &[], now));
        // 20 + round(0.8 * 25) + 0 (medium, low engagement) + 15 trend + 5 land_access
        assert_eq!(scored.score, 60);
        assert_eq!(scored.matched_interests, vec!["gardening".to_string()]);
    }

    #[test]
    fn group_name_keywords_do_not_boost_activities() {
        let now = Utc::now();
        let mut user = UserContext::new(Uuid::new_v4());
        user.engagement_score = 10;
        let mut city = CityContext::new("Portland", "OR");
        city.trending_topics = vec!["food".into()];
        // Inferred from a "Garden Builders" membership, not tracked activity
        let inferred = vec![
            interest("garden", 70, InterestSource::Post),
            interest("builders", 70, InterestSource::Post),
        ];
        let activity = &activities_for(CitySize::Small)[1];

        let scored = activity.score(&ctx(&user, &city, &inferred, now));
        // 20 base + 15 trend + 5 land_access, no implicit bonus
        assert_eq!(scored.score, 40);
        assert!(scored.matched_interests.is_empty());
    }

    #[test]
    fn venue_prerequisite_needs_an_active_group() {
        let now = Utc::now();
        let user = UserContext::new(Uuid::new_v4());
        let mut city = CityContext::new("Portland", "OR");
        let dinner = &activities_for(CitySize::Small)[0];

        let without = prerequisite_match(dinner, &ctx(&user, &city, &[], now)).0;
        city.active_groups.push(group(&[], 10, 1, now));
        let with = prerequisite_match(dinner, &ctx(&user, &city, &[], now)).0;
        assert_eq!((without, with), (5, 10));
    }

    #[test]
    fn candidate_dispatches_to_each_scorer() {
        let now = Utc::now();
        let user = UserContext::new(Uuid::new_v4());
        let city = CityContext::new("Portland", "OR");
        let c = ctx(&user, &city, &[], now);
        let activity = &activities_for(CitySize::Seed)[0];
        let candidate = Candidate::Activity(activity);
        assert_eq!(candidate.recommendation_type(), RecommendationType::Activity);
        assert_eq!(candidate.score(&c), activity.score(&c));
    }

    proptest! {
        #[test]
        fn group_and_event_scores_stay_in_bounds(
            scores in prop::collection::vec(-50i32..200, 0..6),
            members in -10i64..1_000,
            idle in -30i64..60,
            rsvps in -5i64..500,
        ) {
            let now = Utc::now();
            let user = UserContext::new(Uuid::new_v4());
            let city = CityContext::new("Portland", "OR");
            let interests: Vec<_> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| interest(&format!("topic{}", i), *s, InterestSource::Post))
                .collect();
            let topics: Vec<String> = (0..scores.len()).map(|i| format!("topic{}", i)).collect();
            let topic_refs: Vec<&str> = topics.iter().map(String::as_str).collect();
            let c = ctx(&user, &city, &interests, now);

            let g = group(&topic_refs, members, idle, now).score(&c);
            prop_assert!((0..=100).contains(&g.score));
            let e = event(&topic_refs, idle, rsvps, now).score(&c);
            prop_assert!((0..=100).contains(&e.score));
        }

        #[test]
        fn activity_scores_never_drop_below_base(engagement in 0i32..=100, bracket in 0usize..5) {
            let now = Utc::now();
            let mut user = UserContext::new(Uuid::new_v4());
            user.engagement_score = engagement;
            let city = CityContext::new("Portland", "OR");
            let size = [
                CitySize::Seed,
                CitySize::Small,
                CitySize::Medium,
                CitySize::Large,
                CitySize::Established,
            ][bracket];
            for activity in activities_for(size) {
                let s = activity.score(&ctx(&user, &city, &[], now)).score;
                prop_assert!((20..=100).contains(&s));
            }
        }
    }
}
