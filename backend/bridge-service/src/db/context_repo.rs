//! Context snapshots built from the platform's own tables.
//!
//! These tables belong to the wider platform; this service only reads them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Instant;
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    CityContext, EventAttendance, EventSummary, GroupMembership, GroupSummary, InterestScore,
    InterestSource, UserContext,
};
use crate::services::context::{engagement_score, ActivitySignals, ContextSource};

const IMPLICIT_INTEREST_LIMIT: i64 = 20;
const TRENDING_TOPIC_LIMIT: i64 = 10;
const ACTIVITY_WINDOW_DAYS: i32 = 90;
const CITY_WINDOW_DAYS: i32 = 30;

pub struct PostgresContextSource {
    pool: PgPool,
}

impl PostgresContextSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_profile(&self, member_id: Uuid) -> Result<ProfileRow> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT city, state, country, paths, created_at, last_seen_at,
                   onboarding_completed_at IS NOT NULL AS onboarding_complete
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(member_id = %member_id, "Failed to load member profile: {}", e);
            AppError::from(e)
        })?;

        row.ok_or_else(|| AppError::NotFound(format!("member {}", member_id)))
    }

    async fn fetch_interests(&self, member_id: Uuid) -> Result<Vec<InterestScore>> {
        let rows = sqlx::query_as::<_, InterestRow>(
            r#"
            SELECT topic,
                   ROUND(interest_score * 100)::INT AS score,
                   last_engaged
            FROM user_interests
            WHERE user_id = $1
            ORDER BY interest_score DESC
            LIMIT $2
            "#,
        )
        .bind(member_id)
        .bind(IMPLICIT_INTEREST_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InterestScore {
                topic: row.topic,
                score: row.score.clamp(0, 100),
                derived_from: InterestSource::Post,
                last_updated: row.last_engaged,
            })
            .collect())
    }

    async fn fetch_memberships(&self, member_id: Uuid) -> Result<Vec<GroupMembership>> {
        let rows = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT g.id AS group_id, g.name AS group_name, gm.joined_at
            FROM group_members gm
            JOIN groups g ON g.id = gm.group_id
            WHERE gm.user_id = $1 AND g.deleted_at IS NULL
            ORDER BY gm.joined_at ASC
            "#,
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| GroupMembership {
                group_id: row.group_id,
                group_name: row.group_name,
                joined_at: row.joined_at,
            })
            .collect())
    }

    async fn fetch_attendance(&self, member_id: Uuid) -> Result<Vec<EventAttendance>> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT e.id AS event_id, e.title AS event_name, e.starts_at AS attended_at
            FROM event_attendees ea
            JOIN events e ON e.id = ea.event_id
            WHERE ea.user_id = $1 AND e.starts_at <= NOW()
            ORDER BY e.starts_at ASC
            "#,
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| EventAttendance {
                event_id: row.event_id,
                event_name: row.event_name,
                attended_at: row.attended_at,
            })
            .collect())
    }

    async fn fetch_activity_counts(&self, member_id: Uuid) -> Result<(i64, i64)> {
        let (posts, comments): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE action LIKE 'post%'),
                COUNT(*) FILTER (WHERE action LIKE 'comment%')
            FROM user_activity
            WHERE user_id = $1
              AND created_at > NOW() - make_interval(days => $2)
            "#,
        )
        .bind(member_id)
        .bind(ACTIVITY_WINDOW_DAYS)
        .fetch_one(&self.pool)
        .await?;

        Ok((posts, comments))
    }
}

#[async_trait]
impl ContextSource for PostgresContextSource {
    async fn load_user_context(&self, member_id: Uuid) -> Result<UserContext> {
        let started = Instant::now();
        let profile = self.fetch_profile(member_id).await?;
        let implicit_interests = self.fetch_interests(member_id).await?;
        let group_memberships = self.fetch_memberships(member_id).await?;
        let event_attendance = self.fetch_attendance(member_id).await?;
        let (posts_count, comments_count) = self.fetch_activity_counts(member_id).await?;

        let now = Utc::now();
        let signals = ActivitySignals {
            posts_count,
            comments_count,
            group_count: group_memberships.len() as i64,
            events_attended: event_attendance.len() as i64,
            last_active_at: Some(profile.last_seen_at.unwrap_or(profile.created_at)),
            onboarding_complete: profile.onboarding_complete,
        };

        let ctx = UserContext {
            member_id,
            city: profile.city,
            region: profile.state,
            country: profile.country,
            explicit_interests: profile.paths.unwrap_or_default(),
            implicit_interests,
            group_memberships,
            event_attendance,
            engagement_score: engagement_score(&signals, now),
            onboarding_complete: profile.onboarding_complete,
            fetched_at: now,
        };

        debug!(
            member_id = %member_id,
            engagement_score = ctx.engagement_score,
            duration_ms = started.elapsed().as_millis() as u64,
            "Built user context"
        );
        Ok(ctx)
    }

    async fn active_members(&self, within_days: i64, limit: i64) -> Result<Vec<Uuid>> {
        let member_ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM users
            WHERE deleted_at IS NULL
              AND city IS NOT NULL
              AND last_seen_at > NOW() - make_interval(days => $1)
            ORDER BY id
            LIMIT $2
            "#,
        )
        .bind(days_to_i32(within_days))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list active members: {}", e);
            AppError::from(e)
        })?;

        Ok(member_ids)
    }

    async fn load_city_context(&self, city: &str, region: &str) -> Result<CityContext> {
        let started = Instant::now();

        let groups = sqlx::query_as::<_, GroupRow>(
            r#"
            SELECT g.id, g.name, g.category, g.topics, g.last_activity_at,
                   COUNT(gm.user_id) AS member_count
            FROM groups g
            LEFT JOIN group_members gm ON gm.group_id = g.id
            WHERE g.city ILIKE $1
              AND g.region ILIKE $2
              AND g.deleted_at IS NULL
              AND g.last_activity_at > NOW() - make_interval(days => $3)
            GROUP BY g.id
            ORDER BY member_count DESC
            "#,
        )
        .bind(city)
        .bind(region)
        .bind(CITY_WINDOW_DAYS)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!(city = city, region = region, "Failed to load city groups: {}", e);
            AppError::from(e)
        })?;

        let events = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT e.id, e.title, e.starts_at, e.location, e.category, e.topics,
                   COUNT(ea.user_id) AS rsvp_count
            FROM events e
            LEFT JOIN event_attendees ea ON ea.event_id = e.id
            WHERE e.city ILIKE $1
              AND e.region ILIKE $2
              AND e.starts_at BETWEEN NOW() AND NOW() + make_interval(days => $3)
            GROUP BY e.id
            ORDER BY e.starts_at ASC
            "#,
        )
        .bind(city)
        .bind(region)
        .bind(CITY_WINDOW_DAYS)
        .fetch_all(&self.pool)
        .await?;

        let trending_topics: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT ui.topic
            FROM user_interests ui
            JOIN users u ON ui.user_id = u.id
            WHERE u.city ILIKE $1
              AND u.state ILIKE $2
              AND u.deleted_at IS NULL
              AND ui.last_engaged > NOW() - make_interval(days => $3)
            GROUP BY ui.topic
            ORDER BY COUNT(DISTINCT ui.user_id) DESC, AVG(ui.interest_score) DESC
            LIMIT $4
            "#,
        )
        .bind(city)
        .bind(region)
        .bind(CITY_WINDOW_DAYS)
        .bind(TRENDING_TOPIC_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let growth = sqlx::query_as::<_, GrowthRow>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE created_at > NOW() - INTERVAL '30 days') AS recent,
                COUNT(*) FILTER (WHERE created_at > NOW() - INTERVAL '60 days'
                                 AND created_at <= NOW() - INTERVAL '30 days') AS previous,
                MAX(country) AS country
            FROM users
            WHERE city ILIKE $1 AND state ILIKE $2 AND deleted_at IS NULL
            "#,
        )
        .bind(city)
        .bind(region)
        .fetch_one(&self.pool)
        .await?;

        let active_groups: Vec<GroupSummary> = groups
            .into_iter()
            .map(|row| GroupSummary {
                id: row.id,
                name: row.name,
                member_count: row.member_count,
                category: row.category.unwrap_or_default(),
                topics: row.topics.unwrap_or_default(),
                is_active: true,
                last_activity_at: row.last_activity_at,
            })
            .collect();

        let upcoming_events = events
            .into_iter()
            .map(|row| EventSummary {
                id: row.id,
                title: row.title,
                date: row.starts_at,
                location: row.location.unwrap_or_default(),
                category: row.category.unwrap_or_default(),
                topics: row.topics.unwrap_or_default(),
                rsvp_count: row.rsvp_count,
            })
            .collect();

        let ctx = CityContext {
            city: city.to_string(),
            region: region.to_string(),
            country: growth.country.clone(),
            total_group_members: active_groups.iter().map(|g| g.member_count).sum(),
            active_groups,
            upcoming_events,
            trending_topics,
            growth_rate: growth.rate(),
            fetched_at: Utc::now(),
        };

        debug!(
            city = city,
            region = region,
            groups = ctx.active_groups.len(),
            events = ctx.upcoming_events.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Built city context"
        );
        Ok(ctx)
    }
}

// Database row representations

#[derive(sqlx::FromRow)]
struct ProfileRow {
    city: Option<String>,
    state: Option<String>,
    country: Option<String>,
    paths: Option<Vec<String>>,
    created_at: DateTime<Utc>,
    last_seen_at: Option<DateTime<Utc>>,
    onboarding_complete: bool,
}

#[derive(sqlx::FromRow)]
struct InterestRow {
    topic: String,
    score: i32,
    last_engaged: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct MembershipRow {
    group_id: Uuid,
    group_name: String,
    joined_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct AttendanceRow {
    event_id: Uuid,
    event_name: String,
    attended_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: Uuid,
    name: String,
    category: Option<String>,
    topics: Option<Vec<String>>,
    last_activity_at: DateTime<Utc>,
    member_count: i64,
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    title: String,
    starts_at: DateTime<Utc>,
    location: Option<String>,
    category: Option<String>,
    topics: Option<Vec<String>>,
    rsvp_count: i64,
}

#[derive(sqlx::FromRow)]
struct GrowthRow {
    recent: i64,
    previous: i64,
    country: Option<String>,
}

impl GrowthRow {
    /// Percent change in new members, last 30 days against the 30 before
    fn rate(&self) -> i32 {
        growth_rate(self.recent, self.previous)
    }
}

fn days_to_i32(days: i64) -> i32 {
    days.clamp(0, i32::MAX as i64) as i32
}

fn growth_rate(recent: i64, previous: i64) -> i32 {
    let base = previous.max(1) as f64;
    ((recent - previous) as f64 / base * 100.0).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_rate_against_previous_window() {
        assert_eq!(growth_rate(15, 10), 50);
        assert_eq!(growth_rate(5, 10), -50);
        assert_eq!(growth_rate(3, 0), 300);
        assert_eq!(growth_rate(0, 0), 0);
    }
}
