use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

/// Where an interest score was learned from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestSource {
    Profile,
    Post,
    FeedView,
    SupportPoints,
    EventAttendance,
}

impl InterestSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterestSource::Profile => "profile",
            InterestSource::Post => "post",
            InterestSource::FeedView => "feed_view",
            InterestSource::SupportPoints => "support_points",
            InterestSource::EventAttendance => "event_attendance",
        }
    }
}

impl fmt::Display for InterestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterestSource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profile" => Ok(InterestSource::Profile),
            "post" => Ok(InterestSource::Post),
            "feed_view" => Ok(InterestSource::FeedView),
            "support_points" => Ok(InterestSource::SupportPoints),
            "event_attendance" => Ok(InterestSource::EventAttendance),
            other => Err(AppError::Validation(format!("unknown interest source: {}", other))),
        }
    }
}

/// Confidence (0-100) that a member cares about a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestScore {
    pub topic: String,
    pub score: i32,
    pub derived_from: InterestSource,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMembership {
    pub group_id: Uuid,
    pub group_name: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventAttendance {
    pub event_id: Uuid,
    pub event_name: String,
    pub attended_at: DateTime<Utc>,
}

/// Point-in-time view of a member, built by a context source and cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub member_id: Uuid,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub explicit_interests: Vec<String>,
    pub implicit_interests: Vec<InterestScore>,
    pub group_memberships: Vec<GroupMembership>,
    pub event_attendance: Vec<EventAttendance>,
    pub engagement_score: i32,
    pub onboarding_complete: bool,
    pub fetched_at: DateTime<Utc>,
}

impl UserContext {
    /// Empty context for a member, mostly useful as a builder seed.
    pub fn new(member_id: Uuid) -> Self {
        Self {
            member_id,
            city: None,
            region: None,
            country: None,
            explicit_interests: Vec::new(),
            implicit_interests: Vec::new(),
            group_memberships: Vec::new(),
            event_attendance: Vec::new(),
            engagement_score: 0,
            onboarding_complete: false,
            fetched_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub id: Uuid,
    pub name: String,
    pub member_count: i64,
    pub category: String,
    pub topics: Vec<String>,
    pub is_active: bool,
    pub last_activity_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: Uuid,
    pub title: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub category: String,
    pub topics: Vec<String>,
    pub rsvp_count: i64,
}

/// Point-in-time view of a city, keyed by (city, region).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityContext {
    pub city: String,
    pub region: String,
    pub country: Option<String>,
    pub active_groups: Vec<GroupSummary>,
    pub total_group_members: i64,
    pub upcoming_events: Vec<EventSummary>,
    pub trending_topics: Vec<String>,
    pub growth_rate: i32,
    pub fetched_at: DateTime<Utc>,
}

impl CityContext {
    pub fn new(city: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            region: region.into(),
            country: None,
            active_groups: Vec::new(),
            total_group_members: 0,
            upcoming_events: Vec::new(),
            trending_topics: Vec::new(),
            growth_rate: 0,
            fetched_at: Utc::now(),
        }
    }

    pub fn key(&self) -> CityKey {
        CityKey::new(&self.city, &self.region)
    }
}

/// Opaque (city, region) pair supplied by the geolocation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CityKey {
    pub city: String,
    pub region: String,
}

impl CityKey {
    pub fn new(city: &str, region: &str) -> Self {
        Self {
            city: city.to_string(),
            region: region.to_string(),
        }
    }
}

impl fmt::Display for CityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.city, self.region)
    }
}
