use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    LocalGroup,
    Event,
    Activity,
    Discussion,
    ThematicGroup,
    SocialShare,
}

impl RecommendationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationType::LocalGroup => "local_group",
            RecommendationType::Event => "event",
            RecommendationType::Activity => "activity",
            RecommendationType::Discussion => "discussion",
            RecommendationType::ThematicGroup => "thematic_group",
            RecommendationType::SocialShare => "social_share",
        }
    }
}

impl fmt::Display for RecommendationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecommendationType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local_group" => Ok(RecommendationType::LocalGroup),
            "event" => Ok(RecommendationType::Event),
            "activity" => Ok(RecommendationType::Activity),
            "discussion" => Ok(RecommendationType::Discussion),
            "thematic_group" => Ok(RecommendationType::ThematicGroup),
            "social_share" => Ok(RecommendationType::SocialShare),
            other => Err(AppError::Validation(format!("unknown recommendation type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
        }
    }
}

impl FromStr for Urgency {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Urgency::Low),
            "medium" => Ok(Urgency::Medium),
            "high" => Ok(Urgency::High),
            other => Err(AppError::Validation(format!("unknown urgency: {}", other))),
        }
    }
}

/// Recommendation status with a forward-only state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    Pending,
    Shown,
    ActedOn,
    Dismissed,
}

impl RecommendationStatus {
    /// pending -> shown -> acted_on, pending|shown -> dismissed
    pub fn can_transition_to(&self, next: RecommendationStatus) -> bool {
        matches!(
            (self, next),
            (RecommendationStatus::Pending, RecommendationStatus::Shown)
                | (RecommendationStatus::Shown, RecommendationStatus::ActedOn)
                | (RecommendationStatus::Pending, RecommendationStatus::Dismissed)
                | (RecommendationStatus::Shown, RecommendationStatus::Dismissed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RecommendationStatus::ActedOn | RecommendationStatus::Dismissed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationStatus::Pending => "pending",
            RecommendationStatus::Shown => "shown",
            RecommendationStatus::ActedOn => "acted_on",
            RecommendationStatus::Dismissed => "dismissed",
        }
    }
}

impl fmt::Display for RecommendationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecommendationStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RecommendationStatus::Pending),
            "shown" => Ok(RecommendationStatus::Shown),
            "acted_on" => Ok(RecommendationStatus::ActedOn),
            "dismissed" => Ok(RecommendationStatus::Dismissed),
            other => Err(AppError::Validation(format!("unknown recommendation status: {}", other))),
        }
    }
}

/// Personalized suggestion for a member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: Uuid,
    pub member_id: Uuid,
    pub rec_type: RecommendationType,
    pub title: String,
    pub description: String,
    pub target_id: String,
    pub target_url: Option<String>,
    pub relevance_score: i32,
    pub matched_interests: Vec<String>,
    pub city_context: String,
    pub reward_points: i32,
    pub urgency: Urgency,
    pub status: RecommendationStatus,
    pub nudge_count: i32,
    pub max_nudges: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub shown_at: Option<DateTime<Utc>>,
    pub acted_on_at: Option<DateTime<Utc>>,
    pub dismissed_at: Option<DateTime<Utc>>,
}

impl Recommendation {
    /// Active = still pending and under its nudge cap.
    pub fn is_active(&self) -> bool {
        self.status == RecommendationStatus::Pending && self.nudge_count < self.max_nudges
    }

    /// Apply a status transition in place. Returns false (and leaves the
    /// record untouched) when the state machine does not allow it.
    pub fn transition(&mut self, next: RecommendationStatus, at: DateTime<Utc>) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        self.updated_at = at;
        match next {
            RecommendationStatus::Shown => self.shown_at = Some(at),
            RecommendationStatus::ActedOn => self.acted_on_at = Some(at),
            RecommendationStatus::Dismissed => self.dismissed_at = Some(at),
            RecommendationStatus::Pending => {}
        }
        true
    }

    /// Merge an incoming copy of the same recommendation, keeping status forward-only.
    pub fn merge_from(&mut self, incoming: Recommendation) {
        let keep_status = !(incoming.status == self.status
            || self.status.can_transition_to(incoming.status));
        let previous = self.clone();
        *self = incoming;
        if keep_status {
            self.status = previous.status;
            self.shown_at = previous.shown_at;
            self.acted_on_at = previous.acted_on_at;
            self.dismissed_at = previous.dismissed_at;
        } else {
            self.shown_at = self.shown_at.or(previous.shown_at);
            self.acted_on_at = self.acted_on_at.or(previous.acted_on_at);
            self.dismissed_at = self.dismissed_at.or(previous.dismissed_at);
        }
        self.nudge_count = self.nudge_count.max(previous.nudge_count);
        self.created_at = previous.created_at;
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecommendationFilter {
    pub status: Option<RecommendationStatus>,
    pub rec_type: Option<RecommendationType>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationStats {
    pub total: i64,
    pub pending: i64,
    pub shown: i64,
    pub acted_on: i64,
    pub dismissed: i64,
    pub average_relevance: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use RecommendationStatus::*;

    #[test]
    fn terminal_states_have_no_exits() {
        for from in [ActedOn, Dismissed] {
            for to in [Pending, Shown, ActedOn, Dismissed] {
                assert!(!from.can_transition_to(to));
            }
        }
    }

    #[test]
    fn acted_on_requires_shown() {
        assert!(!Pending.can_transition_to(ActedOn));
        assert!(Shown.can_transition_to(ActedOn));
        assert!(Pending.can_transition_to(Dismissed));
        assert!(!Shown.can_transition_to(Pending));
    }

    #[test]
    fn status_roundtrips() {
        for s in [Pending, Shown, ActedOn, Dismissed] {
            assert_eq!(s.as_str().parse::<RecommendationStatus>().unwrap(), s);
        }
    }
}
