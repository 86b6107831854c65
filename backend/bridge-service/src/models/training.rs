use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

/// Review state of a curated question/answer example
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExampleStatus {
    Pending,
    Reviewed,
    Approved,
    Rejected,
    UsedInTraining,
}

impl ExampleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExampleStatus::Pending => "pending",
            ExampleStatus::Reviewed => "reviewed",
            ExampleStatus::Approved => "approved",
            ExampleStatus::Rejected => "rejected",
            ExampleStatus::UsedInTraining => "used_in_training",
        }
    }
}

impl fmt::Display for ExampleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExampleStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ExampleStatus::Pending),
            "reviewed" => Ok(ExampleStatus::Reviewed),
            "approved" => Ok(ExampleStatus::Approved),
            "rejected" => Ok(ExampleStatus::Rejected),
            "used_in_training" => Ok(ExampleStatus::UsedInTraining),
            other => Err(AppError::Validation(format!("unknown example status: {}", other))),
        }
    }
}

/// A recorded assistant answer plus its human review.
///
/// Ratings describe the generated `bridge_response`; `ideal_response` is the
/// curated replacement written by a reviewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub id: Uuid,
    pub question: String,
    pub bridge_response: String,
    pub helpfulness_rating: Option<i16>,
    pub accuracy_rating: Option<i16>,
    pub tone_rating: Option<i16>,
    pub ideal_response: Option<String>,
    pub status: ExampleStatus,
    pub quality_score: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrainingExample {
    pub fn new(question: impl Into<String>, bridge_response: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            question: question.into(),
            bridge_response: bridge_response.into(),
            helpfulness_rating: None,
            accuracy_rating: None,
            tone_rating: None,
            ideal_response: None,
            status: ExampleStatus::Pending,
            quality_score: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_ideal_response(&self) -> bool {
        self.ideal_response
            .as_deref()
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExampleRatings {
    pub helpfulness: i16,
    pub accuracy: i16,
    pub tone: i16,
}

impl ExampleRatings {
    /// Ratings are 1-5; out-of-range input is clamped rather than rejected.
    pub fn clamped(&self) -> ExampleRatings {
        ExampleRatings {
            helpfulness: self.helpfulness.clamp(1, 5),
            accuracy: self.accuracy.clamp(1, 5),
            tone: self.tone.clamp(1, 5),
        }
    }

    /// Average rating scaled to 0-100.
    pub fn quality_score(&self) -> i32 {
        let r = self.clamped();
        let sum = (r.helpfulness + r.accuracy + r.tone) as f64;
        ((sum / 15.0) * 100.0).round() as i32
    }
}

#[derive(Debug, Clone)]
pub struct SimilarQuery {
    pub status: ExampleStatus,
    pub limit: i64,
}

impl Default for SimilarQuery {
    fn default() -> Self {
        Self {
            status: ExampleStatus::Approved,
            limit: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_ideal_response_counts_as_empty() {
        let mut ex = TrainingExample::new("q", "a");
        ex.ideal_response = Some("   ".into());
        assert!(!ex.has_ideal_response());
        ex.ideal_response = Some("Start with a feasibility study.".into());
        assert!(ex.has_ideal_response());
    }

    #[test]
    fn quality_score_scales_ratings() {
        let ratings = ExampleRatings {
            helpfulness: 5,
            accuracy: 5,
            tone: 5,
        };
        assert_eq!(ratings.quality_score(), 100);
        let low = ExampleRatings {
            helpfulness: 0,
            accuracy: 1,
            tone: 9,
        };
        assert_eq!(low.clamped().tone, 5);
        assert_eq!(low.quality_score(), 47);
    }
}
