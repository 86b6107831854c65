use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

/// Kind of platform content that can be indexed for search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    ForumTopic,
    ForumPost,
    Proposal,
    Doc,
}

impl ContentType {
    pub const ALL: [ContentType; 4] = [
        ContentType::ForumTopic,
        ContentType::ForumPost,
        ContentType::Proposal,
        ContentType::Doc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::ForumTopic => "forum_topic",
            ContentType::ForumPost => "forum_post",
            ContentType::Proposal => "proposal",
            ContentType::Doc => "doc",
        }
    }

    /// Heading used when the item is quoted into a prompt block.
    pub fn label(&self) -> &'static str {
        match self {
            ContentType::ForumTopic => "FORUM TOPIC",
            ContentType::ForumPost => "FORUM POST",
            ContentType::Proposal => "PROPOSAL",
            ContentType::Doc => "DOC",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forum_topic" => Ok(ContentType::ForumTopic),
            "forum_post" => Ok(ContentType::ForumPost),
            "proposal" => Ok(ContentType::Proposal),
            "doc" => Ok(ContentType::Doc),
            other => Err(AppError::Validation(format!("unknown content type: {}", other))),
        }
    }
}

/// Community validation level, ordered from least to most validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustTier {
    Unvalidated,
    Low,
    Medium,
    High,
    Consensus,
}

impl TrustTier {
    pub const ALL: [TrustTier; 5] = [
        TrustTier::Unvalidated,
        TrustTier::Low,
        TrustTier::Medium,
        TrustTier::High,
        TrustTier::Consensus,
    ];

    /// Fixed sort rank: consensus=5 down to unvalidated=1.
    pub fn rank(&self) -> i32 {
        match self {
            TrustTier::Unvalidated => 1,
            TrustTier::Low => 2,
            TrustTier::Medium => 3,
            TrustTier::High => 4,
            TrustTier::Consensus => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrustTier::Unvalidated => "unvalidated",
            TrustTier::Low => "low",
            TrustTier::Medium => "medium",
            TrustTier::High => "high",
            TrustTier::Consensus => "consensus",
        }
    }

    pub fn phrase(&self) -> &'static str {
        match self {
            TrustTier::Unvalidated => "(Unvalidated - new post, no community feedback yet)",
            TrustTier::Low => "(Limited community validation)",
            TrustTier::Medium => "(Some community support)",
            TrustTier::High => "(Strong community support)",
            TrustTier::Consensus => "(Community consensus)",
        }
    }

    /// Tiers at or above `self`, used for `min_trust_tier` filters.
    pub fn at_or_above(&self) -> Vec<TrustTier> {
        TrustTier::ALL.iter().copied().filter(|t| t >= self).collect()
    }
}

impl fmt::Display for TrustTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrustTier {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unvalidated" => Ok(TrustTier::Unvalidated),
            "low" => Ok(TrustTier::Low),
            "medium" => Ok(TrustTier::Medium),
            "high" => Ok(TrustTier::High),
            "consensus" => Ok(TrustTier::Consensus),
            other => Err(AppError::Validation(format!("unknown trust tier: {}", other))),
        }
    }
}

/// Engagement counters collected for a piece of content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Engagement {
    pub vote_score: i64,
    pub rating_avg: Option<f64>,
    pub reply_count: i64,
    pub participant_count: i64,
    pub total_support_points: i64,
    pub support_point_allocator_count: i64,
}

impl Engagement {
    /// Copy with every negative counter raised to zero.
    pub fn clamped(&self) -> Engagement {
        Engagement {
            vote_score: self.vote_score.max(0),
            rating_avg: self.rating_avg,
            reply_count: self.reply_count.max(0),
            participant_count: self.participant_count.max(0),
            total_support_points: self.total_support_points.max(0),
            support_point_allocator_count: self.support_point_allocator_count.max(0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowThresholds {
    pub min_votes: i64,
    pub min_replies: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierThresholds {
    pub min_votes: i64,
    pub min_replies: i64,
    #[serde(rename = "minSP")]
    pub min_sp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusThresholds {
    pub min_votes: i64,
    pub min_participants: i64,
    #[serde(rename = "minSP")]
    pub min_sp: i64,
}

/// Administrator-tunable classification thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustThresholds {
    pub new_content_hours: i64,
    pub low: LowThresholds,
    pub medium: TierThresholds,
    pub high: TierThresholds,
    pub consensus: ConsensusThresholds,
}

impl Default for TrustThresholds {
    fn default() -> Self {
        Self {
            new_content_hours: 24,
            low: LowThresholds {
                min_votes: 1,
                min_replies: 1,
            },
            medium: TierThresholds {
                min_votes: 3,
                min_replies: 3,
                min_sp: 5,
            },
            high: TierThresholds {
                min_votes: 10,
                min_replies: 5,
                min_sp: 20,
            },
            consensus: ConsensusThresholds {
                min_votes: 20,
                min_participants: 10,
                min_sp: 50,
            },
        }
    }
}

impl TrustThresholds {
    /// Negative values are meaningless for counters; treat them as zero.
    pub fn sanitized(&self) -> TrustThresholds {
        TrustThresholds {
            new_content_hours: self.new_content_hours.max(0),
            low: LowThresholds {
                min_votes: self.low.min_votes.max(0),
                min_replies: self.low.min_replies.max(0),
            },
            medium: TierThresholds {
                min_votes: self.medium.min_votes.max(0),
                min_replies: self.medium.min_replies.max(0),
                min_sp: self.medium.min_sp.max(0),
            },
            high: TierThresholds {
                min_votes: self.high.min_votes.max(0),
                min_replies: self.high.min_replies.max(0),
                min_sp: self.high.min_sp.max(0),
            },
            consensus: ConsensusThresholds {
                min_votes: self.consensus.min_votes.max(0),
                min_participants: self.consensus.min_participants.max(0),
                min_sp: self.consensus.min_sp.max(0),
            },
        }
    }
}

/// Content submitted for indexing; the trust tier is derived on upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDocument {
    pub content_type: ContentType,
    pub content_id: String,
    pub url: String,
    pub title: String,
    pub summary: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub full_text: Option<String>,
    pub author_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedContent {
    pub content_type: ContentType,
    pub content_id: String,
    pub url: String,
    pub title: String,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub full_text: Option<String>,
    pub engagement: Engagement,
    pub trust_tier: TrustTier,
    pub author_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub indexed_at: DateTime<Utc>,
}

impl IndexedContent {
    pub fn from_document(
        doc: ContentDocument,
        engagement: Engagement,
        trust_tier: TrustTier,
        indexed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            content_type: doc.content_type,
            content_id: doc.content_id,
            url: doc.url,
            title: doc.title,
            summary: doc.summary,
            keywords: doc.keywords,
            full_text: doc.full_text,
            engagement,
            trust_tier,
            author_id: doc.author_id,
            created_at: doc.created_at,
            indexed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentSearchResult {
    #[serde(flatten)]
    pub content: IndexedContent,
    pub rank: f32,
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub types: Option<Vec<ContentType>>,
    pub min_trust_tier: Option<TrustTier>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            types: None,
            min_trust_tier: None,
            limit: 8,
            offset: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_order_matches_rank() {
        for pair in TrustTier::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].rank() < pair[1].rank());
        }
        assert_eq!(TrustTier::Consensus.rank(), 5);
        assert_eq!(TrustTier::Unvalidated.rank(), 1);
    }

    #[test]
    fn at_or_above_includes_self() {
        assert_eq!(
            TrustTier::High.at_or_above(),
            vec![TrustTier::High, TrustTier::Consensus]
        );
    }

    #[test]
    fn thresholds_deserialize_from_settings_json() {
        let raw = r#"{
            "newContentHours": 12,
            "low": {"minVotes": 2, "minReplies": 1},
            "medium": {"minVotes": 3, "minReplies": 3, "minSP": 5},
            "high": {"minVotes": 10, "minReplies": 5, "minSP": 20},
            "consensus": {"minVotes": 20, "minParticipants": 10, "minSP": 50}
        }"#;
        let parsed: TrustThresholds = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.new_content_hours, 12);
        assert_eq!(parsed.low.min_votes, 2);
        assert_eq!(parsed.consensus.min_participants, 10);
    }

    #[test]
    fn sanitized_clamps_negative_thresholds() {
        let mut t = TrustThresholds::default();
        t.high.min_sp = -4;
        assert_eq!(t.sanitized().high.min_sp, 0);
    }

    #[test]
    fn content_type_roundtrips_through_str() {
        for ct in ContentType::ALL {
            assert_eq!(ct.as_str().parse::<ContentType>().unwrap(), ct);
        }
        assert!("wiki".parse::<ContentType>().is_err());
    }
}
