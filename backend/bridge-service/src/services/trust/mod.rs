// ============================================
// Trust Tier Classifier
// ============================================
//
// Maps engagement counters to one of five ordered trust tiers.
// Support points weigh double a vote: allocating one spends a scarce budget.

use crate::models::{Engagement, TrustThresholds, TrustTier};

/// Weight of one support point relative to one vote.
pub const SUPPORT_POINT_WEIGHT: i64 = 2;

/// Classify content. Total over all inputs: negative counters and thresholds
/// are clamped to zero first, and the first matching tier (top-down) wins.
pub fn classify(engagement: &Engagement, thresholds: &TrustThresholds) -> TrustTier {
    let e = engagement.clamped();
    let t = thresholds.sanitized();

    let effective_votes = e
        .vote_score
        .saturating_add(e.total_support_points.saturating_mul(SUPPORT_POINT_WEIGHT));
    let effective_participants = e
        .participant_count
        .saturating_add(e.support_point_allocator_count);

    if effective_votes >= t.consensus.min_votes
        && effective_participants >= t.consensus.min_participants
        && e.total_support_points >= t.consensus.min_sp
    {
        return TrustTier::Consensus;
    }

    // Support points alone can carry an item to high
    if e.total_support_points >= t.high.min_sp
        || (effective_votes >= t.high.min_votes && e.reply_count >= t.high.min_replies)
    {
        return TrustTier::High;
    }

    if e.total_support_points >= t.medium.min_sp
        || effective_votes >= t.medium.min_votes
        || e.reply_count >= t.medium.min_replies
    {
        return TrustTier::Medium;
    }

    if e.vote_score >= t.low.min_votes
        || e.reply_count >= t.low.min_replies
        || e.total_support_points > 0
    {
        return TrustTier::Low;
    }

    TrustTier::Unvalidated
}

/// Continuous 0..~110 trust score, used for display and tie-breaking in prompts.
pub fn trust_score(engagement: &Engagement, age_hours: f64) -> f64 {
    let e = engagement.clamped();

    let vote_points = ((e.vote_score * 2) as f64).min(30.0);
    let sp_points = ((e.total_support_points * 2) as f64).min(40.0);
    let allocator_bonus = (e.support_point_allocator_count as f64).min(10.0);
    let reply_points = (e.reply_count as f64 * 1.5).min(15.0);
    let participant_bonus = (e.participant_count as f64).min(10.0);
    let rating_bonus = e.rating_avg.map(|r| (r - 2.5) * 2.0).unwrap_or(0.0);
    let age_penalty = if age_hours < 6.0 {
        (6.0 - age_hours.max(0.0)) * 2.0
    } else {
        0.0
    };

    let total = vote_points + sp_points + allocator_bonus + reply_points + participant_bonus
        + rating_bonus
        - age_penalty;
    total.max(0.0)
}

pub fn tier_from_score(score: f64) -> TrustTier {
    if score >= 80.0 {
        TrustTier::Consensus
    } else if score >= 50.0 {
        TrustTier::High
    } else if score >= 25.0 {
        TrustTier::Medium
    } else if score >= 10.0 {
        TrustTier::Low
    } else {
        TrustTier::Unvalidated
    }
}

/// Several members each backing an item is a stronger signal than one large allocation.
pub fn has_significant_support(total_sp: i64, allocator_count: i64) -> bool {
    total_sp >= 10 || (allocator_count >= 3 && total_sp >= 5)
}

/// Human-readable engagement line, e.g. "+4 votes, 2 replies, 6 SP from 3 members".
pub fn format_engagement(engagement: &Engagement, tier: TrustTier) -> String {
    let mut parts = Vec::new();

    if engagement.vote_score != 0 {
        let sign = if engagement.vote_score > 0 { "+" } else { "" };
        parts.push(format!("{}{} votes", sign, engagement.vote_score));
    }
    if engagement.reply_count > 0 {
        parts.push(format!("{} replies", engagement.reply_count));
    }
    if engagement.total_support_points > 0 {
        parts.push(format!(
            "{} SP from {} members",
            engagement.total_support_points, engagement.support_point_allocator_count
        ));
    }
    if engagement.participant_count > 0 && tier == TrustTier::Consensus {
        parts.push(format!("{} participants", engagement.participant_count));
    }

    if parts.is_empty() {
        "No engagement yet".to_string()
    } else {
        parts.join(", ")
    }
}
