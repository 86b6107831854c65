// ============================================
// Interest Inference
// ============================================
//
// Ranks a member's interests from three signal layers:
// 1. Explicit profile interests (score 95)
// 2. Tracked implicit interests (taken as-is)
// 3. Keywords from joined group names (+10 / new at 60) and attended
//    event names (+8 / new at 50), capped at 100
// followed by one round of expansion through a fixed topic-cluster table
// (related terms at 60% of the source score).
//
// Output is deterministic: ties keep first-insertion order.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::models::{InterestScore, InterestSource, UserContext};
use crate::utils::overlaps;

pub const EXPLICIT_INTEREST_SCORE: i32 = 95;
pub const MAX_INTEREST_SCORE: i32 = 100;

const GROUP_KEYWORD_BASE: i32 = 60;
const GROUP_KEYWORD_BOOST: i32 = 10;
const EVENT_KEYWORD_BASE: i32 = 50;
const EVENT_KEYWORD_BOOST: i32 = 8;
const EXPANSION_FACTOR: f64 = 0.6;

/// Words never treated as keywords when mining group and event names.
pub const KEYWORD_STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with",
];

/// Topic clusters used for related-interest expansion.
pub const INTEREST_CLUSTERS: &[(&str, &[&str])] = &[
    ("housing", &["cooperative", "community", "affordable", "cohousing", "shelter"]),
    ("climate", &["environment", "sustainability", "ecology", "green", "renewable"]),
    ("food", &["agriculture", "garden", "farming", "nutrition", "local"]),
    ("technology", &["software", "digital", "open-source", "tech", "innovation"]),
    ("governance", &["democracy", "voting", "decision", "consensus", "participation"]),
    ("economy", &["cooperative", "mutual", "timebank", "trade", "exchange"]),
];

/// Keywords from a group or event name: lowercase, split on whitespace and
/// hyphens, longer than three letters, alphabetic only, not a stop word.
pub fn extract_keywords(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|w| w.len() > 3 && !KEYWORD_STOP_WORDS.contains(w))
        .filter(|w| w.chars().all(|c| c.is_ascii_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Insertion-ordered interest set keyed by topic
#[derive(Default)]
struct InterestSet {
    items: Vec<InterestScore>,
    index: HashMap<String, usize>,
}

impl InterestSet {
    fn contains(&self, topic: &str) -> bool {
        self.index.contains_key(topic)
    }

    /// Insert if absent; returns false when the topic is already present
    fn insert(&mut self, interest: InterestScore) -> bool {
        if self.contains(&interest.topic) {
            return false;
        }
        self.index.insert(interest.topic.clone(), self.items.len());
        self.items.push(interest);
        true
    }

    fn boost_or_insert(
        &mut self,
        topic: String,
        boost: i32,
        base: i32,
        source: InterestSource,
        now: DateTime<Utc>,
    ) {
        match self.index.get(&topic) {
            Some(&i) => {
                let item = &mut self.items[i];
                item.score = (item.score + boost).min(MAX_INTEREST_SCORE);
            }
            None => {
                self.insert(InterestScore {
                    topic,
                    score: base,
                    derived_from: source,
                    last_updated: now,
                });
            }
        }
    }
}

/// Infer a member's interests, highest confidence first.
pub fn infer_interests(user: &UserContext, now: DateTime<Utc>) -> Vec<InterestScore> {
    let mut set = InterestSet::default();

    for topic in &user.explicit_interests {
        set.insert(InterestScore {
            topic: topic.clone(),
            score: EXPLICIT_INTEREST_SCORE,
            derived_from: InterestSource::Profile,
            last_updated: now,
        });
    }

    for interest in &user.implicit_interests {
        let mut tracked = interest.clone();
        tracked.score = tracked.score.clamp(0, MAX_INTEREST_SCORE);
        set.insert(tracked);
    }

    for membership in &user.group_memberships {
        for keyword in extract_keywords(&membership.group_name) {
            set.boost_or_insert(
                keyword,
                GROUP_KEYWORD_BOOST,
                GROUP_KEYWORD_BASE,
                InterestSource::Post,
                now,
            );
        }
    }

    for attended in &user.event_attendance {
        for keyword in extract_keywords(&attended.event_name) {
            set.boost_or_insert(
                keyword,
                EVENT_KEYWORD_BOOST,
                EVENT_KEYWORD_BASE,
                InterestSource::EventAttendance,
                now,
            );
        }
    }

    // Expand from a snapshot so added terms do not themselves expand
    let sources: Vec<InterestScore> = set.items.clone();
    for interest in &sources {
        for (cluster, related) in INTEREST_CLUSTERS {
            if !overlaps(&interest.topic, cluster) {
                continue;
            }
            let score = (interest.score as f64 * EXPANSION_FACTOR).round() as i32;
            for term in related.iter() {
                set.insert(InterestScore {
                    topic: term.to_string(),
                    score,
                    derived_from: interest.derived_from,
                    last_updated: now,
                });
            }
        }
    }

    let mut ranked = set.items;
    // Stable sort keeps insertion order among equal scores
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}
