//! Trust-aware rendering of indexed content for the generation collaborator,
//! plus query intent detection.

use once_cell::sync::Lazy;
use regex::RegexSet;

use crate::models::{IndexedContent, TrustTier};
use crate::services::trust::format_engagement;

const BODY_PREVIEW_CHARS: usize = 500;

static RECENT_ACTIVITY_PATTERNS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)what'?s new",
        r"(?i)recent(ly)?",
        r"(?i)latest",
        r"(?i)today",
        r"(?i)this week",
        r"(?i)just (posted|shared|added)",
        r"(?i)any new",
    ])
    .expect("recent activity patterns are valid")
});

static POPULAR_CONTENT_PATTERNS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)popular",
        r"(?i)most (voted|supported|liked)",
        r"(?i)community (supports?|backs?|agrees?)",
        r"(?i)consensus",
        r"(?i)trending",
        r"(?i)top (posts?|topics?|ideas?)",
        r"(?i)what do (people|members|everyone) (think|support|want)",
    ])
    .expect("popular content patterns are valid")
});

/// Does the question ask about what happened lately?
pub fn is_recent_activity_query(query: &str) -> bool {
    RECENT_ACTIVITY_PATTERNS.is_match(query)
}

/// Does the question ask about what the community backs?
pub fn is_popular_content_query(query: &str) -> bool {
    POPULAR_CONTENT_PATTERNS.is_match(query)
}

fn body_preview(item: &IndexedContent) -> String {
    if let Some(summary) = item.summary.as_deref().filter(|s| !s.is_empty()) {
        return summary.to_string();
    }
    match item.full_text.as_deref().filter(|s| !s.is_empty()) {
        Some(text) => text.chars().take(BODY_PREVIEW_CHARS).collect(),
        None => "(No summary available)".to_string(),
    }
}

pub fn format_content(item: &IndexedContent) -> String {
    let mut block = format!(
        "[{}: {}]\nTrust: {}\nURL: {}\n",
        item.content_type.label(),
        item.title,
        item.trust_tier.phrase(),
        item.url
    );

    if item.trust_tier != TrustTier::Unvalidated {
        block.push_str(&format!(
            "Engagement: {}\n",
            format_engagement(&item.engagement, item.trust_tier)
        ));
    }

    block.push('\n');
    block.push_str(&body_preview(item));
    block
}

/// Full context block with trust framing guidance. Empty input yields an empty string.
pub fn format_content_block(items: &[IndexedContent]) -> String {
    if items.is_empty() {
        return String::new();
    }

    let formatted: Vec<String> = items.iter().map(format_content).collect();

    format!(
        "\n**LIVE COMMUNITY CONTENT:**\n\
         The following content was found on the platform. Use appropriate language based on trust level:\n\
         - Unvalidated: Frame as \"one member's opinion\" or \"a recent suggestion\"\n\
         - Low/Medium: Frame as \"some members think\" or \"there's interest in\"\n\
         - High: Frame as \"there's strong community support for\"\n\
         - Consensus: Frame as \"the community has reached consensus that\"\n\
         \n\
         {}\n\
         \n\
         When citing this content, include the URL so users can explore further.",
        formatted.join("\n\n---\n\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentType, Engagement};
    use chrono::Utc;

    fn item(tier: TrustTier, summary: Option<&str>, full_text: Option<&str>) -> IndexedContent {
        IndexedContent {
            content_type: ContentType::ForumTopic,
            content_id: "t-1".into(),
            url: "/forum/t-1".into(),
            title: "Tool library".into(),
            summary: summary.map(str::to_string),
            keywords: vec![],
            full_text: full_text.map(str::to_string),
            engagement: Engagement {
                vote_score: 4,
                reply_count: 2,
                ..Engagement::default()
            },
            trust_tier: tier,
            author_id: None,
            created_at: Utc::now(),
            indexed_at: Utc::now(),
        }
    }

    #[test]
    fn detects_query_intent() {
        assert!(is_recent_activity_query("What's new in the forum?"));
        assert!(is_recent_activity_query("anything posted TODAY"));
        assert!(!is_recent_activity_query("How do co-ops work?"));

        assert!(is_popular_content_query("What do members think about housing?"));
        assert!(is_popular_content_query("show me the top ideas"));
        assert!(!is_popular_content_query("Where is the meeting?"));
    }

    #[test]
    fn validated_content_shows_engagement() {
        let text = format_content(&item(TrustTier::Medium, Some("Share tools."), None));
        assert_eq!(
            text,
            "[FORUM TOPIC: Tool library]\nTrust: (Some community support)\nURL: /forum/t-1\n\
             Engagement: +4 votes, 2 replies\n\nShare tools."
        );
    }

    #[test]
    fn unvalidated_content_hides_engagement_and_previews_body() {
        let long = "x".repeat(600);
        let text = format_content(&item(TrustTier::Unvalidated, Some(""), Some(&long)));
        assert!(!text.contains("Engagement:"));
        assert!(text.ends_with(&"x".repeat(500)));
        assert!(!text.ends_with(&"x".repeat(501)));

        let bare = format_content(&item(TrustTier::Unvalidated, None, None));
        assert!(bare.ends_with("(No summary available)"));
    }

    #[test]
    fn block_is_empty_without_items() {
        assert_eq!(format_content_block(&[]), "");
        let block = format_content_block(&[item(TrustTier::High, Some("a"), None)]);
        assert!(block.starts_with("\n**LIVE COMMUNITY CONTENT:**"));
        assert!(block.ends_with("include the URL so users can explore further."));
    }
}
