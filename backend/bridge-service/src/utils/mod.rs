// Text and time-window helpers shared by search, example matching,
// interest inference and the stores

use chrono::{DateTime, Duration, Utc};

/// Longest look-back accepted from callers. Larger windows mean "everything".
pub const MAX_LOOKBACK_DAYS: i64 = 100 * 365;

/// Common English function words skipped when turning free text into search terms.
pub const SEARCH_STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "am", "an", "and", "any", "are", "as", "at", "be", "been",
    "but", "by", "can", "could", "did", "do", "does", "for", "from", "get", "had", "has",
    "have", "how", "i", "if", "in", "into", "is", "it", "its", "me", "my", "of", "on", "or",
    "our", "should", "so", "some", "than", "that", "the", "their", "them", "then", "there",
    "these", "they", "this", "to", "up", "us", "was", "we", "were", "what", "when", "where",
    "which", "who", "why", "will", "with", "would", "you", "your",
];

/// Lowercased alphanumeric runs of `text`, in order of appearance.
pub fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn is_search_stop_word(word: &str) -> bool {
    SEARCH_STOP_WORDS.contains(&word)
}

/// Case-insensitive substring test in either direction. Empty strings never match.
pub fn overlaps(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    a.contains(&b) || b.contains(&a)
}

/// Count non-overlapping occurrences of `needle` in `haystack` (both already lowercased).
pub fn occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

/// Escape `%`, `_` and `\` for use inside a SQL LIKE pattern.
pub fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// `now` minus `days`, with the window clamped to `0..=MAX_LOOKBACK_DAYS`.
pub fn days_before(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now - Duration::days(days.clamp(0, MAX_LOOKBACK_DAYS))
}

/// `now` minus `hours`, with the window clamped to `0..=MAX_LOOKBACK_DAYS` days.
pub fn hours_before(now: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
    now - Duration::hours(hours.clamp(0, MAX_LOOKBACK_DAYS * 24))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words() {
        assert_eq!(
            words("How do I start a Co-op?"),
            vec!["how", "do", "i", "start", "a", "co", "op"]
        );
        assert!(words("  ?! ").is_empty());
    }

    #[test]
    fn test_overlaps() {
        assert!(overlaps("Housing", "cohousing"));
        assert!(overlaps("garden", "Community Garden"));
        assert!(!overlaps("food", "climate"));
        assert!(!overlaps("", "climate"));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn test_lookback_windows_saturate() {
        let now = Utc::now();
        assert_eq!(hours_before(now, -3), now);
        assert_eq!(days_before(now, 2), now - Duration::days(2));
        assert_eq!(
            hours_before(now, i64::MAX),
            now - Duration::days(MAX_LOOKBACK_DAYS)
        );
        assert_eq!(
            days_before(now, i64::MAX),
            now - Duration::days(MAX_LOOKBACK_DAYS)
        );
    }
}
