//! The canonical article record.
//!
//! The backend does not agree with itself on field names, so every items
//! payload goes through [`super::normalize`] and comes out as a list of
//! `Article`s. Nothing else in the application looks at raw item JSON.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use std::cmp::Ordering;

/// A single normalized article belonging to a feed.
///
/// ## Sorting
///
/// `Article` implements [`Ord`] for **reverse-chronological** ordering:
/// newer articles sort before older ones, and articles whose date is missing
/// or unparseable sort last.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Article {
    /// Backend identifier, or a generated `item-<uuid>` placeholder when the
    /// payload had none. Placeholders change on every fetch.
    pub id: String,

    /// Owning feed, empty when the payload did not say.
    pub feed_id: String,

    pub title: String,

    /// Link to the full content; `"#"` when unknown.
    pub link: String,

    pub description: String,

    /// Publication timestamp exactly as the backend sent it (may be empty).
    pub pub_date: String,

    /// `pub_date` parsed, when it could be.
    pub published: Option<DateTime<FixedOffset>>,
}

impl Article {
    /// Whether the article carries a usable link (not the `"#"` placeholder).
    pub fn has_link(&self) -> bool {
        !self.link.is_empty() && self.link != "#"
    }
}

/// Parse a backend timestamp.
///
/// Accepts RFC 3339 (what the backend stores), RFC 2822 (what RSS feeds
/// carry verbatim) and a bare `YYYY-MM-DD HH:MM:SS`, read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc().fixed_offset())
        })
}

// ---------------------------------------------------------------------------
// Ordering: reverse chronological (newest first)
// ---------------------------------------------------------------------------

impl Ord for Article {
    fn cmp(&self, other: &Self) -> Ordering {
        // `other` first so that newer dates come first; `None` is less than
        // any `Some(_)` so undated articles sink to the bottom.
        other.published.cmp(&self.published)
    }
}

impl PartialOrd for Article {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Shorthand constructor for tests.
    pub fn make_article(id: &str, feed_id: &str, pub_date: &str) -> Article {
        Article {
            id: id.to_string(),
            feed_id: feed_id.to_string(),
            title: format!("Article {id}"),
            link: "#".to_string(),
            description: String::new(),
            pub_date: pub_date.to_string(),
            published: parse_timestamp(pub_date),
        }
    }

    #[test]
    fn sort_reverse_chronological() {
        let old = make_article("1", "f", "2024-01-01T00:00:00Z");
        let mid = make_article("2", "f", "2025-06-15T12:00:00Z");
        let new = make_article("3", "f", "2026-01-01T00:00:00Z");

        let mut articles = vec![old, new, mid];
        articles.sort();

        assert_eq!(articles[0].id, "3", "newest first");
        assert_eq!(articles[1].id, "2");
        assert_eq!(articles[2].id, "1", "oldest last");
    }

    #[test]
    fn undated_articles_sort_after_dated() {
        let dated = make_article("1", "f", "2025-01-01T00:00:00Z");
        let undated = make_article("2", "f", "");

        let mut articles = vec![undated, dated];
        articles.sort();

        assert_eq!(articles[0].id, "1", "dated article should come first");
        assert_eq!(articles[1].id, "2", "undated article should come last");
    }

    #[test]
    fn parses_rfc3339_and_rfc2822() {
        let a = parse_timestamp("2024-01-02T12:00:00+00:00").unwrap();
        let b = parse_timestamp("Tue, 02 Jan 2024 12:00:00 +0000").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn parses_naive_timestamp_as_utc() {
        let parsed = parse_timestamp("2024-01-02 12:00:00").unwrap();
        assert_eq!(parsed, parse_timestamp("2024-01-02T12:00:00Z").unwrap());
    }

    #[test]
    fn garbage_and_empty_dates_are_none() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("   ").is_none());
        assert!(parse_timestamp("not-a-real-date").is_none());
    }

    #[test]
    fn placeholder_link_is_not_a_link() {
        let mut article = make_article("1", "f", "");
        assert!(!article.has_link());
        article.link = "https://example.com/1".into();
        assert!(article.has_link());
    }
}
