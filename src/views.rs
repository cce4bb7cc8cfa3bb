//! Derived dashboard views.
//!
//! Aggregates (totals, today's count, latest articles) and the search-filtered
//! feed list are computed from the [`FeedStore`]. [`ViewCache`] recomputes
//! them only when the store revision, the search text or the calendar date
//! changes, so callers just ask for the view every frame.
//!
//! The date helpers at the bottom turn backend timestamps into the short
//! labels shown next to articles and feeds.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Local, NaiveDate};
use url::Url;

use crate::api::{parse_timestamp, Article, Feed};
use crate::store::FeedStore;

/// How many articles the "Latest articles" panel shows.
pub const RECENT_LIMIT: usize = 5;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DashboardView {
    pub total_feeds: usize,
    pub total_articles: usize,
    /// Recent articles published today (local time).
    pub today: usize,
    /// Newest dated articles across all feeds, newest first.
    pub recent: Vec<Article>,
    /// Indices into `FeedStore::feeds` matching the search text.
    pub filtered: Vec<usize>,
}

impl DashboardView {
    pub fn build(store: &FeedStore, query: &str, today: NaiveDate) -> Self {
        let recent = recent_articles(&store.items, RECENT_LIMIT);
        Self {
            total_feeds: store.feeds.len(),
            total_articles: total_articles(&store.items),
            today: today_count(&recent, today),
            filtered: filter_feeds(&store.feeds, query),
            recent,
        }
    }
}

/// Memoized [`DashboardView`].
#[derive(Debug, Default)]
pub struct ViewCache {
    key: Option<(u64, String, NaiveDate)>,
    view: DashboardView,
}

impl ViewCache {
    pub fn get(&mut self, store: &FeedStore, query: &str) -> &DashboardView {
        self.get_on(store, query, Local::now().date_naive())
    }

    fn get_on(&mut self, store: &FeedStore, query: &str, today: NaiveDate) -> &DashboardView {
        let fresh = matches!(
            &self.key,
            Some((revision, q, day)) if *revision == store.revision() && q == query && *day == today
        );
        if !fresh {
            self.view = DashboardView::build(store, query, today);
            self.key = Some((store.revision(), query.to_string(), today));
        }
        &self.view
    }
}

pub fn total_articles(items: &HashMap<String, Vec<Article>>) -> usize {
    items.values().map(Vec::len).sum()
}

/// Articles with a non-empty publication timestamp, newest first, at most
/// `limit`. Undated articles are left out (they still count in totals).
pub fn recent_articles(items: &HashMap<String, Vec<Article>>, limit: usize) -> Vec<Article> {
    let mut dated: Vec<Article> = items
        .values()
        .flatten()
        .filter(|article| !article.pub_date.is_empty())
        .cloned()
        .collect();
    dated.sort();
    dated.truncate(limit);
    dated
}

/// How many of `recent` were published on `today`, in local time.
pub fn today_count(recent: &[Article], today: NaiveDate) -> usize {
    recent
        .iter()
        .filter_map(|article| article.published)
        .filter(|published| published.with_timezone(&Local).date_naive() == today)
        .count()
}

/// Indices of feeds whose name or URL contains `query`, ignoring case.
/// An empty query matches everything.
pub fn filter_feeds(feeds: &[Feed], query: &str) -> Vec<usize> {
    let needle = query.to_lowercase();
    feeds
        .iter()
        .enumerate()
        .filter(|(_, feed)| {
            needle.is_empty()
                || feed.name.to_lowercase().contains(&needle)
                || feed.url.to_lowercase().contains(&needle)
        })
        .map(|(i, _)| i)
        .collect()
}

// ---------------------------------------------------------------------------
// Date and URL labels
// ---------------------------------------------------------------------------

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

fn month_day(date: &DateTime<Local>, now: &DateTime<Local>) -> String {
    if date.year() == now.year() {
        date.format("%b %-d").to_string()
    } else {
        date.format("%b %-d, %Y").to_string()
    }
}

/// Label for an article on the dashboard: "Today", "Yesterday",
/// "N days ago" within a week, otherwise the date.
pub fn relative_date(raw: &str, now: DateTime<Local>) -> String {
    if raw.is_empty() {
        return "No date".into();
    }
    let Some(date) = parse_timestamp(raw) else {
        return "Invalid date".into();
    };
    let date = date.with_timezone(&Local);
    let days = (now - date).num_milliseconds().abs() / DAY_MS;

    match days {
        0 => "Today".into(),
        1 => "Yesterday".into(),
        2..=6 => format!("{days} days ago"),
        _ => month_day(&date, &now),
    }
}

/// Compact label for the detail screen: "5m ago", "3h ago", "Yesterday",
/// "4d ago", otherwise the month and day.
pub fn short_relative(raw: &str, now: DateTime<Local>) -> String {
    if raw.is_empty() {
        return "No date".into();
    }
    let Some(date) = parse_timestamp(raw) else {
        return "Invalid date".into();
    };
    let date = date.with_timezone(&Local);
    let elapsed = (now - date).max(chrono::Duration::zero());

    match (elapsed.num_minutes(), elapsed.num_hours(), elapsed.num_days()) {
        (m, _, _) if m < 60 => format!("{m}m ago"),
        (_, h, _) if h < 24 => format!("{h}h ago"),
        (_, _, 1) => "Yesterday".into(),
        (_, _, d) if d < 7 => format!("{d}d ago"),
        _ => date.format("%b %-d").to_string(),
    }
}

/// Full timestamp for the detail screen.
pub fn full_date(raw: &str) -> String {
    if raw.is_empty() {
        return "No date".into();
    }
    match parse_timestamp(raw) {
        Some(date) => date.with_timezone(&Local).format("%b %-d, %Y %H:%M").to_string(),
        None => "Invalid date".into(),
    }
}

/// How long ago a feed was added.
pub fn feed_age(created_at: &str, now: DateTime<Local>) -> String {
    let Some(created) = parse_timestamp(created_at) else {
        return "Recently".into();
    };
    let elapsed = (now - created.with_timezone(&Local)).num_milliseconds().abs();
    let days = (elapsed + DAY_MS - 1) / DAY_MS;

    match days {
        0 => "Today".into(),
        1 => "Yesterday".into(),
        2..=7 => format!("{days} days ago"),
        8..=30 => format!("{} weeks ago", (days + 6) / 7),
        _ => format!("{} months ago", (days + 29) / 30),
    }
}

/// Host part of a feed URL without a leading `www.`.
pub fn display_host(raw: &str) -> String {
    if raw.is_empty() {
        return "No URL".into();
    }
    match Url::parse(raw).ok().and_then(|u| u.host_str().map(String::from)) {
        Some(host) => host.strip_prefix("www.").unwrap_or(&host).to_string(),
        None => raw.to_string(),
    }
}
