//! Backend API abstraction layer.
//!
//! This module defines the [`FeedApi`] trait, the wire records the backend
//! speaks, and the canonical [`Article`] type. The HTTP implementation lives
//! in [`http`]; tests swap in an in-memory fake (see `crate::testing`).
//!
//! ## Endpoints
//!
//! | call | method / path |
//! |------|---------------|
//! | [`FeedApi::register_user`] | `POST /v1/users` |
//! | [`FeedApi::list_feeds`] | `GET /v1/feeds` |
//! | [`FeedApi::create_feed`] | `POST /v1/feeds` |
//! | [`FeedApi::delete_feed`] | `DELETE /v1/feeds/{id}` |
//! | [`FeedApi::feed_items`] | `GET /v1/feeds/{id}/items` |
//! | [`FeedApi::scrape_feed`] | `POST /v1/feeds/{id}/scrape` |
//! | [`FeedApi::list_follows`] | `GET /v1/feed-followers` |
//! | [`FeedApi::follow_feed`] | `POST /v1/feed-followers` |
//! | [`FeedApi::unfollow_feed`] | `DELETE /v1/feed-followers/{id}` |
//!
//! Every call takes the caller's bearer token explicitly; the API client
//! holds no session state of its own.

mod article;
mod http;
mod normalize;

pub use article::{parse_timestamp, Article};
pub use http::HttpApi;
pub use normalize::normalize;

#[cfg(test)]
pub(crate) use article::tests::make_article;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::ApiError;

/// A feed owned by the signed-in user. The backend serializes these with
/// PascalCase keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Feed {
    #[serde(rename = "ID", deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(rename = "UserID", deserialize_with = "lenient_string")]
    pub user_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(deserialize_with = "lenient_string")]
    pub created_at: String,
    #[serde(deserialize_with = "lenient_string")]
    pub updated_at: String,
}

/// A follow relation between a user and a feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FeedFollow {
    #[serde(rename = "ID", deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(rename = "FeedID", deserialize_with = "lenient_string")]
    pub feed_id: String,
    #[serde(rename = "UserID", deserialize_with = "lenient_string")]
    pub user_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub created_at: String,
}

/// Accept a string, a number or a bool as text; `null` and anything else
/// read as empty.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => String::new(),
    })
}

/// Body of `POST /v1/users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterUser {
    pub email: Option<String>,
    pub username: String,
}

/// Body of `POST /v1/feeds`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewFeed {
    pub name: String,
    pub url: String,
    pub user_id: String,
}

/// Body of `POST /v1/feed-followers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewFollow {
    pub feed_id: String,
    pub user_id: String,
}

/// Everything the dashboard needs from the backend.
///
/// Implementations must be [`Send`] + [`Sync`]: actions run on spawned tokio
/// tasks that share one client behind an `Arc`.
#[async_trait]
pub trait FeedApi: Send + Sync {
    /// Register (or refresh) the caller's user record.
    async fn register_user(&self, token: &str, body: &RegisterUser) -> Result<(), ApiError>;

    async fn list_feeds(&self, token: &str) -> Result<Vec<Feed>, ApiError>;

    async fn create_feed(&self, token: &str, body: &NewFeed) -> Result<Feed, ApiError>;

    async fn delete_feed(&self, token: &str, feed_id: &str) -> Result<(), ApiError>;

    /// Raw items payload. Its shape is not guaranteed; run it through
    /// [`normalize`] before use.
    async fn feed_items(&self, token: &str, feed_id: &str) -> Result<Value, ApiError>;

    async fn scrape_feed(&self, token: &str, feed_id: &str) -> Result<(), ApiError>;

    async fn list_follows(&self, token: &str) -> Result<Vec<FeedFollow>, ApiError>;

    async fn follow_feed(&self, token: &str, body: &NewFollow) -> Result<(), ApiError>;

    async fn unfollow_feed(&self, token: &str, feed_id: &str) -> Result<(), ApiError>;
}

/// Decode a list endpoint body, treating anything that is not a JSON array
/// as an empty list. Entries that do not decode are logged and skipped.
pub(crate) fn list_or_empty<T>(body: Value) -> Vec<T>
where
    T: for<'de> Deserialize<'de>,
{
    let Value::Array(entries) = body else {
        return Vec::new();
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(index, error = %e, "skipping malformed list entry");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn feed_deserializes_backend_casing() {
        let feed: Feed = serde_json::from_value(json!({
            "ID": "f1",
            "UserID": "u1",
            "Name": "TechCrunch",
            "Url": "https://techcrunch.com/feed",
            "CreatedAt": "2024-01-01T00:00:00Z",
            "UpdatedAt": "2024-01-02T00:00:00Z",
        }))
        .unwrap();

        assert_eq!(feed.id, "f1");
        assert_eq!(feed.user_id, "u1");
        assert_eq!(feed.name, "TechCrunch");
        assert_eq!(feed.url, "https://techcrunch.com/feed");
    }

    #[test]
    fn feed_tolerates_missing_fields() {
        let feed: Feed = serde_json::from_value(json!({"Name": "Bare"})).unwrap();
        assert_eq!(feed.id, "");
        assert_eq!(feed.name, "Bare");
    }

    #[test]
    fn list_or_empty_ignores_non_arrays() {
        let follows: Vec<FeedFollow> = list_or_empty(json!({"error": "nope"}));
        assert!(follows.is_empty());

        let follows: Vec<FeedFollow> =
            list_or_empty(json!([{"ID": "1", "FeedID": "f1", "UserID": "u"}]));
        assert_eq!(follows[0].feed_id, "f1");
    }

    #[test]
    fn null_field_does_not_drop_the_list() {
        let feeds: Vec<Feed> = list_or_empty(json!([
            {"ID": "f1", "Name": "TechCrunch", "Url": "https://techcrunch.com/feed"},
            {"ID": "f2", "Name": "Verge", "Url": "https://theverge.com/rss", "UpdatedAt": null},
        ]));

        assert_eq!(feeds.len(), 2);
        assert_eq!(feeds[1].id, "f2");
        assert_eq!(feeds[1].updated_at, "");
    }

    #[test]
    fn numeric_ids_are_read_as_text() {
        let follows: Vec<FeedFollow> =
            list_or_empty(json!([{"ID": 7, "FeedID": 42, "UserID": "u"}]));
        assert_eq!(follows[0].id, "7");
        assert_eq!(follows[0].feed_id, "42");

        let feeds: Vec<Feed> = list_or_empty(json!([{"ID": 3, "Name": null}]));
        assert_eq!(feeds[0].id, "3");
        assert_eq!(feeds[0].name, "");
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let feeds: Vec<Feed> = list_or_empty(json!([
            "not a feed",
            {"ID": "f1", "Name": "TechCrunch"},
            42,
        ]));
        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].id, "f1");
    }

    #[test]
    fn new_feed_serializes_snake_case() {
        let body = serde_json::to_value(NewFeed {
            name: "n".into(),
            url: "u".into(),
            user_id: "id".into(),
        })
        .unwrap();
        assert_eq!(body, json!({"name": "n", "url": "u", "user_id": "id"}));
    }
}
