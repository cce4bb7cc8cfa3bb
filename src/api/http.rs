//! HTTP implementation of [`FeedApi`] over [`reqwest`].

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::{list_or_empty, Feed, FeedApi, FeedFollow, NewFeed, NewFollow, RegisterUser};
use crate::error::ApiError;

/// Feed backend reached over HTTP.
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base: Url,
}

impl HttpApi {
    /// Create a client for the backend rooted at `base`
    /// (e.g. `http://localhost:8080`).
    pub fn new(base: Url) -> Self {
        Self {
            client: Client::new(),
            base,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base.as_str().trim_end_matches('/'))
    }

    fn request(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        debug!(%method, path, "backend request");
        self.client
            .request(method, self.endpoint(path))
            .bearer_auth(token)
    }

    async fn json(&self, builder: RequestBuilder, fallback: &str) -> Result<Value, ApiError> {
        let response = checked(builder.send().await?, fallback).await?;
        Ok(response.json().await?)
    }

    async fn send(&self, builder: RequestBuilder, fallback: &str) -> Result<(), ApiError> {
        checked(builder.send().await?, fallback).await?;
        Ok(())
    }
}

/// Turn a non-2xx response into [`ApiError::Status`].
///
/// The message is the backend's non-empty `error` field when the body is
/// JSON carrying one, otherwise `fallback`. Anything else in the body is only
/// logged.
async fn checked(response: Response, fallback: &str) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status,
        message: error_message(&text, fallback),
    })
}

fn error_message(body: &str, fallback: &str) -> String {
    let message = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        value
            .get("error")?
            .as_str()
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .map(String::from)
    });

    match message {
        Some(message) => message,
        None => {
            let body = body.trim();
            if !body.is_empty() {
                warn!(body, "backend error response without an error message");
            }
            fallback.to_string()
        }
    }
}

#[async_trait]
impl FeedApi for HttpApi {
    async fn register_user(&self, token: &str, body: &RegisterUser) -> Result<(), ApiError> {
        let req = self.request(Method::POST, "/v1/users", token).json(body);
        self.send(req, "Failed to register with backend").await
    }

    async fn list_feeds(&self, token: &str) -> Result<Vec<Feed>, ApiError> {
        let req = self.request(Method::GET, "/v1/feeds", token);
        Ok(list_or_empty(self.json(req, "Failed to fetch feeds").await?))
    }

    async fn create_feed(&self, token: &str, body: &NewFeed) -> Result<Feed, ApiError> {
        let req = self.request(Method::POST, "/v1/feeds", token).json(body);
        Ok(serde_json::from_value(
            self.json(req, "Failed to create feed").await?,
        )?)
    }

    async fn delete_feed(&self, token: &str, feed_id: &str) -> Result<(), ApiError> {
        let req = self.request(Method::DELETE, &format!("/v1/feeds/{feed_id}"), token);
        self.send(req, "Failed to delete feed").await
    }

    async fn feed_items(&self, token: &str, feed_id: &str) -> Result<Value, ApiError> {
        let req = self.request(Method::GET, &format!("/v1/feeds/{feed_id}/items"), token);
        self.json(req, "Failed to fetch items").await
    }

    async fn scrape_feed(&self, token: &str, feed_id: &str) -> Result<(), ApiError> {
        let req = self.request(Method::POST, &format!("/v1/feeds/{feed_id}/scrape"), token);
        self.send(req, "Failed to scrape feed").await
    }

    async fn list_follows(&self, token: &str) -> Result<Vec<FeedFollow>, ApiError> {
        let req = self.request(Method::GET, "/v1/feed-followers", token);
        Ok(list_or_empty(self.json(req, "Failed to fetch followed feeds").await?))
    }

    async fn follow_feed(&self, token: &str, body: &NewFollow) -> Result<(), ApiError> {
        let req = self
            .request(Method::POST, "/v1/feed-followers", token)
            .json(body);
        self.send(req, "Failed to follow feed").await
    }

    async fn unfollow_feed(&self, token: &str, feed_id: &str) -> Result<(), ApiError> {
        let req = self.request(
            Method::DELETE,
            &format!("/v1/feed-followers/{feed_id}"),
            token,
        );
        self.send(req, "Failed to unfollow feed").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let api = HttpApi::new(Url::parse("http://localhost:8080/").unwrap());
        assert_eq!(api.endpoint("/v1/feeds"), "http://localhost:8080/v1/feeds");
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let api = HttpApi::new(Url::parse("https://example.com/rss-api").unwrap());
        assert_eq!(
            api.endpoint("/v1/feeds/abc/items"),
            "https://example.com/rss-api/v1/feeds/abc/items"
        );
    }

    #[test]
    fn error_message_prefers_json_error_field() {
        assert_eq!(
            error_message(r#"{"error": "user exists"}"#, "fallback"),
            "user exists"
        );
    }

    #[test]
    fn error_message_ignores_non_json_bodies() {
        let fallback = "Failed to register with backend";
        assert_eq!(error_message("<html>502 Bad Gateway</html>", fallback), fallback);
        assert_eq!(error_message("bad gateway", fallback), fallback);
        assert_eq!(error_message("  ", fallback), fallback);
    }

    #[test]
    fn error_message_ignores_blank_or_missing_error_field() {
        let fallback = "Failed to register with backend";
        assert_eq!(error_message(r#"{"error": ""}"#, fallback), fallback);
        assert_eq!(error_message(r#"{"error": "   "}"#, fallback), fallback);
        assert_eq!(error_message(r#"{"error": 42}"#, fallback), fallback);
        assert_eq!(error_message(r#"{"msg": 1}"#, fallback), fallback);
        assert_eq!(error_message(r#"["error"]"#, fallback), fallback);
    }

    #[test]
    fn status_error_displays_message_only() {
        let err = ApiError::Status {
            status: reqwest::StatusCode::CONFLICT,
            message: error_message(r#"{"error": "user exists"}"#, "fallback"),
        };
        assert_eq!(err.to_string(), "user exists");
        assert_eq!(err.status(), Some(reqwest::StatusCode::CONFLICT));
    }
}
