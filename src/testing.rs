//! In-memory stand-ins for the backend and the identity provider.
//!
//! Every call is recorded so tests can assert on what went over the wire,
//! and individual calls (or individual feeds' item fetches) can be told to
//! fail.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::sync::watch;

use crate::actions::Services;
use crate::api::{Feed, FeedApi, FeedFollow, NewFeed, NewFollow, RegisterUser};
use crate::auth::{AuthState, IdentityProvider, Principal};
use crate::error::{ApiError, AuthError};

pub const PASSWORD: &str = "hunter2";

pub fn feed(id: &str, name: &str, url: &str) -> Feed {
    Feed {
        id: id.to_string(),
        user_id: "u1".to_string(),
        name: name.to_string(),
        url: url.to_string(),
        created_at: "2024-01-01T00:00:00Z".to_string(),
        updated_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

pub fn principal() -> Principal {
    Principal {
        uid: "u1".to_string(),
        email: Some("ada@example.com".to_string()),
        display_name: None,
    }
}

/// `n` raw items for a feed, newest first, one hour apart.
pub fn raw_items(feed_id: &str, n: usize) -> Value {
    Value::Array(
        (0..n)
            .map(|i| {
                json!({
                    "id": format!("{feed_id}-{i}"),
                    "feed_id": feed_id,
                    "title": format!("{feed_id} item {i}"),
                    "link": format!("https://example.com/{feed_id}/{i}"),
                    "pub_date": format!("2024-03-01T{:02}:00:00Z", 23 - i % 24),
                })
            })
            .collect(),
    )
}

fn rejected(call: &str) -> ApiError {
    ApiError::Status {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: format!("{call} failed"),
    }
}

#[derive(Default)]
pub struct FakeApi {
    pub feeds: Mutex<Vec<Feed>>,
    pub items: Mutex<HashMap<String, Value>>,
    /// Items a scrape of the given feed will publish.
    pub scraped_items: Mutex<HashMap<String, Value>>,
    pub follows: Mutex<Vec<FeedFollow>>,
    /// Names of calls that should fail (`"list_feeds"`, `"scrape_feed"`, ...).
    pub failing: Mutex<HashSet<&'static str>>,
    /// Feed ids whose item fetch should fail.
    pub failing_items: Mutex<HashSet<String>>,
    pub calls: Mutex<Vec<String>>,
    pub registrations: Mutex<Vec<RegisterUser>>,
}

impl FakeApi {
    pub fn with_feeds(feeds: Vec<Feed>) -> Self {
        let api = Self::default();
        *api.feeds.lock().unwrap() = feeds;
        api
    }

    pub fn set_items(&self, feed_id: &str, items: Value) {
        self.items.lock().unwrap().insert(feed_id.to_string(), items);
    }

    pub fn fail(&self, call: &'static str) {
        self.failing.lock().unwrap().insert(call);
    }

    pub fn fail_items(&self, feed_id: &str) {
        self.failing_items.lock().unwrap().insert(feed_id.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str, detail: String) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(format!("{call} {detail}").trim().to_string());
        if self.failing.lock().unwrap().contains(call) {
            return Err(rejected(call));
        }
        Ok(())
    }
}

#[async_trait]
impl FeedApi for FakeApi {
    async fn register_user(&self, _token: &str, body: &RegisterUser) -> Result<(), ApiError> {
        self.record("register_user", String::new())?;
        self.registrations.lock().unwrap().push(body.clone());
        Ok(())
    }

    async fn list_feeds(&self, _token: &str) -> Result<Vec<Feed>, ApiError> {
        self.record("list_feeds", String::new())?;
        Ok(self.feeds.lock().unwrap().clone())
    }

    async fn create_feed(&self, _token: &str, body: &NewFeed) -> Result<Feed, ApiError> {
        self.record("create_feed", body.name.clone())?;
        let mut feeds = self.feeds.lock().unwrap();
        let mut created = feed(&format!("feed-{}", feeds.len() + 1), &body.name, &body.url);
        created.user_id = body.user_id.clone();
        feeds.push(created.clone());
        Ok(created)
    }

    async fn delete_feed(&self, _token: &str, feed_id: &str) -> Result<(), ApiError> {
        self.record("delete_feed", feed_id.to_string())?;
        self.feeds.lock().unwrap().retain(|f| f.id != feed_id);
        Ok(())
    }

    async fn feed_items(&self, _token: &str, feed_id: &str) -> Result<Value, ApiError> {
        self.record("feed_items", feed_id.to_string())?;
        if self.failing_items.lock().unwrap().contains(feed_id) {
            return Err(rejected("feed_items"));
        }
        Ok(self
            .items
            .lock()
            .unwrap()
            .get(feed_id)
            .cloned()
            .unwrap_or_else(|| json!([])))
    }

    async fn scrape_feed(&self, _token: &str, feed_id: &str) -> Result<(), ApiError> {
        self.record("scrape_feed", feed_id.to_string())?;
        if let Some(items) = self.scraped_items.lock().unwrap().get(feed_id) {
            self.set_items(feed_id, items.clone());
        }
        Ok(())
    }

    async fn list_follows(&self, _token: &str) -> Result<Vec<FeedFollow>, ApiError> {
        self.record("list_follows", String::new())?;
        Ok(self.follows.lock().unwrap().clone())
    }

    async fn follow_feed(&self, _token: &str, body: &NewFollow) -> Result<(), ApiError> {
        self.record("follow_feed", body.feed_id.clone())?;
        let mut follows = self.follows.lock().unwrap();
        let id = format!("follow-{}", follows.len() + 1);
        follows.push(FeedFollow {
            id,
            feed_id: body.feed_id.clone(),
            user_id: body.user_id.clone(),
            created_at: String::new(),
        });
        Ok(())
    }

    async fn unfollow_feed(&self, _token: &str, feed_id: &str) -> Result<(), ApiError> {
        self.record("unfollow_feed", feed_id.to_string())?;
        self.follows.lock().unwrap().retain(|f| f.feed_id != feed_id);
        Ok(())
    }
}

pub struct FakeIdentity {
    state: watch::Sender<AuthState>,
    /// Principal handed out by a successful sign-in.
    pub account: Principal,
}

impl FakeIdentity {
    pub fn signed_out() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            state,
            account: principal(),
        }
    }

    pub fn signed_in() -> Self {
        let identity = Self::signed_out();
        identity.state.send_replace(Some(identity.account.clone()));
        identity
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Principal, AuthError> {
        if password != PASSWORD {
            return Err(AuthError::Rejected("INVALID_PASSWORD".into()));
        }
        let principal = Principal {
            email: Some(email.to_string()),
            ..self.account.clone()
        };
        self.state.send_replace(Some(principal.clone()));
        Ok(principal)
    }

    async fn id_token(&self) -> Result<String, AuthError> {
        match self.current_user() {
            Some(p) => Ok(format!("token-{}", p.uid)),
            None => Err(AuthError::SignedOut),
        }
    }

    fn sign_out(&self) {
        self.state.send_replace(None);
    }

    fn current_user(&self) -> AuthState {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }
}

/// Services wired to the given fakes.
pub fn services(api: &Arc<FakeApi>, identity: &Arc<FakeIdentity>) -> Services {
    Services {
        api: api.clone(),
        auth: identity.clone(),
    }
}
