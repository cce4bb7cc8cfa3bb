//! Hosted identity provider over its REST API.
//!
//! Sign-in goes through `accounts:signInWithPassword`; refreshing uses the
//! secure-token endpoint. Tokens live only in memory for the lifetime of the
//! process.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

use super::{AuthState, IdentityProvider, Principal};
use crate::error::AuthError;

/// Refresh this long before the provider says the token expires.
const REFRESH_MARGIN_SECS: i64 = 60;

struct Tokens {
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

pub struct FirebaseAuth {
    client: Client,
    api_key: String,
    identity_url: Url,
    token_url: Url,
    tokens: Mutex<Option<Tokens>>,
    /// Held for the duration of a token refresh so concurrent callers share
    /// one round-trip.
    refreshing: tokio::sync::Mutex<()>,
    state: watch::Sender<AuthState>,
}

/// What the token cache can offer without a network call.
enum Cached {
    Fresh(String),
    /// The id token is about to expire; carries the refresh token.
    Stale(String),
}

impl FirebaseAuth {
    pub fn new(api_key: impl Into<String>, identity_url: Url, token_url: Url) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            identity_url,
            token_url,
            tokens: Mutex::new(None),
            refreshing: tokio::sync::Mutex::new(()),
            state,
        }
    }

    fn tokens(&self) -> MutexGuard<'_, Option<Tokens>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cached(&self) -> Result<Cached, AuthError> {
        let tokens = self.tokens();
        let tokens = tokens.as_ref().ok_or(AuthError::SignedOut)?;
        if tokens.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > Utc::now() {
            Ok(Cached::Fresh(tokens.id_token.clone()))
        } else {
            Ok(Cached::Stale(tokens.refresh_token.clone()))
        }
    }

    /// Whether the session that issued `refresh_token` is still the current one.
    fn is_current(&self, refresh_token: &str) -> bool {
        self.tokens()
            .as_ref()
            .is_some_and(|tokens| tokens.refresh_token == refresh_token)
    }

    /// Install tokens obtained by refreshing `used`. Refused when the user
    /// signed out (or in again) while the refresh was in flight.
    fn store_refreshed(&self, used: &str, fresh: Tokens) -> Result<String, AuthError> {
        let mut tokens = self.tokens();
        match tokens.as_ref() {
            Some(current) if current.refresh_token == used => {
                let id_token = fresh.id_token.clone();
                *tokens = Some(fresh);
                Ok(id_token)
            }
            _ => {
                debug!("session changed during token refresh, discarding new tokens");
                Err(AuthError::SignedOut)
            }
        }
    }

    fn endpoint(base: &Url, path: &str) -> String {
        format!("{}/{path}", base.as_str().trim_end_matches('/'))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Tokens, AuthError> {
        let response = self
            .client
            .post(Self::endpoint(&self.token_url, "token"))
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;
        let body: RefreshResponse = checked(response).await?.json().await?;

        Ok(Tokens {
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_at: expiry(&body.expires_in),
        })
    }
}

/// Map a provider error response to [`AuthError::Rejected`] with the
/// provider's own message (e.g. `INVALID_PASSWORD`).
async fn checked(response: Response) -> Result<Response, AuthError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    let message = body["error"]["message"]
        .as_str()
        .map(String::from)
        .unwrap_or_else(|| format!("identity provider returned {status}"));
    Err(AuthError::Rejected(message))
}

fn expiry(expires_in: &str) -> DateTime<Utc> {
    let seconds = expires_in.parse::<i64>().unwrap_or(3600);
    Utc::now() + Duration::seconds(seconds)
}

#[async_trait]
impl IdentityProvider for FirebaseAuth {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Principal, AuthError> {
        let response = self
            .client
            .post(Self::endpoint(&self.identity_url, "accounts:signInWithPassword"))
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await?;
        let body: SignInResponse = checked(response).await?.json().await?;

        let principal = Principal {
            uid: body.local_id,
            email: body.email.filter(|e| !e.is_empty()),
            display_name: body.display_name.filter(|n| !n.is_empty()),
        };
        *self.tokens() = Some(Tokens {
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_at: expiry(&body.expires_in),
        });

        info!(uid = %principal.uid, "signed in");
        self.state.send_replace(Some(principal.clone()));
        Ok(principal)
    }

    async fn id_token(&self) -> Result<String, AuthError> {
        if let Cached::Fresh(id_token) = self.cached()? {
            return Ok(id_token);
        }

        let _refreshing = self.refreshing.lock().await;
        // Whoever held the lock before us may already have refreshed.
        let refresh_token = match self.cached()? {
            Cached::Fresh(id_token) => return Ok(id_token),
            Cached::Stale(refresh_token) => refresh_token,
        };

        match self.refresh(&refresh_token).await {
            Ok(fresh) => self.store_refreshed(&refresh_token, fresh),
            Err(AuthError::Rejected(reason)) => {
                // A rejected refresh token means the session is over.
                if self.is_current(&refresh_token) {
                    warn!(%reason, "token refresh rejected, signing out");
                    self.sign_out();
                }
                Err(AuthError::Rejected(reason))
            }
            Err(e) => Err(e),
        }
    }

    fn sign_out(&self) {
        *self.tokens() = None;
        info!("signed out");
        self.state.send_replace(None);
    }

    fn current_user(&self) -> AuthState {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }
}
