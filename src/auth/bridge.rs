//! Credential bridge: tells the backend about a freshly signed-in user.

use tracing::{error, info};

use super::Principal;
use crate::api::{FeedApi, RegisterUser};
use crate::error::ApiError;

/// Username sent when the provider has no display name for the user.
const DEFAULT_USERNAME: &str = "user";

/// Register (or update) `principal` with the backend, authenticating with
/// `token`. Exactly one request is made. A rejection is logged and returned
/// so the sign-in flow can report it.
pub async fn register(api: &dyn FeedApi, token: &str, principal: &Principal) -> Result<(), ApiError> {
    let body = RegisterUser {
        email: principal.email.clone(),
        username: principal
            .display_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
    };

    match api.register_user(token, &body).await {
        Ok(()) => {
            info!(uid = %principal.uid, "registered with backend");
            Ok(())
        }
        Err(e) => {
            error!(uid = %principal.uid, status = ?e.status(), error = %e, "backend registration failed");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{principal, FakeApi};

    #[tokio::test]
    async fn sends_display_name_as_username() {
        let api = FakeApi::default();
        let mut user = principal();
        user.display_name = Some("Ada Lovelace".into());

        register(&api, "tok", &user).await.unwrap();

        let sent = api.registrations.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![RegisterUser {
                email: Some("ada@example.com".into()),
                username: "Ada Lovelace".into(),
            }]
        );
    }

    #[tokio::test]
    async fn falls_back_to_default_username() {
        let api = FakeApi::default();
        register(&api, "tok", &principal()).await.unwrap();
        assert_eq!(api.registrations.lock().unwrap()[0].username, "user");
    }

    #[tokio::test]
    async fn propagates_rejection() {
        let api = FakeApi::default();
        api.fail("register_user");

        let err = register(&api, "tok", &principal()).await.unwrap_err();
        assert!(err.status().is_some());
        assert_eq!(api.calls(), ["register_user"], "exactly one request");
    }

    #[tokio::test]
    async fn rejection_shows_backend_message_without_status() {
        let api = FakeApi::default();
        api.fail("register_user");

        let err = register(&api, "tok", &principal()).await.unwrap_err();
        assert_eq!(err.to_string(), "register_user failed");
    }
}
