//! Identity provider integration.
//!
//! * [`IdentityProvider`]: the seam to whoever issues bearer tokens.
//! * [`firebase`]: REST adapter for the hosted identity provider.
//! * [`gate`]: watches the auth state and routes the UI accordingly.
//! * [`bridge`]: registers a freshly signed-in user with the backend.

pub mod bridge;
pub mod firebase;
pub mod gate;

pub use firebase::FirebaseAuth;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::AuthError;

/// The signed-in user, as far as the dashboard cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl Principal {
    /// Name shown in the header: display name, else the local part of the
    /// email, else `"User"`.
    pub fn label(&self) -> String {
        if let Some(name) = self.display_name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        self.email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
            .unwrap_or("User")
            .to_string()
    }
}

/// Authentication state: `None` when signed out.
pub type AuthState = Option<Principal>;

/// Anything that can sign a user in and hand out short-lived bearer tokens.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Principal, AuthError>;

    /// A bearer token for the current principal, refreshed if it is about
    /// to expire.
    async fn id_token(&self) -> Result<String, AuthError>;

    fn sign_out(&self);

    fn current_user(&self) -> AuthState;

    /// Receive every subsequent auth-state change. The receiver starts out
    /// holding the current state.
    fn subscribe(&self) -> watch::Receiver<AuthState>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(email: Option<&str>, name: Option<&str>) -> Principal {
        Principal {
            uid: "u1".into(),
            email: email.map(String::from),
            display_name: name.map(String::from),
        }
    }

    #[test]
    fn label_prefers_display_name() {
        assert_eq!(principal(Some("a@b.c"), Some("Ada")).label(), "Ada");
    }

    #[test]
    fn label_falls_back_to_email_local_part() {
        assert_eq!(principal(Some("ada@example.com"), Some("")).label(), "ada");
    }

    #[test]
    fn label_defaults_to_user() {
        assert_eq!(principal(None, None).label(), "User");
    }
}
