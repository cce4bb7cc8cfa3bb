//! Error types shared by the backend client, the identity adapter and the
//! dashboard actions.
//!
//! Nothing here is fatal: every variant ends up as a single notice in the
//! status bar (see [`crate::notice::Notice`]).

use reqwest::StatusCode;

/// Failure talking to the feed backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The backend answered with a non-2xx status. Only the message is
    /// shown to the user; the status is kept for logging.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure talking to the identity provider.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The provider rejected the credentials or the refresh token.
    #[error("{0}")]
    Rejected(String),

    #[error("not signed in")]
    SignedOut,

    #[error("identity request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Failure of a dashboard action (load, create, scrape, follow, delete).
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}
