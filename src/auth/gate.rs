//! Session gate: turns auth-state changes into routing decisions.
//!
//! The gate owns a background task subscribed to the identity provider. Each
//! change is forwarded to the UI loop as an [`Access`] value; the loop sends
//! signed-out users to the sign-in screen. Dropping the gate unsubscribes.

use tokio::sync::{mpsc::UnboundedSender, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{AuthState, Principal};

/// What the gate decided for the current auth state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// A principal is present; protected screens may proceed.
    Granted(Principal),
    /// Nobody is signed in (or the subscription broke): show sign-in.
    Denied,
}

impl From<AuthState> for Access {
    fn from(state: AuthState) -> Self {
        match state {
            Some(principal) => Access::Granted(principal),
            None => Access::Denied,
        }
    }
}

pub struct SessionGate {
    task: JoinHandle<()>,
}

impl SessionGate {
    /// Start forwarding auth-state changes to `events`.
    ///
    /// The current state is sent immediately. If the provider goes away the
    /// subscription is treated as signed out and one final
    /// [`Access::Denied`] is sent.
    pub fn spawn<M>(mut auth: watch::Receiver<AuthState>, events: UnboundedSender<M>) -> Self
    where
        M: From<Access> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            loop {
                let access = Access::from(auth.borrow_and_update().clone());
                debug!(granted = matches!(access, Access::Granted(_)), "auth state changed");
                if events.send(access.into()).is_err() {
                    // UI loop is gone.
                    return;
                }
                if auth.changed().await.is_err() {
                    warn!("auth subscription closed, treating session as signed out");
                    let _ = events.send(Access::Denied.into());
                    return;
                }
            }
        });
        Self { task }
    }
}

impl Drop for SessionGate {
    fn drop(&mut self) {
        self.task.abort();
    }
}
