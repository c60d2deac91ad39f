//! Authentication ports.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Identity, Session};
use crate::error::GatewayError;

/// Pub/sub channel on which providers announce session changes.
pub const AUTH_CHANNEL: &str = "auth";

/// Session change pushed by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    SignedIn { user: Identity },
    SignedOut,
}

/// OAuth sign-in against the hosted auth service.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The current session, if one exists and has not expired.
    async fn get_session(&self) -> Result<Option<Session>, AuthError>;

    /// Start the redirect flow; returns the URL to send the browser to.
    async fn authorize_url(&self) -> Result<String, AuthError>;

    /// Finish the redirect flow. Publishes [`AuthEvent::SignedIn`].
    async fn exchange_code(&self, code: &str) -> Result<Session, AuthError>;

    /// End the session. Publishes [`AuthEvent::SignedOut`].
    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// Authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("No sign-in in progress")]
    MissingVerifier,

    #[error("Auth provider misconfigured: {0}")]
    Misconfigured(String),

    #[error("Sign-in rejected: {0}")]
    Rejected(String),

    #[error("Auth request failed: {0}")]
    Transport(String),

    #[error("Session storage failed: {0}")]
    Storage(String),
}

impl From<GatewayError> for AuthError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Remote { message, .. } => AuthError::Rejected(message),
            other => AuthError::Transport(other.to_string()),
        }
    }
}
