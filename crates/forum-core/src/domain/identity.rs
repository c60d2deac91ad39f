use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::UserId;

/// The signed-in user as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub email: Option<String>,
    pub user_name: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl Identity {
    /// Name shown in the navbar.
    pub fn display_name(&self) -> &str {
        self.user_name
            .as_deref()
            .or(self.full_name.as_deref())
            .or(self.email.as_deref())
            .unwrap_or("Guest")
    }

    /// Name recorded on comments this identity writes.
    pub fn author_name(&self) -> Option<&str> {
        self.user_name
            .as_deref()
            .or(self.full_name.as_deref())
            .filter(|name| !name.trim().is_empty())
    }
}

/// An authenticated session with the hosted backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds) after which the access token is rejected.
    pub expires_at: Option<i64>,
    pub user: Identity,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|exp| exp <= Utc::now().timestamp())
            .unwrap_or(false)
    }

    /// Time left before expiry, zero once expired. `None` for sessions
    /// without an expiry.
    pub fn expires_in(&self) -> Option<Duration> {
        let exp = self.expires_at?;
        let left = exp.saturating_mul(1000) - Utc::now().timestamp_millis();
        Some(Duration::from_millis(u64::try_from(left).unwrap_or(0)))
    }
}
