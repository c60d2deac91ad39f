//! GoTrue OAuth with PKCE.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use reqwest::{Method, Url};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use uuid::Uuid;

use forum_core::domain::{Identity, Session, UserId};
use forum_core::ports::{AUTH_CHANNEL, AuthError, AuthEvent, AuthProvider, LocalStorage, PubSub};

use super::{SESSION_STORAGE_KEY, SupabaseClient};

/// S256 code challenge for `verifier` (RFC 7636).
pub(crate) fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

fn new_verifier() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    user_name: Option<String>,
    preferred_username: Option<String>,
    full_name: Option<String>,
    name: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: Uuid,
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: TokenUser,
}

impl From<TokenResponse> for Session {
    fn from(token: TokenResponse) -> Self {
        let expires_at = token
            .expires_at
            .or_else(|| token.expires_in.map(|secs| Utc::now().timestamp() + secs));
        let meta = token.user.user_metadata;
        Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
            user: Identity {
                id: UserId(token.user.id),
                email: token.user.email,
                user_name: meta.user_name.or(meta.preferred_username),
                full_name: meta.full_name.or(meta.name),
                avatar_url: meta.avatar_url,
            },
        }
    }
}

async fn announce(pubsub: &dyn PubSub, event: &AuthEvent) {
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode auth event");
            return;
        }
    };
    if let Err(e) = pubsub.publish(AUTH_CHANNEL, &payload).await {
        tracing::warn!(error = %e, "Failed to publish auth event");
    }
}

/// Clear `session` if it has expired, forget the persisted copy and
/// announce `SignedOut`. Returns whether the session was ended.
async fn end_if_expired(
    session: &RwLock<Option<Session>>,
    storage: &dyn LocalStorage,
    pubsub: &dyn PubSub,
) -> bool {
    {
        let mut current = session.write().await;
        if !current.as_ref().is_some_and(Session::is_expired) {
            return false;
        }
        *current = None;
    }

    tracing::info!("Session expired; signing out");
    if let Err(e) = storage.remove_item(SESSION_STORAGE_KEY) {
        tracing::warn!(error = %e, "Failed to forget expired session");
    }
    announce(pubsub, &AuthEvent::SignedOut).await;
    true
}

impl SupabaseClient {
    pub(super) async fn end_expired_session(&self) -> bool {
        end_if_expired(&self.session, self.storage.as_ref(), self.pubsub.as_ref()).await
    }

    /// Schedule the end of `session` at its expiry, replacing any earlier
    /// schedule.
    async fn arm_expiry(&self, session: &Session) {
        let Some(wait) = session.expires_in() else {
            return;
        };
        let current = Arc::clone(&self.session);
        let storage = Arc::clone(&self.storage);
        let pubsub = Arc::clone(&self.pubsub);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            end_if_expired(&current, storage.as_ref(), pubsub.as_ref()).await;
        });
        if let Some(previous) = self.expiry.lock().await.replace(timer) {
            previous.abort();
        }
    }

    async fn disarm_expiry(&self) {
        if let Some(timer) = self.expiry.lock().await.take() {
            timer.abort();
        }
    }

    fn persist(&self, session: Option<&Session>) -> Result<(), AuthError> {
        let result = match session {
            Some(session) => {
                let raw = serde_json::to_string(session)
                    .map_err(|e| AuthError::Storage(e.to_string()))?;
                self.storage.set_item(SESSION_STORAGE_KEY, &raw)
            }
            None => self.storage.remove_item(SESSION_STORAGE_KEY),
        };
        result.map_err(|e| AuthError::Storage(e.to_string()))
    }

    fn build_authorize_url(&self, challenge: &str) -> Result<String, AuthError> {
        let url = Url::parse_with_params(
            &self.config.auth_url("authorize"),
            &[
                ("provider", self.config.provider.as_str()),
                ("redirect_to", self.config.redirect_to.as_str()),
                ("code_challenge", challenge),
                ("code_challenge_method", "s256"),
            ],
        )
        .map_err(|e| AuthError::Misconfigured(e.to_string()))?;
        Ok(url.into())
    }
}

#[async_trait]
impl AuthProvider for SupabaseClient {
    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        if self.end_expired_session().await {
            self.disarm_expiry().await;
            return Ok(None);
        }
        let session = self.session.read().await.clone();
        if let Some(session) = &session {
            self.arm_expiry(session).await;
        }
        Ok(session)
    }

    async fn authorize_url(&self) -> Result<String, AuthError> {
        let verifier = new_verifier();
        let url = self.build_authorize_url(&pkce_challenge(&verifier))?;
        *self.verifier.lock().await = Some(verifier);
        tracing::debug!(provider = %self.config.provider, "Starting OAuth sign-in");
        Ok(url)
    }

    #[tracing::instrument(skip_all)]
    async fn exchange_code(&self, code: &str) -> Result<Session, AuthError> {
        let verifier = self
            .verifier
            .lock()
            .await
            .take()
            .ok_or(AuthError::MissingVerifier)?;

        let request = self
            .http
            .request(Method::POST, self.config.auth_url("token"))
            .query(&[("grant_type", "pkce")])
            .bearer_auth(&self.config.anon_key)
            .json(&serde_json::json!({
                "auth_code": code,
                "code_verifier": verifier,
            }));
        let token: TokenResponse = Self::send_json(request).await?;
        let session = Session::from(token);

        self.persist(Some(&session))?;
        *self.session.write().await = Some(session.clone());
        self.arm_expiry(&session).await;
        tracing::info!(user = %session.user.id, "Signed in");

        announce(
            self.pubsub.as_ref(),
            &AuthEvent::SignedIn {
                user: session.user.clone(),
            },
        )
        .await;
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.disarm_expiry().await;
        let previous = self.session.write().await.take();

        if let Some(session) = previous {
            let request = self
                .http
                .request(Method::POST, self.config.auth_url("logout"))
                .bearer_auth(&session.access_token);
            if let Err(e) = Self::send_empty(request).await {
                tracing::warn!(error = %e, "Remote logout failed; clearing local session anyway");
            }
        }

        self.persist(None)?;
        tracing::info!("Signed out");
        announce(self.pubsub.as_ref(), &AuthEvent::SignedOut).await;
        Ok(())
    }
}
