//! Hosted backend client - PostgREST tables/RPC and GoTrue OAuth.
//!
//! One [`SupabaseClient`] serves as both the [`ForumGateway`] and the
//! [`AuthProvider`]: the session obtained through sign-in supplies the
//! bearer token for every table request, so row-level security sees the
//! signed-in user.
//!
//! [`ForumGateway`]: forum_core::ports::ForumGateway
//! [`AuthProvider`]: forum_core::ports::AuthProvider

mod auth;
mod rest;

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use forum_core::domain::Session;
use forum_core::error::GatewayError;
use forum_core::ports::{LocalStorage, PubSub};

/// Local storage key holding the persisted session.
pub const SESSION_STORAGE_KEY: &str = "forum-auth-token";

/// Connection settings for the hosted backend.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyzcompany.supabase.co`.
    pub url: String,
    /// Public anon key sent as `apikey` on every request.
    pub anon_key: String,
    /// OAuth provider used for sign-in.
    pub provider: String,
    /// Where the provider sends the browser back to.
    pub redirect_to: String,
}

impl SupabaseConfig {
    fn endpoint(&self, service: &str, path: &str) -> String {
        format!(
            "{}/{}/v1/{}",
            self.url.trim_end_matches('/'),
            service,
            path.trim_start_matches('/')
        )
    }

    pub fn rest_url(&self, path: &str) -> String {
        self.endpoint("rest", path)
    }

    pub fn auth_url(&self, path: &str) -> String {
        self.endpoint("auth", path)
    }
}

/// Error body returned by PostgREST and GoTrue.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

/// Best human-readable message from an error response body.
fn error_message(status: u16, body: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    parsed
        .message
        .or(parsed.msg)
        .or(parsed.error_description)
        .or(parsed.error)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("HTTP {status}")
            } else {
                body.trim().to_string()
            }
        })
}

pub struct SupabaseClient {
    http: reqwest::Client,
    config: SupabaseConfig,
    session: Arc<RwLock<Option<Session>>>,
    /// Ends the current session once its access token expires.
    expiry: Mutex<Option<JoinHandle<()>>>,
    /// PKCE verifier of the sign-in currently in progress.
    verifier: Mutex<Option<String>>,
    storage: Arc<dyn LocalStorage>,
    pubsub: Arc<dyn PubSub>,
}

impl SupabaseClient {
    /// Build the client and restore any persisted, unexpired session.
    pub fn new(
        config: SupabaseConfig,
        storage: Arc<dyn LocalStorage>,
        pubsub: Arc<dyn PubSub>,
    ) -> Self {
        let mut headers = HeaderMap::new();
        match HeaderValue::from_str(&config.anon_key) {
            Ok(value) => {
                headers.insert("apikey", value);
            }
            Err(e) => tracing::error!(error = %e, "Anon key is not a valid header value"),
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("forum-web/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        let session = Self::restore_session(storage.as_ref());

        Self {
            http,
            config,
            session: Arc::new(RwLock::new(session)),
            expiry: Mutex::new(None),
            verifier: Mutex::new(None),
            storage,
            pubsub,
        }
    }

    fn restore_session(storage: &dyn LocalStorage) -> Option<Session> {
        let raw = match storage.get_item(SESSION_STORAGE_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted session");
                return None;
            }
        };

        match serde_json::from_str::<Session>(&raw) {
            Ok(session) if session.is_expired() => {
                tracing::info!("Persisted session expired; starting signed out");
                None
            }
            Ok(session) => {
                tracing::info!(user = %session.user.id, "Restored persisted session");
                Some(session)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable persisted session");
                None
            }
        }
    }

    /// Token for the `Authorization` header: the user's access token when
    /// signed in, the anon key otherwise.
    async fn bearer(&self) -> String {
        let token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| (s.access_token.clone(), s.is_expired()));
        match token {
            Some((token, false)) => token,
            Some((_, true)) => {
                self.end_expired_session().await;
                self.config.anon_key.clone()
            }
            None => self.config.anon_key.clone(),
        }
    }

    async fn request(&self, method: Method, url: String) -> RequestBuilder {
        let bearer = self.bearer().await;
        self.http
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {bearer}"))
    }

    async fn send(builder: RequestBuilder) -> Result<Response, GatewayError> {
        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(status.as_u16(), &body);
        tracing::warn!(status = status.as_u16(), message = %message, "Backend rejected request");
        Err(GatewayError::Remote {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, GatewayError> {
        Self::send(builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    async fn send_empty(builder: RequestBuilder) -> Result<(), GatewayError> {
        Self::send(builder).await.map(|_| ())
    }
}

impl Drop for SupabaseClient {
    fn drop(&mut self) {
        if let Some(timer) = self.expiry.get_mut().take() {
            timer.abort();
        }
    }
}
