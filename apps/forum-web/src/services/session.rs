//! Process-wide identity, kept in step with the auth provider.
//!
//! The store never changes its identity directly. It asks the provider for
//! the session once at start-up and afterwards follows the `SIGNED_IN` /
//! `SIGNED_OUT` events the provider publishes on the auth channel.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use forum_core::domain::Identity;
use forum_core::ports::{
    AUTH_CHANNEL, AuthError, AuthEvent, AuthProvider, MessageHandler, PubSub, PubSubError,
    PubSubMessage,
};

/// How long a sign-in/out waits for its event to arrive.
const EVENT_WAIT: Duration = Duration::from_secs(5);

pub struct SessionStore {
    provider: Arc<dyn AuthProvider>,
    pubsub: Arc<dyn PubSub>,
    current: Arc<watch::Sender<Option<Identity>>>,
}

impl SessionStore {
    pub fn new(provider: Arc<dyn AuthProvider>, pubsub: Arc<dyn PubSub>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            provider,
            pubsub,
            current: Arc::new(current),
        }
    }

    /// Start following auth events, then load the existing session.
    pub async fn start(&self) -> Result<(), PubSubError> {
        let current = Arc::clone(&self.current);
        let handler: MessageHandler = Box::new(
            move |message: PubSubMessage| -> Pin<Box<dyn Future<Output = ()> + Send>> {
                let current = Arc::clone(&current);
                Box::pin(async move { apply_event(&current, &message.payload) })
            },
        );
        let subscribed = self.pubsub.subscribe(AUTH_CHANNEL, handler).await;

        match self.provider.get_session().await {
            Ok(session) => {
                let user = session.map(|s| s.user);
                if let Some(user) = &user {
                    tracing::info!(user = %user.display_name(), "Resumed session");
                }
                self.current.send_replace(user);
            }
            Err(e) => tracing::warn!(error = %e, "Could not load session; starting signed out"),
        }

        subscribed
    }

    /// Stop following auth events.
    pub async fn shutdown(&self) {
        if let Err(e) = self.pubsub.unsubscribe(AUTH_CHANNEL).await {
            tracing::warn!(error = %e, "Failed to unsubscribe from auth events");
        }
    }

    pub fn current(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }

    /// URL of the provider's sign-in page.
    pub async fn sign_in_url(&self) -> Result<String, AuthError> {
        self.provider.authorize_url().await
    }

    /// Finish the OAuth redirect and wait until the identity reflects it.
    pub async fn complete_sign_in(&self, code: &str) -> Result<Identity, AuthError> {
        let mut changes = self.subscribe();
        let session = self.provider.exchange_code(code).await?;
        let user_id = session.user.id;
        self.settle(&mut changes, |id| id.as_ref().is_some_and(|u| u.id == user_id))
            .await;
        Ok(session.user)
    }

    /// End the session; the identity clears once the provider reports it.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let mut changes = self.subscribe();
        self.provider.sign_out().await?;
        self.settle(&mut changes, Option::is_none).await;
        Ok(())
    }

    async fn settle(
        &self,
        changes: &mut watch::Receiver<Option<Identity>>,
        done: impl FnMut(&Option<Identity>) -> bool,
    ) {
        match tokio::time::timeout(EVENT_WAIT, changes.wait_for(done)).await {
            Ok(Ok(_)) => {}
            Ok(Err(_)) => tracing::warn!("Identity channel closed"),
            Err(_) => tracing::warn!("Auth event not received in time"),
        }
    }
}

fn apply_event(current: &watch::Sender<Option<Identity>>, payload: &str) {
    match serde_json::from_str::<AuthEvent>(payload) {
        Ok(AuthEvent::SignedIn { user }) => {
            tracing::info!(user = %user.display_name(), "Identity changed: signed in");
            current.send_replace(Some(user));
        }
        Ok(AuthEvent::SignedOut) => {
            tracing::info!("Identity changed: signed out");
            current.send_replace(None);
        }
        Err(e) => tracing::warn!(error = %e, "Ignoring malformed auth event"),
    }
}
