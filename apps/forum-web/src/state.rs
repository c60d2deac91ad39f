//! Application state - shared across all handlers.

use std::sync::Arc;

use forum_core::ports::{AuthProvider, ForumGateway, LocalStorage, PubSub};
use forum_infra::{FileLocalStorage, InMemoryBackend, InMemoryCache, InMemoryPubSub, QueryClient};

use crate::config::AppConfig;
use crate::services::{CommentService, LikeService, PostService, SessionStore, UiSettingsStore};

#[cfg(feature = "supabase")]
use forum_infra::{SupabaseClient, SupabaseConfig};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub likes: Arc<LikeService>,
    pub session: Arc<SessionStore>,
    pub settings: Arc<UiSettingsStore>,
    /// `supabase` or `offline`.
    pub backend: &'static str,
}

/// The pieces the services are built from.
pub struct Parts {
    pub gateway: Arc<dyn ForumGateway>,
    pub auth: Arc<dyn AuthProvider>,
    pub pubsub: Arc<dyn PubSub>,
    pub storage: Arc<dyn LocalStorage>,
    pub queries: Arc<QueryClient>,
    pub backend: &'static str,
}

impl AppState {
    /// Build the state for `config`, falling back to the in-memory backend
    /// when no hosted backend is configured.
    pub async fn new(config: &AppConfig) -> Self {
        let pubsub: Arc<dyn PubSub> = Arc::new(InMemoryPubSub::default());
        let storage: Arc<dyn LocalStorage> = Arc::new(FileLocalStorage::new(&config.data_dir));
        let queries = Arc::new(QueryClient::new(
            Arc::new(InMemoryCache::new()),
            Some(config.query_stale_time),
        ));

        let (gateway, auth, backend) = Self::backend(config, storage.clone(), pubsub.clone());

        Self::from_parts(Parts {
            gateway,
            auth,
            pubsub,
            storage,
            queries,
            backend,
        })
        .await
    }

    #[cfg(feature = "supabase")]
    fn backend(
        config: &AppConfig,
        storage: Arc<dyn LocalStorage>,
        pubsub: Arc<dyn PubSub>,
    ) -> (Arc<dyn ForumGateway>, Arc<dyn AuthProvider>, &'static str) {
        match &config.backend {
            Some(remote) => {
                tracing::info!(url = %remote.url, "Using hosted backend");
                let client = Arc::new(SupabaseClient::new(
                    SupabaseConfig {
                        url: remote.url.clone(),
                        anon_key: remote.anon_key.clone(),
                        provider: config.oauth_provider.clone(),
                        redirect_to: config.callback_url(),
                    },
                    storage,
                    pubsub,
                ));
                let gateway: Arc<dyn ForumGateway> = client.clone();
                let auth: Arc<dyn AuthProvider> = client;
                (gateway, auth, "supabase")
            }
            None => {
                tracing::warn!("SUPABASE_URL not set. Running offline against the in-memory backend.");
                Self::offline(config, pubsub)
            }
        }
    }

    #[cfg(not(feature = "supabase"))]
    fn backend(
        config: &AppConfig,
        _storage: Arc<dyn LocalStorage>,
        pubsub: Arc<dyn PubSub>,
    ) -> (Arc<dyn ForumGateway>, Arc<dyn AuthProvider>, &'static str) {
        if config.backend.is_some() {
            tracing::warn!("Built without the supabase feature; ignoring SUPABASE_URL");
        }
        Self::offline(config, pubsub)
    }

    fn offline(
        config: &AppConfig,
        pubsub: Arc<dyn PubSub>,
    ) -> (Arc<dyn ForumGateway>, Arc<dyn AuthProvider>, &'static str) {
        let backend = Arc::new(InMemoryBackend::new(pubsub, config.callback_url()));
        let gateway: Arc<dyn ForumGateway> = backend.clone();
        let auth: Arc<dyn AuthProvider> = backend;
        (gateway, auth, "offline")
    }

    /// Wire the services together and start the session store.
    pub async fn from_parts(parts: Parts) -> Self {
        let session = Arc::new(SessionStore::new(parts.auth, parts.pubsub));
        if let Err(e) = session.start().await {
            tracing::error!(error = %e, "Auth events unavailable; sign-in changes need a restart");
        }

        let state = Self {
            posts: Arc::new(PostService::new(parts.gateway.clone(), parts.queries.clone())),
            comments: Arc::new(CommentService::new(
                parts.gateway.clone(),
                parts.queries.clone(),
            )),
            likes: Arc::new(LikeService::new(parts.gateway, parts.queries)),
            session,
            settings: Arc::new(UiSettingsStore::load(parts.storage)),
            backend: parts.backend,
        };

        tracing::info!(backend = state.backend, "Application state initialized");
        state
    }
}
