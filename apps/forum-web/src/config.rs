//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Hosted backend connection settings.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Externally visible base URL; the OAuth callback is built from it.
    pub public_url: String,
    /// `None` runs the offline in-memory backend.
    pub backend: Option<BackendConfig>,
    pub oauth_provider: String,
    /// Directory holding the local key/value store.
    pub data_dir: PathBuf,
    /// How long a query result is served before it is refetched. Zero
    /// refetches on every read.
    pub query_stale_time: Duration,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = var("PORT").and_then(|p| p.parse().ok()).unwrap_or(5173);
        let public_url = var("PUBLIC_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://{host}:{port}"));

        let backend = var("SUPABASE_URL").map(|url| BackendConfig {
            url,
            anon_key: var("SUPABASE_ANON_KEY").unwrap_or_default(),
        });

        // 0 turns caching off; every read refetches.
        let query_stale_time = Duration::from_secs(
            var("QUERY_STALE_SECS")
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(30),
        );

        Self {
            host,
            port,
            public_url,
            backend,
            oauth_provider: var("OAUTH_PROVIDER").unwrap_or_else(|| "github".to_string()),
            data_dir: var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".forum")),
            query_stale_time,
        }
    }

    pub fn callback_url(&self) -> String {
        format!("{}/auth/callback", self.public_url)
    }
}
