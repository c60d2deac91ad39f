//! # Forum Infrastructure
//!
//! Concrete implementations of the ports defined in `forum-core`, plus the
//! query client that sits between views and the remote gateway.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No remote backend, in-memory only
//! - `supabase` - Hosted backend gateway and OAuth via reqwest

pub mod backend;
pub mod cache;
pub mod pubsub;
pub mod storage;

#[cfg(feature = "supabase")]
pub mod supabase;

// Re-exports - In-Memory
pub use backend::InMemoryBackend;
pub use cache::{InMemoryCache, QueryClient};
pub use pubsub::InMemoryPubSub;
pub use storage::{FileLocalStorage, InMemoryLocalStorage};

// Re-exports - Hosted backend
#[cfg(feature = "supabase")]
pub use supabase::{SESSION_STORAGE_KEY, SupabaseClient, SupabaseConfig};
