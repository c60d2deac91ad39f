//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod cache;
mod gateway;
mod pubsub;
mod storage;

pub use auth::{AUTH_CHANNEL, AuthError, AuthEvent, AuthProvider};
pub use cache::{Cache, CacheError, QueryKey};
pub use gateway::ForumGateway;
pub use pubsub::{MessageHandler, PubSub, PubSubError, PubSubMessage};
pub use storage::{LocalStorage, StorageError};
