use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::PostId;

/// Logical identity of a cached remote read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// The aggregate post list.
    Posts,
    Post(PostId),
    Comments(PostId),
    Likes(PostId),
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::Posts => f.write_str("posts"),
            QueryKey::Post(id) => write!(f, "post:{id}"),
            QueryKey::Comments(id) => write!(f, "comments:{id}"),
            QueryKey::Likes(id) => write!(f, "likes:{id}"),
        }
    }
}

/// Cache trait - storage for serialized query results.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get a value from the cache.
    async fn get(&self, key: &str) -> Option<String>;

    /// Set a value in the cache with optional TTL.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Delete a key from the cache.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Cache operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_render_entity_and_id() {
        assert_eq!(QueryKey::Posts.to_string(), "posts");
        assert_eq!(QueryKey::Post(PostId(4)).to_string(), "post:4");
        assert_eq!(QueryKey::Comments(PostId(4)).to_string(), "comments:4");
        assert_eq!(QueryKey::Likes(PostId(9)).to_string(), "likes:9");
    }
}
