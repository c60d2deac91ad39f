//! Like toggle.

use std::sync::Arc;

use forum_core::domain::{Identity, Like, PostId};
use forum_core::error::{DomainError, GatewayError};
use forum_core::ports::{ForumGateway, QueryKey};
use forum_infra::QueryClient;

pub struct LikeService {
    gateway: Arc<dyn ForumGateway>,
    queries: Arc<QueryClient>,
}

impl LikeService {
    pub fn new(gateway: Arc<dyn ForumGateway>, queries: Arc<QueryClient>) -> Self {
        Self { gateway, queries }
    }

    pub async fn list(&self, post_id: PostId) -> Result<Vec<Like>, GatewayError> {
        self.queries
            .fetch(QueryKey::Likes(post_id), || self.gateway.likes(post_id))
            .await
    }

    /// Like the post, or take an existing like back. Returns whether the
    /// viewer likes the post afterwards.
    #[tracing::instrument(skip(self, viewer), fields(user = %viewer.id))]
    pub async fn toggle(&self, viewer: &Identity, post_id: PostId) -> Result<bool, DomainError> {
        let like = Like {
            post_id,
            user_id: viewer.id,
        };
        let liked = self.list(post_id).await?.contains(&like);

        if liked {
            let removed = self.gateway.delete_like(&like).await?;
            if removed.is_empty() {
                tracing::debug!("Like was already gone");
            }
        } else {
            self.gateway.insert_like(&like).await?;
        }

        self.queries
            .invalidate_many(&[QueryKey::Likes(post_id), QueryKey::Posts])
            .await;
        Ok(!liked)
    }
}
