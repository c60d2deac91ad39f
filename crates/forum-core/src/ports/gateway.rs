use async_trait::async_trait;

use crate::domain::{Comment, Like, NewComment, NewPost, Post, PostId, PostSummary, PostUpdate};
use crate::error::GatewayError;

/// Remote data gateway - the hosted backend's table and RPC surface.
///
/// Writes return the rows the backend reports as affected. Row-level
/// security filters rows silently, so an empty result means "missing or
/// not yours" and callers must treat it as a failure.
#[async_trait]
pub trait ForumGateway: Send + Sync {
    /// Every post with precomputed like and comment counts.
    async fn posts_with_counts(&self) -> Result<Vec<PostSummary>, GatewayError>;

    async fn post(&self, id: PostId) -> Result<Option<Post>, GatewayError>;

    async fn insert_post(&self, post: &NewPost) -> Result<Post, GatewayError>;

    async fn update_post(&self, id: PostId, update: &PostUpdate)
    -> Result<Vec<Post>, GatewayError>;

    async fn delete_post(&self, id: PostId) -> Result<Vec<Post>, GatewayError>;

    /// Comments of a post, oldest first.
    async fn comments(&self, post_id: PostId) -> Result<Vec<Comment>, GatewayError>;

    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment, GatewayError>;

    async fn likes(&self, post_id: PostId) -> Result<Vec<Like>, GatewayError>;

    async fn insert_like(&self, like: &Like) -> Result<(), GatewayError>;

    async fn delete_like(&self, like: &Like) -> Result<Vec<Like>, GatewayError>;
}
