//! Threaded comments: fetch, write, and per-comment collapse state.

use std::sync::Arc;

use dashmap::DashMap;

use forum_core::domain::{CollapseState, Comment, CommentId, Identity, NewComment, PostId};
use forum_core::error::{DomainError, GatewayError};
use forum_core::ports::{ForumGateway, QueryKey};
use forum_infra::QueryClient;

const LOGIN_TO_REPLY: &str = "You must be logged in to reply.";
const LOGIN_TO_COMMENT: &str = "You must be logged in to comment.";

pub struct CommentService {
    gateway: Arc<dyn ForumGateway>,
    queries: Arc<QueryClient>,
    collapsed: DashMap<PostId, CollapseState>,
}

impl CommentService {
    pub fn new(gateway: Arc<dyn ForumGateway>, queries: Arc<QueryClient>) -> Self {
        Self {
            gateway,
            queries,
            collapsed: DashMap::new(),
        }
    }

    /// Comments of `post_id`, oldest first.
    pub async fn list(&self, post_id: PostId) -> Result<Vec<Comment>, GatewayError> {
        self.queries
            .fetch(QueryKey::Comments(post_id), || self.gateway.comments(post_id))
            .await
    }

    /// Reply to `parent`. Blank text is dropped without a request and
    /// yields `Ok(None)`.
    pub async fn reply(
        &self,
        viewer: Option<&Identity>,
        post_id: PostId,
        parent: CommentId,
        text: &str,
    ) -> Result<Option<Comment>, DomainError> {
        let viewer = viewer.ok_or(DomainError::Unauthenticated(LOGIN_TO_REPLY))?;
        self.write(viewer, post_id, Some(parent), text).await
    }

    /// Top-level comment on `post_id`; same rules as [`Self::reply`].
    pub async fn comment(
        &self,
        viewer: Option<&Identity>,
        post_id: PostId,
        text: &str,
    ) -> Result<Option<Comment>, DomainError> {
        let viewer = viewer.ok_or(DomainError::Unauthenticated(LOGIN_TO_COMMENT))?;
        let written = self.write(viewer, post_id, None, text).await?;
        if written.is_some() {
            // Comment totals on the list change too.
            self.queries.invalidate(QueryKey::Posts).await;
        }
        Ok(written)
    }

    #[tracing::instrument(skip(self, viewer, text), fields(user = %viewer.id))]
    async fn write(
        &self,
        viewer: &Identity,
        post_id: PostId,
        parent: Option<CommentId>,
        text: &str,
    ) -> Result<Option<Comment>, DomainError> {
        let content = text.trim();
        if content.is_empty() {
            tracing::debug!("Ignoring empty comment");
            return Ok(None);
        }

        let new_comment = NewComment {
            post_id,
            content: content.to_string(),
            parent_comment_id: parent,
            user_id: viewer.id,
            author: viewer
                .author_name()
                .unwrap_or_else(|| viewer.display_name())
                .to_string(),
        };
        let comment = self.gateway.insert_comment(&new_comment).await?;

        self.queries.invalidate(QueryKey::Comments(post_id)).await;
        tracing::info!(comment_id = %comment.id, "Comment added");
        Ok(Some(comment))
    }

    /// Flip the collapse flag of `comment`; returns whether it is now
    /// collapsed.
    pub fn toggle(&self, post_id: PostId, comment: CommentId) -> bool {
        self.collapsed.entry(post_id).or_default().toggle(comment)
    }

    pub fn collapse_state(&self, post_id: PostId) -> CollapseState {
        self.collapsed
            .get(&post_id)
            .map(|state| state.value().clone())
            .unwrap_or_default()
    }

    /// Drop what is kept for a deleted post.
    pub fn forget(&self, post_id: PostId) {
        self.collapsed.remove(&post_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use forum_core::domain::{CommentForest, UserId};
    use forum_infra::{InMemoryBackend, InMemoryCache, InMemoryPubSub};
    use uuid::Uuid;

    fn fixture() -> (Arc<InMemoryBackend>, Arc<QueryClient>, CommentService) {
        let backend = Arc::new(InMemoryBackend::new(
            Arc::new(InMemoryPubSub::default()),
            "/auth/callback",
        ));
        let queries = Arc::new(QueryClient::new(Arc::new(InMemoryCache::new()), None));
        let comments = CommentService::new(backend.clone(), queries.clone());
        (backend, queries, comments)
    }

    fn identity() -> Identity {
        Identity {
            id: UserId(Uuid::new_v4()),
            email: Some("grace@example.com".to_string()),
            user_name: None,
            full_name: Some("Grace Hopper".to_string()),
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn unauthenticated_reply_fails_before_any_request() {
        let (backend, _, comments) = fixture();
        let err = comments
            .reply(None, PostId(1), CommentId(1), "hello")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "You must be logged in to reply.");
        assert_eq!(backend.request_count(), 0);
    }

    #[tokio::test]
    async fn empty_reply_is_ignored() {
        let (backend, _, comments) = fixture();
        let user = identity();
        let written = comments
            .reply(Some(&user), PostId(1), CommentId(1), "   \n")
            .await
            .unwrap();
        assert!(written.is_none());
        assert_eq!(backend.request_count(), 0);
    }

    #[tokio::test]
    async fn reply_attaches_to_parent_and_refreshes_thread() {
        let (backend, queries, comments) = fixture();
        let user = identity();
        backend.sign_in_as(user.clone()).await;
        let post = backend.seed_post("Thread", "body", None, Utc::now()).await;
        let root = backend.seed_comment(post.id, None, "alice", "first").await;

        assert_eq!(comments.list(post.id).await.unwrap().len(), 1);
        let mut invalidated = queries.subscribe();

        let reply = comments
            .reply(Some(&user), post.id, root.id, "  agreed  ")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.parent_comment_id, Some(root.id));
        assert_eq!(reply.author, "Grace Hopper");
        assert_eq!(reply.content, "agreed");
        assert_eq!(
            invalidated.recv().await.unwrap(),
            QueryKey::Comments(post.id)
        );

        let forest = CommentForest::build(comments.list(post.id).await.unwrap());
        assert_eq!(forest.reply_count(root.id), 1);
    }

    #[tokio::test]
    async fn top_level_comment_also_refreshes_post_list() {
        let (backend, queries, comments) = fixture();
        let user = identity();
        backend.sign_in_as(user.clone()).await;
        let post = backend.seed_post("Thread", "body", None, Utc::now()).await;
        let mut invalidated = queries.subscribe();

        let comment = comments
            .comment(Some(&user), post.id, "hi")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(comment.parent_comment_id, None);
        assert_eq!(
            invalidated.recv().await.unwrap(),
            QueryKey::Comments(post.id)
        );
        assert_eq!(invalidated.recv().await.unwrap(), QueryKey::Posts);
    }

    #[test]
    fn collapse_state_is_per_post() {
        let (_, _, comments) = fixture();
        assert!(comments.toggle(PostId(1), CommentId(4)));
        assert!(comments.collapse_state(PostId(1)).is_collapsed(CommentId(4)));
        assert!(!comments.collapse_state(PostId(2)).is_collapsed(CommentId(4)));
        assert!(!comments.toggle(PostId(1), CommentId(4)));
        assert!(!comments.collapse_state(PostId(1)).is_collapsed(CommentId(4)));
    }

    #[test]
    fn forget_drops_collapse_state() {
        let (_, _, comments) = fixture();
        comments.toggle(PostId(1), CommentId(4));
        comments.toggle(PostId(2), CommentId(9));

        comments.forget(PostId(1));
        assert!(!comments.collapsed.contains_key(&PostId(1)));
        assert!(comments.collapse_state(PostId(2)).is_collapsed(CommentId(9)));
    }
}
