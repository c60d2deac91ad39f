//! In-memory backend - gateway and auth provider in one process.
//!
//! Used when no hosted backend is configured, and by tests. Writes follow
//! the hosted service's row-level security: a post may be changed only by
//! its owner or, when it has none, by anyone signed in. Rows the caller may
//! not touch are silently left out of the result, exactly like the remote.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use forum_core::domain::{
    Comment, CommentId, Identity, Like, NewComment, NewPost, Post, PostId, PostSummary,
    PostUpdate, Session, UserId,
};
use forum_core::error::GatewayError;
use forum_core::ports::{AUTH_CHANNEL, AuthError, AuthEvent, AuthProvider, ForumGateway, PubSub};

struct StoredPost {
    post: Post,
    avatar_url: Option<String>,
}

#[derive(Default)]
struct Tables {
    posts: Vec<StoredPost>,
    comments: Vec<Comment>,
    likes: Vec<Like>,
    next_post_id: i64,
    next_comment_id: i64,
}

pub struct InMemoryBackend {
    tables: RwLock<Tables>,
    session: RwLock<Option<Session>>,
    pending_code: RwLock<Option<String>>,
    pubsub: Arc<dyn PubSub>,
    callback_url: String,
    local_user: Identity,
    requests: AtomicUsize,
}

fn row_level_security() -> GatewayError {
    GatewayError::Remote {
        status: 401,
        message: "new row violates row-level security policy".to_string(),
    }
}

impl InMemoryBackend {
    /// `callback_url` is where the offline sign-in "redirect" lands.
    pub fn new(pubsub: Arc<dyn PubSub>, callback_url: impl Into<String>) -> Self {
        Self {
            tables: RwLock::new(Tables {
                next_post_id: 1,
                next_comment_id: 1,
                ..Default::default()
            }),
            session: RwLock::new(None),
            pending_code: RwLock::new(None),
            pubsub,
            callback_url: callback_url.into(),
            local_user: Identity {
                id: UserId(Uuid::new_v4()),
                email: None,
                user_name: Some("local-user".to_string()),
                full_name: Some("Local User".to_string()),
                avatar_url: None,
            },
            requests: AtomicUsize::new(0),
        }
    }

    /// Gateway calls served so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn record(&self, operation: &'static str) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(operation, "In-memory gateway call");
    }

    async fn current_user(&self) -> Option<UserId> {
        self.session.read().await.as_ref().map(|s| s.user.id)
    }

    async fn publish(&self, event: &AuthEvent) {
        match serde_json::to_string(event) {
            Ok(payload) => {
                if let Err(e) = self.pubsub.publish(AUTH_CHANNEL, &payload).await {
                    tracing::warn!(error = %e, "Failed to publish auth event");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to encode auth event"),
        }
    }

    /// Sign `user` in directly and announce it, skipping the redirect flow.
    pub async fn sign_in_as(&self, user: Identity) -> Session {
        let session = Session {
            access_token: format!("local-{}", Uuid::new_v4()),
            refresh_token: None,
            expires_at: None,
            user: user.clone(),
        };
        *self.session.write().await = Some(session.clone());
        self.publish(&AuthEvent::SignedIn { user }).await;
        session
    }

    /// Drop the session without announcing it, as when the hosted side
    /// revokes a token the client still holds.
    pub async fn revoke_session(&self) {
        *self.session.write().await = None;
    }

    /// Insert a post as-is, bypassing row-level security.
    pub async fn seed_post(
        &self,
        title: &str,
        content: &str,
        owner: Option<UserId>,
        created_at: chrono::DateTime<Utc>,
    ) -> Post {
        let mut tables = self.tables.write().await;
        let post = Post {
            id: PostId(tables.next_post_id),
            title: title.to_string(),
            content: content.to_string(),
            image_url: None,
            user_id: owner,
            created_at,
        };
        tables.next_post_id += 1;
        tables.posts.push(StoredPost {
            post: post.clone(),
            avatar_url: None,
        });
        post
    }

    /// Insert a comment as-is, bypassing row-level security.
    pub async fn seed_comment(
        &self,
        post_id: PostId,
        parent: Option<CommentId>,
        author: &str,
        content: &str,
    ) -> Comment {
        let mut tables = self.tables.write().await;
        let comment = Comment {
            id: CommentId(tables.next_comment_id),
            post_id,
            parent_comment_id: parent,
            author: author.to_string(),
            user_id: None,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        tables.next_comment_id += 1;
        tables.comments.push(comment.clone());
        comment
    }

    /// Insert a like as-is, bypassing row-level security.
    pub async fn seed_like(&self, post_id: PostId, user_id: UserId) {
        self.tables.write().await.likes.push(Like { post_id, user_id });
    }
}

#[async_trait]
impl ForumGateway for InMemoryBackend {
    async fn posts_with_counts(&self) -> Result<Vec<PostSummary>, GatewayError> {
        self.record("rpc:get_posts_with_counts");
        let tables = self.tables.read().await;

        Ok(tables
            .posts
            .iter()
            .map(|stored| {
                let post = &stored.post;
                let likes = tables.likes.iter().filter(|l| l.post_id == post.id).count();
                let comments = tables
                    .comments
                    .iter()
                    .filter(|c| c.post_id == post.id)
                    .count();
                PostSummary {
                    id: post.id,
                    title: post.title.clone(),
                    content: post.content.clone(),
                    image_url: post.image_url.clone(),
                    avatar_url: stored.avatar_url.clone(),
                    created_at: post.created_at,
                    user_id: post.user_id,
                    like_count: Some(likes as i64),
                    comment_count: Some(comments as i64),
                }
            })
            .collect())
    }

    async fn post(&self, id: PostId) -> Result<Option<Post>, GatewayError> {
        self.record("posts:select");
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .find(|p| p.post.id == id)
            .map(|p| p.post.clone()))
    }

    async fn insert_post(&self, new_post: &NewPost) -> Result<Post, GatewayError> {
        self.record("posts:insert");
        if self.current_user().await != Some(new_post.user_id) {
            return Err(row_level_security());
        }

        let mut tables = self.tables.write().await;
        let post = Post {
            id: PostId(tables.next_post_id),
            title: new_post.title.clone(),
            content: new_post.content.clone(),
            image_url: new_post.image_url.clone(),
            user_id: Some(new_post.user_id),
            created_at: Utc::now(),
        };
        tables.next_post_id += 1;
        tables.posts.push(StoredPost {
            post: post.clone(),
            avatar_url: new_post.avatar_url.clone(),
        });
        Ok(post)
    }

    async fn update_post(
        &self,
        id: PostId,
        update: &PostUpdate,
    ) -> Result<Vec<Post>, GatewayError> {
        self.record("posts:update");
        let Some(user) = self.current_user().await else {
            return Ok(Vec::new());
        };

        let mut tables = self.tables.write().await;
        Ok(tables
            .posts
            .iter_mut()
            .filter(|p| p.post.id == id && p.post.user_id.is_none_or(|owner| owner == user))
            .map(|p| {
                p.post.title = update.title.clone();
                p.post.content = update.content.clone();
                p.post.clone()
            })
            .collect())
    }

    async fn delete_post(&self, id: PostId) -> Result<Vec<Post>, GatewayError> {
        self.record("posts:delete");
        let Some(user) = self.current_user().await else {
            return Ok(Vec::new());
        };

        let mut tables = self.tables.write().await;
        let allowed = |p: &StoredPost| {
            p.post.id == id && p.post.user_id.is_none_or(|owner| owner == user)
        };
        let deleted: Vec<Post> = tables
            .posts
            .iter()
            .filter(|&p| allowed(p))
            .map(|p| p.post.clone())
            .collect();

        if !deleted.is_empty() {
            tables.posts.retain(|p| !allowed(p));
            tables.comments.retain(|c| c.post_id != id);
            tables.likes.retain(|l| l.post_id != id);
        }
        Ok(deleted)
    }

    async fn comments(&self, post_id: PostId) -> Result<Vec<Comment>, GatewayError> {
        self.record("comments:select");
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn insert_comment(&self, new_comment: &NewComment) -> Result<Comment, GatewayError> {
        self.record("comments:insert");
        if self.current_user().await != Some(new_comment.user_id) {
            return Err(row_level_security());
        }

        let mut tables = self.tables.write().await;
        if !tables.posts.iter().any(|p| p.post.id == new_comment.post_id) {
            return Err(GatewayError::Remote {
                status: 409,
                message: "insert or update on table \"comments\" violates foreign key constraint"
                    .to_string(),
            });
        }

        let comment = Comment {
            id: CommentId(tables.next_comment_id),
            post_id: new_comment.post_id,
            parent_comment_id: new_comment.parent_comment_id,
            author: new_comment.author.clone(),
            user_id: Some(new_comment.user_id),
            content: new_comment.content.clone(),
            created_at: Utc::now(),
        };
        tables.next_comment_id += 1;
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn likes(&self, post_id: PostId) -> Result<Vec<Like>, GatewayError> {
        self.record("likes:select");
        let tables = self.tables.read().await;
        Ok(tables
            .likes
            .iter()
            .filter(|l| l.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn insert_like(&self, like: &Like) -> Result<(), GatewayError> {
        self.record("likes:insert");
        if self.current_user().await != Some(like.user_id) {
            return Err(row_level_security());
        }

        let mut tables = self.tables.write().await;
        if tables.likes.contains(like) {
            return Err(GatewayError::Remote {
                status: 409,
                message: "duplicate key value violates unique constraint \"likes_pkey\""
                    .to_string(),
            });
        }
        tables.likes.push(like.clone());
        Ok(())
    }

    async fn delete_like(&self, like: &Like) -> Result<Vec<Like>, GatewayError> {
        self.record("likes:delete");
        if self.current_user().await != Some(like.user_id) {
            return Ok(Vec::new());
        }

        let mut tables = self.tables.write().await;
        let before = tables.likes.len();
        tables.likes.retain(|l| l != like);
        let removed = before - tables.likes.len();
        Ok(vec![like.clone(); removed])
    }
}

#[async_trait]
impl AuthProvider for InMemoryBackend {
    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        let session = self.session.read().await;
        Ok(session.as_ref().filter(|s| !s.is_expired()).cloned())
    }

    async fn authorize_url(&self) -> Result<String, AuthError> {
        let code = Uuid::new_v4().simple().to_string();
        *self.pending_code.write().await = Some(code.clone());
        Ok(format!("{}?code={}", self.callback_url, code))
    }

    async fn exchange_code(&self, code: &str) -> Result<Session, AuthError> {
        let expected = self
            .pending_code
            .write()
            .await
            .take()
            .ok_or(AuthError::MissingVerifier)?;
        if expected != code {
            return Err(AuthError::Rejected("invalid authorization code".to_string()));
        }

        tracing::info!(user = %self.local_user.display_name(), "Signed in locally");
        Ok(self.sign_in_as(self.local_user.clone()).await)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        *self.session.write().await = None;
        self.publish(&AuthEvent::SignedOut).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pubsub::InMemoryPubSub;

    fn backend() -> InMemoryBackend {
        InMemoryBackend::new(Arc::new(InMemoryPubSub::default()), "/auth/callback")
    }

    fn identity(name: &str) -> Identity {
        Identity {
            id: UserId(Uuid::new_v4()),
            email: None,
            user_name: Some(name.to_string()),
            full_name: None,
            avatar_url: None,
        }
    }

    fn edit() -> PostUpdate {
        PostUpdate {
            title: "edited".to_string(),
            content: "new body".to_string(),
        }
    }

    #[tokio::test]
    async fn owner_updates_own_post() {
        let backend = backend();
        let owner = identity("owner");
        let post = backend
            .seed_post("title", "body", Some(owner.id), Utc::now())
            .await;
        backend.sign_in_as(owner).await;

        let rows = backend.update_post(post.id, &edit()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "edited");
    }

    #[tokio::test]
    async fn non_owner_update_affects_zero_rows() {
        let backend = backend();
        let post = backend
            .seed_post("title", "body", Some(identity("owner").id), Utc::now())
            .await;
        backend.sign_in_as(identity("intruder")).await;

        assert!(backend.update_post(post.id, &edit()).await.unwrap().is_empty());
        assert!(backend.delete_post(post.id).await.unwrap().is_empty());
        assert!(backend.post(post.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unowned_post_is_editable_by_anyone_signed_in() {
        let backend = backend();
        let post = backend.seed_post("title", "body", None, Utc::now()).await;

        assert!(backend.update_post(post.id, &edit()).await.unwrap().is_empty());

        backend.sign_in_as(identity("anyone")).await;
        assert_eq!(backend.update_post(post.id, &edit()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_cascades_to_comments_and_likes() {
        let backend = backend();
        let owner = identity("owner");
        let post = backend
            .seed_post("title", "body", Some(owner.id), Utc::now())
            .await;
        backend.seed_comment(post.id, None, "someone", "hi").await;
        backend.seed_like(post.id, owner.id).await;
        backend.sign_in_as(owner).await;

        assert_eq!(backend.delete_post(post.id).await.unwrap().len(), 1);
        assert!(backend.comments(post.id).await.unwrap().is_empty());
        assert!(backend.likes(post.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn aggregate_counts_likes_and_comments() {
        let backend = backend();
        let post = backend.seed_post("title", "body", None, Utc::now()).await;
        backend.seed_comment(post.id, None, "a", "one").await;
        backend.seed_comment(post.id, None, "b", "two").await;
        backend.seed_like(post.id, identity("fan").id).await;

        let summaries = backend.posts_with_counts().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].likes(), 1);
        assert_eq!(summaries[0].comments(), 2);
    }

    #[tokio::test]
    async fn writes_require_matching_session() {
        let backend = backend();
        let post = backend.seed_post("title", "body", None, Utc::now()).await;
        let stranger = identity("stranger");

        let like = Like {
            post_id: post.id,
            user_id: stranger.id,
        };
        assert!(backend.insert_like(&like).await.is_err());

        backend.sign_in_as(stranger).await;
        backend.insert_like(&like).await.unwrap();
        assert!(backend.insert_like(&like).await.is_err());
        assert_eq!(backend.delete_like(&like).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn offline_oauth_round_trip() {
        let backend = backend();
        let url = backend.authorize_url().await.unwrap();
        let code = url.split("code=").nth(1).unwrap().to_string();
        assert!(url.starts_with("/auth/callback?code="));

        assert!(matches!(
            backend.exchange_code("wrong").await,
            Err(AuthError::Rejected(_))
        ));
        assert!(matches!(
            backend.exchange_code(&code).await,
            Err(AuthError::MissingVerifier)
        ));

        let url = backend.authorize_url().await.unwrap();
        let code = url.split("code=").nth(1).unwrap().to_string();
        let session = backend.exchange_code(&code).await.unwrap();
        assert_eq!(session.user.user_name.as_deref(), Some("local-user"));
        assert!(backend.get_session().await.unwrap().is_some());

        backend.sign_out().await.unwrap();
        assert!(backend.get_session().await.unwrap().is_none());
    }
}
