//! Post list, single post and the owner-only mutations.

use std::sync::Arc;

use forum_core::domain::{
    Identity, NewPost, Post, PostId, PostSummary, PostUpdate, SortOrder, can_modify,
    filter_and_sort,
};
use forum_core::error::{DomainError, GatewayError};
use forum_core::ports::{ForumGateway, QueryKey};
use forum_infra::QueryClient;

/// A post to create, as entered in the form.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
}

pub struct PostService {
    gateway: Arc<dyn ForumGateway>,
    queries: Arc<QueryClient>,
}

impl PostService {
    pub fn new(gateway: Arc<dyn ForumGateway>, queries: Arc<QueryClient>) -> Self {
        Self { gateway, queries }
    }

    /// All posts with counts, filtered by title and ordered.
    pub async fn list(&self, term: &str, order: SortOrder) -> Result<Vec<PostSummary>, GatewayError> {
        let posts = self
            .queries
            .fetch(QueryKey::Posts, || self.gateway.posts_with_counts())
            .await?;
        Ok(filter_and_sort(posts, term, order))
    }

    pub async fn get(&self, id: PostId) -> Result<Option<Post>, GatewayError> {
        self.queries
            .fetch(QueryKey::Post(id), || self.gateway.post(id))
            .await
    }

    #[tracing::instrument(skip(self, author, draft), fields(user = %author.id))]
    pub async fn create(&self, author: &Identity, draft: PostDraft) -> Result<Post, DomainError> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(DomainError::Validation("Title is required.".to_string()));
        }
        if draft.content.trim().is_empty() {
            return Err(DomainError::Validation("Content is required.".to_string()));
        }

        let new_post = NewPost {
            title: title.to_string(),
            content: draft.content,
            image_url: draft
                .image_url
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            avatar_url: author.avatar_url.clone(),
            user_id: author.id,
        };
        let post = self.gateway.insert_post(&new_post).await?;

        self.queries.invalidate(QueryKey::Posts).await;
        tracing::info!(post_id = %post.id, "Post created");
        Ok(post)
    }

    /// Refuse before any write when `viewer` cannot own the post.
    async fn ensure_owner(&self, viewer: Option<&Identity>, id: PostId) -> Result<(), DomainError> {
        let post = self.get(id).await?.ok_or(DomainError::NotFoundOrForbidden)?;
        if can_modify(viewer, post.user_id) {
            Ok(())
        } else {
            tracing::warn!(post_id = %id, "Refusing change to a post the viewer does not own");
            Err(DomainError::NotFoundOrForbidden)
        }
    }

    #[tracing::instrument(skip(self, viewer, update))]
    pub async fn update(
        &self,
        viewer: Option<&Identity>,
        id: PostId,
        update: PostUpdate,
    ) -> Result<Post, DomainError> {
        self.ensure_owner(viewer, id).await?;
        if update.title.trim().is_empty() {
            return Err(DomainError::Validation("Title is required.".to_string()));
        }
        if update.content.trim().is_empty() {
            return Err(DomainError::Validation("Content is required.".to_string()));
        }

        let rows = self.gateway.update_post(id, &update).await?;
        let Some(post) = rows.into_iter().next() else {
            tracing::warn!(post_id = %id, "Update affected no rows");
            return Err(DomainError::NotFoundOrForbidden);
        };

        self.queries
            .invalidate_many(&[QueryKey::Post(id), QueryKey::Posts])
            .await;
        tracing::info!(post_id = %id, "Post updated");
        Ok(post)
    }

    #[tracing::instrument(skip(self, viewer))]
    pub async fn delete(&self, viewer: Option<&Identity>, id: PostId) -> Result<(), DomainError> {
        self.ensure_owner(viewer, id).await?;

        let rows = self.gateway.delete_post(id).await?;
        if rows.is_empty() {
            tracing::warn!(post_id = %id, "Delete affected no rows");
            return Err(DomainError::NotFoundOrForbidden);
        }

        self.queries.invalidate(QueryKey::Posts).await;
        self.queries
            .forget(&[QueryKey::Post(id), QueryKey::Comments(id), QueryKey::Likes(id)])
            .await;
        tracing::info!(post_id = %id, "Post deleted");
        Ok(())
    }
}
