use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Identity, PostId, UserId};

/// A row of the `posts` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Owner. Posts without one are editable by anyone signed in.
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// A row returned by the `get_posts_with_counts` aggregate query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: PostId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub like_count: Option<i64>,
    #[serde(default)]
    pub comment_count: Option<i64>,
}

impl PostSummary {
    pub fn likes(&self) -> i64 {
        self.like_count.unwrap_or(0)
    }

    pub fn comments(&self) -> i64 {
        self.comment_count.unwrap_or(0)
    }
}

/// Insert payload for a new post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub user_id: UserId,
}

/// Patch payload for editing a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostUpdate {
    pub title: String,
    pub content: String,
}

/// A row of the `likes` relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    pub post_id: PostId,
    pub user_id: UserId,
}

/// Whether `viewer` may edit or delete a post owned by `owner`.
///
/// Signed-out viewers never may. Unowned posts are open to every signed-in
/// viewer.
pub fn can_modify(viewer: Option<&Identity>, owner: Option<UserId>) -> bool {
    match (viewer, owner) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(viewer), Some(owner)) => viewer.id == owner,
    }
}

/// First `limit` characters of `content`, with `...` when cut.
pub fn content_preview(content: &str, limit: usize) -> String {
    match content.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}
