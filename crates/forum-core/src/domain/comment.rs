//! Threaded comments.
//!
//! Comments arrive from the backend as a flat list. [`CommentForest::build`]
//! groups them by parent once; [`CommentForest::rows`] then walks the forest
//! depth-first with an explicit stack, so arbitrarily deep threads never
//! grow the call stack.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CommentId, PostId, UserId};

/// A row of the `comments` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    #[serde(default)]
    pub parent_comment_id: Option<CommentId>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a comment or reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
    pub post_id: PostId,
    pub content: String,
    pub parent_comment_id: Option<CommentId>,
    pub user_id: UserId,
    pub author: String,
}

/// The comments of one post arranged by parent reference.
#[derive(Debug, Clone, Default)]
pub struct CommentForest {
    comments: Vec<Comment>,
    roots: Vec<usize>,
    children: HashMap<CommentId, Vec<usize>>,
}

/// One visible line of a flattened forest.
#[derive(Debug, Clone, Copy)]
pub struct CommentRow<'a> {
    pub comment: &'a Comment,
    pub depth: usize,
    /// Number of direct replies, whether shown or not.
    pub reply_count: usize,
    pub collapsed: bool,
}

impl CommentForest {
    /// Group `comments` by parent. Siblings keep the order they were given
    /// in. A comment whose parent is not in the set becomes a root.
    pub fn build(comments: Vec<Comment>) -> Self {
        let known: HashSet<CommentId> = comments.iter().map(|c| c.id).collect();
        let mut roots = Vec::new();
        let mut children: HashMap<CommentId, Vec<usize>> = HashMap::new();

        for (idx, comment) in comments.iter().enumerate() {
            match comment.parent_comment_id {
                Some(parent) if parent != comment.id && known.contains(&parent) => {
                    children.entry(parent).or_default().push(idx);
                }
                Some(parent) => {
                    tracing::debug!(
                        comment_id = %comment.id,
                        parent_id = %parent,
                        "Parent comment missing; treating reply as top level"
                    );
                    roots.push(idx);
                }
                None => roots.push(idx),
            }
        }

        Self {
            comments,
            roots,
            children,
        }
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    pub fn get(&self, id: CommentId) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }

    /// Top-level comments in fetch order.
    pub fn roots(&self) -> impl Iterator<Item = &Comment> {
        self.roots.iter().map(|&idx| &self.comments[idx])
    }

    /// Direct replies to `id` in fetch order.
    pub fn replies(&self, id: CommentId) -> impl Iterator<Item = &Comment> {
        self.children
            .get(&id)
            .into_iter()
            .flatten()
            .map(|&idx| &self.comments[idx])
    }

    pub fn reply_count(&self, id: CommentId) -> usize {
        self.children.get(&id).map_or(0, Vec::len)
    }

    /// Depth-first rows, skipping the descendants of collapsed comments.
    pub fn rows(&self, collapsed: &CollapseState) -> Vec<CommentRow<'_>> {
        let mut rows = Vec::with_capacity(self.comments.len());
        let mut visited = HashSet::new();
        let mut stack: Vec<(usize, usize)> = self.roots.iter().rev().map(|&idx| (idx, 0)).collect();

        while let Some((idx, depth)) = stack.pop() {
            let comment = &self.comments[idx];
            if !visited.insert(comment.id) {
                continue;
            }

            let is_collapsed = collapsed.is_collapsed(comment.id);
            rows.push(CommentRow {
                comment,
                depth,
                reply_count: self.reply_count(comment.id),
                collapsed: is_collapsed,
            });

            if is_collapsed {
                continue;
            }
            if let Some(kids) = self.children.get(&comment.id) {
                stack.extend(kids.iter().rev().map(|&kid| (kid, depth + 1)));
            }
        }

        rows
    }
}

/// Which comments currently hide their replies.
///
/// Flags are independent per comment: collapsing a parent leaves the flags
/// of its descendants untouched, so they reappear as they were.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollapseState {
    collapsed: HashSet<CommentId>,
}

impl CollapseState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_collapsed(&self, id: CommentId) -> bool {
        self.collapsed.contains(&id)
    }

    /// Flip the flag for `id`; returns the new collapsed value.
    pub fn toggle(&mut self, id: CommentId) -> bool {
        if self.collapsed.remove(&id) {
            false
        } else {
            self.collapsed.insert(id);
            true
        }
    }
}
