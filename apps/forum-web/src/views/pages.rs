use askama::Template;

use forum_core::domain::{
    CollapseState, CommentForest, CommentId, Identity, Like, Post, PostSummary, SortOrder,
    UiSettings, content_preview,
};

use super::{Layout, timestamp};

/// Characters of post content shown on a card.
const PREVIEW_CHARS: usize = 160;
/// Deepest indentation level drawn; deeper replies line up with it.
const MAX_INDENT: usize = 12;

pub struct SortOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

impl SortOption {
    pub fn all(current: SortOrder) -> Vec<Self> {
        SortOrder::ALL
            .into_iter()
            .map(|order| SortOption {
                value: order.as_str(),
                label: order.label(),
                selected: order == current,
            })
            .collect()
    }
}

pub struct PostCard {
    pub id: i64,
    pub title: String,
    pub preview: String,
    pub show_preview: bool,
    pub image_url: String,
    pub show_image: bool,
    pub avatar_url: String,
    pub has_avatar: bool,
    pub upvotes: String,
    pub likes: i64,
    pub comments: i64,
    pub created: String,
}

impl PostCard {
    pub fn new(post: &PostSummary, settings: UiSettings) -> Self {
        let image_url = post.image_url.clone().unwrap_or_default();
        let avatar_url = post.avatar_url.clone().unwrap_or_default();
        let upvotes = match post.like_count {
            Some(1) => "1 upvote".to_string(),
            Some(n) => format!("{n} upvotes"),
            None => String::new(),
        };
        Self {
            id: post.id.0,
            title: post.title.clone(),
            preview: content_preview(&post.content, PREVIEW_CHARS),
            show_preview: settings.show_content && !post.content.is_empty(),
            show_image: settings.show_image && !image_url.is_empty(),
            image_url,
            has_avatar: !avatar_url.is_empty(),
            avatar_url,
            upvotes,
            likes: post.likes(),
            comments: post.comments(),
            created: timestamp(&post.created_at),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage {
    pub layout: Layout,
    pub query: String,
    pub sorts: Vec<SortOption>,
    pub error: String,
    pub cards: Vec<PostCard>,
}

pub struct PostView {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub image_url: String,
    pub has_image: bool,
    pub created: String,
}

impl From<&Post> for PostView {
    fn from(post: &Post) -> Self {
        let image_url = post.image_url.clone().unwrap_or_default();
        Self {
            id: post.id.0,
            title: post.title.clone(),
            content: post.content.clone(),
            has_image: !image_url.is_empty(),
            image_url,
            created: timestamp(&post.created_at),
        }
    }
}

pub struct LikeView {
    pub count: usize,
    pub liked: bool,
    pub label: String,
}

impl LikeView {
    pub fn new(likes: &[Like], viewer: Option<&Identity>) -> Self {
        let count = likes.len();
        Self {
            count,
            liked: viewer.is_some_and(|v| likes.iter().any(|l| l.user_id == v.id)),
            label: if count == 1 {
                "1 like".to_string()
            } else {
                format!("{count} likes")
            },
        }
    }
}

pub struct CommentView {
    pub id: i64,
    pub author: String,
    pub created: String,
    pub content: String,
    pub indent: usize,
    pub replies: usize,
    pub has_replies: bool,
    pub collapsed: bool,
    pub toggle_label: String,
    /// The inline reply composer is open on this comment.
    pub replying: bool,
}

impl CommentView {
    /// Visible rows of `forest`, depth-first.
    pub fn rows(
        forest: &CommentForest,
        collapsed: &CollapseState,
        reply_to: Option<CommentId>,
    ) -> Vec<Self> {
        forest
            .rows(collapsed)
            .into_iter()
            .map(|row| {
                let noun = if row.reply_count == 1 { "reply" } else { "replies" };
                Self {
                    id: row.comment.id.0,
                    author: if row.comment.author.is_empty() {
                        "Anonymous".to_string()
                    } else {
                        row.comment.author.clone()
                    },
                    created: timestamp(&row.comment.created_at),
                    content: row.comment.content.clone(),
                    indent: row.depth.min(MAX_INDENT) * 2,
                    replies: row.reply_count,
                    has_replies: row.reply_count > 0,
                    collapsed: row.collapsed,
                    toggle_label: if row.collapsed {
                        format!("Show {} {}", row.reply_count, noun)
                    } else {
                        format!("Hide {} {}", row.reply_count, noun)
                    },
                    replying: reply_to == Some(row.comment.id),
                }
            })
            .collect()
    }
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostPage {
    pub layout: Layout,
    pub post: PostView,
    pub can_modify: bool,
    pub editing: bool,
    pub edit_title: String,
    pub edit_content: String,
    pub error: String,
    pub like: LikeView,
    pub comments: Vec<CommentView>,
    pub comment_total: usize,
    pub comments_error: String,
}

#[derive(Template)]
#[template(path = "delete.html")]
pub struct DeletePage {
    pub layout: Layout,
    pub post_id: i64,
    pub title: String,
    pub error: String,
}

#[derive(Template)]
#[template(path = "create.html")]
pub struct CreatePage {
    pub layout: Layout,
    pub error: String,
    pub title: String,
    pub content: String,
    pub image_url: String,
}

/// A page that only states a message, e.g. "Post not found.".
#[derive(Template)]
#[template(path = "message.html")]
pub struct MessagePage {
    pub layout: Layout,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use forum_core::domain::{Comment, PostId, UserId};
    use uuid::Uuid;

    fn summary(content: &str, likes: Option<i64>) -> PostSummary {
        PostSummary {
            id: PostId(1),
            title: "Hello".to_string(),
            content: content.to_string(),
            image_url: Some("https://img.example.com/a.png".to_string()),
            avatar_url: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            user_id: None,
            like_count: likes,
            comment_count: None,
        }
    }

    #[test]
    fn card_truncates_and_labels_upvotes() {
        let long = "x".repeat(200);
        let card = PostCard::new(&summary(&long, Some(3)), UiSettings::default());
        assert_eq!(card.preview.chars().count(), PREVIEW_CHARS + 3);
        assert!(card.preview.ends_with("..."));
        assert_eq!(card.upvotes, "3 upvotes");
        assert_eq!(card.comments, 0);

        let card = PostCard::new(&summary("short", Some(1)), UiSettings::default());
        assert_eq!(card.upvotes, "1 upvote");
        let card = PostCard::new(&summary("short", None), UiSettings::default());
        assert_eq!(card.upvotes, "");
    }

    #[test]
    fn card_respects_visibility_settings() {
        let settings = UiSettings {
            show_content: false,
            show_image: false,
            ..Default::default()
        };
        let card = PostCard::new(&summary("body", None), settings);
        assert!(!card.show_preview);
        assert!(!card.show_image);
    }

    #[test]
    fn like_view_knows_viewer_like() {
        let viewer = Identity {
            id: UserId(Uuid::new_v4()),
            email: None,
            user_name: None,
            full_name: None,
            avatar_url: None,
        };
        let likes = vec![Like {
            post_id: PostId(1),
            user_id: viewer.id,
        }];
        let view = LikeView::new(&likes, Some(&viewer));
        assert!(view.liked);
        assert_eq!(view.label, "1 like");
        assert!(!LikeView::new(&likes, None).liked);
    }

    #[test]
    fn comment_rows_mark_reply_target_and_collapse() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let comment = |id: i64, parent: Option<i64>| Comment {
            id: CommentId(id),
            post_id: PostId(1),
            parent_comment_id: parent.map(CommentId),
            author: String::new(),
            user_id: None,
            content: format!("c{id}"),
            created_at: at,
        };
        let forest = CommentForest::build(vec![comment(1, None), comment(2, Some(1))]);

        let mut collapsed = CollapseState::new();
        let rows = CommentView::rows(&forest, &collapsed, Some(CommentId(2)));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].toggle_label, "Hide 1 reply");
        assert_eq!(rows[0].author, "Anonymous");
        assert_eq!(rows[1].indent, 2);
        assert!(rows[1].replying);

        collapsed.toggle(CommentId(1));
        let rows = CommentView::rows(&forest, &collapsed, None);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].toggle_label, "Show 1 reply");
    }
}
