//! Domain entities and the client-side rules that operate on them.

mod comment;
mod identity;
mod ids;
mod listing;
mod post;
mod settings;

pub use comment::{CollapseState, Comment, CommentForest, CommentRow, NewComment};
pub use identity::{Identity, Session};
pub use ids::{CommentId, PostId, UserId};
pub use listing::{SortOrder, filter_and_sort};
pub use post::{Like, NewPost, Post, PostSummary, PostUpdate, can_modify, content_preview};
pub use settings::{SettingsPatch, Theme, UiSettings};
