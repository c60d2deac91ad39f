//! Application services - the operations the pages trigger.
//!
//! Reads go through the shared [`QueryClient`](forum_infra::QueryClient);
//! every successful write invalidates the query keys it affects.

pub mod comments;
pub mod likes;
pub mod posts;
pub mod session;
pub mod settings;

pub use comments::CommentService;
pub use likes::LikeService;
pub use posts::{PostDraft, PostService};
pub use session::SessionStore;
pub use settings::UiSettingsStore;
