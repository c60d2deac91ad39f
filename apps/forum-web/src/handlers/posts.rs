//! Post list, detail, create, edit and delete pages.

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, web};

use forum_core::domain::{
    CommentForest, CommentId, Identity, PostId, PostUpdate, SortOrder, can_modify,
};
use forum_core::error::NOT_FOUND_OR_FORBIDDEN;
use forum_shared::dto::{DeleteForm, DetailQuery, ListQuery, PostForm};

use super::{current_path, layout, message, see_other};
use crate::middleware::auth::{CurrentUser, OptionalIdentity};
use crate::middleware::error::{PageResult, domain_status};
use crate::services::PostDraft;
use crate::state::AppState;
use crate::views::{
    self, CommentView, CreatePage, DeletePage, IndexPage, LikeView, PostCard, PostPage, PostView,
    SortOption,
};

const INVALID_POST_ID: &str = "Invalid post id.";
const POST_NOT_FOUND: &str = "Post not found.";

/// GET /
pub async fn index(
    state: web::Data<AppState>,
    OptionalIdentity(viewer): OptionalIdentity,
    query: web::Query<ListQuery>,
    req: HttpRequest,
) -> PageResult {
    let order = match query.sort.as_deref() {
        Some(raw) => raw.parse::<SortOrder>().unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Falling back to newest first");
            SortOrder::default()
        }),
        None => SortOrder::default(),
    };

    let settings = state.settings.current();
    let (cards, error) = match state.posts.list(&query.q, order).await {
        Ok(posts) => (
            posts.iter().map(|p| PostCard::new(p, settings)).collect(),
            String::new(),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load posts");
            (Vec::new(), e.to_string())
        }
    };

    views::render(
        StatusCode::OK,
        &IndexPage {
            layout: layout(&state, viewer.as_ref(), "Posts", current_path(&req)),
            query: query.q.clone(),
            sorts: SortOption::all(order),
            error,
            cards,
        },
    )
}

/// What the detail page shows besides the post itself.
#[derive(Default)]
pub(super) struct DetailOptions {
    pub editing: bool,
    pub reply_to: Option<CommentId>,
    pub error: String,
    /// Edit form contents to show instead of the stored post.
    pub draft: Option<PostUpdate>,
}

/// Render the detail page of `id`, or the matching message when the post
/// cannot be shown.
pub(super) async fn render_detail(
    state: &AppState,
    viewer: Option<&Identity>,
    id: PostId,
    options: DetailOptions,
    status: StatusCode,
) -> PageResult {
    let post = match state.posts.get(id).await {
        Ok(Some(post)) => post,
        Ok(None) => return message(state, viewer, StatusCode::NOT_FOUND, POST_NOT_FOUND),
        Err(e) => {
            return message(state, viewer, StatusCode::BAD_GATEWAY, format!("Error: {e}"));
        }
    };

    let can_modify = can_modify(viewer, post.user_id);
    let likes = state.likes.list(id).await.unwrap_or_else(|e| {
        tracing::warn!(post_id = %id, error = %e, "Failed to load likes");
        Vec::new()
    });

    let reply_to = options.reply_to.filter(|_| viewer.is_some());
    let (comments, comment_total, comments_error) = match state.comments.list(id).await {
        Ok(comments) => {
            let forest = CommentForest::build(comments);
            let collapsed = state.comments.collapse_state(id);
            (
                CommentView::rows(&forest, &collapsed, reply_to),
                forest.len(),
                String::new(),
            )
        }
        Err(e) => {
            tracing::warn!(post_id = %id, error = %e, "Failed to load comments");
            (Vec::new(), 0, e.to_string())
        }
    };

    let (edit_title, edit_content) = match options.draft {
        Some(draft) => (draft.title, draft.content),
        None => (post.title.clone(), post.content.clone()),
    };

    views::render(
        status,
        &PostPage {
            layout: layout(state, viewer, post.title.clone(), format!("/post/{id}")),
            post: PostView::from(&post),
            can_modify,
            editing: options.editing && can_modify,
            edit_title,
            edit_content,
            error: options.error,
            like: LikeView::new(&likes, viewer),
            comments,
            comment_total,
            comments_error,
        },
    )
}

/// GET /post/{id}
pub async fn detail(
    state: web::Data<AppState>,
    OptionalIdentity(viewer): OptionalIdentity,
    path: web::Path<String>,
    query: web::Query<DetailQuery>,
) -> PageResult {
    let Some(id) = PostId::parse(&path) else {
        return message(&state, viewer.as_ref(), StatusCode::BAD_REQUEST, INVALID_POST_ID);
    };

    let options = DetailOptions {
        editing: query.editing(),
        reply_to: query.reply.as_deref().and_then(|r| r.parse().ok()),
        ..Default::default()
    };
    render_detail(&state, viewer.as_ref(), id, options, StatusCode::OK).await
}

/// POST /post/{id}/edit
pub async fn update(
    state: web::Data<AppState>,
    OptionalIdentity(viewer): OptionalIdentity,
    path: web::Path<String>,
    form: web::Form<PostForm>,
) -> PageResult {
    let Some(id) = PostId::parse(&path) else {
        return message(&state, viewer.as_ref(), StatusCode::BAD_REQUEST, INVALID_POST_ID);
    };

    let form = form.into_inner();
    let update = PostUpdate {
        title: form.title.trim().to_string(),
        content: form.content,
    };

    match state.posts.update(viewer.as_ref(), id, update.clone()).await {
        Ok(_) => Ok(see_other(format!("/post/{id}"))),
        Err(e) => {
            let options = DetailOptions {
                editing: true,
                error: format!("Error updating post: {e}"),
                draft: Some(update),
                ..Default::default()
            };
            render_detail(&state, viewer.as_ref(), id, options, domain_status(&e)).await
        }
    }
}

async fn delete_page(
    state: &AppState,
    viewer: Option<&Identity>,
    id: PostId,
    error: String,
    status: StatusCode,
) -> PageResult {
    let post = match state.posts.get(id).await {
        Ok(Some(post)) => post,
        Ok(None) => return message(state, viewer, StatusCode::NOT_FOUND, POST_NOT_FOUND),
        Err(e) => {
            return message(state, viewer, StatusCode::BAD_GATEWAY, format!("Error: {e}"));
        }
    };
    if !can_modify(viewer, post.user_id) {
        let text = if error.is_empty() {
            NOT_FOUND_OR_FORBIDDEN.to_string()
        } else {
            error
        };
        return message(state, viewer, StatusCode::NOT_FOUND, text);
    }

    views::render(
        status,
        &DeletePage {
            layout: layout(state, viewer, "Delete post", format!("/post/{id}/delete")),
            post_id: id.0,
            title: post.title,
            error,
        },
    )
}

/// GET /post/{id}/delete
pub async fn confirm_delete(
    state: web::Data<AppState>,
    OptionalIdentity(viewer): OptionalIdentity,
    path: web::Path<String>,
) -> PageResult {
    let Some(id) = PostId::parse(&path) else {
        return message(&state, viewer.as_ref(), StatusCode::BAD_REQUEST, INVALID_POST_ID);
    };
    delete_page(&state, viewer.as_ref(), id, String::new(), StatusCode::OK).await
}

/// POST /post/{id}/delete
pub async fn delete(
    state: web::Data<AppState>,
    OptionalIdentity(viewer): OptionalIdentity,
    path: web::Path<String>,
    form: web::Form<DeleteForm>,
) -> PageResult {
    let Some(id) = PostId::parse(&path) else {
        return message(&state, viewer.as_ref(), StatusCode::BAD_REQUEST, INVALID_POST_ID);
    };
    if !form.confirmed() {
        return Ok(see_other(format!("/post/{id}")));
    }

    match state.posts.delete(viewer.as_ref(), id).await {
        Ok(()) => {
            state.comments.forget(id);
            Ok(see_other("/"))
        }
        Err(e) => {
            let error = format!("Error deleting post: {e}");
            delete_page(&state, viewer.as_ref(), id, error, domain_status(&e)).await
        }
    }
}

/// GET /create
pub async fn new_post(state: web::Data<AppState>, CurrentUser(user): CurrentUser) -> PageResult {
    views::render(
        StatusCode::OK,
        &CreatePage {
            layout: layout(&state, Some(&user), "New post", "/create"),
            error: String::new(),
            title: String::new(),
            content: String::new(),
            image_url: String::new(),
        },
    )
}

/// POST /create
pub async fn create(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    form: web::Form<PostForm>,
) -> PageResult {
    let form = form.into_inner();
    let draft = PostDraft {
        title: form.title.clone(),
        content: form.content.clone(),
        image_url: form.image_url.clone(),
    };

    match state.posts.create(&user, draft).await {
        Ok(post) => Ok(see_other(format!("/post/{}", post.id))),
        Err(e) => views::render(
            domain_status(&e),
            &CreatePage {
                layout: layout(&state, Some(&user), "New post", "/create"),
                error: e.to_string(),
                title: form.title,
                content: form.content,
                image_url: form.image_url.unwrap_or_default(),
            },
        ),
    }
}
