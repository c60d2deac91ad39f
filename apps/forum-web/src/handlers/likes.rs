use actix_web::http::StatusCode;
use actix_web::web;

use forum_core::domain::PostId;

use super::posts::{DetailOptions, render_detail};
use super::{message, see_other};
use crate::middleware::auth::CurrentUser;
use crate::middleware::error::{PageResult, domain_status};
use crate::state::AppState;

/// POST /post/{id}/like
pub async fn toggle(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<String>,
) -> PageResult {
    let Some(post_id) = PostId::parse(&path) else {
        return message(&state, Some(&user), StatusCode::BAD_REQUEST, "Invalid post id.");
    };

    match state.likes.toggle(&user, post_id).await {
        Ok(liked) => {
            tracing::debug!(%post_id, liked, "Like toggled");
            Ok(see_other(format!("/post/{post_id}")))
        }
        Err(e) => {
            let options = DetailOptions {
                error: e.to_string(),
                ..Default::default()
            };
            render_detail(&state, Some(&user), post_id, options, domain_status(&e)).await
        }
    }
}
