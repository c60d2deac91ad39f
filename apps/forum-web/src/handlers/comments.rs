//! Comment, reply and collapse routes of the post page.

use actix_web::http::StatusCode;
use actix_web::web;

use forum_core::domain::{CommentId, PostId};
use forum_shared::dto::CommentForm;

use super::posts::{DetailOptions, render_detail};
use super::{message, see_other};
use crate::middleware::auth::OptionalIdentity;
use crate::middleware::error::{PageResult, domain_status};
use crate::state::AppState;

fn parse_ids(post: &str, comment: &str) -> Result<(PostId, CommentId), &'static str> {
    let post_id = PostId::parse(post).ok_or("Invalid post id.")?;
    let comment_id = comment.parse().map_err(|_| "Invalid comment id.")?;
    Ok((post_id, comment_id))
}

fn comment_anchor(post_id: PostId, comment: Option<CommentId>) -> String {
    match comment {
        Some(id) => format!("/post/{post_id}#comment-{id}"),
        None => format!("/post/{post_id}"),
    }
}

/// POST /post/{id}/comments
pub async fn create(
    state: web::Data<AppState>,
    OptionalIdentity(viewer): OptionalIdentity,
    path: web::Path<String>,
    form: web::Form<CommentForm>,
) -> PageResult {
    let Some(post_id) = PostId::parse(&path) else {
        return message(&state, viewer.as_ref(), StatusCode::BAD_REQUEST, "Invalid post id.");
    };

    match state
        .comments
        .comment(viewer.as_ref(), post_id, &form.content)
        .await
    {
        Ok(written) => Ok(see_other(comment_anchor(post_id, written.map(|c| c.id)))),
        Err(e) => {
            let options = DetailOptions {
                error: e.to_string(),
                ..Default::default()
            };
            render_detail(&state, viewer.as_ref(), post_id, options, domain_status(&e)).await
        }
    }
}

/// POST /post/{id}/comments/{cid}/reply
pub async fn reply(
    state: web::Data<AppState>,
    OptionalIdentity(viewer): OptionalIdentity,
    path: web::Path<(String, String)>,
    form: web::Form<CommentForm>,
) -> PageResult {
    let (post_id, parent) = match parse_ids(&path.0, &path.1) {
        Ok(ids) => ids,
        Err(msg) => return message(&state, viewer.as_ref(), StatusCode::BAD_REQUEST, msg),
    };

    match state
        .comments
        .reply(viewer.as_ref(), post_id, parent, &form.content)
        .await
    {
        Ok(written) => Ok(see_other(comment_anchor(
            post_id,
            Some(written.map_or(parent, |c| c.id)),
        ))),
        Err(e) => {
            let options = DetailOptions {
                reply_to: Some(parent),
                error: e.to_string(),
                ..Default::default()
            };
            render_detail(&state, viewer.as_ref(), post_id, options, domain_status(&e)).await
        }
    }
}

/// POST /post/{id}/comments/{cid}/toggle
pub async fn toggle(
    state: web::Data<AppState>,
    OptionalIdentity(viewer): OptionalIdentity,
    path: web::Path<(String, String)>,
) -> PageResult {
    let (post_id, comment) = match parse_ids(&path.0, &path.1) {
        Ok(ids) => ids,
        Err(msg) => return message(&state, viewer.as_ref(), StatusCode::BAD_REQUEST, msg),
    };

    let collapsed = state.comments.toggle(post_id, comment);
    tracing::debug!(%post_id, %comment, collapsed, "Toggled replies");
    Ok(see_other(comment_anchor(post_id, Some(comment))))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use chrono::Utc;

    use crate::handlers::test_support::{body_text, identity, init_app, location};
    use crate::state::testing::TestApp;

    #[actix_web::test]
    async fn signed_in_comment_lands_on_anchor() {
        let app = TestApp::new().await;
        let post = app.backend.seed_post("Talk", "body", None, Utc::now()).await;
        app.sign_in(&identity("alice")).await;
        let svc = init_app!(app);

        let resp = test::call_service(
            &svc,
            test::TestRequest::post()
                .uri(&format!("/post/{}/comments", post.id))
                .set_form([("content", "  first!  ")])
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), format!("/post/{}#comment-1", post.id));

        let html = body_text(
            test::call_service(
                &svc,
                test::TestRequest::get().uri(&format!("/post/{}", post.id)).to_request(),
            )
            .await,
        )
        .await;
        assert!(html.contains("first!"));
        assert!(html.contains("alice"));
        assert!(html.contains("Comments (1)"));
    }

    #[actix_web::test]
    async fn blank_comment_is_ignored() {
        let app = TestApp::new().await;
        let post = app.backend.seed_post("Talk", "body", None, Utc::now()).await;
        app.sign_in(&identity("alice")).await;
        let svc = init_app!(app);
        let before = app.backend.request_count();

        let resp = test::call_service(
            &svc,
            test::TestRequest::post()
                .uri(&format!("/post/{}/comments", post.id))
                .set_form([("content", "   ")])
                .to_request(),
        )
        .await;
        assert_eq!(location(&resp), format!("/post/{}", post.id));
        assert_eq!(app.backend.request_count(), before);
    }

    #[actix_web::test]
    async fn signed_out_reply_shows_login_message() {
        let app = TestApp::new().await;
        let post = app.backend.seed_post("Talk", "body", None, Utc::now()).await;
        let parent = app.backend.seed_comment(post.id, None, "bob", "root").await;
        let svc = init_app!(app);

        let resp = test::call_service(
            &svc,
            test::TestRequest::post()
                .uri(&format!("/post/{}/comments/{}/reply", post.id, parent.id))
                .set_form([("content", "hi")])
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(body_text(resp).await.contains("You must be logged in to reply."));
    }

    #[actix_web::test]
    async fn reply_nests_under_parent_and_collapses() {
        let app = TestApp::new().await;
        let post = app.backend.seed_post("Talk", "body", None, Utc::now()).await;
        let parent = app.backend.seed_comment(post.id, None, "bob", "root").await;
        app.sign_in(&identity("alice")).await;
        let svc = init_app!(app);

        let resp = test::call_service(
            &svc,
            test::TestRequest::post()
                .uri(&format!("/post/{}/comments/{}/reply", post.id, parent.id))
                .set_form([("content", "nested answer")])
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let page = format!("/post/{}", post.id);
        let html = body_text(
            test::call_service(&svc, test::TestRequest::get().uri(&page).to_request()).await,
        )
        .await;
        assert!(html.contains("nested answer"));
        assert!(html.contains("Hide 1 reply"));

        let resp = test::call_service(
            &svc,
            test::TestRequest::post()
                .uri(&format!("/post/{}/comments/{}/toggle", post.id, parent.id))
                .to_request(),
        )
        .await;
        assert_eq!(location(&resp), format!("/post/{}#comment-{}", post.id, parent.id));
        assert!(
            app.state
                .comments
                .collapse_state(post.id)
                .is_collapsed(parent.id)
        );

        let html = body_text(
            test::call_service(&svc, test::TestRequest::get().uri(&page).to_request()).await,
        )
        .await;
        assert!(!html.contains("nested answer"));
        assert!(html.contains("Show 1 reply"));
    }

    #[actix_web::test]
    async fn invalid_comment_id() {
        let app = TestApp::new().await;
        let svc = init_app!(app);

        let resp = test::call_service(
            &svc,
            test::TestRequest::post().uri("/post/1/comments/abc/toggle").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(resp).await.contains("Invalid comment id."));
    }
}
