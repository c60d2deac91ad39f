//! OAuth sign-in and sign-out routes.

use actix_web::http::StatusCode;
use actix_web::web;

use forum_shared::dto::CallbackQuery;

use super::{message, see_other};
use crate::middleware::auth::OptionalIdentity;
use crate::middleware::error::PageResult;
use crate::state::AppState;

/// GET /auth/signin - redirect to the provider.
pub async fn sign_in(
    state: web::Data<AppState>,
    OptionalIdentity(viewer): OptionalIdentity,
) -> PageResult {
    match state.session.sign_in_url().await {
        Ok(url) => Ok(see_other(url)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to start sign-in");
            message(
                &state,
                viewer.as_ref(),
                StatusCode::BAD_GATEWAY,
                format!("Sign-in failed: {e}"),
            )
        }
    }
}

/// GET /auth/callback - the provider redirects here with `code`.
pub async fn callback(
    state: web::Data<AppState>,
    OptionalIdentity(viewer): OptionalIdentity,
    query: web::Query<CallbackQuery>,
) -> PageResult {
    let query = query.into_inner();
    if let Some(error) = query.error {
        let detail = query.error_description.unwrap_or(error);
        tracing::warn!(%detail, "Provider refused sign-in");
        return message(
            &state,
            viewer.as_ref(),
            StatusCode::UNAUTHORIZED,
            format!("Sign-in failed: {detail}"),
        );
    }
    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return message(
            &state,
            viewer.as_ref(),
            StatusCode::BAD_REQUEST,
            "Sign-in failed: missing authorization code.",
        );
    };

    match state.session.complete_sign_in(&code).await {
        Ok(user) => {
            tracing::info!(user = %user.display_name(), "Signed in");
            Ok(see_other("/"))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Code exchange failed");
            message(
                &state,
                viewer.as_ref(),
                StatusCode::UNAUTHORIZED,
                format!("Sign-in failed: {e}"),
            )
        }
    }
}

/// POST /auth/signout
pub async fn sign_out(
    state: web::Data<AppState>,
    OptionalIdentity(viewer): OptionalIdentity,
) -> PageResult {
    match state.session.sign_out().await {
        Ok(()) => Ok(see_other("/")),
        Err(e) => {
            tracing::error!(error = %e, "Sign-out failed");
            message(
                &state,
                viewer.as_ref(),
                StatusCode::BAD_GATEWAY,
                format!("Sign-out failed: {e}"),
            )
        }
    }
}
