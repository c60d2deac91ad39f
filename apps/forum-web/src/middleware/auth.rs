//! Identity extractors.

use actix_web::{FromRequest, HttpRequest, HttpResponse, dev::Payload, http::StatusCode, http::header, web};
use std::fmt;
use std::future::{Ready, ready};

use forum_core::domain::Identity;

use crate::state::AppState;

pub const SIGN_IN_PATH: &str = "/auth/signin";

fn current_identity(req: &HttpRequest) -> Option<Identity> {
    match req.app_data::<web::Data<AppState>>() {
        Some(state) => state.session.current(),
        None => {
            tracing::error!("AppState not found in app data");
            None
        }
    }
}

/// Signed-in user extractor.
///
/// Signed-out requests are redirected to the sign-in route:
/// ```ignore
/// async fn create(user: CurrentUser) -> impl Responder {
///     format!("Hello, {}!", user.0.display_name())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

/// Rejection of [`CurrentUser`]: a redirect to sign in.
#[derive(Debug)]
pub struct SignInRequired;

impl fmt::Display for SignInRequired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sign in required")
    }
}

impl actix_web::ResponseError for SignInRequired {
    fn status_code(&self) -> StatusCode {
        StatusCode::SEE_OTHER
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::SeeOther()
            .insert_header((header::LOCATION, SIGN_IN_PATH))
            .finish()
    }
}

impl FromRequest for CurrentUser {
    type Error = SignInRequired;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(current_identity(req).map(CurrentUser).ok_or(SignInRequired))
    }
}

/// Optional identity extractor - doesn't fail if not authenticated.
pub struct OptionalIdentity(pub Option<Identity>);

impl FromRequest for OptionalIdentity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(OptionalIdentity(current_identity(req))))
    }
}
