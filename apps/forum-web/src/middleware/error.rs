//! Error handling - RFC 7807 JSON for `/api`, a small HTML page elsewhere.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use askama::Template;
use forum_core::error::{DomainError, GatewayError};
use forum_shared::ErrorResponse;
use std::fmt;

/// Application-level error type that converts to RFC 7807 responses.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    /// The hosted backend failed or refused.
    Upstream(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "{}", msg),
            AppError::BadRequest(msg) => write!(f, "{}", msg),
            AppError::Unauthorized(msg) => write!(f, "{}", msg),
            AppError::Upstream(msg) => write!(f, "Error: {}", msg),
            AppError::Internal(_) => write!(f, "Something went wrong."),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            AppError::NotFound(detail) => ErrorResponse::not_found(detail),
            AppError::BadRequest(detail) => ErrorResponse::bad_request(detail),
            AppError::Unauthorized(detail) => ErrorResponse::unauthorized(detail),
            AppError::Upstream(detail) => ErrorResponse::bad_gateway(detail),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                ErrorResponse::internal_error()
            }
        };

        HttpResponse::build(self.status_code()).json(error)
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFoundOrForbidden => AppError::NotFound(err.to_string()),
            DomainError::Unauthenticated(msg) => AppError::Unauthorized(msg.to_string()),
            DomainError::InvalidId | DomainError::Validation(_) => {
                AppError::BadRequest(err.to_string())
            }
            DomainError::Gateway(e) => e.into(),
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError::Upstream(err.to_string())
    }
}

impl From<askama::Error> for AppError {
    fn from(err: askama::Error) -> Self {
        AppError::Internal(format!("template rendering failed: {err}"))
    }
}

/// Status for a failed user action shown inline on a page.
pub fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::NotFoundOrForbidden => StatusCode::NOT_FOUND,
        DomainError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        DomainError::InvalidId => StatusCode::BAD_REQUEST,
        DomainError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::Gateway(_) => StatusCode::BAD_GATEWAY,
    }
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorPage<'a> {
    status: u16,
    reason: &'a str,
    message: String,
}

/// The same errors rendered as HTML, for page routes.
#[derive(Debug)]
pub struct PageError(pub AppError);

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl ResponseError for PageError {
    fn status_code(&self) -> StatusCode {
        self.0.status_code()
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if let AppError::Internal(detail) = &self.0 {
            tracing::error!("Internal error: {}", detail);
        }

        let page = ErrorPage {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Error"),
            message: self.0.to_string(),
        };
        match page.render() {
            Ok(html) => HttpResponse::build(status)
                .content_type("text/html; charset=utf-8")
                .body(html),
            Err(e) => {
                tracing::error!(error = %e, "Failed to render error page");
                HttpResponse::build(status).body(self.0.to_string())
            }
        }
    }
}

impl From<AppError> for PageError {
    fn from(err: AppError) -> Self {
        PageError(err)
    }
}

impl From<DomainError> for PageError {
    fn from(err: DomainError) -> Self {
        PageError(err.into())
    }
}

impl From<GatewayError> for PageError {
    fn from(err: GatewayError) -> Self {
        PageError(err.into())
    }
}

impl From<askama::Error> for PageError {
    fn from(err: askama::Error) -> Self {
        PageError(err.into())
    }
}

/// Result type alias for JSON handlers.
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for page handlers.
pub type PageResult = Result<HttpResponse, PageError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn zero_rows_map_to_not_found() {
        let err = AppError::from(DomainError::NotFoundOrForbidden);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            err.to_string(),
            "Post not found or you do not have permission."
        );
    }

    #[test]
    fn gateway_errors_are_upstream_failures() {
        let err = AppError::from(DomainError::Gateway(GatewayError::Remote {
            status: 500,
            message: "boom".to_string(),
        }));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "Error: boom");
    }

    #[actix_web::test]
    async fn json_body_is_problem_details() {
        let response = AppError::BadRequest("Invalid post id.".to_string()).error_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["title"], "Bad Request");
        assert_eq!(json["detail"], "Invalid post id.");
    }

    #[actix_web::test]
    async fn page_error_escapes_message() {
        let response = PageError(AppError::NotFound("<b>gone</b>".to_string())).error_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body()).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("&lt;b&gt;gone"));
        assert!(!html.contains("<b>"));
    }
}
