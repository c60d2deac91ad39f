//! Domain-level error types.

use thiserror::Error;

/// Message shown when a write touched no rows. Row-level security makes a
/// forbidden write indistinguishable from a missing row, so both share it.
pub const NOT_FOUND_OR_FORBIDDEN: &str = "Post not found or you do not have permission.";

/// Domain errors - failures of a user-triggered operation.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Post not found or you do not have permission.")]
    NotFoundOrForbidden,

    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("Invalid post id.")]
    InvalidId,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Remote gateway errors.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("{message}")]
    Remote { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_row_message_matches_constant() {
        assert_eq!(
            DomainError::NotFoundOrForbidden.to_string(),
            NOT_FOUND_OR_FORBIDDEN
        );
    }

    #[test]
    fn remote_error_displays_backend_message() {
        let err = DomainError::from(GatewayError::Remote {
            status: 401,
            message: "JWT expired".to_string(),
        });
        assert_eq!(err.to_string(), "JWT expired");
    }
}
