use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::email_sender::EmailSendError;

/// Errors raised while managing addresses or confirming them.
///
/// Duplicate addresses and unknown or expired keys are not errors; those
/// operations return `Ok(None)` instead.
#[derive(Debug, Error)]
pub enum ConfirmationError {
    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Owner not found")]
    OwnerNotFound,

    #[error("Email address not found")]
    AddressNotFound,

    #[error("backend error: {0}")]
    Backend(String),

    #[error("email delivery error: {0}")]
    EmailSend(#[from] EmailSendError),

    #[error("template error: {0}")]
    Template(String),
}

impl ConfirmationError {
    pub(crate) fn from_backend<E: std::error::Error>(error: E) -> Self {
        Self::Backend(error.to_string())
    }
}

/// JSON error body returned by the HTTP surface.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
}

impl IntoResponse for ConfirmationError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ConfirmationError::InvalidEmail => (StatusCode::BAD_REQUEST, self.to_string()),
            ConfirmationError::OwnerNotFound | ConfirmationError::AddressNotFound => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ConfirmationError::Backend(ref msg) => {
                tracing::error!("Backend error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ConfirmationError::EmailSend(ref e) => {
                tracing::error!(error = ?e, "Email delivery error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ConfirmationError::Template(ref msg) => {
                tracing::error!("Template error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_errors_hide_details_from_clients() {
        let response =
            ConfirmationError::Backend("connection refused".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn unknown_address_is_not_found() {
        let response = ConfirmationError::AddressNotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_email_is_a_client_error() {
        let response = ConfirmationError::InvalidEmail.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
