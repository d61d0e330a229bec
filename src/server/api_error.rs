use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::journal::JournalError;
use crate::user::UserError;
use crate::verification::VerificationError;

/// Error body returned by every handler: `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    fn internal(err: anyhow::Error) -> Self {
        error!("Internal error: {:#}", err);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Invalid(_) | UserError::Duplicate(_) | UserError::PasswordReused => {
                Self::bad_request(err.to_string())
            }
            UserError::NotFound => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            UserError::InvalidCredentials | UserError::InvalidToken => {
                Self::new(StatusCode::UNAUTHORIZED, err.to_string())
            }
            UserError::Store(err) => Self::internal(err),
        }
    }
}

impl From<VerificationError> for ApiError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::NotFound => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            VerificationError::AlreadyActive
            | VerificationError::Malformed
            | VerificationError::NoMatch => Self::bad_request(err.to_string()),
            VerificationError::Store(err) => Self::internal(err),
        }
    }
}

impl From<JournalError> for ApiError {
    fn from(err: JournalError) -> Self {
        match err {
            JournalError::Invalid(_) | JournalError::Duplicate(_) => {
                Self::bad_request(err.to_string())
            }
            JournalError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            JournalError::Store(err) => Self::internal(err),
        }
    }
}
