//! Command errors and their RFC 7807 rendering.

use std::fmt;
use std::process::ExitCode;

use posts_core::PostError;
use posts_shared::ErrorResponse;

/// Application-level error type that converts to problem details.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Forbidden(String),
    Conflict(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    pub fn status(&self) -> u16 {
        match self {
            AppError::BadRequest(_) => 400,
            AppError::Forbidden(_) => 403,
            AppError::NotFound(_) => 404,
            AppError::Conflict(_) => 409,
            AppError::Internal(_) => 500,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        match self {
            AppError::NotFound(detail) => ErrorResponse::not_found(detail),
            AppError::BadRequest(detail) => ErrorResponse::bad_request(detail),
            AppError::Forbidden(detail) => ErrorResponse::forbidden(detail),
            AppError::Conflict(detail) => ErrorResponse::conflict(detail),
            AppError::Internal(detail) => ErrorResponse::internal_error(detail),
        }
    }

    /// Process exit status: 1 for internal failures, 2 for everything the
    /// caller can fix.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            AppError::Internal(_) => ExitCode::FAILURE,
            _ => ExitCode::from(2),
        }
    }
}

// Conversion from store errors
impl From<PostError> for AppError {
    fn from(err: PostError) -> Self {
        match err {
            PostError::Unauthorized(reason) => AppError::Forbidden(reason),
            PostError::Locked(id) => {
                AppError::Conflict(format!("Post {} is being edited, try again later", id))
            }
            PostError::Storage { context, source } => {
                tracing::error!(error = %source, "{}", context);
                AppError::Internal(context.to_string())
            }
        }
    }
}

/// Result type alias for command handlers.
pub type AppResult<T> = Result<T, AppError>;
