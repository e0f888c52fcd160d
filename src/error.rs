//! Error types for the circulation server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable numeric error codes returned in error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NotFound = 4,
    BadValue = 5,
    PreconditionFailed = 6,
    ReservationExpired = 7,
    DataInconsistency = 8,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    /// Missing or malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// A state or business rule forbids the operation
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Pickup attempted after the reservation window closed; the reservation
    /// has been cancelled as part of the failed attempt
    #[error("Reservation expired: {0}")]
    ReservationExpired(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Stored records contradict each other (e.g. a borrowing pointing at a
    /// copy that no longer exists)
    #[error("Data inconsistency: {0}")]
    Consistency(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Build a consistency error, logging it where it is detected
    pub fn consistency(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(target: "circulation::consistency", "{}", message);
        AppError::Consistency(message)
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Authentication(_) | AppError::Authorization(_) => ErrorCode::NotAuthorized,
            AppError::Validation(_) => ErrorCode::BadValue,
            AppError::PreconditionFailed(_) => ErrorCode::PreconditionFailed,
            AppError::ReservationExpired(_) => ErrorCode::ReservationExpired,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Consistency(_) => ErrorCode::DataInconsistency,
            AppError::Database(_) => ErrorCode::DbFailure,
            AppError::Internal(_) => ErrorCode::Failure,
        }
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            AppError::Authentication(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Authorization(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::PreconditionFailed(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::ReservationExpired(msg) => (StatusCode::GONE, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Consistency(msg) => {
                tracing::error!("Data inconsistency: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Data inconsistency detected".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
