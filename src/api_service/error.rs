/**
 * API Service Error Types
 *
 * Tagged error kinds raised by the service layer. The transport layer maps
 * each tag to an HTTP status exhaustively; see api_server.
 */
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::SecurityError;

/// Main error type for vault engine operations
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ApiError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Single opaque message: an unauthenticated caller must not learn
    /// whether the token was missing, expired, revoked, or malformed.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Payload too large: {message}")]
    PayloadTooLarge { message: String },

    #[error("Too many requests")]
    RateLimited { retry_after_secs: u64 },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ApiError {
    /// Get error code for clients
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::Forbidden { .. } => "FORBIDDEN",
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::Conflict { .. } => "CONFLICT",
            ApiError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            ApiError::RateLimited { .. } => "RATE_LIMITED",
            ApiError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

/// Result type alias for service operations
pub type ApiResult<T> = Result<T, ApiError>;

impl From<SecurityError> for ApiError {
    fn from(err: SecurityError) -> Self {
        match err {
            SecurityError::NonCanonicalBase64 | SecurityError::Base64Error(_) => {
                ApiError::Validation {
                    message: "Invalid base64 payload".to_string(),
                }
            }
            SecurityError::InvalidCursor => ApiError::Validation {
                message: "Invalid cursor".to_string(),
            },
            SecurityError::TokenRejected => ApiError::Unauthorized,
            other => ApiError::Internal {
                message: other.to_string(),
            },
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {}", err);
        ApiError::Internal {
            message: "Database error".to_string(),
        }
    }
}
