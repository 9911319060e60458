/// Error types for match-service
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input ({code}): {message}")]
    InvalidInput { code: &'static str, message: String },

    #[error("Collaborator call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MatchError {
    pub fn invalid(code: &'static str, message: impl Into<String>) -> Self {
        MatchError::InvalidInput {
            code,
            message: message.into(),
        }
    }

    /// Machine-readable code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            MatchError::InvalidInput { code, .. } => code,
            MatchError::Unauthorized => "UNAUTHORIZED",
            MatchError::Timeout(_) => "TIMEOUT",
            MatchError::Database(_)
            | MatchError::Redis(_)
            | MatchError::Config(_)
            | MatchError::Internal(_) => "SERVER_ERROR",
        }
    }
}

impl ResponseError for MatchError {
    fn status_code(&self) -> StatusCode {
        match self {
            MatchError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            MatchError::Unauthorized => StatusCode::UNAUTHORIZED,
            MatchError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            MatchError::Database(e) => tracing::error!("Database error: {:?}", e),
            MatchError::Redis(e) => tracing::error!("Redis error: {:?}", e),
            MatchError::Config(e) | MatchError::Internal(e) => tracing::error!("{}", e),
            MatchError::Timeout(d) => tracing::warn!(timeout = ?d, "Collaborator deadline exceeded"),
            MatchError::InvalidInput { .. } | MatchError::Unauthorized => {}
        }

        HttpResponse::build(self.status_code()).json(serde_json::json!({ "code": self.code() }))
    }
}

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, MatchError>;
