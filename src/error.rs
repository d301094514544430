use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Database operation '{operation}' failed: {cause}")]
    Database { operation: &'static str, cause: String },

    #[error("Database connection failed: {cause}")]
    ConnectionFailed { cause: String },

    #[error("{error}: {details}")]
    SignupFailed { error: String, details: String },

    #[error("{error}: {details}")]
    ProfileFailed { error: String, details: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        ApiError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest { .. } | ApiError::SignupFailed { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::ConnectionFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Database { .. } | ApiError::ProfileFailed { .. } | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// JSON error body. Signup errors carry `success: false`, the rest only `error`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("{}", self);
        } else {
            warn!("{}", self);
        }

        let body = match self {
            ApiError::NotFound { resource, .. } => ErrorResponse {
                success: None,
                error: format!("{} not found", resource),
                details: None,
            },
            ApiError::InvalidRequest { message } => ErrorResponse {
                success: None,
                error: message,
                details: None,
            },
            ApiError::Database { operation, cause } => ErrorResponse {
                success: None,
                error: format!("Failed to {}", operation),
                details: Some(cause),
            },
            ApiError::ConnectionFailed { cause } => ErrorResponse {
                success: None,
                error: "Database unavailable".to_string(),
                details: Some(cause),
            },
            ApiError::SignupFailed { error, details }
            | ApiError::ProfileFailed { error, details } => ErrorResponse {
                success: Some(false),
                error,
                details: Some(details),
            },
            ApiError::Internal(msg) => ErrorResponse {
                success: None,
                error: msg,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<deadpool_postgres::PoolError> for ApiError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        ApiError::ConnectionFailed {
            cause: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::invalid(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::invalid(rejection.body_text())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
