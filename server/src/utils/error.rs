use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::services::accounts::AccountError;
use crate::services::credentials::TokenError;
use crate::services::registration::RegistrationError;
use crate::store::StoreError;
use crate::utils::response::{error_list, error_message, FieldError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error")]
    ValidationError(Vec<FieldError>),

    /// Account workflow failure. Reported as 400 with an `errors` list.
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// Missing or invalid bearer token on an admin route.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Business-rule violation with its own client-facing code.
    #[error("Conflict ({code}): {message}")]
    Conflict { code: &'static str, message: String },

    #[error("Store error")]
    StoreError(#[from] StoreError),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn validation(param: impl Into<String>, msg: impl Into<String>) -> Self {
        AppError::ValidationError(vec![FieldError::new(param, msg)])
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::BAD_REQUEST,
            AppError::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ExternalServiceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict { code, .. } => *code,
            AppError::StoreError(_) => "DATABASE_ERROR",
            AppError::ExternalServiceError(_) => "EXTERNAL_SERVICE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::ValidationError(errors) => {
                warn!(count = errors.len(), "Request failed validation");
            }
            AppError::AuthError(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict { message: msg, .. } => {
                warn!(code = self.code(), message = %msg, "Request rejected");
            }
            AppError::ExternalServiceError(msg) | AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::StoreError(e) => {
                error!(error = ?e, "Store error");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        self.log();

        match self {
            AppError::ValidationError(errors) => error_list(errors, status),
            AppError::AuthError(msg) => error_list(vec![FieldError::message(msg)], status),
            AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict { message: msg, .. } => error_message(code, msg, status),
            // Only a generic message leaves the process
            AppError::StoreError(_) => error_message(code, "A database error occurred", status),
            AppError::ExternalServiceError(_) | AppError::InternalServerError(_) => {
                error_message(code, "Internal server error", status)
            }
        }
    }
}

impl From<RegistrationError> for AppError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::NotFound => AppError::NotFound("Event not found".to_string()),
            RegistrationError::Inactive => AppError::Conflict {
                code: "EVENT_INACTIVE",
                message: "Event is currently inactive".to_string(),
            },
            RegistrationError::AlreadyRegistered => AppError::Conflict {
                code: "ALREADY_REGISTERED",
                message: "You are already registered for this event".to_string(),
            },
            RegistrationError::EventFull => AppError::Conflict {
                code: "EVENT_FULL",
                message: "Event is full".to_string(),
            },
            RegistrationError::Store(e) => AppError::StoreError(e),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Store(e) => AppError::StoreError(e),
            AccountError::Credentials(e) => AppError::InternalServerError(e.to_string()),
            other => AppError::AuthError(other.to_string()),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        AppError::Unauthorized(err.to_string())
    }
}
