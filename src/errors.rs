use std::time::Duration;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Serialize;
use std::error::Error as StdError;
use thiserror::Error;

use crate::logging::SecurityEvent;
use crate::models::ModelValidationError;

/// Application-wide error type; every handler and store operation reports
/// failures through it.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("authentication required")]
    Unauthenticated,

    #[error("authorization header is malformed")]
    InvalidAuthHeader,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("resource not found")]
    NotFound,

    #[error("forbidden: you do not have access to this resource")]
    Forbidden,

    #[error("resource conflict: {0}")]
    Conflict(String),

    #[error("database error")]
    Database(#[source] DieselError),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("failed to encode authentication token: {0}")]
    TokenEncoding(String),

    #[error("failed to hash password: {0}")]
    PasswordHashing(String),

    #[error("rate limit exceeded; please try again later")]
    RateLimitExceeded { retry_after: Option<Duration> },

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    pub fn from_diesel(error: DieselError) -> Self {
        match error {
            DieselError::NotFound => AppError::NotFound,
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                let constraint = info.constraint_name().unwrap_or("unique constraint");
                AppError::Conflict(format!("duplicate value violates {constraint}"))
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                AppError::Conflict("foreign key constraint violation".to_string())
            }
            DieselError::DatabaseError(DatabaseErrorKind::NotNullViolation, _) => {
                AppError::Conflict("required reference is missing".to_string())
            }
            other => AppError::Database(other),
        }
    }

    pub(crate) fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated
            | AppError::InvalidAuthHeader
            | AppError::InvalidToken
            | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,

            AppError::Pool(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_)
            | AppError::TokenEncoding(_)
            | AppError::PasswordHashing(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Release builds only expose client errors.
    fn should_expose_details(&self) -> bool {
        cfg!(debug_assertions) || self.status_code().is_client_error()
    }

    fn user_message(&self) -> String {
        if self.should_expose_details() {
            return self.to_string();
        }

        match self {
            AppError::Database(_) => "a database error occurred".to_string(),
            AppError::Pool(_) => "service temporarily unavailable".to_string(),
            AppError::TokenEncoding(_) => "authentication error".to_string(),
            AppError::PasswordHashing(_) => "password processing error".to_string(),
            _ => "internal server error".to_string(),
        }
    }

    fn error_details(&self) -> Option<String> {
        if !self.should_expose_details() {
            return None;
        }

        match self {
            AppError::Database(err) => Some(format!("database: {err}")),
            _ => None,
        }
    }

    fn log_error(&self) {
        match self.status_code() {
            code if code.is_client_error() => match self {
                AppError::InvalidToken | AppError::InvalidAuthHeader | AppError::Unauthenticated => {
                    crate::log_security_event!(
                        SecurityEvent::UnauthorizedAccess,
                        error = %self,
                        status_code = %code,
                        "Unauthorized access attempt"
                    );
                }
                AppError::Forbidden => {
                    crate::log_security_event!(
                        SecurityEvent::ForbiddenAccess,
                        error = %self,
                        status_code = %code,
                        "Forbidden access attempt"
                    );
                }
                _ => {
                    tracing::warn!(error = %self, status_code = %code, "Client error");
                }
            },
            code if code.is_server_error() => {
                tracing::error!(
                    error = %self,
                    status_code = %code,
                    source = ?self.source(),
                    "Server error"
                );
            }
            _ => {}
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log_error();

        let status = self.status_code();
        let retry_after = match &self {
            AppError::RateLimitExceeded {
                retry_after: Some(wait),
            } => Some(wait.as_secs().max(1)),
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: self.user_message(),
            details: self.error_details(),
        });

        let mut response = (status, body).into_response();
        if let Some(seconds) = retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}

impl From<DieselError> for AppError {
    fn from(error: DieselError) -> Self {
        AppError::from_diesel(error)
    }
}

impl From<ModelValidationError> for AppError {
    fn from(error: ModelValidationError) -> Self {
        AppError::Validation(error.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        AppError::TokenEncoding(error.to_string())
    }
}

impl From<argon2::password_hash::Error> for AppError {
    fn from(error: argon2::password_hash::Error) -> Self {
        AppError::PasswordHashing(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Validation("bad".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::Unauthenticated.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Pool("exhausted".to_string()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_diesel_not_found_maps_to_not_found() {
        let error = AppError::from_diesel(DieselError::NotFound);
        assert!(matches!(error, AppError::NotFound));
    }

    #[test]
    fn test_client_errors_keep_their_message() {
        let error = AppError::Validation("field 'email' is required".to_string());
        assert!(error.should_expose_details());
        assert!(error.user_message().contains("field 'email' is required"));
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn test_internal_errors_hidden_in_production() {
        let error = AppError::Internal("sensitive internal detail".to_string());
        assert!(!error.should_expose_details());
        assert!(!error.user_message().contains("sensitive internal detail"));
    }

    #[test]
    fn test_rate_limit_sets_retry_after() {
        let response = AppError::RateLimitExceeded {
            retry_after: Some(Duration::from_millis(200)),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "1");
    }
}
