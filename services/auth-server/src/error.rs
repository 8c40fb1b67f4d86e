//! Service error type and its HTTP mapping.
//!
//! Client-visible messages are sanitized: store and signing internals stay in
//! the logs, never in a response body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use identity_common::StoreError;
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the issuance service.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AuthError {
    /// Unknown user or wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The presented refresh token failed validation.
    #[error("Invalid refresh token: {0}")]
    InvalidRefreshToken(String),

    /// The presented refresh token was already rotated or revoked.
    #[error("Refresh token revoked")]
    RefreshTokenRevoked,

    /// Signing or key handling failure.
    #[error("Signing error: {0}")]
    SigningError(String),

    /// Revocation store failure.
    #[error("Store error: {0}")]
    StoreError(String),

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-readable code for the response body.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::InvalidRefreshToken(_) => "INVALID_REFRESH_TOKEN",
            AuthError::RefreshTokenRevoked => "TOKEN_REVOKED",
            AuthError::SigningError(_) | AuthError::Internal(_) => "INTERNAL_ERROR",
            AuthError::StoreError(_) => "STORE_UNAVAILABLE",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::InvalidRefreshToken(_)
            | AuthError::RefreshTokenRevoked => StatusCode::UNAUTHORIZED,
            AuthError::StoreError(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::SigningError(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn client_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials => "Invalid username or password".to_string(),
            AuthError::InvalidRefreshToken(reason) => {
                format!("Refresh token rejected: {reason}")
            }
            AuthError::RefreshTokenRevoked => "Refresh token has been revoked".to_string(),
            AuthError::StoreError(_) => "Revocation store unavailable".to_string(),
            AuthError::SigningError(_) | AuthError::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

/// Structured error body returned to clients.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Stable machine-readable code.
    pub error: String,
    /// Human-readable, sanitized message.
    pub message: String,
    /// HTTP status, duplicated in the body.
    pub status: u16,
    /// RFC 3339 UTC timestamp.
    pub timestamp: String,
}

impl ErrorResponse {
    /// Builds the body for an error.
    #[must_use]
    pub fn from_error(error: &AuthError) -> Self {
        ErrorResponse {
            error: error.code().to_string(),
            message: error.client_message(),
            status: error.status().as_u16(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::from_error(&self);
        (self.status(), Json(body)).into_response()
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::StoreError(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AuthError::SigningError(err.to_string())
    }
}
