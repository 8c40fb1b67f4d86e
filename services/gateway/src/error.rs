//! Gateway error type and its HTTP mapping.
//!
//! Every rejection reason carries a stable machine-readable code so clients
//! and dashboards can tell a revoked token from a bad signature. Internal
//! detail (upstream URLs, store errors) stays in the logs; response bodies
//! only carry sanitized messages.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the edge gateway.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GatewayError {
    /// No bearer token on a protected path.
    #[error("Missing bearer token")]
    MissingToken,

    /// The token could not be parsed, or its header is unusable.
    #[error("Malformed token: {reason}")]
    Malformed {
        /// Parse-level detail, log only.
        reason: String,
    },

    /// Signature verification failed, or the signing key is unknown.
    #[error("Invalid token signature")]
    InvalidSignature,

    /// The `iss` claim does not match the configured issuer.
    #[error("Issuer mismatch")]
    IssuerMismatch,

    /// The `aud` claim does not contain the expected audience.
    #[error("Audience mismatch")]
    AudienceMismatch,

    /// The token expired.
    #[error("Token expired at {expired_at}")]
    Expired {
        /// When the token stopped being valid.
        expired_at: chrono::DateTime<chrono::Utc>,
    },

    /// The token id is present in the revocation store.
    #[error("Token revoked")]
    Revoked,

    /// No published key set is available and a refresh failed.
    #[error("Key set unavailable: {reason}")]
    KeySetUnavailable {
        /// Fetch-level detail, log only.
        reason: String,
    },

    /// The revocation store did not answer in time. Validation fails closed.
    #[error("Revocation store unavailable: {reason}")]
    RevocationUnavailable {
        /// Store-level detail, log only.
        reason: String,
    },

    /// The proxied upstream could not be reached.
    #[error("Upstream unavailable: {reason}")]
    UpstreamUnavailable {
        /// Connection-level detail, log only.
        reason: String,
    },

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Stable machine-readable code for the response body.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::MissingToken => "TOKEN_MISSING",
            GatewayError::Malformed { .. } => "TOKEN_MALFORMED",
            GatewayError::InvalidSignature => "SIGNATURE_INVALID",
            GatewayError::IssuerMismatch => "ISSUER_MISMATCH",
            GatewayError::AudienceMismatch => "AUDIENCE_MISMATCH",
            GatewayError::Expired { .. } => "TOKEN_EXPIRED",
            GatewayError::Revoked => "TOKEN_REVOKED",
            GatewayError::KeySetUnavailable { .. } => "KEYSET_UNAVAILABLE",
            GatewayError::RevocationUnavailable { .. } => "DOWNSTREAM_UNAVAILABLE",
            GatewayError::UpstreamUnavailable { .. } => "SERVICE_UNAVAILABLE",
            GatewayError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            GatewayError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn client_message(&self) -> &'static str {
        match self {
            GatewayError::MissingToken => "Missing or invalid Authorization header",
            GatewayError::Malformed { .. } => "Token is malformed",
            GatewayError::InvalidSignature => "Token signature verification failed",
            GatewayError::IssuerMismatch => "Token issuer is not trusted",
            GatewayError::AudienceMismatch => "Token audience is not accepted",
            GatewayError::Expired { .. } => "Token has expired",
            GatewayError::Revoked => "Token has been revoked",
            GatewayError::KeySetUnavailable { .. } => "Token validation keys are unavailable",
            GatewayError::RevocationUnavailable { .. } => "Token validation is unavailable",
            GatewayError::UpstreamUnavailable { .. } => "Service temporarily unavailable",
            GatewayError::Internal(_) => "Internal server error",
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
    pub fn from_error(error: &GatewayError) -> Self {
        ErrorResponse {
            error: error.code().to_string(),
            message: error.client_message().to_string(),
            status: error.status().as_u16(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Builds a body from raw parts, for surfaces with fixed wording.
    #[must_use]
    pub fn from_parts(code: &str, message: &str, status: StatusCode) -> Self {
        ErrorResponse {
            error: code.to_string(),
            message: message.to_string(),
            status: status.as_u16(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::from_error(&self);
        (self.status(), Json(body)).into_response()
    }
}
