//! Edge gate middleware.
//!
//! Runs in front of every route. Inbound identity headers are stripped
//! unconditionally, public paths included, so the only way an `X-User-*`
//! header reaches the upstream is this gate writing it from a validated
//! token.

mod paths;

pub use paths::PathMatcher;

use crate::error::GatewayError;
use crate::http::AppState;
use crate::jwt::VerifiedIdentity;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::warn;

/// Asserted principal id.
pub static USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");
/// Asserted authority list, comma-joined.
pub static USER_AUTHORITIES_HEADER: HeaderName = HeaderName::from_static("x-user-authorities");
/// Asserted contact email.
pub static USER_EMAIL_HEADER: HeaderName = HeaderName::from_static("x-user-email");
/// Asserted display username.
pub static USER_NAME_HEADER: HeaderName = HeaderName::from_static("x-user-name");

/// Gate middleware: strip, classify, validate, assert.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    strip_identity_headers(request.headers_mut());

    if state.matcher.is_public(request.uri().path()) {
        return next.run(request).await;
    }

    let Some(token) = bearer_token(request.headers()) else {
        return GatewayError::MissingToken.into_response();
    };

    match state.validator.validate(&token).await {
        Ok(identity) => {
            insert_identity_headers(request.headers_mut(), &identity);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Drops caller-supplied identity headers.
fn strip_identity_headers(headers: &mut HeaderMap) {
    for name in [
        &USER_ID_HEADER,
        &USER_AUTHORITIES_HEADER,
        &USER_EMAIL_HEADER,
        &USER_NAME_HEADER,
    ] {
        headers.remove(name);
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Writes the validated identity for the upstream to consume.
fn insert_identity_headers(headers: &mut HeaderMap, identity: &VerifiedIdentity) {
    insert_header(headers, &USER_ID_HEADER, &identity.subject);
    insert_header(
        headers,
        &USER_AUTHORITIES_HEADER,
        &identity.authorities.join(","),
    );
    if let Some(email) = &identity.email {
        insert_header(headers, &USER_EMAIL_HEADER, email);
    }
    if let Some(username) = &identity.username {
        insert_header(headers, &USER_NAME_HEADER, username);
    }
}

fn insert_header(headers: &mut HeaderMap, name: &HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => warn!(header = %name, "claim value is not a legal header value, skipping"),
    }
}
