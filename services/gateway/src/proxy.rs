//! Upstream forwarding.
//!
//! Every request that is not served locally is forwarded to the single
//! configured upstream, preserving method, path, query, and body. By the
//! time a request reaches here the gate has already stripped and, for
//! protected paths, re-asserted the identity headers.

use crate::error::{ErrorResponse, GatewayError};
use crate::http::AppState;
use crate::metrics::UPSTREAM_REQUESTS;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use tracing::{debug, warn};

/// Largest request body the proxy buffers before forwarding.
const MAX_FORWARD_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Connection-scoped headers, dropped in both directions.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

/// Fallback handler: forwards the request to the configured upstream.
pub async fn forward(State(state): State<Arc<AppState>>, request: Request<Body>) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    match forward_inner(&state, request).await {
        Ok(response) => {
            UPSTREAM_REQUESTS.with_label_values(&["success"]).inc();
            debug!(%method, path = %path, status = %response.status(), "forwarded upstream");
            response
        }
        Err(e) => {
            UPSTREAM_REQUESTS.with_label_values(&["failure"]).inc();
            warn!(%method, path = %path, error = %e, "upstream forward failed");
            e.into_response()
        }
    }
}

async fn forward_inner(
    state: &AppState,
    request: Request<Body>,
) -> Result<Response, GatewayError> {
    let (parts, body) = request.into_parts();

    let mut url = state.config.upstream_url.clone();
    url.set_path(parts.uri.path());
    url.set_query(parts.uri.query());

    let body = match axum::body::to_bytes(body, MAX_FORWARD_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return Ok(payload_too_large()),
    };

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);

    let upstream = state
        .http_client
        .request(parts.method, url)
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(|e| GatewayError::UpstreamUnavailable {
            reason: e.to_string(),
        })?;

    let status = upstream.status();
    let mut response_headers = upstream.headers().clone();
    strip_hop_by_hop(&mut response_headers);

    let bytes = upstream
        .bytes()
        .await
        .map_err(|e| GatewayError::UpstreamUnavailable {
            reason: format!("reading upstream response: {e}"),
        })?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    Ok(response)
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
}

fn payload_too_large() -> Response {
    let body = ErrorResponse::from_parts(
        "PAYLOAD_TOO_LARGE",
        "Request body exceeds the forwarding limit",
        StatusCode::PAYLOAD_TOO_LARGE,
    );
    (StatusCode::PAYLOAD_TOO_LARGE, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_hop_by_hop_headers_are_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert("connection", HeaderValue::from_static("keep-alive"));
        headers.insert("host", HeaderValue::from_static("gateway.internal"));
        headers.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        headers.insert("x-user-id", HeaderValue::from_static("user-1"));
        headers.insert("accept", HeaderValue::from_static("application/json"));

        strip_hop_by_hop(&mut headers);

        assert!(headers.get("connection").is_none());
        assert!(headers.get("host").is_none());
        assert!(headers.get("transfer-encoding").is_none());
        assert_eq!(headers.get("x-user-id").unwrap(), "user-1");
        assert_eq!(headers.get("accept").unwrap(), "application/json");
    }
}
