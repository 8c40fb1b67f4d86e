//! Liveness and metrics endpoints.

use crate::error::AuthError;
use axum::Json;
use prometheus::TextEncoder;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "UP" }))
}

pub async fn info() -> Json<Value> {
    Json(json!({
        "service": "auth-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn metrics() -> Result<String, AuthError> {
    TextEncoder::new()
        .encode_to_string(&prometheus::gather())
        .map_err(|e| AuthError::Internal(e.to_string()))
}
