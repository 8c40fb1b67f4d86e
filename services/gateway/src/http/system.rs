//! Liveness and metrics endpoints, served by the gateway itself.

use super::AppState;
use crate::error::GatewayError;
use axum::extract::State;
use axum::Json;
use prometheus::TextEncoder;
use serde_json::{json, Value};
use std::sync::Arc;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "UP" }))
}

pub async fn info(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "service": "gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "cached_keys": state.cache.key_count(),
    }))
}

pub async fn metrics() -> Result<String, GatewayError> {
    TextEncoder::new()
        .encode_to_string(&prometheus::gather())
        .map_err(|e| GatewayError::Internal(e.to_string()))
}
