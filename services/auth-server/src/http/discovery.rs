//! Key publication and discovery endpoints.

use super::AppState;
use axum::extract::State;
use axum::Json;
use identity_common::KeySet;
use serde_json::{json, Value};
use std::sync::Arc;

pub async fn jwks(State(state): State<Arc<AppState>>) -> Json<KeySet> {
    Json(state.keystore.key_set())
}

pub async fn openid_configuration(State(state): State<Arc<AppState>>) -> Json<Value> {
    let issuer = state.config.issuer_uri_str();
    Json(json!({
        "issuer": issuer,
        "jwks_uri": format!("{issuer}/.well-known/jwks.json"),
        "token_endpoint": format!("{issuer}/api/auth/login"),
        "id_token_signing_alg_values_supported": ["RS256"],
    }))
}
