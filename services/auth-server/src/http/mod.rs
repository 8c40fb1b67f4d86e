//! HTTP surface: auth endpoints, key publication, liveness.

mod auth;
mod discovery;
mod system;

use crate::config::Config;
use crate::directory::UserDirectory;
use crate::issuer::TokenIssuer;
use crate::keys::SigningKeyStore;
use axum::routing::{get, post};
use axum::Router;
use identity_common::RevocationStore;
use std::sync::Arc;

/// Shared state handed to every handler.
pub struct AppState {
    /// Service configuration.
    pub config: Config,
    /// Signing key store, also used to verify our own tokens.
    pub keystore: Arc<SigningKeyStore>,
    /// Token issuer.
    pub issuer: TokenIssuer,
    /// Credential verifier.
    pub directory: Arc<dyn UserDirectory>,
    /// Revocation and session store.
    pub store: Arc<dyn RevocationStore>,
}

/// Builds the service router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/.well-known/jwks.json", get(discovery::jwks))
        .route(
            "/.well-known/openid-configuration",
            get(discovery::openid_configuration),
        )
        .route("/actuator/health", get(system::health))
        .route("/actuator/info", get(system::info))
        .route("/metrics", get(system::metrics))
        .with_state(state)
}
