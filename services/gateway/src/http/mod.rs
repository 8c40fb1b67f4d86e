//! Router assembly and the gateway's locally served surface.

mod fallback;
mod system;

use crate::config::Config;
use crate::gate::{self, PathMatcher};
use crate::jwt::{KeySetCache, TokenValidator};
use crate::proxy;
use axum::middleware;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

/// Shared state handed to the gate, the proxy, and local handlers.
pub struct AppState {
    /// Service configuration.
    pub config: Config,
    /// Public path classifier.
    pub matcher: PathMatcher,
    /// Token validation pipeline.
    pub validator: Arc<TokenValidator>,
    /// Cached view of the issuer's key set.
    pub cache: Arc<KeySetCache>,
    /// Outbound client, shared by the key cache and the proxy.
    pub http_client: reqwest::Client,
}

/// Builds the gateway router: local surfaces, upstream forwarding for
/// everything else, the gate in front of all of it.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/actuator/health", get(system::health))
        .route("/actuator/info", get(system::info))
        .route("/metrics", get(system::metrics))
        .route("/fallback/auth", get(fallback::auth).post(fallback::auth))
        .route(
            "/fallback/resource",
            get(fallback::resource).post(fallback::resource),
        )
        .route(
            "/fallback/general",
            get(fallback::general).post(fallback::general),
        )
        .fallback(proxy::forward)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            gate::authenticate,
        ))
        .with_state(state)
}
