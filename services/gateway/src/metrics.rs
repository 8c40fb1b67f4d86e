//! Prometheus metrics for the edge gateway.

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, CounterVec};

/// Token validation outcomes, labelled by result code.
pub static TOKEN_VALIDATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "gateway_token_validations_total",
        "Total number of token validations",
        &["result"]
    )
    .expect("Failed to register token_validations metric")
});

/// Key set fetches against the issuer, labelled by outcome.
pub static JWKS_FETCHES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "gateway_jwks_fetches_total",
        "Total number of key set fetches",
        &["outcome"]
    )
    .expect("Failed to register jwks_fetches metric")
});

/// Requests forwarded to the upstream, labelled by outcome.
pub static UPSTREAM_REQUESTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "gateway_upstream_requests_total",
        "Total number of proxied upstream requests",
        &["outcome"]
    )
    .expect("Failed to register upstream_requests metric")
});
