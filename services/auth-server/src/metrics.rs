//! Prometheus metrics for the issuance service.

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, CounterVec};

/// Tokens issued counter.
pub static TOKENS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "auth_server_tokens_issued_total",
        "Total number of tokens issued",
        &["token_type"]
    )
    .expect("Failed to register tokens_issued metric")
});

/// Tokens revoked counter.
pub static TOKENS_REVOKED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "auth_server_tokens_revoked_total",
        "Total number of tokens revoked",
        &["reason"]
    )
    .expect("Failed to register tokens_revoked metric")
});

/// Login attempts counter.
pub static LOGINS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "auth_server_logins_total",
        "Total number of login attempts",
        &["status"]
    )
    .expect("Failed to register logins metric")
});
