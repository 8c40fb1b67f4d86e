//! Edge gateway.
//!
//! Validates every inbound bearer token locally against the issuer's cached
//! key set, consults the shared revocation store, and forwards accepted
//! requests upstream with asserted `X-User-*` identity headers.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod gate;
pub mod http;
pub mod jwt;
pub mod metrics;
pub mod proxy;
pub mod server;

pub use config::Config;
pub use error::GatewayError;
