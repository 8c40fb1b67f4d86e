//! Token issuance service.
//!
//! Holds the platform's signing keys, mints access and refresh tokens,
//! publishes the public key set, and writes revocations and sessions to the
//! shared store.

#![forbid(unsafe_code)]

pub mod config;
pub mod directory;
pub mod error;
pub mod http;
pub mod issuer;
pub mod keys;
pub mod metrics;
pub mod server;

pub use config::Config;
pub use error::AuthError;
