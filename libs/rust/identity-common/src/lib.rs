//! Shared identity primitives for the platform's Rust services.
//!
//! This crate provides centralized implementations for:
//! - The typed token claim set shared by issuer and validator
//! - JWKS document types and decoding-key conversion
//! - The revocation store abstraction with Redis and in-memory backends
//! - Graceful shutdown coordination for the service binaries

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod claims;
pub mod keyset;
pub mod revocation;
pub mod shutdown;

pub use claims::{Audience, TokenClaims};
pub use keyset::{Jwk, KeySet, KeySetError};
pub use revocation::{
    InMemoryRevocationStore, RedisRevocationStore, RevocationStore, StoreError,
};
pub use shutdown::ShutdownCoordinator;
