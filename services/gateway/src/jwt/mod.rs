//! Token handling: key set cache, staged verification, validation pipeline.

pub mod key_cache;
pub mod token;
pub mod validator;

pub use key_cache::{KeySetCache, KeySnapshot};
pub use validator::{TokenValidator, VerifiedIdentity};
