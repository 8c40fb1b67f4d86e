//! Revocation store abstraction.
//!
//! The store is the single piece of mutable state shared between the issuing
//! and validating sides. Every entry is TTL-bounded by the lifetime of the
//! token it describes, so the store can never grow past the set of tokens
//! that are still alive.
//!
//! Key layout:
//! - `revoked-token:<tokenId>` marks a token id revoked; presence is the
//!   signal, the value is irrelevant.
//! - `session:<sessionId>` maps a login session to its principal id.
//! - `principal-tokens:<principalId>` is a sorted set of live token ids
//!   scored by expiry epoch, maintained at issuance time so revoke-all never
//!   has to enumerate keys.

mod memory;
mod redis;

pub use memory::InMemoryRevocationStore;
pub use redis::RedisRevocationStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Prefix for revoked token id entries.
pub const REVOKED_TOKEN_PREFIX: &str = "revoked-token:";
/// Prefix for session entries.
pub const SESSION_PREFIX: &str = "session:";
/// Prefix for per-principal live token indexes.
pub const PRINCIPAL_TOKENS_PREFIX: &str = "principal-tokens:";

/// Key for a revoked token id.
pub fn revoked_token_key(token_id: &str) -> String {
    format!("{REVOKED_TOKEN_PREFIX}{token_id}")
}

/// Key for a session entry.
pub fn session_key(session_id: &str) -> String {
    format!("{SESSION_PREFIX}{session_id}")
}

/// Key for a principal's live token index.
pub fn principal_tokens_key(principal_id: &str) -> String {
    format!("{PRINCIPAL_TOKENS_PREFIX}{principal_id}")
}

/// Failure talking to the backing store.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The store could not be reached or the connection could not be set up.
    #[error("store connection failure: {0}")]
    Connection(String),

    /// The store answered with an error.
    #[error("store operation failed: {0}")]
    Backend(String),
}

/// Shared revocation and session state.
///
/// All operations are idempotent: revoking a revoked token or deleting an
/// absent session succeeds without effect.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Marks a token id revoked for `ttl`.
    ///
    /// A zero `ttl` is a no-op: the token is already past its expiry and
    /// rejected by the expiry check, so writing an entry would only add an
    /// immortal key on stores that treat zero as "no expiry".
    async fn revoke(&self, token_id: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Whether a token id is currently revoked.
    async fn is_revoked(&self, token_id: &str) -> Result<bool, StoreError>;

    /// Records a freshly issued token in its principal's live index.
    async fn track_token(
        &self,
        principal_id: &str,
        token_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Revokes every live indexed token of a principal and drops the index.
    ///
    /// Returns the number of tokens revoked. Never enumerates store keys;
    /// only the principal's own index is read.
    async fn revoke_all_for_principal(&self, principal_id: &str) -> Result<u64, StoreError>;

    /// Creates a session entry mapping `session_id` to `principal_id`.
    async fn store_session(
        &self,
        session_id: &str,
        principal_id: &str,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Principal owning the session, if the session is live.
    async fn session_principal(&self, session_id: &str) -> Result<Option<String>, StoreError>;

    /// Deletes a session entry.
    async fn invalidate_session(&self, session_id: &str) -> Result<(), StoreError>;
}
