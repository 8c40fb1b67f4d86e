//! In-memory revocation store for tests and single-process development.
//!
//! Unlike Redis there is no native expiry, so entries carry their deadline
//! and a periodic sweep evicts the dead ones. Reads also treat an expired
//! entry as absent, which keeps behavior correct between sweeps.

use super::{RevocationStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
struct TrackedToken {
    token_id: String,
    expires_at: DateTime<Utc>,
}

/// Process-local revocation store.
#[derive(Default)]
pub struct InMemoryRevocationStore {
    revoked: RwLock<HashMap<String, DateTime<Utc>>>,
    sessions: RwLock<HashMap<String, (String, DateTime<Utc>)>>,
    principal_tokens: RwLock<HashMap<String, Vec<TrackedToken>>>,
}

fn deadline(ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl InMemoryRevocationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Evicts every expired entry.
    pub fn sweep(&self) {
        let now = Utc::now();

        self.revoked.write().retain(|_, expiry| *expiry > now);
        self.sessions.write().retain(|_, (_, expiry)| *expiry > now);

        let mut indexes = self.principal_tokens.write();
        for tokens in indexes.values_mut() {
            tokens.retain(|token| token.expires_at > now);
        }
        indexes.retain(|_, tokens| !tokens.is_empty());
    }

    /// Sweeps at `interval` forever; run it as a registered background task.
    pub async fn sweep_loop(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.sweep();
        }
    }

    #[cfg(test)]
    fn revoked_len(&self) -> usize {
        self.revoked.read().len()
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn revoke(&self, token_id: &str, ttl: Duration) -> Result<(), StoreError> {
        if ttl.is_zero() {
            return Ok(());
        }
        self.revoked
            .write()
            .insert(token_id.to_string(), deadline(ttl));
        Ok(())
    }

    async fn is_revoked(&self, token_id: &str) -> Result<bool, StoreError> {
        let revoked = self
            .revoked
            .read()
            .get(token_id)
            .is_some_and(|expiry| *expiry > Utc::now());
        Ok(revoked)
    }

    async fn track_token(
        &self,
        principal_id: &str,
        token_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let now = Utc::now();
        if expires_at <= now {
            return Ok(());
        }
        let mut indexes = self.principal_tokens.write();
        let tokens = indexes.entry(principal_id.to_string()).or_default();
        tokens.retain(|token| token.expires_at > now);
        tokens.push(TrackedToken {
            token_id: token_id.to_string(),
            expires_at,
        });
        Ok(())
    }

    async fn revoke_all_for_principal(&self, principal_id: &str) -> Result<u64, StoreError> {
        let now = Utc::now();
        let tokens = self.principal_tokens.write().remove(principal_id);

        let Some(tokens) = tokens else {
            return Ok(0);
        };

        let mut revoked = self.revoked.write();
        let mut count = 0u64;
        for token in tokens {
            if token.expires_at > now {
                revoked.insert(token.token_id, token.expires_at);
                count += 1;
            }
        }
        Ok(count)
    }

    async fn store_session(
        &self,
        session_id: &str,
        principal_id: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        if ttl.is_zero() {
            return Ok(());
        }
        self.sessions.write().insert(
            session_id.to_string(),
            (principal_id.to_string(), deadline(ttl)),
        );
        Ok(())
    }

    async fn session_principal(&self, session_id: &str) -> Result<Option<String>, StoreError> {
        let principal = self.sessions.read().get(session_id).and_then(
            |(principal, expiry)| {
                if *expiry > Utc::now() {
                    Some(principal.clone())
                } else {
                    None
                }
            },
        );
        Ok(principal)
    }

    async fn invalidate_session(&self, session_id: &str) -> Result<(), StoreError> {
        self.sessions.write().remove(session_id);
        Ok(())
    }
}
