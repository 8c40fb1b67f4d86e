//! Redis-backed revocation store.
//!
//! Revocations and sessions ride on Redis native expiry (`SET ... EX`); the
//! per-principal index is a sorted set scored by expiry epoch so dead members
//! can be pruned by score. The connection manager is cloned per operation,
//! which keeps concurrent readers from serializing on a shared lock.

use super::{
    principal_tokens_key, revoked_token_key, session_key, RevocationStore, StoreError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, instrument};

/// Revocation store on a shared Redis instance.
#[derive(Clone)]
pub struct RedisRevocationStore {
    conn: ConnectionManager,
}

impl RedisRevocationStore {
    /// Connects to Redis and hands back a store.
    pub async fn new(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(RedisRevocationStore { conn })
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    #[instrument(skip(self), level = "debug")]
    async fn revoke(&self, token_id: &str, ttl: Duration) -> Result<(), StoreError> {
        if ttl.is_zero() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let key = revoked_token_key(token_id);

        conn.set_ex::<_, _, ()>(&key, "1", ttl.as_secs().max(1))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn is_revoked(&self, token_id: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let key = revoked_token_key(token_id);

        let exists: bool = conn
            .exists(&key)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(exists)
    }

    async fn track_token(
        &self,
        principal_id: &str,
        token_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let key = principal_tokens_key(principal_id);
        let now = Utc::now().timestamp();
        let remaining = expires_at.timestamp() - now;
        if remaining <= 0 {
            return Ok(());
        }

        // Drop members that expired since the last write
        conn.zrembyscore::<_, _, _, ()>(&key, "-inf", now)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        conn.zadd::<_, _, _, ()>(&key, token_id, expires_at.timestamp())
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        // The index never needs to outlive its longest-lived member
        conn.expire::<_, ()>(&key, remaining)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn revoke_all_for_principal(&self, principal_id: &str) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let key = principal_tokens_key(principal_id);
        let now = Utc::now().timestamp();

        let members: Vec<(String, f64)> = conn
            .zrangebyscore_withscores(&key, now, "+inf")
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut revoked = 0u64;
        for (token_id, score) in members {
            let remaining = score as i64 - now;
            if remaining <= 0 {
                continue;
            }
            conn.set_ex::<_, _, ()>(&revoked_token_key(&token_id), "1", remaining as u64)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            revoked += 1;
        }

        conn.del::<_, ()>(&key)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        debug!(principal = %principal_id, revoked, "revoked principal's live tokens");
        Ok(revoked)
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
        let mut conn = self.conn.clone();
        let key = session_key(session_id);

        conn.set_ex::<_, _, ()>(&key, principal_id, ttl.as_secs().max(1))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn session_principal(&self, session_id: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let key = session_key(session_id);

        let principal: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(principal)
    }

    async fn invalidate_session(&self, session_id: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let key = session_key(session_id);

        conn.del::<_, ()>(&key)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }
}
