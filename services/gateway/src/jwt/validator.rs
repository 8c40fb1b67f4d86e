//! Ordered token validation pipeline.
//!
//! Stages run in a fixed order and the first failure wins, so every
//! rejection maps to exactly one reason code: malformed, key resolution,
//! signature, issuer, audience, expiry, revocation. Revocation is checked
//! last and only for tokens that are otherwise valid, keeping store load
//! proportional to real traffic.

use crate::config::Config;
use crate::error::GatewayError;
use crate::jwt::key_cache::KeySetCache;
use crate::jwt::token::Token;
use crate::metrics::TOKEN_VALIDATIONS;
use identity_common::{RevocationStore, TokenClaims};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Identity proven by a fully validated token.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    /// Principal id, from `sub`.
    pub subject: String,
    /// Effective authority list.
    pub authorities: Vec<String>,
    /// Display username, when the token carries one.
    pub username: Option<String>,
    /// Contact email, when the token carries one.
    pub email: Option<String>,
    /// The full decoded claim set.
    pub claims: TokenClaims,
}

impl VerifiedIdentity {
    fn from_claims(claims: TokenClaims) -> Self {
        VerifiedIdentity {
            subject: claims.sub.clone(),
            authorities: claims.granted_authorities(),
            username: claims.username.clone(),
            email: claims.email.clone(),
            claims,
        }
    }
}

/// Validates bearer tokens against the cached key set and revocation store.
pub struct TokenValidator {
    cache: Arc<KeySetCache>,
    store: Arc<dyn RevocationStore>,
    expected_issuer: String,
    expected_audience: String,
    revocation_timeout: Duration,
    validations: AtomicU64,
}

impl TokenValidator {
    /// Creates a validator over `cache` and `store`.
    #[must_use]
    pub fn new(cache: Arc<KeySetCache>, store: Arc<dyn RevocationStore>, config: &Config) -> Self {
        TokenValidator {
            cache,
            store,
            expected_issuer: config.issuer_uri_str().to_string(),
            expected_audience: config.expected_audience.clone(),
            revocation_timeout: config.revocation_timeout(),
            validations: AtomicU64::new(0),
        }
    }

    /// Runs the full pipeline on a raw bearer token.
    #[instrument(skip_all)]
    pub async fn validate(&self, raw: &str) -> Result<VerifiedIdentity, GatewayError> {
        self.validations.fetch_add(1, Ordering::Relaxed);

        let result = self.run_pipeline(raw).await;
        match &result {
            Ok(identity) => {
                TOKEN_VALIDATIONS.with_label_values(&["success"]).inc();
                debug!(subject = %identity.subject, "token validated");
            }
            Err(e) => {
                TOKEN_VALIDATIONS.with_label_values(&[e.code()]).inc();
                debug!(code = e.code(), "token rejected");
            }
        }
        result
    }

    async fn run_pipeline(&self, raw: &str) -> Result<VerifiedIdentity, GatewayError> {
        let unverified = Token::parse(raw)?;
        let key = self.cache.key_for(unverified.kid()).await?;
        let signed = unverified.verify_signature(&key)?;
        let verified = signed.verify_claims(&self.expected_issuer, &self.expected_audience)?;
        self.check_revocation(verified.jti()).await?;
        Ok(VerifiedIdentity::from_claims(verified.into_claims()))
    }

    /// Revocation lookup under a deadline. Fails closed: a store outage
    /// rejects the token rather than letting a possibly revoked one through.
    async fn check_revocation(&self, jti: &str) -> Result<(), GatewayError> {
        match tokio::time::timeout(self.revocation_timeout, self.store.is_revoked(jti)).await {
            Ok(Ok(false)) => Ok(()),
            Ok(Ok(true)) => Err(GatewayError::Revoked),
            Ok(Err(e)) => {
                warn!(error = %e, "revocation lookup failed");
                Err(GatewayError::RevocationUnavailable {
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.revocation_timeout.as_millis() as u64,
                    "revocation lookup timed out"
                );
                Err(GatewayError::RevocationUnavailable {
                    reason: format!("lookup exceeded {:?}", self.revocation_timeout),
                })
            }
        }
    }

    /// Number of validations attempted so far.
    #[must_use]
    pub fn validation_count(&self) -> u64 {
        self.validations.load(Ordering::Relaxed)
    }
}
