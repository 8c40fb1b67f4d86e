//! Token issuer.
//!
//! Assembles the claim set and signs it with the key store's current key.
//! Access and refresh tokens share one shape; what separates them is the
//! audience (gateway-facing set vs. this service's own identifier) and the
//! lifetime. Issuance never touches the revocation store; the HTTP layer
//! records minted token ids in the principal index afterwards.

use crate::config::Config;
use crate::directory::Principal;
use crate::error::AuthError;
use crate::keys::SigningKeyStore;
use identity_common::TokenClaims;
use jsonwebtoken::{encode, Algorithm, Header};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

// Stamped when the directory reports no roles at all
const BASELINE_ROLE: &str = "ROLE_USER";

/// A signed token together with the claims that went into it.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Compact JWT.
    pub token: String,
    /// Claims as signed.
    pub claims: TokenClaims,
}

/// Mints signed tokens.
pub struct TokenIssuer {
    keystore: Arc<SigningKeyStore>,
    issuer_uri: String,
    default_audience: Vec<String>,
    service_audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    /// Builds an issuer bound to a key store and the service configuration.
    pub fn new(keystore: Arc<SigningKeyStore>, config: &Config) -> Self {
        TokenIssuer {
            keystore,
            issuer_uri: config.issuer_uri_str().to_string(),
            default_audience: config.default_audience.clone(),
            service_audience: config.service_audience.clone(),
            access_ttl: config.access_token_ttl(),
            refresh_ttl: config.refresh_token_ttl(),
        }
    }

    /// Access token lifetime in seconds, for `expires_in` response fields.
    #[must_use]
    pub fn access_ttl_seconds(&self) -> u64 {
        self.access_ttl.as_secs()
    }

    /// Mints an access token for the gateway-facing audience set.
    ///
    /// `extra_audiences` are unioned with the configured defaults.
    pub fn issue_access(
        &self,
        principal: &Principal,
        extra_audiences: &[String],
    ) -> Result<IssuedToken, AuthError> {
        let mut audience = self.default_audience.clone();
        for extra in extra_audiences {
            if !audience.contains(extra) {
                audience.push(extra.clone());
            }
        }
        self.issue(principal, audience, self.access_ttl)
    }

    /// Mints a refresh token addressed to this service itself.
    pub fn issue_refresh(&self, principal: &Principal) -> Result<IssuedToken, AuthError> {
        self.issue(
            principal,
            vec![self.service_audience.clone()],
            self.refresh_ttl,
        )
    }

    fn issue(
        &self,
        principal: &Principal,
        audience: Vec<String>,
        ttl: Duration,
    ) -> Result<IssuedToken, AuthError> {
        let now = chrono::Utc::now().timestamp();
        let roles = if principal.roles.is_empty() {
            vec![BASELINE_ROLE.to_string()]
        } else {
            principal.roles.clone()
        };

        let claims = TokenClaims {
            iss: self.issuer_uri.clone(),
            sub: principal.id.clone(),
            aud: audience,
            exp: now + ttl.as_secs() as i64,
            iat: now,
            jti: Uuid::new_v4().to_string(),
            authorities: roles.clone(),
            roles,
            username: Some(principal.username.clone()),
            email: principal.email.clone(),
            custom: HashMap::new(),
        };

        let key = self.keystore.current();
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(key.kid().to_string());

        let token = encode(&header, &claims, key.encoding_key())?;
        Ok(IssuedToken { token, claims })
    }
}
