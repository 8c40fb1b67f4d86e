//! Signing key store.
//!
//! Keys are generated in-process at startup and live only in memory; a
//! restart mints a fresh keypair and validators pick it up through their
//! unknown-kid refresh. Rotation keeps a bounded set of retired keys
//! resolvable so tokens signed before the rotation keep validating.

use crate::error::AuthError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use identity_common::{Jwk, KeySet};
use jsonwebtoken::{DecodingKey, EncodingKey};
use parking_lot::RwLock;
use rand::rngs::OsRng;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const RSA_KEY_BITS: usize = 2048;

// Retired generations kept resolvable after rotation
const MAX_RETIRED_KEYS: usize = 2;

/// One generated signing keypair.
pub struct SigningKey {
    kid: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    jwk: Jwk,
}

impl SigningKey {
    fn generate() -> Result<Self, AuthError> {
        let private_key = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)
            .map_err(|e| AuthError::SigningError(e.to_string()))?;
        let public_key = private_key.to_public_key();

        let pem = private_key
            .to_pkcs1_pem(rsa::pkcs1::LineEnding::LF)
            .map_err(|e| AuthError::SigningError(e.to_string()))?;
        let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| AuthError::SigningError(e.to_string()))?;

        let kid = Uuid::new_v4().to_string();
        let jwk = Jwk {
            kty: "RSA".to_string(),
            kid: kid.clone(),
            key_use: "sig".to_string(),
            alg: "RS256".to_string(),
            n: Some(URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be())),
            e: Some(URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be())),
        };
        let decoding_key = jwk
            .decoding_key()
            .map_err(|e| AuthError::SigningError(e.to_string()))?;

        Ok(SigningKey {
            kid,
            encoding_key,
            decoding_key,
            jwk,
        })
    }

    /// Key id embedded in issued token headers.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Private key handle for signing.
    #[must_use]
    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }
}

struct KeyRing {
    current: Arc<SigningKey>,
    retired: Vec<Arc<SigningKey>>,
}

/// Holds the current signing key and recently retired ones.
pub struct SigningKeyStore {
    ring: RwLock<KeyRing>,
}

impl SigningKeyStore {
    /// Generates the first signing key.
    pub fn new() -> Result<Self, AuthError> {
        let current = Arc::new(SigningKey::generate()?);
        info!(kid = %current.kid, "generated initial signing key");
        Ok(SigningKeyStore {
            ring: RwLock::new(KeyRing {
                current,
                retired: Vec::new(),
            }),
        })
    }

    /// The key new tokens are signed with.
    #[must_use]
    pub fn current(&self) -> Arc<SigningKey> {
        Arc::clone(&self.ring.read().current)
    }

    /// Generates a new current key; the old one moves to the retired set.
    ///
    /// Returns the new key id.
    pub fn rotate(&self) -> Result<String, AuthError> {
        let new_key = Arc::new(SigningKey::generate()?);
        let kid = new_key.kid.clone();

        let mut ring = self.ring.write();
        let old = std::mem::replace(&mut ring.current, new_key);
        ring.retired.insert(0, old);
        ring.retired.truncate(MAX_RETIRED_KEYS);

        info!(kid = %kid, retired = ring.retired.len(), "rotated signing key");
        Ok(kid)
    }

    /// Verification key for a key id, current or retired.
    #[must_use]
    pub fn verification_key(&self, kid: &str) -> Option<DecodingKey> {
        let ring = self.ring.read();
        if ring.current.kid == kid {
            return Some(ring.current.decoding_key.clone());
        }
        ring.retired
            .iter()
            .find(|key| key.kid == kid)
            .map(|key| key.decoding_key.clone())
    }

    /// Published key set: current key first, retired keys after.
    #[must_use]
    pub fn key_set(&self) -> KeySet {
        let ring = self.ring.read();
        let mut keys = vec![ring.current.jwk.clone()];
        keys.extend(ring.retired.iter().map(|key| key.jwk.clone()));
        KeySet { keys }
    }
}
