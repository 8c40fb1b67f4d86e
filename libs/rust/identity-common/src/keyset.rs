//! JWKS document types shared by the publishing and consuming sides.
//!
//! Only RSA signing keys are modelled; that is the sole key type the issuer
//! mints. Conversion to a [`jsonwebtoken::DecodingKey`] is fallible and the
//! caller decides whether a bad entry poisons the whole set or is skipped.

use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Serialize};

/// A single published key, RFC 7517 shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, `"RSA"` for every key this platform publishes.
    pub kty: String,
    /// Key id, embedded in issued token headers.
    pub kid: String,
    /// Intended use, `"sig"`.
    #[serde(rename = "use")]
    pub key_use: String,
    /// Signing algorithm, `"RS256"`.
    pub alg: String,
    /// RSA modulus, base64url without padding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// RSA public exponent, base64url without padding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

impl Jwk {
    /// Builds the verification key for this entry.
    pub fn decoding_key(&self) -> Result<DecodingKey, KeySetError> {
        if self.kty != "RSA" {
            return Err(KeySetError::UnsupportedKeyType {
                kid: self.kid.clone(),
                kty: self.kty.clone(),
            });
        }
        let n = self.n.as_deref().ok_or_else(|| KeySetError::MissingComponent {
            kid: self.kid.clone(),
            component: "n",
        })?;
        let e = self.e.as_deref().ok_or_else(|| KeySetError::MissingComponent {
            kid: self.kid.clone(),
            component: "e",
        })?;

        // Minimum key size 2048 bits (256 bytes, ~342 base64 chars)
        if n.len() < 340 {
            return Err(KeySetError::WeakKey {
                kid: self.kid.clone(),
            });
        }

        DecodingKey::from_rsa_components(n, e).map_err(|source| KeySetError::InvalidComponent {
            kid: self.kid.clone(),
            source,
        })
    }
}

/// A published key set, RFC 7517 `{"keys": [...]}` shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeySet {
    /// Published keys, current first.
    pub keys: Vec<Jwk>,
}

impl KeySet {
    /// Looks up a key by id.
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|key| key.kid == kid)
    }

    /// Number of published keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Why a JWK entry could not be turned into a verification key.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum KeySetError {
    /// Key type other than RSA.
    #[error("key {kid} has unsupported type {kty}")]
    UnsupportedKeyType {
        /// Offending key id.
        kid: String,
        /// Declared key type.
        kty: String,
    },

    /// A required component (`n` or `e`) is absent.
    #[error("key {kid} is missing component {component}")]
    MissingComponent {
        /// Offending key id.
        kid: String,
        /// Name of the absent component.
        component: &'static str,
    },

    /// The modulus is below the 2048-bit floor.
    #[error("key {kid} is below the minimum RSA key size")]
    WeakKey {
        /// Offending key id.
        kid: String,
    },

    /// The components did not decode into a usable key.
    #[error("key {kid} has invalid components")]
    InvalidComponent {
        /// Offending key id.
        kid: String,
        /// Decode failure from the JWT library.
        #[source]
        source: jsonwebtoken::errors::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rsa_jwk(kid: &str) -> Jwk {
        Jwk {
            kty: "RSA".to_string(),
            kid: kid.to_string(),
            key_use: "sig".to_string(),
            alg: "RS256".to_string(),
            n: Some("x".repeat(342)),
            e: Some("AQAB".to_string()),
        }
    }

    #[test]
    fn test_find_by_kid() {
        let set = KeySet {
            keys: vec![rsa_jwk("key-1"), rsa_jwk("key-2")],
        };
        assert_eq!(set.find("key-2").map(|k| k.kid.as_str()), Some("key-2"));
        assert!(set.find("key-3").is_none());
    }

    #[test]
    fn test_use_field_serializes_as_use() {
        let json = serde_json::to_value(rsa_jwk("key-1")).unwrap();
        assert_eq!(json.get("use"), Some(&serde_json::json!("sig")));
        assert!(json.get("key_use").is_none());
    }

    #[test]
    fn test_non_rsa_key_rejected() {
        let mut jwk = rsa_jwk("key-1");
        jwk.kty = "EC".to_string();
        assert!(matches!(
            jwk.decoding_key(),
            Err(KeySetError::UnsupportedKeyType { .. })
        ));
    }

    #[test]
    fn test_missing_modulus_rejected() {
        let mut jwk = rsa_jwk("key-1");
        jwk.n = None;
        assert!(matches!(
            jwk.decoding_key(),
            Err(KeySetError::MissingComponent { component: "n", .. })
        ));
    }

    #[test]
    fn test_short_modulus_rejected() {
        let mut jwk = rsa_jwk("key-1");
        jwk.n = Some("short".to_string());
        assert!(matches!(jwk.decoding_key(), Err(KeySetError::WeakKey { .. })));
    }

    #[test]
    fn test_keyset_document_shape() {
        let set = KeySet {
            keys: vec![rsa_jwk("key-1")],
        };
        let json = serde_json::to_value(&set).unwrap();
        assert!(json.get("keys").unwrap().is_array());
    }
}
