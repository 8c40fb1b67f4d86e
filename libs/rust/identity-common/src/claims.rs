//! Typed claim set shared by the token issuer and the edge validator.
//!
//! Keeping one struct on both sides guarantees round-trip symmetry: whatever
//! the issuer writes is exactly what the validator and the identity headers
//! see. Audience handling follows RFC 7519 section 4.1.3: a bare string on
//! the wire is promoted to a one-element set on read, and the set form is
//! always written.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Audience claim value as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// Single audience string.
    One(String),
    /// List of audience strings.
    Many(Vec<String>),
}

impl Audience {
    /// Promotes the wire form to a set.
    pub fn into_set(self) -> Vec<String> {
        match self {
            Audience::One(aud) => vec![aud],
            Audience::Many(auds) => auds,
        }
    }
}

fn deserialize_audience<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Audience::deserialize(deserializer).map(Audience::into_set)
}

/// Registered and custom claims carried by every token this platform issues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Issuer URI.
    pub iss: String,
    /// Subject, the principal id.
    pub sub: String,
    /// Audience set. Accepts a bare string on deserialization.
    #[serde(default, deserialize_with = "deserialize_audience")]
    pub aud: Vec<String>,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Token id, unique per issuance. Revocation is keyed on this.
    pub jti: String,
    /// Role set granted to the principal.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    /// Authority set, mirroring `roles` for consumers that expect this name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authorities: Vec<String>,
    /// Display username. OIDC-shaped tokens carry this as `preferred_username`.
    #[serde(
        default,
        alias = "preferred_username",
        skip_serializing_if = "Option::is_none"
    )]
    pub username: Option<String>,
    /// Contact email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Any further claims, preserved verbatim.
    #[serde(flatten)]
    pub custom: HashMap<String, serde_json::Value>,
}

impl TokenClaims {
    /// Whether `exp` has passed.
    pub fn is_expired(&self) -> bool {
        self.exp <= chrono::Utc::now().timestamp()
    }

    /// Seconds until expiry. Negative when already expired.
    pub fn remaining_lifetime(&self) -> i64 {
        self.exp - chrono::Utc::now().timestamp()
    }

    /// Expiry as a timestamp type.
    pub fn expires_at(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp(self.exp, 0)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC)
    }

    /// Whether the audience set contains `audience`.
    pub fn has_audience(&self, audience: &str) -> bool {
        self.aud.iter().any(|aud| aud == audience)
    }

    /// Resolves the effective authority list.
    ///
    /// Uses `authorities` when present, then `roles`, then a `scope` custom
    /// claim (either a list or a space-delimited string).
    pub fn granted_authorities(&self) -> Vec<String> {
        if !self.authorities.is_empty() {
            return self.authorities.clone();
        }
        if !self.roles.is_empty() {
            return self.roles.clone();
        }
        match self.custom.get("scope") {
            Some(serde_json::Value::String(scope)) => {
                scope.split_whitespace().map(str::to_string).collect()
            }
            Some(serde_json::Value::Array(scopes)) => scopes
                .iter()
                .filter_map(|value| value.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}
