//! Staged token verification with compile-time ordering.
//!
//! A token moves `Unverified` -> `SignatureVerified` -> `Verified`; claims
//! are only reachable once the stage that proved them has run, so a caller
//! cannot read identity out of a token whose signature was never checked.

use crate::error::GatewayError;
use identity_common::TokenClaims;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};

mod private {
    pub trait Sealed {}
}

/// Marker trait for verification stages.
pub trait Stage: private::Sealed {}

/// Parsed header, nothing proven yet.
pub struct Unverified {
    kid: String,
}
impl private::Sealed for Unverified {}
impl Stage for Unverified {}

/// Signature proven against a published key.
pub struct SignatureVerified {
    claims: TokenClaims,
}
impl private::Sealed for SignatureVerified {}
impl Stage for SignatureVerified {}

/// Signature, issuer, audience, and expiry all proven.
pub struct Verified {
    claims: TokenClaims,
}
impl private::Sealed for Verified {}
impl Stage for Verified {}

/// A bearer token at a known verification stage.
pub struct Token<S: Stage> {
    raw: String,
    state: S,
}

// Raw token material stays out of debug output.
impl<S: Stage> std::fmt::Debug for Token<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("stage", &std::any::type_name::<S>())
            .finish_non_exhaustive()
    }
}

impl Token<Unverified> {
    /// Parses the compact JWT header.
    ///
    /// Only RS256 tokens with a `kid` are accepted; everything else is
    /// malformed as far as this gateway is concerned.
    pub fn parse(raw: &str) -> Result<Self, GatewayError> {
        let header = decode_header(raw).map_err(|e| GatewayError::Malformed {
            reason: format!("invalid header: {e}"),
        })?;

        if header.alg != Algorithm::RS256 {
            return Err(GatewayError::Malformed {
                reason: format!("unsupported algorithm {:?}", header.alg),
            });
        }

        let kid = header.kid.ok_or_else(|| GatewayError::Malformed {
            reason: "missing kid in header".to_string(),
        })?;

        Ok(Token {
            raw: raw.to_string(),
            state: Unverified { kid },
        })
    }

    /// Key id named by the token header.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.state.kid
    }

    /// Checks the RS256 signature against `key`.
    ///
    /// Expiry and audience stay unchecked here; those belong to the next
    /// stage so every failure maps to exactly one reason.
    pub fn verify_signature(
        self,
        key: &DecodingKey,
    ) -> Result<Token<SignatureVerified>, GatewayError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<TokenClaims>(&self.raw, key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => GatewayError::InvalidSignature,
                _ => GatewayError::Malformed {
                    reason: format!("undecodable claims: {e}"),
                },
            }
        })?;

        Ok(Token {
            raw: self.raw,
            state: SignatureVerified {
                claims: data.claims,
            },
        })
    }
}

impl Token<SignatureVerified> {
    /// Claims as decoded; trust them only for logging until fully verified.
    #[must_use]
    pub fn claims(&self) -> &TokenClaims {
        &self.state.claims
    }

    /// Checks issuer, then audience, then expiry, in that order.
    pub fn verify_claims(
        self,
        expected_issuer: &str,
        expected_audience: &str,
    ) -> Result<Token<Verified>, GatewayError> {
        let claims = &self.state.claims;

        if claims.iss != expected_issuer {
            return Err(GatewayError::IssuerMismatch);
        }
        if !claims.has_audience(expected_audience) {
            return Err(GatewayError::AudienceMismatch);
        }
        if claims.is_expired() {
            return Err(GatewayError::Expired {
                expired_at: claims.expires_at(),
            });
        }

        Ok(Token {
            raw: self.raw,
            state: Verified {
                claims: self.state.claims,
            },
        })
    }
}

impl Token<Verified> {
    /// Fully verified claims.
    #[must_use]
    pub fn claims(&self) -> &TokenClaims {
        &self.state.claims
    }

    /// Token id, the revocation key.
    #[must_use]
    pub fn jti(&self) -> &str {
        &self.state.claims.jti
    }

    /// Consumes the token, keeping only the claims.
    #[must_use]
    pub fn into_claims(self) -> TokenClaims {
        self.state.claims
    }
}
