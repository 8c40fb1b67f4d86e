//! Login, logout, and refresh handlers.

use super::AppState;
use crate::directory::Principal;
use crate::error::AuthError;
use crate::issuer::IssuedToken;
use crate::metrics::{LOGINS, TOKENS_ISSUED, TOKENS_REVOKED};
use axum::extract::State;
use axum::Json;
use identity_common::TokenClaims;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
    pub revoked: u64,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[instrument(skip_all, fields(username = %payload.username))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    let principal = state
        .directory
        .authenticate(&payload.username, &payload.password)
        .await?;

    let Some(principal) = principal else {
        LOGINS.with_label_values(&["failure"]).inc();
        debug!("login rejected");
        return Err(AuthError::InvalidCredentials);
    };

    let (access, refresh) = mint_pair(&state, &principal).await?;

    let session_id = Uuid::new_v4().to_string();
    state
        .store
        .store_session(&session_id, &principal.id, state.config.refresh_token_ttl())
        .await?;

    LOGINS.with_label_values(&["success"]).inc();
    info!(principal = %principal.id, "login succeeded");

    Ok(Json(TokenResponse {
        access_token: access.token,
        refresh_token: refresh.token,
        token_type: "Bearer".to_string(),
        expires_in: state.issuer.access_ttl_seconds(),
        session_id: Some(session_id),
    }))
}

#[instrument(skip_all)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LogoutRequest>,
) -> Result<Json<LogoutResponse>, AuthError> {
    let mut revoked = 0u64;

    if let Some(raw) = payload.token.as_deref() {
        match verify_own_token(&state, raw) {
            Ok(claims) => {
                let remaining = claims.remaining_lifetime();
                if remaining > 0 {
                    state
                        .store
                        .revoke(&claims.jti, Duration::from_secs(remaining as u64))
                        .await?;
                    TOKENS_REVOKED.with_label_values(&["logout"]).inc();
                    revoked += 1;
                }
            }
            // Not revocable, nothing to do: logout stays idempotent
            Err(reason) => debug!(%reason, "logout token skipped"),
        }
    }

    if let Some(user_id) = payload.user_id.as_deref() {
        let count = state.store.revoke_all_for_principal(user_id).await?;
        TOKENS_REVOKED
            .with_label_values(&["logout_all"])
            .inc_by(count as f64);
        info!(principal = %user_id, count, "revoked all tokens for principal");
        revoked += count;
    }

    if let Some(session_id) = payload.session_id.as_deref() {
        state.store.invalidate_session(session_id).await?;
    }

    Ok(Json(LogoutResponse {
        message: "Logout successful".to_string(),
        revoked,
    }))
}

#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    let claims = verify_refresh_token(&state, &payload.refresh_token)?;

    if state.store.is_revoked(&claims.jti).await? {
        warn!(jti = %claims.jti, "refresh token replay detected");
        return Err(AuthError::RefreshTokenRevoked);
    }

    // Rotation: the presented token dies the moment a new pair exists
    let remaining = claims.remaining_lifetime();
    if remaining > 0 {
        state
            .store
            .revoke(&claims.jti, Duration::from_secs(remaining as u64))
            .await?;
        TOKENS_REVOKED.with_label_values(&["rotation"]).inc();
    }

    let principal = Principal {
        username: claims.username.clone().unwrap_or_else(|| claims.sub.clone()),
        id: claims.sub,
        email: claims.email,
        roles: claims.roles,
    };
    let (access, refresh) = mint_pair(&state, &principal).await?;
    info!(principal = %principal.id, "refresh rotation complete");

    Ok(Json(TokenResponse {
        access_token: access.token,
        refresh_token: refresh.token,
        token_type: "Bearer".to_string(),
        expires_in: state.issuer.access_ttl_seconds(),
        session_id: None,
    }))
}

/// Mints an access/refresh pair and records both in the principal index.
async fn mint_pair(
    state: &AppState,
    principal: &Principal,
) -> Result<(IssuedToken, IssuedToken), AuthError> {
    let access = state.issuer.issue_access(principal, &[])?;
    let refresh = state.issuer.issue_refresh(principal)?;

    state
        .store
        .track_token(&principal.id, &access.claims.jti, access.claims.expires_at())
        .await?;
    state
        .store
        .track_token(&principal.id, &refresh.claims.jti, refresh.claims.expires_at())
        .await?;

    TOKENS_ISSUED.with_label_values(&["access"]).inc();
    TOKENS_ISSUED.with_label_values(&["refresh"]).inc();

    Ok((access, refresh))
}

/// Signature-and-issuer check against our own key store.
///
/// Used for logout, where expiry does not matter (an expired token simply has
/// nothing left to revoke; the caller checks remaining lifetime).
fn verify_own_token(state: &AppState, raw: &str) -> Result<TokenClaims, AuthError> {
    let header =
        decode_header(raw).map_err(|_| AuthError::InvalidRefreshToken("malformed".to_string()))?;
    let kid = header
        .kid
        .ok_or_else(|| AuthError::InvalidRefreshToken("missing key id".to_string()))?;
    let key = state
        .keystore
        .verification_key(&kid)
        .ok_or_else(|| AuthError::InvalidRefreshToken("unknown signing key".to_string()))?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<TokenClaims>(raw, &key, &validation)
        .map_err(|_| AuthError::InvalidRefreshToken("invalid signature".to_string()))?;

    if data.claims.iss != state.config.issuer_uri_str() {
        return Err(AuthError::InvalidRefreshToken("issuer mismatch".to_string()));
    }
    Ok(data.claims)
}

/// Full refresh-token validation: signature, issuer, audience, expiry.
fn verify_refresh_token(state: &AppState, raw: &str) -> Result<TokenClaims, AuthError> {
    let claims = verify_own_token(state, raw)?;

    if !claims.has_audience(&state.config.service_audience) {
        return Err(AuthError::InvalidRefreshToken(
            "not a refresh token".to_string(),
        ));
    }
    if claims.is_expired() {
        return Err(AuthError::InvalidRefreshToken("expired".to_string()));
    }
    Ok(claims)
}
