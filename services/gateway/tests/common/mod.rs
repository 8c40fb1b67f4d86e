//! Shared harness: a throwaway token issuer and a fully wired gateway
//! driven in-process through `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use gateway::config::{Config, DEFAULT_PUBLIC_PATHS};
use gateway::gate::PathMatcher;
use gateway::http::{self, AppState};
use gateway::jwt::{KeySetCache, TokenValidator};
use identity_common::{InMemoryRevocationStore, Jwk, KeySet, RevocationStore, TokenClaims};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rand::rngs::OsRng;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use std::sync::Arc;
use tower::ServiceExt;
use url::Url;

/// Issuer URI every test token carries; must match the gateway config.
pub const TEST_ISSUER: &str = "http://localhost:9000";

/// Signs tokens the way the real auth server does, without running one.
pub struct TestIssuer {
    pub kid: String,
    encoding_key: EncodingKey,
    pub jwk: Jwk,
}

impl TestIssuer {
    pub fn new(kid: &str) -> Self {
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let public_key = private_key.to_public_key();

        let pem = private_key
            .to_pkcs1_pem(rsa::pkcs1::LineEnding::LF)
            .unwrap();
        let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap();

        let jwk = Jwk {
            kty: "RSA".to_string(),
            kid: kid.to_string(),
            key_use: "sig".to_string(),
            alg: "RS256".to_string(),
            n: Some(URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be())),
            e: Some(URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be())),
        };

        TestIssuer {
            kid: kid.to_string(),
            encoding_key,
            jwk,
        }
    }

    pub fn key_set(&self) -> KeySet {
        KeySet {
            keys: vec![self.jwk.clone()],
        }
    }

    /// Claims that pass the full pipeline against `test_config`.
    pub fn good_claims(&self) -> TokenClaims {
        serde_json::from_value(serde_json::json!({
            "iss": TEST_ISSUER,
            "sub": "user-1",
            "aud": ["api-gateway"],
            "exp": chrono::Utc::now().timestamp() + 900,
            "iat": chrono::Utc::now().timestamp(),
            "jti": uuid::Uuid::new_v4().to_string(),
            "roles": ["ROLE_USER"],
            "authorities": ["ROLE_USER"],
            "username": "alice",
            "email": "alice@example.com"
        }))
        .unwrap()
    }

    pub fn sign(&self, claims: &TokenClaims) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());
        encode(&header, claims, &self.encoding_key).unwrap()
    }

    /// A signed token whose claims pass every check.
    pub fn good_token(&self) -> String {
        self.sign(&self.good_claims())
    }
}

/// Combines a two-key set into one JWKS document.
pub fn combined_key_set(issuers: &[&TestIssuer]) -> KeySet {
    KeySet {
        keys: issuers.iter().map(|issuer| issuer.jwk.clone()).collect(),
    }
}

pub fn test_config(jwks_url: &str, upstream_url: &str) -> Config {
    Config {
        host: "localhost".to_string(),
        port: 8080,
        issuer_uri: Url::parse(TEST_ISSUER).unwrap(),
        jwks_url: Url::parse(jwks_url).unwrap(),
        upstream_url: Url::parse(upstream_url).unwrap(),
        expected_audience: "api-gateway".to_string(),
        public_paths: DEFAULT_PUBLIC_PATHS.iter().map(|s| (*s).to_string()).collect(),
        jwks_cache_ttl_seconds: 3600,
        jwks_refresh_cooldown_seconds: 30,
        jwks_prewarm: false,
        http_timeout_seconds: 5,
        redis_url: None,
        revocation_timeout_ms: 500,
        shutdown_timeout_seconds: 30,
    }
}

/// A gateway wired against mock servers, with handles into its internals.
pub struct TestGateway {
    pub router: Router,
    pub store: Arc<InMemoryRevocationStore>,
    pub cache: Arc<KeySetCache>,
    pub validator: Arc<TokenValidator>,
}

pub fn build_gateway(config: Config) -> TestGateway {
    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout())
        .build()
        .unwrap();

    let cache = Arc::new(KeySetCache::new(&config, http_client.clone()));
    let store = Arc::new(InMemoryRevocationStore::new());
    let validator = Arc::new(TokenValidator::new(
        Arc::clone(&cache),
        Arc::clone(&store) as Arc<dyn RevocationStore>,
        &config,
    ));
    let matcher = PathMatcher::new(&config.public_paths);

    let state = Arc::new(AppState {
        config,
        matcher,
        validator: Arc::clone(&validator),
        cache: Arc::clone(&cache),
        http_client,
    });

    TestGateway {
        router: http::router(state),
        store,
        cache,
        validator,
    }
}

/// Sends a request through the router, returning status and parsed body.
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn bearer_request(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}
