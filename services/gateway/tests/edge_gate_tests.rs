//! End-to-end gate tests driven through the full router.
//!
//! A wiremock server stands in for the issuer's JWKS endpoint and another
//! for the proxied upstream, so every test exercises the real pipeline:
//! strip, classify, validate, assert headers, forward.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use common::{
    bearer_request, build_gateway, combined_key_set, get_request, send, test_config, TestGateway,
    TestIssuer,
};
use identity_common::RevocationStore;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JWKS_PATH: &str = "/.well-known/jwks.json";

fn jwks_url(server: &MockServer) -> String {
    format!("{}{JWKS_PATH}", server.uri())
}

async fn mount_key_set(server: &MockServer, issuer: &TestIssuer) {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(issuer.key_set()))
        .mount(server)
        .await;
}

async fn gateway(issuer: &TestIssuer) -> (TestGateway, MockServer, MockServer) {
    let jwks = MockServer::start().await;
    mount_key_set(&jwks, issuer).await;
    let upstream = MockServer::start().await;
    let gw = build_gateway(test_config(&jwks_url(&jwks), &upstream.uri()));
    (gw, jwks, upstream)
}

async fn mount_ok(upstream: &MockServer, route: &str) {
    Mock::given(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(upstream)
        .await;
}

#[tokio::test]
async fn test_protected_path_without_token_is_401_with_stable_shape() {
    let issuer = TestIssuer::new("key-a");
    let (gw, _jwks, upstream) = gateway(&issuer).await;

    let (status, body) = send(&gw.router, get_request("/api/orders")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "TOKEN_MISSING");
    assert_eq!(body["status"], 401);
    assert!(body["message"].is_string());
    assert!(body["timestamp"].is_string());
    assert!(upstream.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_token_is_rejected_before_any_key_fetch() {
    let issuer = TestIssuer::new("key-a");
    let (gw, _jwks, upstream) = gateway(&issuer).await;

    let (status, body) = send(&gw.router, bearer_request("/api/orders", "not-a-jwt")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "TOKEN_MALFORMED");
    assert_eq!(gw.cache.fetch_count(), 0);
    assert!(upstream.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_valid_token_forwards_with_asserted_identity() {
    let issuer = TestIssuer::new("key-a");
    let jwks = MockServer::start().await;
    mount_key_set(&jwks, &issuer).await;

    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .and(header("x-user-id", "user-1"))
        .and(header("x-user-authorities", "ROLE_USER"))
        .and(header("x-user-name", "alice"))
        .and(header("x-user-email", "alice@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"orders": []})))
        .expect(1)
        .mount(&upstream)
        .await;

    let gw = build_gateway(test_config(&jwks_url(&jwks), &upstream.uri()));

    // Spoofed identity headers ride in alongside a legitimate token; the
    // upstream matcher only accepts the values the gate asserted itself.
    let request = Request::builder()
        .uri("/api/orders")
        .header("authorization", format!("Bearer {}", issuer.good_token()))
        .header("x-user-id", "attacker")
        .header("x-user-authorities", "ROLE_ADMIN")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&gw.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orders"], serde_json::json!([]));
}

#[tokio::test]
async fn test_spoofed_identity_headers_are_dropped_on_public_paths() {
    let issuer = TestIssuer::new("key-a");
    let (gw, _jwks, upstream) = gateway(&issuer).await;
    mount_ok(&upstream, "/public/docs").await;

    let request = Request::builder()
        .uri("/public/docs")
        .header("x-user-id", "attacker")
        .header("x-user-email", "fake@example.com")
        .body(Body::empty())
        .unwrap();

    let (status, _) = send(&gw.router, request).await;
    assert_eq!(status, StatusCode::OK);

    let received = upstream.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].headers.get("x-user-id").is_none());
    assert!(received[0].headers.get("x-user-email").is_none());
}

#[tokio::test]
async fn test_public_paths_skip_validation_entirely() {
    let issuer = TestIssuer::new("key-a");
    let (gw, _jwks, _upstream) = gateway(&issuer).await;

    let (status, body) = send(
        &gw.router,
        bearer_request("/actuator/health", "utter-garbage"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "UP");
    assert_eq!(gw.validator.validation_count(), 0);
    assert_eq!(gw.cache.fetch_count(), 0);
}

#[tokio::test]
async fn test_tampered_payload_is_rejected_as_invalid_signature() {
    let issuer = TestIssuer::new("key-a");
    let (gw, _jwks, upstream) = gateway(&issuer).await;

    let token = issuer.good_token();
    let parts: Vec<&str> = token.split('.').collect();
    let forged = URL_SAFE_NO_PAD.encode(serde_json::json!({"sub": "attacker"}).to_string());
    let tampered = format!("{}.{}.{}", parts[0], forged, parts[2]);

    let (status, body) = send(&gw.router, bearer_request("/api/orders", &tampered)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "SIGNATURE_INVALID");
    assert!(upstream.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let issuer = TestIssuer::new("key-a");
    let (gw, _jwks, _upstream) = gateway(&issuer).await;

    let mut claims = issuer.good_claims();
    claims.exp = chrono::Utc::now().timestamp() - 60;
    let token = issuer.sign(&claims);

    let (status, body) = send(&gw.router, bearer_request("/api/orders", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "TOKEN_EXPIRED");
}

#[tokio::test]
async fn test_wrong_audience_is_rejected() {
    let issuer = TestIssuer::new("key-a");
    let (gw, _jwks, _upstream) = gateway(&issuer).await;

    let mut claims = issuer.good_claims();
    claims.aud = vec!["other-service".to_string()];
    let token = issuer.sign(&claims);

    let (status, body) = send(&gw.router, bearer_request("/api/orders", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "AUDIENCE_MISMATCH");
}

#[tokio::test]
async fn test_wrong_issuer_wins_over_wrong_audience() {
    let issuer = TestIssuer::new("key-a");
    let (gw, _jwks, _upstream) = gateway(&issuer).await;

    let mut claims = issuer.good_claims();
    claims.iss = "https://evil.example.com".to_string();
    claims.aud = vec!["other-service".to_string()];
    let token = issuer.sign(&claims);

    let (status, body) = send(&gw.router, bearer_request("/api/orders", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "ISSUER_MISMATCH");
}

#[tokio::test]
async fn test_revocation_takes_effect_on_the_next_request() {
    let issuer = TestIssuer::new("key-a");
    let jwks = MockServer::start().await;
    mount_key_set(&jwks, &issuer).await;

    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&upstream)
        .await;

    let gw = build_gateway(test_config(&jwks_url(&jwks), &upstream.uri()));
    let claims = issuer.good_claims();
    let token = issuer.sign(&claims);

    let (status, _) = send(&gw.router, bearer_request("/api/profile", &token)).await;
    assert_eq!(status, StatusCode::OK);

    gw.store
        .revoke(&claims.jti, Duration::from_secs(900))
        .await
        .unwrap();

    let (status, body) = send(&gw.router, bearer_request("/api/profile", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "TOKEN_REVOKED");
}

#[tokio::test]
async fn test_revoke_all_for_principal_kills_every_tracked_token() {
    let issuer = TestIssuer::new("key-a");
    let (gw, _jwks, upstream) = gateway(&issuer).await;
    mount_ok(&upstream, "/api/profile").await;

    let first = issuer.good_claims();
    let second = issuer.good_claims();
    for claims in [&first, &second] {
        gw.store
            .track_token(&claims.sub, &claims.jti, claims.expires_at())
            .await
            .unwrap();
        let token = issuer.sign(claims);
        let (status, _) = send(&gw.router, bearer_request("/api/profile", &token)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let revoked = gw.store.revoke_all_for_principal("user-1").await.unwrap();
    assert_eq!(revoked, 2);

    for claims in [&first, &second] {
        let token = issuer.sign(claims);
        let (status, body) = send(&gw.router, bearer_request("/api/profile", &token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "TOKEN_REVOKED");
    }
}

#[tokio::test]
async fn test_unknown_kid_triggers_exactly_one_extra_fetch() {
    let published = TestIssuer::new("key-a");
    let unpublished = TestIssuer::new("key-b");

    let jwks = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(published.key_set()))
        .expect(2)
        .mount(&jwks)
        .await;

    let upstream = MockServer::start().await;
    let gw = build_gateway(test_config(&jwks_url(&jwks), &upstream.uri()));

    let (status, body) = send(
        &gw.router,
        bearer_request("/api/orders", &unpublished.good_token()),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "SIGNATURE_INVALID");
    assert_eq!(gw.cache.fetch_count(), 2);
    jwks.verify().await;
}

#[tokio::test]
async fn test_rotated_key_is_picked_up_and_old_tokens_still_validate() {
    let old_key = TestIssuer::new("key-old");
    let new_key = TestIssuer::new("key-new");

    let jwks = MockServer::start().await;
    // First fetch sees the pre-rotation set, every later one the rotated set
    // with the old key retained as retired.
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(old_key.key_set()))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&jwks)
        .await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(combined_key_set(&[&new_key, &old_key])),
        )
        .mount(&jwks)
        .await;

    let upstream = MockServer::start().await;
    mount_ok(&upstream, "/api/orders").await;
    let gw = build_gateway(test_config(&jwks_url(&jwks), &upstream.uri()));

    let (status, _) = send(
        &gw.router,
        bearer_request("/api/orders", &old_key.good_token()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(gw.cache.fetch_count(), 1);

    // A token signed by the rotated-in key has a kid the snapshot does not
    // know yet; one refresh resolves it.
    let (status, _) = send(
        &gw.router,
        bearer_request("/api/orders", &new_key.good_token()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(gw.cache.fetch_count(), 2);

    // Pre-rotation tokens keep validating against the retired key.
    let (status, _) = send(
        &gw.router,
        bearer_request("/api/orders", &old_key.good_token()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(gw.cache.fetch_count(), 2);
}

#[tokio::test]
async fn test_cold_cache_with_unreachable_issuer_rejects_as_keyset_unavailable() {
    let issuer = TestIssuer::new("key-a");

    let jwks = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&jwks)
        .await;

    let upstream = MockServer::start().await;
    let gw = build_gateway(test_config(&jwks_url(&jwks), &upstream.uri()));

    let (status, body) = send(
        &gw.router,
        bearer_request("/api/orders", &issuer.good_token()),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "KEYSET_UNAVAILABLE");
    assert!(upstream.received_requests().await.unwrap().is_empty());
}
