//! Circuit-breaker fallback surface.
//!
//! When a downstream circuit is open the routing layer sends requests here
//! instead; each endpoint names the unavailable service in a structured 503.

use crate::error::ErrorResponse;
use axum::http::StatusCode;
use axum::Json;

pub async fn auth() -> (StatusCode, Json<ErrorResponse>) {
    unavailable("AUTH_SERVICE_DOWN", "Authentication service is currently unavailable")
}

pub async fn resource() -> (StatusCode, Json<ErrorResponse>) {
    unavailable("RESOURCE_SERVICE_DOWN", "Resource service is currently unavailable")
}

pub async fn general() -> (StatusCode, Json<ErrorResponse>) {
    unavailable("SERVICE_DOWN", "Service is currently unavailable")
}

fn unavailable(code: &str, message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse::from_parts(
            code,
            message,
            StatusCode::SERVICE_UNAVAILABLE,
        )),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fallbacks_name_the_unavailable_service() {
        let (status, body) = auth().await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.0.error, "AUTH_SERVICE_DOWN");
        assert_eq!(body.0.status, 503);

        let (_, body) = resource().await;
        assert_eq!(body.0.error, "RESOURCE_SERVICE_DOWN");

        let (_, body) = general().await;
        assert_eq!(body.0.error, "SERVICE_DOWN");
    }
}
