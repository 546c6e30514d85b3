mod common;

use axum::{
    body::to_bytes,
    http::{header, Method, StatusCode},
};
use common::TestApp;

#[tokio::test]
async fn health_reports_service_and_version() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "invoicing-service");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn readiness_is_ok_with_a_healthy_store() {
    let app = TestApp::new();
    let response = app.raw(Method::GET, "/ready", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn metrics_are_plain_text() {
    let app = TestApp::new();
    let response = app.raw(Method::GET, "/metrics", None, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/plain"), "{content_type}");
}

#[tokio::test]
async fn responses_carry_request_id_and_security_headers() {
    let app = TestApp::new();
    let response = app.raw(Method::GET, "/health", None, None).await;

    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new();
    let response = app
        .raw(Method::GET, "/.well-known/openapi.json", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(doc["paths"]["/invoices/{invoice_id}/send"].is_object());
    assert!(doc["components"]["securitySchemes"]["bearer_auth"].is_object());
}
