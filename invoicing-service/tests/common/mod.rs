//! Test helpers for invoicing-service integration tests.
//!
//! Drives the full router in-process over the in-memory store and the mock
//! mail transport.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use invoicing_service::{
    build_router, config::InvoicingConfig, services::InMemoryStore, services::MockEmailProvider,
    AppState,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

pub const PASSWORD: &str = "slaptazodis123";

#[derive(Clone)]
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub email: Arc<MockEmailProvider>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let email = Arc::new(MockEmailProvider::new(true));
        let state = AppState::new(InvoicingConfig::default(), store.clone(), email.clone())
            .expect("Failed to build state");
        Self {
            router: build_router(state),
            store,
            email,
        }
    }

    pub async fn raw(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        self.router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    /// Send a request and decode the JSON response (Null for empty bodies).
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.raw(method, uri, token, body).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::DELETE, uri, Some(token), None).await
    }

    /// Register an account and return its session.
    pub async fn register(&self, email: &str) -> Value {
        let (status, body) = self
            .call(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({
                    "email": email,
                    "password": PASSWORD,
                    "first_name": "Jonas",
                    "last_name": "Jonaitis"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body
    }

    /// Register a fresh account and return its access token.
    pub async fn token(&self) -> String {
        let email = format!("user-{}@example.lt", uuid::Uuid::new_v4());
        let session = self.register(&email).await;
        session["access_token"].as_str().unwrap().to_string()
    }

    /// Token for an account on `plan`.
    pub async fn token_on_plan(&self, plan: &str) -> String {
        let token = self.token().await;
        let (status, body) = self
            .put("/billing/subscription", &token, json!({ "plan": plan }))
            .await;
        assert_eq!(status, StatusCode::OK, "plan change failed: {body}");
        token
    }

    pub async fn create_client(&self, token: &str, name: &str) -> String {
        let (status, body) = self
            .post(
                "/clients",
                token,
                json!({ "name": name, "email": "buhalterija@klientas.lt" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "client create failed: {body}");
        body["client_id"].as_str().unwrap().to_string()
    }

    /// Create a draft invoice with the given items.
    pub async fn create_invoice(&self, token: &str, client_id: &str, items: Value) -> Value {
        let (status, body) = self
            .post(
                "/invoices",
                token,
                json!({ "client_id": client_id, "items": items }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "invoice create failed: {body}");
        body
    }

    /// Create a one-line invoice and send it.
    pub async fn sent_invoice(&self, token: &str, client_id: &str) -> Value {
        let draft = self
            .create_invoice(
                token,
                client_id,
                json!([{ "description": "Konsultacija", "quantity": "1", "unit_price": "100.00", "tax_rate": 21 }]),
            )
            .await;
        let id = draft["invoice_id"].as_str().unwrap();
        let (status, body) = self
            .post(&format!("/invoices/{id}/send"), token, json!({}))
            .await;
        assert_eq!(status, StatusCode::OK, "send failed: {body}");
        body
    }
}

/// Read a JSON money value.
pub fn money(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        Value::Number(n) => n.to_string().parse().unwrap(),
        other => panic!("not a money value: {other}"),
    }
}

/// Token query parameter from a link in an email body.
pub fn token_from_link(body: &str) -> String {
    body.split("token=")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap()
        .to_string()
}
