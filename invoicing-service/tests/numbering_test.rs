mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;
use std::collections::HashSet;

fn one_item() -> serde_json::Value {
    json!([{ "description": "Konsultacija", "quantity": "1", "unit_price": "10" }])
}

#[tokio::test]
async fn invoices_are_numbered_sequentially_with_company_prefix() {
    let app = TestApp::new();
    let token = app.token().await;
    let client_id = app.create_client(&token, "UAB Klientas").await;

    let first = app.create_invoice(&token, &client_id, one_item()).await;
    let second = app.create_invoice(&token, &client_id, one_item()).await;

    assert_eq!(first["invoice_number"], "SF000001");
    assert_eq!(second["invoice_number"], "SF000002");
}

#[tokio::test]
async fn prefix_and_counter_changes_apply_to_the_next_invoice() {
    let app = TestApp::new();
    let token = app.token().await;
    let client_id = app.create_client(&token, "UAB Klientas").await;

    let (status, company) = app
        .put(
            "/company/invoice-settings",
            &token,
            json!({ "invoice_prefix": "AB", "next_invoice_number": 41 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(company["invoice_prefix"], "AB");

    let invoice = app.create_invoice(&token, &client_id, one_item()).await;
    assert_eq!(invoice["invoice_number"], "AB000041");
}

#[tokio::test]
async fn counter_cannot_move_backwards() {
    let app = TestApp::new();
    let token = app.token().await;
    let client_id = app.create_client(&token, "UAB Klientas").await;
    app.create_invoice(&token, &client_id, one_item()).await;
    app.create_invoice(&token, &client_id, one_item()).await;

    let (status, _) = app
        .put(
            "/company/invoice-settings",
            &token,
            json!({ "next_invoice_number": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let invoice = app.create_invoice(&token, &client_id, one_item()).await;
    assert_eq!(invoice["invoice_number"], "SF000003");
}

#[tokio::test]
async fn companies_have_independent_counters() {
    let app = TestApp::new();
    let alice = app.token().await;
    let bob = app.token().await;
    let alice_client = app.create_client(&alice, "UAB Alfa").await;
    let bob_client = app.create_client(&bob, "UAB Beta").await;

    app.create_invoice(&alice, &alice_client, one_item()).await;
    app.create_invoice(&alice, &alice_client, one_item()).await;
    let bobs = app.create_invoice(&bob, &bob_client, one_item()).await;

    assert_eq!(bobs["invoice_number"], "SF000001");
}

#[tokio::test]
async fn concurrent_creates_never_share_a_number() {
    let app = TestApp::new();
    let token = app.token_on_plan("enterprise").await;
    let client_id = app.create_client(&token, "UAB Klientas").await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let app = app.clone();
        let token = token.clone();
        let client_id = client_id.clone();
        handles.push(tokio::spawn(async move {
            app.create_invoice(&token, &client_id, json!([])).await["invoice_number"]
                .as_str()
                .unwrap()
                .to_string()
        }));
    }

    let mut numbers = HashSet::new();
    for handle in handles {
        numbers.insert(handle.await.unwrap());
    }

    assert_eq!(numbers.len(), 20);
    for n in 1..=20 {
        assert!(numbers.contains(&format!("SF{:06}", n)), "missing SF{:06}", n);
    }
}
