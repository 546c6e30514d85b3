mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn plans_are_public_and_unlimited_is_minus_one() {
    let app = TestApp::new();
    let (status, plans) = app.call(Method::GET, "/billing/plans", None, None).await;

    assert_eq!(status, StatusCode::OK);
    let plans = plans.as_array().unwrap();
    assert_eq!(plans.len(), 4);
    assert_eq!(plans[0]["plan"], "free");
    assert_eq!(plans[0]["limits"]["invoices_per_month"], 5);
    assert_eq!(plans[0]["limits"]["reports"], false);
    assert_eq!(plans[2]["plan"], "pro");
    assert_eq!(plans[2]["limits"]["invoices_per_month"], -1);
}

#[tokio::test]
async fn free_plan_stops_at_five_invoices_a_month() {
    let app = TestApp::new();
    let token = app.token().await;
    let client_id = app.create_client(&token, "UAB Klientas").await;

    for _ in 0..5 {
        app.create_invoice(&token, &client_id, json!([])).await;
    }
    let (status, body) = app
        .post("/invoices", &token, json!({ "client_id": client_id }))
        .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED, "{body}");

    let (_, list) = app.get("/invoices", &token).await;
    let first = list["invoices"][0]["invoice_id"].as_str().unwrap().to_string();
    let (status, _) = app
        .post(&format!("/invoices/{first}/duplicate"), &token, json!({}))
        .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
}

#[tokio::test]
async fn cancelled_invoices_still_count_towards_the_monthly_limit() {
    let app = TestApp::new();
    let token = app.token().await;
    let client_id = app.create_client(&token, "UAB Klientas").await;

    for _ in 0..5 {
        let draft = app.create_invoice(&token, &client_id, json!([])).await;
        let id = draft["invoice_id"].as_str().unwrap();
        app.post(&format!("/invoices/{id}/cancel"), &token, json!({})).await;
    }
    let (status, _) = app
        .post("/invoices", &token, json!({ "client_id": client_id }))
        .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
}

#[tokio::test]
async fn upgrading_lifts_the_limit() {
    let app = TestApp::new();
    let token = app.token().await;
    let client_id = app.create_client(&token, "UAB Klientas").await;
    for _ in 0..5 {
        app.create_invoice(&token, &client_id, json!([])).await;
    }

    let (status, subscription) = app
        .put("/billing/subscription", &token, json!({ "plan": "pro" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(subscription["plan"]["plan"], "pro");
    assert_eq!(subscription["usage"]["invoices_this_month"]["used"], 5);
    assert_eq!(subscription["usage"]["invoices_this_month"]["limit"], -1);

    let (status, _) = app
        .post("/invoices", &token, json!({ "client_id": client_id }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn client_limit_counts_active_clients() {
    let app = TestApp::new();
    let token = app.token().await;
    let mut ids = Vec::new();
    for n in 0..10 {
        ids.push(app.create_client(&token, &format!("Klientas {n}")).await);
    }

    let (status, _) = app.post("/clients", &token, json!({ "name": "Vienuoliktas" })).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

    let (status, _) = app.delete(&format!("/clients/{}", ids[0]), &token).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.post("/clients", &token, json!({ "name": "Vienuoliktas" })).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn subscription_reports_usage() {
    let app = TestApp::new();
    let token = app.token().await;
    let client_id = app.create_client(&token, "UAB Klientas").await;
    app.create_invoice(&token, &client_id, json!([])).await;
    app.post("/products", &token, json!({ "name": "Konsultacija", "unit_price": "50" }))
        .await;

    let (status, subscription) = app.get("/billing/subscription", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(subscription["plan"]["plan"], "free");
    assert_eq!(subscription["usage"]["invoices_this_month"]["used"], 1);
    assert_eq!(subscription["usage"]["invoices_this_month"]["limit"], 5);
    assert_eq!(subscription["usage"]["clients"]["used"], 1);
    assert_eq!(subscription["usage"]["products"]["used"], 1);
    assert_eq!(subscription["usage"]["reports"], false);
}

#[tokio::test]
async fn reports_need_a_plan_that_includes_them() {
    let app = TestApp::new();
    let free = app.token().await;
    let basic = app.token_on_plan("basic").await;
    let pro = app.token_on_plan("pro").await;

    for path in ["/reports/revenue", "/reports/vat", "/reports/clients", "/reports/export/invoices"] {
        let (status, _) = app.get(path, &free).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "free {path}");
        let (status, _) = app.get(path, &basic).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "basic {path}");
    }
    let (status, _) = app.get("/reports/revenue", &pro).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/dashboard", &free).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_plan_is_rejected() {
    let app = TestApp::new();
    let token = app.token().await;
    let (status, _) = app
        .put("/billing/subscription", &token, json!({ "plan": "platinum" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
