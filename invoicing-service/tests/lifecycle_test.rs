mod common;

use axum::body::to_bytes;
use axum::http::{header, Method, StatusCode};
use chrono::{Duration, Utc};
use common::{money, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

fn item() -> serde_json::Value {
    json!([{ "description": "Konsultacija", "quantity": "1", "unit_price": "100.00", "tax_rate": 21 }])
}

#[tokio::test]
async fn sending_emails_the_pdf_and_assigns_a_reference() {
    let app = TestApp::new();
    let token = app.token().await;
    let client_id = app.create_client(&token, "UAB Klientas").await;
    let emails_before = app.email.send_count();

    let sent = app.sent_invoice(&token, &client_id).await;

    assert_eq!(sent["status"], "sent");
    assert!(sent["sent_utc"].is_string());
    let reference = sent["payment_reference"].as_str().unwrap();
    assert!(reference.starts_with("SF"));
    assert_eq!(reference.len(), 34);

    assert_eq!(app.email.send_count(), emails_before + 1);
    let message = app.email.last_message().unwrap();
    assert_eq!(message.to, "buhalterija@klientas.lt");
    let attachment = message.attachment.unwrap();
    assert_eq!(attachment.filename, "SF000001.pdf");
    assert!(attachment.data.starts_with(b"%PDF"));
}

#[tokio::test]
async fn failed_delivery_leaves_the_invoice_in_draft() {
    let app = TestApp::new();
    let token = app.token().await;
    let client_id = app.create_client(&token, "UAB Klientas").await;
    let draft = app.create_invoice(&token, &client_id, item()).await;
    let id = draft["invoice_id"].as_str().unwrap();

    app.email.set_failing(true);
    let (status, _) = app.post(&format!("/invoices/{id}/send"), &token, json!({})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, detail) = app.get(&format!("/invoices/{id}"), &token).await;
    assert_eq!(detail["status"], "draft");
    assert!(detail["payment_reference"].is_null());

    app.email.set_failing(false);
    let (status, sent) = app.post(&format!("/invoices/{id}/send"), &token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["status"], "sent");
}

#[tokio::test]
async fn empty_invoices_and_clients_without_email_cannot_be_sent() {
    let app = TestApp::new();
    let token = app.token().await;
    let client_id = app.create_client(&token, "UAB Klientas").await;
    let empty = app.create_invoice(&token, &client_id, json!([])).await;
    let (status, _) = app
        .post(&format!("/invoices/{}/send", empty["invoice_id"].as_str().unwrap()), &token, json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, silent) = app.post("/clients", &token, json!({ "name": "Be pašto" })).await;
    let no_email = app
        .create_invoice(&token, silent["client_id"].as_str().unwrap(), item())
        .await;
    let (status, _) = app
        .post(&format!("/invoices/{}/send", no_email["invoice_id"].as_str().unwrap()), &token, json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_drafts_can_be_edited() {
    let app = TestApp::new();
    let token = app.token().await;
    let client_id = app.create_client(&token, "UAB Klientas").await;
    let sent = app.sent_invoice(&token, &client_id).await;
    let id = sent["invoice_id"].as_str().unwrap();
    let item_id = sent["items"][0]["line_item_id"].as_str().unwrap();

    let (status, _) = app
        .put(&format!("/invoices/{id}"), &token, json!({ "notes": "Ačiū" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            &format!("/invoices/{id}/items"),
            &token,
            json!({ "description": "Papildomai", "quantity": "1", "unit_price": "5" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .put(&format!("/invoices/{id}/items/{item_id}"), &token, json!({ "quantity": "2" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, detail) = app.get(&format!("/invoices/{id}"), &token).await;
    assert_eq!(money(&detail["total"]), dec!(121.00));
}

#[tokio::test]
async fn paid_invoices_cannot_be_cancelled() {
    let app = TestApp::new();
    let token = app.token().await;
    let client_id = app.create_client(&token, "UAB Klientas").await;
    let sent = app.sent_invoice(&token, &client_id).await;
    let id = sent["invoice_id"].as_str().unwrap();

    let (status, paid) = app
        .post(&format!("/invoices/{id}/pay"), &token, json!({ "paid_date": "2024-05-02" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "paid");
    assert_eq!(paid["paid_date"], "2024-05-02");
    assert_eq!(money(&paid["paid_amount"]), dec!(121.00));

    let (status, _) = app.post(&format!("/invoices/{id}/cancel"), &token, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn paid_amount_must_fit_a_stored_amount() {
    let app = TestApp::new();
    let token = app.token().await;
    let client_id = app.create_client(&token, "UAB Klientas").await;
    let sent = app.sent_invoice(&token, &client_id).await;
    let id = sent["invoice_id"].as_str().unwrap();

    for paid_amount in ["120.005", "1000000000000"] {
        let (status, body) = app
            .post(&format!("/invoices/{id}/pay"), &token, json!({ "paid_amount": paid_amount }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    }

    let (status, paid) = app
        .post(&format!("/invoices/{id}/pay"), &token, json!({ "paid_amount": "120.50" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&paid["paid_amount"]), dec!(120.50));
}

#[tokio::test]
async fn drafts_cannot_be_paid_and_cancelled_invoices_stay_cancelled() {
    let app = TestApp::new();
    let token = app.token().await;
    let client_id = app.create_client(&token, "UAB Klientas").await;
    let draft = app.create_invoice(&token, &client_id, item()).await;
    let id = draft["invoice_id"].as_str().unwrap();

    let (status, _) = app.post(&format!("/invoices/{id}/pay"), &token, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, cancelled) = app.post(&format!("/invoices/{id}/cancel"), &token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    for action in ["send", "pay", "cancel"] {
        let (status, _) = app
            .post(&format!("/invoices/{id}/{action}"), &token, json!({}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{action}");
    }
}

#[tokio::test]
async fn past_due_sent_invoices_read_as_overdue_and_can_still_be_paid() {
    let app = TestApp::new();
    let token = app.token().await;
    let client_id = app.create_client(&token, "UAB Klientas").await;
    let today = Utc::now().date_naive();

    let (status, draft) = app
        .post(
            "/invoices",
            &token,
            json!({
                "client_id": client_id,
                "invoice_date": (today - Duration::days(30)).to_string(),
                "due_date": (today - Duration::days(16)).to_string(),
                "items": item()
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = draft["invoice_id"].as_str().unwrap();
    let (status, _) = app.post(&format!("/invoices/{id}/send"), &token, json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (_, detail) = app.get(&format!("/invoices/{id}"), &token).await;
    assert_eq!(detail["status"], "overdue");

    let (_, list) = app.get("/invoices?status=overdue", &token).await;
    assert_eq!(list["total"], 1);

    let (status, paid) = app.post(&format!("/invoices/{id}/pay"), &token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "paid");
}

#[tokio::test]
async fn due_date_defaults_to_payment_terms_and_cannot_precede_invoice_date() {
    let app = TestApp::new();
    let token = app.token().await;
    let client_id = app.create_client(&token, "UAB Klientas").await;

    let (_, draft) = app
        .post(
            "/invoices",
            &token,
            json!({ "client_id": client_id, "invoice_date": "2024-03-01" }),
        )
        .await;
    assert_eq!(draft["due_date"], "2024-03-15");

    let (status, _) = app
        .post(
            "/invoices",
            &token,
            json!({ "client_id": client_id, "invoice_date": "2024-03-01", "due_date": "2024-02-28" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_creates_a_new_draft_with_the_same_lines() {
    let app = TestApp::new();
    let token = app.token().await;
    let client_id = app.create_client(&token, "UAB Klientas").await;
    let sent = app.sent_invoice(&token, &client_id).await;

    let (status, copy) = app
        .post(
            &format!("/invoices/{}/duplicate", sent["invoice_id"].as_str().unwrap()),
            &token,
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(copy["status"], "draft");
    assert_eq!(copy["invoice_number"], "SF000002");
    assert_eq!(copy["invoice_date"], Utc::now().date_naive().to_string());
    assert_eq!(copy["items"].as_array().unwrap().len(), 1);
    assert_eq!(money(&copy["total"]), money(&sent["total"]));
    assert!(copy["payment_reference"].is_null());
}

#[tokio::test]
async fn reminders_go_out_only_for_outstanding_invoices() {
    let app = TestApp::new();
    let token = app.token().await;
    let client_id = app.create_client(&token, "UAB Klientas").await;
    let draft = app.create_invoice(&token, &client_id, item()).await;
    let (status, _) = app
        .post(&format!("/invoices/{}/remind", draft["invoice_id"].as_str().unwrap()), &token, json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let sent = app.sent_invoice(&token, &client_id).await;
    let before = app.email.send_count();
    let (status, _) = app
        .post(&format!("/invoices/{}/remind", sent["invoice_id"].as_str().unwrap()), &token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.email.send_count(), before + 1);
    assert!(app.email.last_message().unwrap().attachment.is_none());
}

#[tokio::test]
async fn pdf_download_is_an_attachment() {
    let app = TestApp::new();
    let token = app.token().await;
    let client_id = app.create_client(&token, "UAB Klientas").await;
    let draft = app.create_invoice(&token, &client_id, item()).await;

    let response = app
        .raw(
            Method::GET,
            &format!("/invoices/{}/pdf", draft["invoice_id"].as_str().unwrap()),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"SF000001.pdf\""
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn invoices_of_other_companies_are_not_found() {
    let app = TestApp::new();
    let owner = app.token().await;
    let stranger = app.token().await;
    let client_id = app.create_client(&owner, "UAB Klientas").await;
    let draft = app.create_invoice(&owner, &client_id, item()).await;
    let id = draft["invoice_id"].as_str().unwrap();

    let (status, _) = app.get(&format!("/invoices/{id}"), &stranger).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.post(&format!("/invoices/{id}/cancel"), &stranger, json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
