mod common;

use axum::http::StatusCode;
use common::{money, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn client_crud() {
    let app = TestApp::new();
    let token = app.token().await;

    let (status, client) = app
        .post(
            "/clients",
            &token,
            json!({
                "name": "UAB Medis",
                "client_type": "company",
                "company_code": "304123456",
                "vat_code": "LT100012345678",
                "email": "info@medis.lt",
                "city": "Vilnius"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(client["country"], "Lietuva");
    assert_eq!(client["is_active"], true);
    let id = client["client_id"].as_str().unwrap();

    let (status, updated) = app
        .put(
            &format!("/clients/{id}"),
            &token,
            json!({ "city": "Kaunas", "contact_person": "Ona Onaitė" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["city"], "Kaunas");
    assert_eq!(updated["name"], "UAB Medis");

    let (status, detail) = app.get(&format!("/clients/{id}"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["contact_person"], "Ona Onaitė");
    assert_eq!(money(&detail["total_invoiced"]), dec!(0));
    assert_eq!(money(&detail["outstanding"]), dec!(0));

    let (status, _) = app
        .get(&format!("/clients/{}", uuid::Uuid::new_v4()), &token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn client_input_is_validated() {
    let app = TestApp::new();
    let token = app.token().await;

    let (status, _) = app
        .post("/clients", &token, json!({ "name": "", "email": "bad" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn client_detail_reports_balance() {
    let app = TestApp::new();
    let token = app.token().await;
    let client = app.create_client(&token, "UAB Balansas").await;

    let paid = app.sent_invoice(&token, &client).await;
    let paid_id = paid["invoice_id"].as_str().unwrap();
    let (status, _) = app
        .post(&format!("/invoices/{paid_id}/pay"), &token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    app.sent_invoice(&token, &client).await;
    app.create_invoice(
        &token,
        &client,
        json!([{ "description": "Juodraštis", "quantity": "1", "unit_price": "999.00" }]),
    )
    .await;

    let (_, detail) = app.get(&format!("/clients/{client}"), &token).await;
    assert_eq!(money(&detail["total_invoiced"]), dec!(121.00));
    assert_eq!(money(&detail["outstanding"]), dec!(121.00));
}

#[tokio::test]
async fn client_with_invoices_is_only_deactivated() {
    let app = TestApp::new();
    let token = app.token().await;
    let used = app.create_client(&token, "UAB Naudojamas").await;
    let unused = app.create_client(&token, "UAB Nenaudojamas").await;
    app.create_invoice(
        &token,
        &used,
        json!([{ "description": "Darbai", "quantity": "1", "unit_price": "10.00" }]),
    )
    .await;

    let (status, removal) = app.delete(&format!("/clients/{used}"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removal["deleted"], false);
    let (status, kept) = app.get(&format!("/clients/{used}"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(kept["is_active"], false);

    let (_, removal) = app.delete(&format!("/clients/{unused}"), &token).await;
    assert_eq!(removal["deleted"], true);
    let (status, _) = app.get(&format!("/clients/{unused}"), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, active) = app.get("/clients", &token).await;
    assert_eq!(active.as_array().unwrap().len(), 0);
    let (_, all) = app.get("/clients?include_inactive=true", &token).await;
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn client_search_matches_name_code_and_email() {
    let app = TestApp::new();
    let token = app.token().await;
    app.post(
        "/clients",
        &token,
        json!({ "name": "UAB Ąžuolas", "company_code": "300111222" }),
    )
    .await;
    app.post(
        "/clients",
        &token,
        json!({ "name": "MB Beržas", "email": "saskaitos@berzas.lt" }),
    )
    .await;

    let (_, by_code) = app.get("/clients?search=300111", &token).await;
    assert_eq!(by_code.as_array().unwrap().len(), 1);
    assert_eq!(by_code[0]["name"], "UAB Ąžuolas");

    let (_, by_email) = app.get("/clients?search=BERZAS", &token).await;
    assert_eq!(by_email.as_array().unwrap().len(), 1);
    assert_eq!(by_email[0]["name"], "MB Beržas");

    let (_, all) = app.get("/clients", &token).await;
    let names: Vec<&str> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["MB Beržas", "UAB Ąžuolas"]);
}

#[tokio::test]
async fn clients_are_scoped_to_company() {
    let app = TestApp::new();
    let owner = app.token().await;
    let other = app.token().await;
    let client = app.create_client(&owner, "UAB Privatus").await;

    let (status, _) = app.get(&format!("/clients/{client}"), &other).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, list) = app.get("/clients", &other).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn product_crud_and_defaults() {
    let app = TestApp::new();
    let token = app.token().await;

    let (status, product) = app
        .post(
            "/products",
            &token,
            json!({ "name": "Konsultacija", "unit_price": "50.00" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(product["tax_rate"], 21);
    assert_eq!(product["unit"], "vnt.");
    assert_eq!(product["product_type"], "service");
    let id = product["product_id"].as_str().unwrap();

    let (status, updated) = app
        .put(
            &format!("/products/{id}"),
            &token,
            json!({ "unit_price": "55.50", "tax_rate": 9 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&updated["unit_price"]), dec!(55.50));
    assert_eq!(updated["tax_rate"], 9);

    let (status, fetched) = app.get(&format!("/products/{id}"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Konsultacija");
}

#[tokio::test]
async fn product_amounts_are_validated() {
    let app = TestApp::new();
    let token = app.token().await;

    let (status, _) = app
        .post(
            "/products",
            &token,
            json!({ "name": "Blogas PVM", "unit_price": "10.00", "tax_rate": 7 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/products",
            &token,
            json!({ "name": "Neigiama kaina", "unit_price": "-1.00" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, list) = app.get("/products", &token).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn product_delete_deactivates() {
    let app = TestApp::new();
    let token = app.token().await;
    let (_, product) = app
        .post(
            "/products",
            &token,
            json!({ "name": "Svetainės priežiūra", "sku": "WEB-01", "unit_price": "80.00" }),
        )
        .await;
    let id = product["product_id"].as_str().unwrap();

    let (status, removed) = app.delete(&format!("/products/{id}"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed["is_active"], false);

    let (_, active) = app.get("/products", &token).await;
    assert!(active.as_array().unwrap().is_empty());
    let (_, by_sku) = app
        .get("/products?search=web-01&include_inactive=true", &token)
        .await;
    assert_eq!(by_sku.as_array().unwrap().len(), 1);

    let (status, _) = app.get(&format!("/products/{id}"), &token).await;
    assert_eq!(status, StatusCode::OK);
}
