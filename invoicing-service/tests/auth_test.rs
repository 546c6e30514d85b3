mod common;

use axum::http::{Method, StatusCode};
use common::{token_from_link, TestApp, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn register_creates_user_company_and_session() {
    let app = TestApp::new();
    let session = app.register("Jonas@Example.lt").await;

    assert_eq!(session["token_type"], "Bearer");
    assert!(session["expires_in"].as_i64().unwrap() > 0);
    assert_eq!(session["user"]["email"], "jonas@example.lt");
    assert_eq!(session["user"]["is_verified"], false);
    assert!(session["user"].get("password_hash").is_none());
    assert_eq!(session["company"]["name"], "Jonas Jonaitis");
    assert_eq!(session["company"]["subscription_plan"], "free");
    assert_eq!(session["company"]["invoice_prefix"], "SF");

    let welcome = app.email.last_message().unwrap();
    assert_eq!(welcome.to, "jonas@example.lt");
    assert!(welcome.body_text.contains("/auth/verify?token="));
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let app = TestApp::new();
    app.register("jonas@example.lt").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "email": "JONAS@example.lt",
                "password": PASSWORD,
                "first_name": "Kitas",
                "last_name": "Jonas"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn registration_input_is_validated() {
    let app = TestApp::new();
    let (status, body) = app
        .call(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "email": "not-an-email",
                "password": "short",
                "first_name": "",
                "last_name": "Jonaitis"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());

    let response = app
        .raw(Method::POST, "/auth/register", None, None)
        .await;
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn login_accepts_right_password_only() {
    let app = TestApp::new();
    app.register("jonas@example.lt").await;

    let (status, session) = app
        .call(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "jonas@example.lt", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(session["access_token"].is_string());

    let (status, _) = app
        .call(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "jonas@example.lt", "password": "neteisingas" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "nera@example.lt", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = TestApp::new();

    let (status, body) = app.call(Method::GET, "/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = app.get("/invoices", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn email_verification_flow() {
    let app = TestApp::new();
    let session = app.register("jonas@example.lt").await;
    let token = session["access_token"].as_str().unwrap();
    let verify = token_from_link(&app.email.last_message().unwrap().body_text);

    let (status, _) = app
        .call(Method::GET, "/auth/verify?token=wrong", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(Method::GET, &format!("/auth/verify?token={verify}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, me) = app.get("/me", token).await;
    assert_eq!(me["user"]["is_verified"], true);
}

#[tokio::test]
async fn password_reset_flow() {
    let app = TestApp::new();
    app.register("jonas@example.lt").await;

    let before = app.email.send_count();
    let (status, _) = app
        .call(
            Method::POST,
            "/auth/forgot-password",
            None,
            Some(json!({ "email": "nera@example.lt" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.email.send_count(), before);

    let (status, _) = app
        .call(
            Method::POST,
            "/auth/forgot-password",
            None,
            Some(json!({ "email": "jonas@example.lt" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let reset = token_from_link(&app.email.last_message().unwrap().body_text);

    let (status, _) = app
        .call(
            Method::POST,
            "/auth/reset-password",
            None,
            Some(json!({ "token": reset, "password": "naujasslaptazodis" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "jonas@example.lt", "password": "naujasslaptazodis" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(
            Method::POST,
            "/auth/reset-password",
            None,
            Some(json!({ "token": reset, "password": "treciasslaptazodis" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_and_password_changes() {
    let app = TestApp::new();
    let session = app.register("jonas@example.lt").await;
    let token = session["access_token"].as_str().unwrap();

    let (status, user) = app
        .put("/me", token, json!({ "first_name": "Petras", "phone": "+37060000000" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["first_name"], "Petras");
    assert_eq!(user["last_name"], "Jonaitis");

    let (status, _) = app
        .post(
            "/me/password",
            token,
            json!({ "current_password": "neteisingas", "new_password": "naujasslaptazodis" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/me/password",
            token,
            json!({ "current_password": PASSWORD, "new_password": "naujasslaptazodis" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, activity) = app.get("/activity?limit=5", token).await;
    let actions: Vec<&str> = activity
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["action"].as_str().unwrap())
        .collect();
    assert!(actions.contains(&"password_change"), "{actions:?}");
}
