#![allow(clippy::unwrap_used, clippy::panic, clippy::missing_panics_doc, unreachable_pub)]
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

mod common;

#[tokio::test]
async fn test_login_with_valid_and_invalid_password() {
    let app = common::TestApp::spawn().await;
    let user = app.register("login_user").await;

    let resp = app
        .client
        .post(app.url("/sessions"))
        .json(&json!({ "username": user.username, "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["expiresAt"].as_i64().is_some());

    let resp = app
        .client
        .post(app.url("/sessions"))
        .json(&json!({ "username": user.username, "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_flow() {
    let app = common::TestApp::spawn().await;
    let user = app.register("refresh_user").await;

    let resp = app
        .client
        .post(app.url("/sessions/refresh"))
        .json(&json!({ "refreshToken": user.refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = resp.json().await.unwrap();
    let rotated = body["refreshToken"].as_str().unwrap();
    assert_ne!(rotated, user.refresh_token, "Refresh token should rotate");

    // The consumed token cannot be replayed
    let resp = app
        .client
        .post(app.url("/sessions/refresh"))
        .json(&json!({ "refreshToken": user.refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let app = common::TestApp::spawn().await;
    let user = app.register("logout_user").await;

    let resp = app
        .client
        .delete(app.url("/sessions"))
        .bearer_auth(&user.token)
        .json(&json!({ "refreshToken": user.refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .client
        .post(app.url("/sessions/refresh"))
        .json(&json!({ "refreshToken": user.refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_registration_rejects_duplicates_and_bad_input() {
    let app = common::TestApp::spawn().await;
    let user = app.register("dup_user").await;

    let resp = app
        .client
        .post(app.url("/users"))
        .json(&json!({ "username": user.username, "email": "other@example.com", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let username = format!("bad_email_{}", &Uuid::new_v4().simple().to_string()[..8]);
    let resp = app
        .client
        .post(app.url("/users"))
        .json(&json!({ "username": username, "email": "not-an-email", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn test_protected_routes_require_bearer_token() {
    let app = common::TestApp::spawn().await;

    let resp = app.client.get(app.url("/recipients")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app.client.get(app.url("/mailings")).bearer_auth("garbage.token.value").send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
