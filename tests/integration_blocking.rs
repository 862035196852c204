#![allow(clippy::unwrap_used, clippy::panic, clippy::missing_panics_doc, unreachable_pub)]
use reqwest::StatusCode;
use serde_json::json;

mod common;

#[tokio::test]
async fn test_blocked_user_loses_access_until_unblocked() {
    let app = common::TestApp::spawn().await;
    let admin = app.register("blocker").await;
    let target = app.register("blocked").await;
    app.grant(&admin, &["can_block_users"]).await;

    let resp = app.post_empty(&admin, &format!("/users/{}/block", target.id)).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // Existing access tokens stop working immediately
    let (status, _) = app.get_json(&target, "/recipients").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Refresh tokens were revoked
    let resp = app
        .client
        .post(app.url("/sessions/refresh"))
        .json(&json!({ "refreshToken": target.refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let login = json!({ "username": target.username, "password": "password123" });
    let resp = app.client.post(app.url("/sessions")).json(&login).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app.post_empty(&admin, &format!("/users/{}/unblock", target.id)).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app.client.post(app.url("/sessions")).json(&login).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_blocking_requires_permission() {
    let app = common::TestApp::spawn().await;
    let user = app.register("no_block_perm").await;
    let target = app.register("block_target").await;

    let resp = app.post_empty(&user, &format!("/users/{}/block", target.id)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_cannot_block_self() {
    let app = common::TestApp::spawn().await;
    let admin = app.register("self_blocker").await;
    app.grant(&admin, &["can_block_users"]).await;

    let resp = app.post_empty(&admin, &format!("/users/{}/block", admin.id)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
