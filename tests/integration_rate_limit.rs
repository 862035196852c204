#![allow(clippy::unwrap_used, clippy::panic, clippy::missing_panics_doc, unreachable_pub)]
use reqwest::StatusCode;
use serde_json::json;

mod common;

#[tokio::test]
async fn test_auth_routes_are_throttled_per_client() {
    let mut config = common::get_test_config();
    config.rate_limit.auth_per_second = 1;
    config.rate_limit.auth_burst = 2;
    let app = common::TestApp::spawn_with_config(config).await;

    let login = json!({ "username": "nobody_here", "password": "password123" });
    let mut statuses = Vec::new();
    for _ in 0..4 {
        let resp = app
            .client
            .post(app.url("/sessions"))
            .header("x-forwarded-for", "203.0.113.7")
            .json(&login)
            .send()
            .await
            .unwrap();
        statuses.push(resp.status());
    }

    assert_eq!(statuses[0], StatusCode::UNAUTHORIZED);
    assert!(statuses.contains(&StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn test_resource_routes_are_not_throttled() {
    let mut config = common::get_test_config();
    config.rate_limit.auth_per_second = 1;
    config.rate_limit.auth_burst = 1;
    let app = common::TestApp::spawn_with_config(config).await;

    // Registration spends the single token for this client
    let user = app.register("unthrottled").await;

    for _ in 0..5 {
        let (status, _) = app.get_json(&user, "/recipients").await;
        assert_eq!(status, StatusCode::OK);
    }
}
