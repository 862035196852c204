#![allow(clippy::unwrap_used, clippy::panic, clippy::missing_panics_doc, unreachable_pub)]
use reqwest::StatusCode;

mod common;

async fn active_mailings(app: &common::TestApp, user: &common::TestUser) -> i64 {
    let (status, body) = app.get_json(user, "/stats").await;
    assert_eq!(status, StatusCode::OK);
    body["activeMailings"].as_i64().unwrap()
}

// Dashboard counters are global, so this binary holds a single test to keep them stable.
#[tokio::test]
async fn test_active_count_does_not_wait_for_status_refresh() {
    let app = common::TestApp::spawn().await;
    let user = app.register("active_counter").await;
    let moderator = app.register("active_moderator").await;
    app.grant(&moderator, &["can_disable_mailing"]).await;

    let message_id = app.create_message(&user, "Counted").await;
    let mailing_id = app.create_mailing(&user, message_id, &[]).await;

    let before = active_mailings(&app, &user).await;
    app.open_window(mailing_id).await;

    // Nobody has read the mailing yet, so the stored status is still stale
    let stored: String = sqlx::query_scalar("SELECT status FROM mailings WHERE id = $1")
        .bind(mailing_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(stored, "created");

    assert_eq!(active_mailings(&app, &user).await, before + 1);

    // Reading reconciles the status without changing the count
    let (_, body) = app.get_json(&user, &format!("/mailings/{mailing_id}")).await;
    assert_eq!(body["status"], "running");
    assert_eq!(active_mailings(&app, &user).await, before + 1);

    // Disabled mailings are never active, even inside their window
    assert_eq!(app.post_empty(&moderator, &format!("/mailings/{mailing_id}/disable")).await.status(), StatusCode::OK);
    assert_eq!(active_mailings(&app, &user).await, before);
}
