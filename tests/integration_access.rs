#![allow(clippy::unwrap_used, clippy::panic, clippy::missing_panics_doc, unreachable_pub)]
use reqwest::StatusCode;
use serde_json::json;

mod common;

#[tokio::test]
async fn test_recipients_are_isolated_between_owners() {
    let app = common::TestApp::spawn().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;

    let recipient_id = app.create_recipient(&alice, "alice_contact").await;

    let (status, _) = app.get_json(&alice, &format!("/recipients/{recipient_id}")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get_json(&bob, &format!("/recipients/{recipient_id}")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().is_some());

    let resp = app.client.delete(app.url(&format!("/recipients/{recipient_id}"))).bearer_auth(&bob.token).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Bob's list never contains Alice's rows
    let (status, body) = app.get_json(&bob, "/recipients?limit=100").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body.as_array().unwrap().iter().map(|r| r["id"].as_str().unwrap()).collect();
    assert!(!ids.contains(&recipient_id.to_string().as_str()));
}

#[tokio::test]
async fn test_permission_holder_sees_foreign_resources() {
    let app = common::TestApp::spawn().await;
    let owner = app.register("msg_owner").await;
    let manager = app.register("msg_manager").await;
    app.grant(&manager, &["can_manage_messages", "can_view_all_mailings"]).await;

    let message_id = app.create_message(&owner, "Quarterly update").await;
    let mailing_id = app.create_mailing(&owner, message_id, &[]).await;

    let (status, body) = app.get_json(&manager, &format!("/messages/{message_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subject"], "Quarterly update");

    let (status, body) = app.get_json(&manager, &format!("/mailings/{mailing_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ownerId"], owner.id.to_string());
}

#[tokio::test]
async fn test_missing_resource_is_not_found() {
    let app = common::TestApp::spawn().await;
    let user = app.register("lost").await;

    let (status, _) = app.get_json(&user, &format!("/messages/{}", uuid::Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cannot_attach_foreign_message_or_recipient() {
    let app = common::TestApp::spawn().await;
    let alice = app.register("attach_alice").await;
    let mallory = app.register("attach_mallory").await;

    let foreign_message = app.create_message(&alice, "Private").await;
    let foreign_recipient = app.create_recipient(&alice, "private_contact").await;
    let own_message = app.create_message(&mallory, "Mine").await;

    let start = time::OffsetDateTime::now_utc() + time::Duration::hours(1);
    let end = start + time::Duration::hours(1);

    let resp = app.post_mailing(&mallory, foreign_message, &[], start, end).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app.post_mailing(&mallory, own_message, &[foreign_recipient], start, end).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_user_directory_requires_permission() {
    let app = common::TestApp::spawn().await;
    let user = app.register("dir_user").await;
    let viewer = app.register("dir_viewer").await;
    app.grant(&viewer, &["can_view_users"]).await;

    let (status, _) = app.get_json(&user, "/users").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.get_json(&viewer, "/users?limit=5").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().len() <= 5);
}

#[tokio::test]
async fn test_staff_reads_but_cannot_edit_foreign_profile() {
    let app = common::TestApp::spawn().await;
    let member = app.register("profile_member").await;
    let staff = app.register("profile_staff").await;
    let other = app.register("profile_other").await;
    app.make_staff(&staff).await;

    let (status, body) = app.get_json(&staff, &format!("/users/{}", member.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], member.username);

    let (status, _) = app.get_json(&other, &format!("/users/{}", member.id)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let resp = app
        .client
        .patch(app.url(&format!("/users/{}", member.id)))
        .bearer_auth(&staff.token)
        .json(&json!({ "email": "hijack@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let new_email = format!("{}_new@example.com", member.username);
    let resp = app
        .client
        .patch(app.url(&format!("/users/{}", member.id)))
        .bearer_auth(&member.token)
        .json(&json!({ "email": new_email }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["email"], new_email);
}

#[tokio::test]
async fn test_duplicate_recipient_email_conflicts() {
    let app = common::TestApp::spawn().await;
    let user = app.register("dup_recipient").await;
    let email = format!("{}_contact@example.com", user.username);

    for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
        let resp = app
            .client
            .post(app.url("/recipients"))
            .bearer_auth(&user.token)
            .json(&json!({ "email": email, "fullName": "Twin" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), expected);
    }
}
