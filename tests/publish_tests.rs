//! Publish-state endpoints and the scheduled publisher.

mod common;

use axum::http::StatusCode;
use common::{NOW, TestApp, body_json};
use lectern::db::{ContentKind, PublishState, PublishStatus};
use lectern::publisher::publish_due;

#[tokio::test]
async fn test_publish_requires_token() {
    let (app, seed) = TestApp::seeded().await;

    let response = app
        .put(&format!("/api/events/{}/publish", seed.event), None, None)
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_publish_requires_organization_role() {
    let (app, seed) = TestApp::seeded().await;
    let token = app.token_for(seed.admin).await;

    let response = app
        .put(&format!("/api/events/{}/publish", seed.event), Some(&token), None)
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_publish_requires_ownership() {
    let (app, seed) = TestApp::seeded().await;
    let token = app.token_for(seed.other_org).await;

    let response = app
        .put(&format!("/api/sessions/{}/publish", seed.session), Some(&token), None)
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        app.db
            .content()
            .get_state(ContentKind::Session, seed.session)
            .await
            .unwrap(),
        Some(PublishState::draft())
    );
}

#[tokio::test]
async fn test_unknown_item_is_not_found() {
    let (app, seed) = TestApp::seeded().await;
    let token = app.token_for(seed.org_owner).await;

    let response = app.put("/api/events/999/publish", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Event not found");

    let response = app.put("/api/sessions/999/unpublish", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Session not found");
}

#[tokio::test]
async fn test_publish_and_unpublish() {
    let (app, seed) = TestApp::seeded().await;
    let token = app.token_for(seed.org_owner).await;

    let response = app
        .put(&format!("/api/events/{}/publish", seed.event), Some(&token), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["id"], seed.event);
    assert_eq!(json["publish_status"], "PUBLISHED");
    assert!(json["publish_at"].is_null());

    let response = app
        .put(&format!("/api/events/{}/unpublish", seed.event), Some(&token), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["publish_status"], "DRAFT");
    assert!(json["publish_at"].is_null());

    assert_eq!(
        app.db
            .content()
            .get_state(ContentKind::Event, seed.event)
            .await
            .unwrap(),
        Some(PublishState::draft())
    );
}

#[tokio::test]
async fn test_schedule_sets_time() {
    let (app, seed) = TestApp::seeded().await;
    let token = app.token_for(seed.org_owner).await;

    let response = app
        .put(
            &format!("/api/sessions/{}/schedule", seed.session),
            Some(&token),
            Some(r#"{"publish_at": "2023-11-15T00:00:00+01:00"}"#),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["publish_status"], "SCHEDULED");
    assert_eq!(json["publish_at"], "2023-11-14T23:00:00Z");
}

#[tokio::test]
async fn test_schedule_rejects_bad_bodies() {
    let (app, seed) = TestApp::seeded().await;
    let token = app.token_for(seed.org_owner).await;
    let uri = format!("/api/events/{}/schedule", seed.event);

    for body in [None, Some("not json"), Some("{}"), Some(r#"{"publish_at": "next week"}"#)] {
        let response = app.put(&uri, Some(&token), body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{:?}", body);
        assert!(body_json(response).await["error"].is_string());
    }

    assert_eq!(
        app.db
            .content()
            .get_state(ContentKind::Event, seed.event)
            .await
            .unwrap(),
        Some(PublishState::draft())
    );
}

#[tokio::test]
async fn test_scheduled_content_goes_live() {
    let (app, seed) = TestApp::seeded().await;
    let org_token = app.token_for(seed.org_owner).await;
    let admin_token = app.token_for(seed.admin).await;

    // NOW is 2023-11-14T22:13:20Z; schedule one hour ahead.
    let response = app
        .put(
            &format!("/api/events/{}/schedule", seed.event),
            Some(&org_token),
            Some(r#"{"publish_at": "2023-11-14T23:13:20Z"}"#),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get("/api/admin/scheduled", Some(&admin_token)).await;
    let json = body_json(response).await;
    assert_eq!(
        json,
        serde_json::json!([{
            "kind": "event",
            "id": seed.event,
            "title": "Rust Week",
            "publish_at": "2023-11-14T23:13:20Z",
        }])
    );

    let report = publish_due(&app.db, NOW).await.unwrap();
    assert_eq!(report.total(), 0);

    app.clock.advance(3600);
    let report = publish_due(&app.db, app.clock.now()).await.unwrap();
    assert_eq!(report.events, 1);

    let state = app
        .db
        .content()
        .get_state(ContentKind::Event, seed.event)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.status, PublishStatus::Published);

    let response = app.get("/api/admin/scheduled", Some(&admin_token)).await;
    assert_eq!(body_json(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_publish_clears_schedule() {
    let (app, seed) = TestApp::seeded().await;
    let token = app.token_for(seed.org_owner).await;

    app.put(
        &format!("/api/sessions/{}/schedule", seed.session),
        Some(&token),
        Some(r#"{"publish_at": "2030-01-01T00:00:00Z"}"#),
    )
    .await;
    let response = app
        .put(&format!("/api/sessions/{}/publish", seed.session), Some(&token), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(
        app.db
            .content()
            .get_state(ContentKind::Session, seed.session)
            .await
            .unwrap(),
        Some(PublishState::published())
    );
}

#[tokio::test]
async fn test_malformed_id_is_json_bad_request() {
    let (app, seed) = TestApp::seeded().await;
    let token = app.token_for(seed.org_owner).await;

    let response = app.put("/api/events/abc/publish", Some(&token), None).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get(axum::http::header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert!(body_json(response).await["error"].is_string());
}
