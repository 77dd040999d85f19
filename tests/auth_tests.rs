//! Identity tokens and role gates exercised through the full router.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{NOW, TestApp, body_json};
use lectern::db::{Role, RoleSet};
use lectern::jwt::{JwtConfig, TOKEN_DURATION_SECS};

#[tokio::test]
async fn test_me_without_token() {
    let app = TestApp::new().await;

    let response = app.get("/api/auth/me", None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Not authenticated");
}

#[tokio::test]
async fn test_me_returns_principal() {
    let app = TestApp::new().await;
    let user = app
        .db
        .users()
        .create("a@example.com", "A", &RoleSet::from([Role::User, Role::Affiliate]))
        .await
        .unwrap();
    let token = app.token_for(user).await;

    let response = app.get("/api/auth/me", Some(&token)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["user_id"], user);
    assert_eq!(json["roles"], serde_json::json!(["USER", "AFFILIATE"]));
}

#[tokio::test]
async fn test_invalid_and_missing_tokens_look_the_same() {
    let app = TestApp::new().await;

    let missing = body_json(app.get("/api/auth/me", None).await).await;
    let invalid = body_json(app.get("/api/auth/me", Some("not-a-token")).await).await;

    assert_eq!(missing, invalid);
}

#[tokio::test]
async fn test_token_expires_after_lifetime() {
    let app = TestApp::new().await;
    let user = app
        .db
        .users()
        .create("a@example.com", "A", &RoleSet::from([Role::User]))
        .await
        .unwrap();
    let token = app.token_for(user).await;

    app.clock.set(NOW + TOKEN_DURATION_SECS - 1);
    let response = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    app.clock.set(NOW + TOKEN_DURATION_SECS);
    let response = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_secret_rejected() {
    let app = TestApp::new().await;
    let forged = JwtConfig::new(b"some-other-secret-entirely-0123456789")
        .unwrap()
        .issue_at(1, &RoleSet::from([Role::Admin]), NOW)
        .unwrap()
        .token;

    let response = app.get("/api/admin/scheduled", Some(&forged)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tampered_token_rejected() {
    let app = TestApp::new().await;
    let token = app
        .jwt
        .issue_at(1, &RoleSet::from([Role::User]), NOW)
        .unwrap()
        .token;
    // Swap the payload for one claiming ADMIN, keeping the original signature.
    let admin = app
        .jwt
        .issue_at(1, &RoleSet::from([Role::Admin]), NOW)
        .unwrap()
        .token;
    let parts: Vec<&str> = token.split('.').collect();
    let admin_parts: Vec<&str> = admin.split('.').collect();
    let tampered = format!("{}.{}.{}", parts[0], admin_parts[1], parts[2]);

    let response = app.get("/api/admin/scheduled", Some(&tampered)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_bearer_scheme_rejected() {
    let app = TestApp::new().await;
    let token = app
        .jwt
        .issue_at(1, &RoleSet::from([Role::User]), NOW)
        .unwrap()
        .token;

    let response = app
        .send(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::AUTHORIZATION, format!("Basic {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_route_requires_admin_role() {
    let (app, seed) = TestApp::seeded().await;

    let token = app.token_for(seed.buyer).await;
    let response = app.get("/api/admin/scheduled", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Insufficient permissions");

    let token = app.token_for(seed.admin).await;
    let response = app.get("/api/admin/scheduled", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_roles_come_from_the_token() {
    let (app, seed) = TestApp::seeded().await;
    let token = app.token_for(seed.buyer).await;

    // Promotion in storage does not change what an already issued token carries.
    app.db
        .users()
        .set_roles(seed.buyer, &RoleSet::from([Role::User, Role::Admin]))
        .await
        .unwrap();

    let response = app.get("/api/admin/scheduled", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let fresh = app.token_for(seed.buyer).await;
    let response = app.get("/api/admin/scheduled", Some(&fresh)).await;
    assert_eq!(response.status(), StatusCode::OK);
}
