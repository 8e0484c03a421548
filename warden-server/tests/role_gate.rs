use anyhow::Result;
use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::Value;
use tower::ServiceExt;
use warden_core::{database::InMemoryUserStore, domain::users::Role};
use warden_server::routes::create_router;

#[path = "support/mod.rs"]
mod support;
use support::{PASSWORD, bearer, build_test_app, build_test_state, login_token, register, set_role};

#[tokio::test]
async fn admin_only_forbids_plain_users() -> Result<()> {
    let app = build_test_app()?;
    register(&app.server, "A", "plain@example.com").await;
    let token = login_token(&app.server, "plain@example.com", PASSWORD).await;

    let response = app
        .server
        .get("/admin-only")
        .add_header("Authorization", bearer(&token))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let body: Value = response.json();
    assert_eq!(body["error"]["status"], 403);
    Ok(())
}

#[tokio::test]
async fn admin_only_requires_authentication() -> Result<()> {
    let app = build_test_app()?;

    app.server
        .get("/admin-only")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn admin_only_greets_admins_and_superadmins() -> Result<()> {
    let app = build_test_app()?;

    for (email, role) in [
        ("admin@example.com", Role::Admin),
        ("root@example.com", Role::Superadmin),
    ] {
        register(&app.server, "A", email).await;
        set_role(&app.store, email, role).await?;
        let token = login_token(&app.server, email, PASSWORD).await;

        let response = app
            .server
            .get("/admin-only")
            .add_header("Authorization", bearer(&token))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["message"], "Hello, A. You have access!");
    }
    Ok(())
}

#[tokio::test]
async fn role_changes_apply_to_existing_tokens() -> Result<()> {
    let app = build_test_app()?;
    register(&app.server, "A", "promoted@example.com").await;
    let token = login_token(&app.server, "promoted@example.com", PASSWORD).await;

    set_role(&app.store, "promoted@example.com", Role::Admin).await?;
    app.server
        .get("/admin-only")
        .add_header("Authorization", bearer(&token))
        .await
        .assert_status_ok();

    set_role(&app.store, "promoted@example.com", Role::User).await?;
    app.server
        .get("/admin-only")
        .add_header("Authorization", bearer(&token))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn health_is_public() -> Result<()> {
    let state = build_test_state(InMemoryUserStore::new())?;
    let response = create_router(state)
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["status"], "ok");
    Ok(())
}
