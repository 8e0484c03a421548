use axum::{Extension, Json, extract::State, http::StatusCode};
use serde_json::{Value, json};
use warden_core::domain::users::{
    AdminGreeting, AuthToken, CurrentUser, LoginRequest, PasswordChange,
    RegisterRequest, User, UserPatch, UserProfile,
};

use crate::infra::{
    app_state::AppState,
    errors::{AppJson, AppResult},
};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn register(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> AppResult<Json<UserProfile>> {
    let user = state.accounts().register(request).await?;
    Ok(Json(user.into()))
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> AppResult<Json<AuthToken>> {
    let token = state.accounts().login(request).await?;
    Ok(Json(token))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Json<CurrentUser> {
    Json(state.accounts().current_user(&user))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppJson(patch): AppJson<UserPatch>,
) -> AppResult<Json<UserProfile>> {
    let updated = state.accounts().update_profile(user.id, patch).await?;
    Ok(Json(updated.into()))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    AppJson(request): AppJson<PasswordChange>,
) -> AppResult<StatusCode> {
    state.accounts().change_password(user.id, request).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reachable only through the admin role gate.
pub async fn admin_only(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Json<AdminGreeting> {
    Json(state.accounts().admin_greeting(&user))
}
