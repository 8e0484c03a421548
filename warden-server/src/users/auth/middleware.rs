use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::infra::{app_state::AppState, errors::AppError};

/// Resolve the bearer token to a [`User`](warden_core::domain::users::User)
/// and attach it to the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&request)?.to_owned();
    let user = state.accounts().authenticate(&token).await?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn extract_bearer_token(request: &Request) -> Result<&str, AppError> {
    let missing = || AppError::unauthorized("Missing bearer token");

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(missing)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(missing)
}
