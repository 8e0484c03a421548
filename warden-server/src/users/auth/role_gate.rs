use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::future::Future;
use std::pin::Pin;
use warden_core::{
    auth::RoleGate,
    domain::users::{Role, User},
};

use crate::infra::errors::AppError;

/// Middleware admitting only users whose role is in `roles`.
///
/// Must run after [`auth_middleware`](super::auth_middleware), which
/// attaches the [`User`] extension. Wire it with
/// `route_layer(middleware::from_fn(require_roles(ROLES)))` placed before the
/// authentication layer so authentication wraps it.
pub fn require_roles(
    roles: &'static [Role],
) -> impl Fn(Request, Next) -> Pin<Box<dyn Future<Output = Response> + Send>>
+ Clone
+ Send
+ Sync
+ 'static {
    move |request: Request, next: Next| {
        Box::pin(check_roles_async(request, next, roles))
    }
}

async fn check_roles_async(
    request: Request,
    next: Next,
    roles: &'static [Role],
) -> Response {
    let verdict = match request.extensions().get::<User>() {
        Some(user) => RoleGate::require(roles)
            .check(user)
            .map(|_| ())
            .map_err(AppError::from),
        None => Err(AppError::unauthorized("Authentication required")),
    };

    if let Err(err) = verdict {
        return err.into_response();
    }

    next.run(request).await
}
