use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use warden_core::application::ADMIN_ROLES;

use crate::{
    AppState,
    infra::config::CorsConfig,
    users::{auth, handlers},
};

/// Build the full router with tracing and CORS applied.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config().cors);

    Router::new()
        .merge(create_public_routes())
        .merge(create_protected_routes(state.clone()))
        .merge(create_admin_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn create_public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
}

/// Routes that require a valid bearer token
fn create_protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/me", get(handlers::me).patch(handlers::update_me))
        .route("/change-password", put(handlers::change_password))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::auth_middleware,
        ))
}

fn create_admin_routes(state: AppState) -> Router<AppState> {
    // Layers run outermost-last: authentication wraps the role gate.
    Router::new()
        .route("/admin-only", get(handlers::admin_only))
        .route_layer(middleware::from_fn(auth::require_roles(ADMIN_ROLES)))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::auth_middleware,
        ))
}

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let allow_origin = if cors.is_wildcard_included() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            cors.allowed_origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        )
    };

    let methods = cors
        .allowed_methods
        .iter()
        .filter_map(|method| Method::from_bytes(method.as_bytes()).ok());
    let headers = cors
        .allowed_headers
        .iter()
        .filter_map(|header| HeaderName::from_bytes(header.as_bytes()).ok());

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::list(methods))
        .allow_headers(AllowHeaders::list(headers))
}
