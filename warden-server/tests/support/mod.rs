// Helpers are shared by several test binaries; not every binary uses all of them.
#![allow(unused)]

use std::{sync::Arc, time::Duration};

use anyhow::{Result, anyhow};
use argon2::Params;
use axum_test::TestServer;
use serde_json::{Value, json};
use warden_core::{
    auth::AuthCrypto,
    database::{InMemoryUserStore, UserStore},
    domain::users::Role,
};
use warden_server::{
    AppState,
    infra::{
        config::{
            AuthConfig, Config, ConfigMetadata, CorsConfig, DatabaseConfig,
            ServerConfig,
        },
        startup::build_state_with,
    },
    routes::create_router,
};

pub const TOKEN_KEY: &str = "integration-token-key";
pub const PASSWORD: &str = "password-one";

pub struct TestApp {
    pub server: TestServer,
    pub store: InMemoryUserStore,
    pub state: AppState,
}

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        },
        database: DatabaseConfig {
            url: None,
            max_connections: 1,
        },
        auth: AuthConfig {
            password_pepper: "integration-pepper".into(),
            token_key: TOKEN_KEY.into(),
            access_token_ttl: Duration::from_secs(30 * 60),
        },
        cors: CorsConfig {
            allowed_origins: vec!["http://localhost:5173".into()],
            allowed_methods: vec!["GET".into(), "POST".into(), "PUT".into(), "PATCH".into()],
            allowed_headers: vec!["Authorization".into(), "Content-Type".into()],
        },
        metadata: ConfigMetadata::default(),
    }
}

pub fn build_test_state(store: InMemoryUserStore) -> Result<AppState> {
    // Minimal Argon2 cost keeps the suite fast; production uses the defaults.
    let params =
        Params::new(8, 1, 1, None).map_err(|err| anyhow!(err.to_string()))?;
    let crypto = AuthCrypto::with_params("integration-pepper", params)?;
    build_state_with(test_config(), Arc::new(store), crypto)
}

pub fn build_test_app() -> Result<TestApp> {
    let store = InMemoryUserStore::new();
    let state = build_test_state(store.clone())?;
    let server = TestServer::builder()
        .build(create_router(state.clone()))
        .map_err(|err| anyhow!(err.to_string()))?;

    Ok(TestApp {
        server,
        store,
        state,
    })
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

pub async fn register(server: &TestServer, fullname: &str, email: &str) -> Value {
    let response = server
        .post("/register")
        .json(&json!({
            "fullname": fullname,
            "email": email,
            "password": PASSWORD,
            "phone": "1"
        }))
        .await;
    response.assert_status_ok();
    response.json()
}

pub async fn login_token(server: &TestServer, email: &str, password: &str) -> String {
    let response = server
        .post("/login")
        .json(&json!({ "email": email, "password": password }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    body["access_token"]
        .as_str()
        .unwrap_or_else(|| panic!("access_token missing"))
        .to_string()
}

/// Change a stored user's role directly through the store.
pub async fn set_role(store: &InMemoryUserStore, email: &str, role: Role) -> Result<()> {
    let mut uow = store.begin().await?;
    let user = uow
        .get_by_email(email)
        .await?
        .ok_or_else(|| anyhow!("{email} not registered"))?;
    uow.set_role(user.id, role).await?;
    uow.commit().await?;
    Ok(())
}
