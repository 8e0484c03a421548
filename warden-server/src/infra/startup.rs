use std::sync::Arc;

use anyhow::Context;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::{info, warn};
use warden_core::{
    application::AccountService,
    auth::{AuthCrypto, TokenIssuer},
    database::{InMemoryUserStore, PostgresUserStore, UserStore},
};

use crate::infra::{
    app_state::AppState,
    config::{Config, DatabaseConfig},
};

/// Open the configured store (running migrations for PostgreSQL) and build
/// the shared application state.
pub async fn build_state(config: Config) -> anyhow::Result<AppState> {
    let store: Arc<dyn UserStore> = match &config.database.url {
        Some(_) => {
            let pool = connect_pool(&config.database).await?;
            warden_core::MIGRATOR
                .run(&pool)
                .await
                .context("failed to apply database migrations")?;
            info!("connected to PostgreSQL user store");
            Arc::new(PostgresUserStore::new(pool))
        }
        None => {
            warn!("no database configured; using in-memory user store");
            Arc::new(InMemoryUserStore::new())
        }
    };

    let crypto = AuthCrypto::new(&config.auth.password_pepper)
        .context("failed to initialise password hashing")?;
    build_state_with(config, store, crypto)
}

/// Assemble state from an already-opened store and hasher.
pub fn build_state_with(
    config: Config,
    store: Arc<dyn UserStore>,
    crypto: AuthCrypto,
) -> anyhow::Result<AppState> {
    let tokens =
        TokenIssuer::new(&config.auth.token_key, config.auth.access_token_ttl)
            .context("failed to initialise token issuer")?;

    let accounts =
        AccountService::new(store, Arc::new(crypto), Arc::new(tokens));
    Ok(AppState::new(Arc::new(config), Arc::new(accounts)))
}

pub async fn connect_pool(database: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let url = database
        .url
        .as_deref()
        .context("DATABASE_URL is not configured")?;
    PgPoolOptions::new()
        .max_connections(database.max_connections)
        .connect(url)
        .await
        .context("failed to connect to PostgreSQL")
}
