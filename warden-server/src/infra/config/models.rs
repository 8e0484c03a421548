use std::{path::PathBuf, time::Duration};

use crate::infra::constants::{DEFAULT_PASSWORD_PEPPER, DEFAULT_TOKEN_KEY};

/// Fully resolved configuration the server runs with.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `None` selects the in-memory store.
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub password_pepper: String,
    pub token_key: String,
    pub access_token_ttl: Duration,
}

impl AuthConfig {
    pub fn is_default_pepper(&self) -> bool {
        self.password_pepper == DEFAULT_PASSWORD_PEPPER
    }

    pub fn is_default_token_key(&self) -> bool {
        self.token_key == DEFAULT_TOKEN_KEY
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("password_pepper", &"<redacted>")
            .field("token_key", &"<redacted>")
            .field("access_token_ttl", &self.access_token_ttl)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
}

impl CorsConfig {
    pub fn is_wildcard_included(&self) -> bool {
        self.allowed_origins
            .iter()
            .any(|origin| origin.trim() == "*")
    }
}

/// Where the configuration came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
