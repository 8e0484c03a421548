use axum::http::{Method, header::HeaderName};
use thiserror::Error;

use super::models::{AuthConfig, Config, CorsConfig};

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error("authentication secret {field} must not be empty")]
    EmptySecret { field: &'static str },
    #[error("ACCESS_TOKEN_TTL must be greater than zero")]
    ZeroTokenLifetime,
    #[error("invalid CORS configuration: {reason}")]
    InvalidCorsConfig { reason: String },
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.items.iter().any(|item| item.message.contains(needle))
    }
}

pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    check_secrets(&config.auth, &mut warnings)?;
    validate_cors(&config.cors)?;

    if config.database.url.is_none() {
        warnings.push_with_hint(
            "DATABASE_URL not configured; accounts are kept in memory and lost on restart",
            "Set DATABASE_URL to a PostgreSQL connection string",
        );
    }

    if config.cors.is_wildcard_included() {
        warnings.push("CORS allows any origin");
    }

    Ok(warnings)
}

fn check_secrets(
    auth: &AuthConfig,
    warnings: &mut ConfigWarnings,
) -> Result<(), ConfigGuardRailError> {
    if auth.password_pepper.is_empty() {
        return Err(ConfigGuardRailError::EmptySecret {
            field: "AUTH_PASSWORD_PEPPER",
        });
    }
    if auth.token_key.is_empty() {
        return Err(ConfigGuardRailError::EmptySecret {
            field: "AUTH_TOKEN_KEY",
        });
    }
    if auth.access_token_ttl.is_zero() {
        return Err(ConfigGuardRailError::ZeroTokenLifetime);
    }

    if auth.is_default_pepper() {
        warnings.push_with_hint(
            "AUTH_PASSWORD_PEPPER uses the built-in development value",
            "Set AUTH_PASSWORD_PEPPER before storing real accounts; changing it later invalidates every password",
        );
    }
    if auth.is_default_token_key() {
        warnings.push_with_hint(
            "AUTH_TOKEN_KEY uses the built-in development value",
            "Set AUTH_TOKEN_KEY to a long random secret",
        );
    }

    Ok(())
}

fn validate_cors(cors: &CorsConfig) -> Result<(), ConfigGuardRailError> {
    if cors.allowed_methods.is_empty() {
        return Err(ConfigGuardRailError::InvalidCorsConfig {
            reason:
                "CORS_ALLOWED_METHODS must include at least one HTTP method"
                    .into(),
        });
    }

    for method in &cors.allowed_methods {
        Method::from_bytes(method.as_bytes()).map_err(|_| {
            ConfigGuardRailError::InvalidCorsConfig {
                reason: format!(
                    "invalid HTTP method `{method}` in CORS_ALLOWED_METHODS"
                ),
            }
        })?;
    }

    for header in &cors.allowed_headers {
        HeaderName::from_bytes(header.as_bytes()).map_err(|_| {
            ConfigGuardRailError::InvalidCorsConfig {
                reason: format!(
                    "invalid header name `{header}` in CORS_ALLOWED_HEADERS"
                ),
            }
        })?;
    }

    Ok(())
}
