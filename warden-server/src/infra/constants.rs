use std::time::Duration;

/// Placeholder pepper used when none is configured. Startup warns about it.
pub const DEFAULT_PASSWORD_PEPPER: &str = "warden-dev-password-pepper";

/// Placeholder token signing key used when none is configured.
pub const DEFAULT_TOKEN_KEY: &str = "warden-dev-token-signing-key";

pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
pub const DEFAULT_SERVER_PORT: u16 = 3000;

pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;
