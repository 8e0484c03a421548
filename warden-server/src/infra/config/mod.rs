//! Layered server configuration: defaults, then an optional TOML file, then
//! environment variables (including a `.env` file when present).

pub mod loader;
pub mod models;
pub mod sources;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader};
pub use models::{
    AuthConfig, Config, ConfigMetadata, CorsConfig, DatabaseConfig,
    ServerConfig,
};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
