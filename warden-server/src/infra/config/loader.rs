use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

use super::{
    models::{
        AuthConfig, Config, ConfigMetadata, CorsConfig, DatabaseConfig,
        ServerConfig,
    },
    sources::{EnvConfig, FileConfig},
    validation::{self, ConfigGuardRailError, ConfigWarnings},
};
use crate::infra::constants::{
    DEFAULT_ACCESS_TOKEN_TTL, DEFAULT_DATABASE_MAX_CONNECTIONS,
    DEFAULT_PASSWORD_PEPPER, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT,
    DEFAULT_TOKEN_KEY,
};

const DEFAULT_CONFIG_LOCATIONS: &[&str] = &["warden.toml", "config/warden.toml"];

#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env_file: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Read dotenv values from `path` instead of `./.env`. Unlike the
    /// implicit `.env`, an explicit file that does not exist is an error.
    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.env_file = Some(path.into());
        self
    }

    /// Load the dotenv file, read the process environment, then resolve.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.env_file {
            Some(path) if !path.exists() => {
                return Err(ConfigLoadError::MissingEnvFile { path: path.clone() });
            }
            Some(path) => dotenvy::from_path(path).map(|()| true)?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        self.resolve(EnvConfig::gather(), env_file_loaded)
    }

    /// Resolve against an explicit set of environment values without
    /// touching the process environment.
    pub fn load_from_env(
        &self,
        env: EnvConfig,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        self.resolve(env, false)
    }

    fn resolve(
        &self,
        env: EnvConfig,
        env_file_loaded: bool,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let (config, warnings) =
            compose_config(file_config, env, config_path, env_file_loaded)?;
        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let explicit = self
            .config_path
            .clone()
            .or_else(|| env.config_path.clone());

        let path = match explicit {
            Some(path) if !path.exists() => {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            Some(path) => path,
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists())
            {
                Some(path) => path,
                None => return Ok((None, None)),
            },
        };

        let contents =
            fs::read_to_string(&path).map_err(|err| ConfigLoadError::Io {
                path: path.clone(),
                source: err,
            })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|err| ConfigLoadError::Parse {
                path: path.clone(),
                source: err,
            })?;

        Ok((Some(file_config), Some(path)))
    }
}

fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    config_path: Option<PathBuf>,
    env_file_loaded: bool,
) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    if config_path.is_none() {
        warnings.push_with_hint(
            "No warden.toml detected; using environment variables and defaults",
            "Pass --config or set WARDEN_CONFIG to load a configuration file",
        );
    }

    let FileConfig {
        server: file_server,
        database: file_database,
        auth: file_auth,
        cors: file_cors,
    } = file_config.unwrap_or_default();

    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string()),
        port: env
            .server_port
            .or(file_server.port)
            .unwrap_or(DEFAULT_SERVER_PORT),
    };

    let database = DatabaseConfig {
        url: non_blank(env.database_url).or_else(|| non_blank(file_database.url)),
        max_connections: env
            .database_max_connections
            .or(file_database.max_connections)
            .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
    };

    let access_token_ttl = match (env.access_token_ttl, file_auth.access_token_ttl)
    {
        (Some(raw), _) => parse_ttl("ACCESS_TOKEN_TTL", &raw)?,
        (None, Some(raw)) => parse_ttl("auth.access_token_ttl", &raw)?,
        (None, None) => DEFAULT_ACCESS_TOKEN_TTL,
    };

    let auth = AuthConfig {
        password_pepper: env
            .auth_password_pepper
            .or(file_auth.password_pepper)
            .unwrap_or_else(|| DEFAULT_PASSWORD_PEPPER.to_string()),
        token_key: env
            .auth_token_key
            .or(file_auth.token_key)
            .unwrap_or_else(|| DEFAULT_TOKEN_KEY.to_string()),
        access_token_ttl,
    };

    let cors = CorsConfig {
        allowed_origins: env
            .cors_allowed_origins
            .or(file_cors.allowed_origins)
            .unwrap_or_else(default_cors_origins),
        allowed_methods: env
            .cors_allowed_methods
            .or(file_cors.allowed_methods)
            .unwrap_or_else(default_cors_methods),
        allowed_headers: env
            .cors_allowed_headers
            .or(file_cors.allowed_headers)
            .unwrap_or_else(default_cors_headers),
    };

    let config = Config {
        server,
        database,
        auth,
        cors,
        metadata: ConfigMetadata {
            config_path,
            env_file_loaded,
        },
    };

    warnings.extend(validation::apply_guard_rails(&config)?);

    Ok((config, warnings))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn parse_ttl(field: &'static str, raw: &str) -> Result<Duration, ConfigLoadError> {
    humantime::parse_duration(raw.trim()).map_err(|source| {
        ConfigLoadError::InvalidDuration {
            field,
            value: raw.to_string(),
            source,
        }
    })
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

fn default_cors_methods() -> Vec<String> {
    ["GET", "POST", "PUT", "PATCH", "OPTIONS"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_cors_headers() -> Vec<String> {
    vec!["Authorization".to_string(), "Content-Type".to_string()]
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid duration '{value}' for {field}")]
    InvalidDuration {
        field: &'static str,
        value: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error(transparent)]
    GuardRail(#[from] ConfigGuardRailError),
    #[error("env file missing: {path}")]
    MissingEnvFile { path: PathBuf },
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

impl ConfigLoad {
    pub fn config_path(&self) -> Option<&Path> {
        self.config.metadata.config_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn config_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_apply_without_file_or_env() {
        let load = ConfigLoader::new()
            .load_from_env(EnvConfig::default())
            .unwrap();
        let config = &load.config;

        assert_eq!(config.server.host, DEFAULT_SERVER_HOST);
        assert_eq!(config.server.port, DEFAULT_SERVER_PORT);
        assert_eq!(config.auth.access_token_ttl, Duration::from_secs(1800));
        assert!(config.database.url.is_none());
        assert!(config.auth.is_default_pepper());
        assert!(config.auth.is_default_token_key());

        assert!(load.warnings.contains("No warden.toml"));
        assert!(load.warnings.contains("AUTH_PASSWORD_PEPPER"));
        assert!(load.warnings.contains("AUTH_TOKEN_KEY"));
        assert!(load.warnings.contains("DATABASE_URL"));
    }

    #[test]
    fn file_values_are_loaded() {
        let file = config_file(
            r#"
            [server]
            host = "127.0.0.1"
            port = 8081

            [database]
            url = "postgres://warden@localhost/warden"
            max_connections = 4

            [auth]
            password_pepper = "file-pepper"
            token_key = "file-token-key"
            access_token_ttl = "15m"

            [cors]
            allowed_origins = ["https://app.example.com"]
            "#,
        );

        let load = ConfigLoader::new()
            .with_config_path(file.path())
            .load_from_env(EnvConfig::default())
            .unwrap();
        let config = &load.config;

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8081);
        assert_eq!(
            config.database.url.as_deref(),
            Some("postgres://warden@localhost/warden")
        );
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.auth.password_pepper, "file-pepper");
        assert_eq!(config.auth.access_token_ttl, Duration::from_secs(900));
        assert_eq!(config.cors.allowed_origins, ["https://app.example.com"]);
        assert_eq!(load.config_path(), Some(file.path()));
        assert!(load.warnings.is_empty());
    }

    #[test]
    fn env_overrides_file() {
        let file = config_file(
            r#"
            [server]
            port = 8081

            [auth]
            token_key = "file-token-key"
            access_token_ttl = "15m"
            "#,
        );
        let env = EnvConfig {
            server_port: Some(9000),
            auth_token_key: Some("env-token-key".into()),
            access_token_ttl: Some("2h".into()),
            ..Default::default()
        };

        let config = ConfigLoader::new()
            .with_config_path(file.path())
            .load_from_env(env)
            .unwrap()
            .config;

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.auth.token_key, "env-token-key");
        assert_eq!(config.auth.access_token_ttl, Duration::from_secs(7200));
    }

    #[test]
    fn blank_database_url_selects_memory_store() {
        let env = EnvConfig {
            database_url: Some("   ".into()),
            ..Default::default()
        };
        let config = ConfigLoader::new().load_from_env(env).unwrap().config;
        assert!(config.database.url.is_none());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.toml");

        let err = ConfigLoader::new()
            .with_config_path(&missing)
            .load_from_env(EnvConfig::default())
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::MissingConfig { path } if path == missing));
    }

    #[test]
    fn config_path_from_env_is_honoured() {
        let file = config_file("[server]\nport = 7070\n");
        let env = EnvConfig {
            config_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };

        let config = ConfigLoader::new().load_from_env(env).unwrap().config;
        assert_eq!(config.server.port, 7070);
    }

    #[test]
    fn malformed_toml_is_reported_with_path() {
        let file = config_file("[server\nport = ");
        let err = ConfigLoader::new()
            .with_config_path(file.path())
            .load_from_env(EnvConfig::default())
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::Parse { .. }));
    }

    #[test]
    fn invalid_ttl_is_rejected() {
        let env = EnvConfig {
            access_token_ttl: Some("soon".into()),
            ..Default::default()
        };
        let err = ConfigLoader::new().load_from_env(env).unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::InvalidDuration { field: "ACCESS_TOKEN_TTL", .. }
        ));
    }

    #[test]
    fn empty_secret_fails_guard_rails() {
        let env = EnvConfig {
            auth_token_key: Some(String::new()),
            ..Default::default()
        };
        let err = ConfigLoader::new().load_from_env(env).unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::GuardRail(ConfigGuardRailError::EmptySecret {
                field: "AUTH_TOKEN_KEY"
            })
        ));
    }

    #[test]
    fn invalid_cors_method_fails_guard_rails() {
        let env = EnvConfig {
            cors_allowed_methods: Some(vec!["GET POST".into()]),
            ..Default::default()
        };
        let err = ConfigLoader::new().load_from_env(env).unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::GuardRail(
                ConfigGuardRailError::InvalidCorsConfig { .. }
            )
        ));
    }

    #[test]
    fn explicit_missing_env_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.env");

        let err = ConfigLoader::new()
            .with_env_file(&missing)
            .load()
            .unwrap_err();
        assert!(
            matches!(err, ConfigLoadError::MissingEnvFile { path } if path == missing)
        );
    }

    #[test]
    fn explicit_env_file_is_loaded() {
        let env_file = config_file("WARDEN_LOADER_TEST_MARKER=loaded\n");

        let load = ConfigLoader::new()
            .with_env_file(env_file.path())
            .load()
            .unwrap();

        assert!(load.config.metadata.env_file_loaded);
        assert_eq!(
            std::env::var("WARDEN_LOADER_TEST_MARKER").as_deref(),
            Ok("loaded")
        );
    }
}
