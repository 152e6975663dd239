use anyhow::Result;
use config::{Config, ConfigBuilder, builder::DefaultState};
use serde::Deserialize;

use crate::constants::{DEFAULT_ROLE_HEADER, DEFAULT_USER_ID_HEADER};
use crate::types::{Identity, Role};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    SingleUser,
    Proxy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    #[serde(default)]
    pub proxy: ProxyAuthConfig,
    pub single_user: Option<SingleUserAuthConfig>,
}

/// Headers populated by the authenticating reverse proxy.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyAuthConfig {
    #[serde(default = "default_user_id_header")]
    pub user_id_header: String,
    #[serde(default = "default_role_header")]
    pub role_header: String,
}

impl Default for ProxyAuthConfig {
    fn default() -> Self {
        Self {
            user_id_header: default_user_id_header(),
            role_header: default_role_header(),
        }
    }
}

fn default_user_id_header() -> String {
    DEFAULT_USER_ID_HEADER.to_string()
}

fn default_role_header() -> String {
    DEFAULT_ROLE_HEADER.to_string()
}

/// Fixed identity used for local development.
#[derive(Debug, Clone, Deserialize)]
pub struct SingleUserAuthConfig {
    pub user_id: i32,
    pub role: Role,
}

impl SingleUserAuthConfig {
    #[must_use]
    pub const fn identity(&self) -> Identity {
        Identity::new(self.user_id, self.role)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u8,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// ## Summary
    /// Returns the bind address in the format "host:port".
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory under which room attachments are written.
    pub upload_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_minute: usize,
}

impl Settings {
    /// ## Summary
    /// Returns a configuration builder pre-populated with defaults.
    ///
    /// ## Errors
    /// Returns an error if a default value cannot be set.
    pub fn builder() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8698)?
            .set_default("database.max_connections", 4)?
            .set_default("database.run_migrations", true)?
            .set_default("logging.level", "debug")?
            .set_default("auth.method", "proxy")?
            .set_default("storage.upload_dir", "./uploads/rooms")?
            .set_default("rate_limit.enabled", true)?
            .set_default("rate_limit.requests_per_minute", 120)?)
    }

    /// ## Summary
    /// Loads configuration from defaults, an optional `config.toml` and environment
    /// variables into a `Settings`. Environment variables take precedence.
    ///
    /// Nested keys use a double underscore (`SERVER__PORT`); the conventional
    /// `DATABASE_URL` is honoured as well.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Ok(Self::builder()?
            // TOML file
            .add_source(config::File::with_name("config.toml").required(false))
            // Env
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .build()?
            .try_deserialize::<Settings>()?)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}
