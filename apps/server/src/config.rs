//! Layered configuration: files under `config/` plus `STETHOS__`-prefixed
//! environment overrides (e.g. `STETHOS__DATABASE__URL`).

use std::net::SocketAddr;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins. Empty means no cross-origin access.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    #[serde(default = "default_max_body_size")]
    pub max_request_body_size: usize,
    /// Include store error detail in 500 bodies. Development only.
    #[serde(default)]
    pub expose_errors: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Fail fast instead of queueing indefinitely when the pool is full.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub access_secret: String,
    #[serde(default)]
    pub refresh_secret: String,
    #[serde(default = "default_access_ttl")]
    pub access_ttl_hours: i64,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_days: i64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    /// Directory for rotated log files. Console-only when unset.
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_max_body_size() -> usize {
    10 * 1024 * 1024
}
fn default_max_connections() -> u32 {
    50
}
fn default_acquire_timeout() -> u64 {
    5
}
fn default_idle_timeout() -> u64 {
    10
}
fn default_access_ttl() -> i64 {
    24
}
fn default_refresh_ttl() -> i64 {
    7
}
fn default_bcrypt_cost() -> u32 {
    10
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_service_name() -> String {
    "stethos-server".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            max_request_body_size: default_max_body_size(),
            expose_errors: false,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            acquire_timeout_seconds: default_acquire_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_secret: String::new(),
            refresh_secret: String::new(),
            access_ttl_hours: default_access_ttl(),
            refresh_ttl_days: default_refresh_ttl(),
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            directory: None,
            service_name: default_service_name(),
        }
    }
}

impl Config {
    /// Load configuration from `config/default`, an optional
    /// `config/<STETHOS_ENV>` overlay, and environment variables.
    pub fn load() -> anyhow::Result<Self> {
        // Make .env available to the environment source below.
        dotenvy::dotenv().ok();

        let run_env = std::env::var("STETHOS_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_env}")).required(false))
            .add_source(
                config::Environment::with_prefix("STETHOS")
                    .separator("__")
                    .list_separator(",")
                    .try_parsing(true)
                    .with_list_parse_key("server.cors_origins"),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.database.url.is_empty() {
            return Err("database.url is not set".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("database.max_connections must be greater than zero".to_string());
        }
        if self.auth.access_secret.is_empty() || self.auth.refresh_secret.is_empty() {
            return Err("auth.access_secret and auth.refresh_secret must be set".to_string());
        }
        if self.auth.access_secret == self.auth.refresh_secret {
            return Err("auth.access_secret and auth.refresh_secret must differ".to_string());
        }
        if self.auth.access_ttl_hours <= 0 || self.auth.refresh_ttl_days <= 0 {
            return Err("auth token lifetimes must be positive".to_string());
        }
        if !(4..=16).contains(&self.auth.bcrypt_cost) {
            return Err("auth.bcrypt_cost must be between 4 and 16".to_string());
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("invalid listen address {addr}: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            database: DatabaseConfig {
                url: "postgres://localhost/stethos".into(),
                ..Default::default()
            },
            auth: AuthConfig {
                access_secret: "access-secret".into(),
                refresh_secret: "refresh-secret".into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.max_request_body_size, 10 * 1024 * 1024);
        assert_eq!(config.database.max_connections, 50);
        assert_eq!(config.database.acquire_timeout_seconds, 5);
        assert_eq!(config.database.idle_timeout_seconds, 10);
        assert_eq!(config.auth.access_ttl_hours, 24);
        assert_eq!(config.auth.refresh_ttl_days, 7);
        assert_eq!(config.auth.bcrypt_cost, 10);
        assert!(!config.server.expose_errors);
    }

    #[test]
    fn validate_accepts_complete_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_database_url() {
        let config = Config {
            database: DatabaseConfig::default(),
            ..valid_config()
        };
        assert!(config.validate().unwrap_err().contains("database.url"));
    }

    #[test]
    fn validate_rejects_shared_token_secret() {
        let mut config = valid_config();
        config.auth.refresh_secret = config.auth.access_secret.clone();
        assert!(config.validate().unwrap_err().contains("differ"));
    }

    #[test]
    fn validate_rejects_out_of_range_bcrypt_cost() {
        let mut config = valid_config();
        config.auth.bcrypt_cost = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn socket_addr_combines_host_and_port() {
        let mut config = valid_config();
        config.server.host = "127.0.0.1".into();
        config.server.port = 8080;
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:8080");
    }
}
