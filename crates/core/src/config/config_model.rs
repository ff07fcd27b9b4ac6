//! Configuration data types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Where the process runs, which decides how configuration is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Running as a binary on the host.
    #[default]
    LocalHost,
    /// Running as a local docker container.
    LocalDocker,
    Cloud,
}

impl Mode {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value {
            "" | "local_host" => Ok(Mode::LocalHost),
            "local_docker" => Ok(Mode::LocalDocker),
            "cloud" => Ok(Mode::Cloud),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::LocalHost => "local_host",
            Mode::LocalDocker => "local_docker",
            Mode::Cloud => "cloud",
        }
    }

    pub fn is_local(&self) -> bool {
        self.as_str().starts_with("local_")
    }
}

/// Top level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub mode: Mode,
    pub app_root: String,
    #[serde(rename = "postgres_config")]
    pub postgres: PostgresConfig,
    #[serde(default)]
    pub local_auth_mode: bool,
}

/// PostgreSQL connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub username: String,
    pub password: String,
    pub database_name: String,
    pub host: String,
    pub database_ssl_mode: String,
    pub port: u16,
}

impl PostgresConfig {
    /// Connection string for the configured database.
    pub fn url(&self) -> String {
        self.url_for(&self.database_name)
    }

    /// Connection string for the server's maintenance database (`postgres`),
    /// used to create the application database.
    pub fn local_base_url(&self) -> String {
        self.url_for("postgres")
    }

    fn url_for(&self, dbname: &str) -> String {
        format!(
            "host={} port={} dbname={} user={} password={} sslmode={}",
            self.host, self.port, dbname, self.username, self.password, self.database_ssl_mode
        )
    }

    /// Every field is required.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("username", &self.username),
            ("password", &self.password),
            ("database_name", &self.database_name),
            ("host", &self.host),
            ("database_ssl_mode", &self.database_ssl_mode),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(ConfigError::MissingField(name));
            }
        }
        if self.port == 0 {
            return Err(ConfigError::MissingField("port"));
        }
        Ok(())
    }
}

/// Connection pool tuning. Zero values are replaced by
/// [`DbConfig::with_defaults`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DbConfig {
    pub max_open_conn: u32,
    pub max_idle_conn: u32,
    pub conn_max_idle_time: Duration,
    pub conn_max_lifetime: Duration,
}
