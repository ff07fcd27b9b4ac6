//! Application configuration: PostgreSQL connection settings, pool tuning and
//! the runtime mode that decides where the configuration comes from.

mod config_model;

pub use config_model::*;

use std::path::Path;
use std::time::Duration;

use base64::Engine;
use log::info;
use thiserror::Error;
use uuid::Uuid;

/// Environment variable holding the serialized configuration.
pub const CONFIG_ENV: &str = "CONFIG";
/// Environment variable selecting the runtime [`Mode`].
pub const MODE_ENV: &str = "MODE";
/// Environment variable naming the database in `local_docker` mode.
pub const LOCAL_DB_NAME_ENV: &str = "LOCAL_DB_NAME";
/// Configuration file expected under the application root in local modes.
pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} not found")]
    MissingEnv(&'static str),

    #[error("Invalid mode: {0}")]
    InvalidMode(String),

    #[error("Failed to decode base64 configuration: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Configuration is not valid UTF-8")]
    Utf8,

    #[error("error unmarshal config to Config type: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Required field '{0}' is missing")]
    MissingField(&'static str),

    #[error("app root is not the same in config: expected {expected}, found {found}")]
    AppRootMismatch { expected: String, found: String },
}

impl Config {
    /// Loads the configuration the way services do at startup.
    ///
    /// `.env` is honoured through `dotenvy`. In local modes the file
    /// `{app_root}/config.json` is the source; in cloud mode the `CONFIG`
    /// variable must already hold the JSON document, plain or base64 encoded.
    pub fn from_env(app_root: &str) -> std::result::Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mode = match std::env::var(MODE_ENV) {
            Ok(value) => Mode::parse(&value)?,
            Err(_) => Mode::LocalHost,
        };

        let raw = match mode {
            Mode::LocalHost | Mode::LocalDocker => read_local_config(Path::new(app_root))?,
            Mode::Cloud => {
                let raw =
                    std::env::var(CONFIG_ENV).map_err(|_| ConfigError::MissingEnv(CONFIG_ENV))?;
                if raw.trim_start().starts_with('{') {
                    raw
                } else {
                    decode_base64_config(&raw)?
                }
            }
        };

        let local_db_name = std::env::var(LOCAL_DB_NAME_ENV).ok();
        Self::from_json(&raw, mode, app_root, local_db_name)
    }

    /// Parses and finalizes a configuration document for the given mode.
    pub fn from_json(
        raw: &str,
        mode: Mode,
        app_root: &str,
        local_db_name: Option<String>,
    ) -> std::result::Result<Self, ConfigError> {
        let mut cfg: Config = serde_json::from_str(raw)?;
        cfg.mode = mode;
        cfg.postgres.validate()?;

        match mode {
            Mode::LocalHost => {
                cfg.postgres.host = "localhost".to_string();
                cfg.postgres.database_name = random_database_name();
            }
            Mode::LocalDocker => {
                cfg.postgres.database_name =
                    local_db_name.ok_or(ConfigError::MissingEnv(LOCAL_DB_NAME_ENV))?;
            }
            Mode::Cloud => {}
        }

        if cfg.app_root != app_root {
            return Err(ConfigError::AppRootMismatch {
                expected: app_root.to_string(),
                found: cfg.app_root,
            });
        }

        info!(
            "Configuration loaded (mode: {}, database: {})",
            cfg.mode.as_str(),
            cfg.postgres.database_name
        );
        Ok(cfg)
    }
}

fn read_local_config(app_root: &Path) -> std::result::Result<String, ConfigError> {
    let path = app_root.join(CONFIG_FILE_NAME);
    std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Decodes a base64 wrapped configuration document.
pub fn decode_base64_config(encoded: &str) -> std::result::Result<String, ConfigError> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;
    String::from_utf8(bytes).map_err(|_| ConfigError::Utf8)
}

/// Lowercase alphabetic-leading name usable as a throwaway database name.
pub fn random_database_name() -> String {
    format!("db_{}", Uuid::new_v4().simple())
}

impl DbConfig {
    /// Fills every unset (zero) field with the pool defaults.
    pub fn with_defaults(mut self) -> Self {
        if self.max_open_conn == 0 {
            self.max_open_conn = 100;
        }
        if self.max_idle_conn == 0 {
            self.max_idle_conn = 10;
        }
        if self.conn_max_idle_time.is_zero() {
            self.conn_max_idle_time = Duration::from_secs(60);
        }
        if self.conn_max_lifetime.is_zero() {
            self.conn_max_lifetime = Duration::from_secs(300);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "app_root": "testapp",
        "postgres_config": {
            "username": "user",
            "password": "pwd",
            "database_name": "main",
            "host": "db.internal",
            "database_ssl_mode": "disable",
            "port": 5432
        },
        "local_auth_mode": true
    }"#;

    #[test]
    fn test_postgres_urls() {
        let cfg = Config::from_json(SAMPLE, Mode::Cloud, "testapp", None).unwrap();
        assert_eq!(
            cfg.postgres.url(),
            "host=db.internal port=5432 dbname=main user=user password=pwd sslmode=disable"
        );
        assert_eq!(
            cfg.postgres.local_base_url(),
            "host=db.internal port=5432 dbname=postgres user=user password=pwd sslmode=disable"
        );
        assert!(cfg.local_auth_mode);
    }

    #[test]
    fn test_local_host_overrides_host_and_database() {
        let cfg = Config::from_json(SAMPLE, Mode::LocalHost, "testapp", None).unwrap();
        assert_eq!(cfg.postgres.host, "localhost");
        assert_ne!(cfg.postgres.database_name, "main");
        assert!(cfg.postgres.database_name.starts_with("db_"));
    }

    #[test]
    fn test_local_docker_requires_db_name() {
        let err = Config::from_json(SAMPLE, Mode::LocalDocker, "testapp", None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(LOCAL_DB_NAME_ENV)));

        let cfg =
            Config::from_json(SAMPLE, Mode::LocalDocker, "testapp", Some("docker_db".into()))
                .unwrap();
        assert_eq!(cfg.postgres.database_name, "docker_db");
    }

    #[test]
    fn test_app_root_mismatch() {
        let err = Config::from_json(SAMPLE, Mode::Cloud, "other", None).unwrap_err();
        assert!(matches!(err, ConfigError::AppRootMismatch { .. }));
    }

    #[test]
    fn test_missing_required_field() {
        let raw = SAMPLE.replace("\"host\": \"db.internal\",", "\"host\": \"\",");
        let err = Config::from_json(&raw, Mode::Cloud, "testapp", None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField("host")));
    }

    #[test]
    fn test_read_local_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join(CONFIG_FILE_NAME)).unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let raw = read_local_config(dir.path()).unwrap();
        let cfg = Config::from_json(&raw, Mode::LocalHost, "testapp", None).unwrap();
        assert_eq!(cfg.postgres.port, 5432);
    }

    #[test]
    fn test_decode_base64_config() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(SAMPLE);
        assert_eq!(decode_base64_config(&encoded).unwrap(), SAMPLE);
    }

    #[test]
    fn test_db_config_defaults() {
        let cfg = DbConfig::default().with_defaults();
        assert_eq!(cfg.max_open_conn, 100);
        assert_eq!(cfg.max_idle_conn, 10);
        assert_eq!(cfg.conn_max_idle_time, Duration::from_secs(60));
        assert_eq!(cfg.conn_max_lifetime, Duration::from_secs(300));

        let custom = DbConfig {
            max_open_conn: 4,
            ..Default::default()
        }
        .with_defaults();
        assert_eq!(custom.max_open_conn, 4);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(Mode::parse("").unwrap(), Mode::LocalHost);
        assert_eq!(Mode::parse("local_docker").unwrap(), Mode::LocalDocker);
        assert!(!Mode::parse("cloud").unwrap().is_local());
        assert!(Mode::parse("staging").is_err());
    }
}
