//! Server configuration loading from file and environment variables.

use examiner_types::ExamPolicy;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Exam policy and question bank settings.
    #[serde(default)]
    pub exam: ExamConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "examiner_session=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Exam configuration.
///
/// The policy keys (`phase1_questions`, `phase3_questions`,
/// `persist_max_attempts`, `persist_backoff_ms`) sit directly in the
/// `[exam]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct ExamConfig {
    /// TOML question bank to load instead of the built-in one.
    #[serde(default)]
    pub question_bank_path: Option<String>,

    /// Seconds a session may sit idle before it is discarded. 0 disables
    /// expiry.
    #[serde(default = "default_session_idle_timeout_secs")]
    pub session_idle_timeout_secs: u64,

    #[serde(flatten)]
    pub policy: ExamPolicy,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "examiner.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_session_idle_timeout_secs() -> u64 {
    3_600
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            question_bank_path: None,
            session_idle_timeout_secs: default_session_idle_timeout_secs(),
            policy: ExamPolicy::default(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `EXAMINER_HOST` overrides `server.host`
/// - `EXAMINER_PORT` overrides `server.port`
/// - `EXAMINER_DB_PATH` overrides `database.path`
/// - `EXAMINER_LOG_LEVEL` overrides `logging.level`
/// - `EXAMINER_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `EXAMINER_QUESTION_BANK` overrides `exam.question_bank_path`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(host) = var("EXAMINER_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = var("EXAMINER_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(db_path) = var("EXAMINER_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = var("EXAMINER_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("EXAMINER_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(bank) = var("EXAMINER_QUESTION_BANK") {
        if !bank.trim().is_empty() {
            config.exam.question_bank_path = Some(bank);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.path, "examiner.db");
        assert_eq!(config.database.busy_timeout_ms, 5_000);
        assert_eq!(config.database.pool_max_size, 8);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
        assert_eq!(config.exam.question_bank_path, None);
        assert_eq!(config.exam.session_idle_timeout_secs, 3_600);
        assert_eq!(config.exam.policy, ExamPolicy::default());
    }

    #[test]
    fn exam_table_carries_policy_keys() {
        let config: Config = toml::from_str(
            r#"
            [exam]
            question_bank_path = "bank.toml"
            phase1_questions = 5
            persist_backoff_ms = 10
            session_idle_timeout_secs = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.exam.question_bank_path.as_deref(), Some("bank.toml"));
        assert_eq!(config.exam.session_idle_timeout_secs, 0);
        assert_eq!(config.exam.policy.phase1_questions, 5);
        assert_eq!(config.exam.policy.phase3_questions, 4);
        assert_eq!(config.exam.policy.persist_max_attempts, 3);
        assert_eq!(config.exam.policy.persist_backoff_ms, 10);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = load_config(path.to_str()).unwrap();
        assert_eq!(config.exam.policy.phase3_questions, 4);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();
        assert!(matches!(
            load_config(path.to_str()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn environment_overrides_file_values() {
        let vars: HashMap<&str, &str> = [
            ("EXAMINER_PORT", "8080"),
            ("EXAMINER_HOST", "not-an-ip"),
            ("EXAMINER_DB_PATH", "/var/lib/examiner/exams.db"),
            ("EXAMINER_LOG_JSON", "1"),
            ("EXAMINER_QUESTION_BANK", "/etc/examiner/bank.toml"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        apply_env_overrides(&mut config, |key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, default_host());
        assert_eq!(config.database.path, "/var/lib/examiner/exams.db");
        assert!(config.logging.json);
        assert_eq!(
            config.exam.question_bank_path.as_deref(),
            Some("/etc/examiner/bank.toml")
        );
    }
}
