//! Configuration types for the ETL pipeline.
//!
//! This module provides configuration options using the builder pattern.
//! Database credentials come from the environment (optionally a `.env` file).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::EtlError;

pub const DEFAULT_INPUT_PATH: &str = "data/fifa21_raw_data_v2.csv";
pub const DEFAULT_OUTPUT_PATH: &str = "data/fifa21_clean.csv";
pub const DEFAULT_TABLE_NAME: &str = "fifa21_clean";
pub const DEFAULT_LOG_FILE: &str = "logs/etl.log";
pub const DEFAULT_DB_PORT: u16 = 5432;

static TABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("Invalid regex: table name"));

/// Connection settings for the PostgreSQL sink.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

impl DatabaseConfig {
    /// Read `DB_HOST`, `DB_PORT`, `DB_NAME`, `DB_USER` and `DB_PASSWORD`.
    ///
    /// A `.env` file in the working directory is loaded first; variables
    /// already set in the process environment take precedence.
    pub fn from_env() -> Result<Self, ConfigValidationError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigValidationError> {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigValidationError::MissingEnvVar(key.to_string()))
        };

        let port = match lookup("DB_PORT").filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigValidationError::InvalidPort(raw))?,
            None => DEFAULT_DB_PORT,
        };

        Ok(Self {
            host: require("DB_HOST")?,
            port,
            database: require("DB_NAME")?,
            user: require("DB_USER")?,
            password: lookup("DB_PASSWORD").unwrap_or_default(),
        })
    }
}

/// Configuration for one ETL run.
///
/// Use [`EtlConfig::builder()`] to create a validated configuration.
///
/// # Example
///
/// ```rust,ignore
/// use fifa_etl::config::EtlConfig;
///
/// let config = EtlConfig::builder()
///     .input_path("data/raw.csv")
///     .write_database(false)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlConfig {
    /// Raw CSV export to read.
    /// Default: "data/fifa21_raw_data_v2.csv"
    pub input_path: PathBuf,

    /// Where the clean CSV is written.
    /// Default: "data/fifa21_clean.csv"
    pub output_path: PathBuf,

    /// Table replaced by the database sink.
    /// Default: "fifa21_clean"
    pub table_name: String,

    /// Append-mode log file used by the binary.
    /// Default: "logs/etl.log"
    pub log_file: PathBuf,

    /// Whether to write the CSV sink.
    /// Default: true
    pub write_csv: bool,

    /// Whether to write the database sink. Requires `database`.
    /// Default: true
    pub write_database: bool,

    /// Database connection settings.
    /// Default: None
    pub database: Option<DatabaseConfig>,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            table_name: DEFAULT_TABLE_NAME.to_string(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            write_csv: true,
            write_database: true,
            database: None,
        }
    }
}

impl EtlConfig {
    /// Create a new configuration builder.
    pub fn builder() -> EtlConfigBuilder {
        EtlConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.input_path.as_os_str().is_empty() {
            return Err(ConfigValidationError::EmptyPath("input_path".to_string()));
        }

        if self.write_csv && self.output_path.as_os_str().is_empty() {
            return Err(ConfigValidationError::EmptyPath("output_path".to_string()));
        }

        if self.write_database {
            if !TABLE_NAME.is_match(&self.table_name) {
                return Err(ConfigValidationError::InvalidTableName(
                    self.table_name.clone(),
                ));
            }
            if self.database.is_none() {
                return Err(ConfigValidationError::MissingDatabaseSettings);
            }
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Path for '{0}' must not be empty")]
    EmptyPath(String),

    #[error("Invalid table name '{0}' (letters, digits and underscores only)")]
    InvalidTableName(String),

    #[error("Database writing is enabled but no database settings were provided")]
    MissingDatabaseSettings,

    #[error("Environment variable '{0}' is not set")]
    MissingEnvVar(String),

    #[error("Invalid DB_PORT '{0}'")]
    InvalidPort(String),
}

impl From<ConfigValidationError> for EtlError {
    fn from(err: ConfigValidationError) -> Self {
        EtlError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`EtlConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct EtlConfigBuilder {
    input_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
    table_name: Option<String>,
    log_file: Option<PathBuf>,
    write_csv: Option<bool>,
    write_database: Option<bool>,
    database: Option<DatabaseConfig>,
}

impl EtlConfigBuilder {
    pub fn input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_path = Some(path.into());
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Enable or disable the CSV sink.
    pub fn write_csv(mut self, enable: bool) -> Self {
        self.write_csv = Some(enable);
        self
    }

    /// Enable or disable the database sink.
    ///
    /// When enabled, [`database`](Self::database) must also be set.
    pub fn write_database(mut self, enable: bool) -> Self {
        self.write_database = Some(enable);
        self
    }

    /// Set the database connection settings.
    pub fn database(mut self, database: DatabaseConfig) -> Self {
        self.database = Some(database);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `EtlConfig` or an error if validation fails.
    pub fn build(self) -> Result<EtlConfig, ConfigValidationError> {
        let config = EtlConfig {
            input_path: self
                .input_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_PATH)),
            output_path: self
                .output_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH)),
            table_name: self
                .table_name
                .unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string()),
            log_file: self
                .log_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            write_csv: self.write_csv.unwrap_or(true),
            write_database: self.write_database.unwrap_or(true),
            database: self.database,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn db() -> DatabaseConfig {
        DatabaseConfig {
            host: "localhost".to_string(),
            port: 5432,
            database: "fifa".to_string(),
            user: "etl".to_string(),
            password: "secret".to_string(),
        }
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = EtlConfig::default();
        assert_eq!(config.input_path, PathBuf::from("data/fifa21_raw_data_v2.csv"));
        assert_eq!(config.output_path, PathBuf::from("data/fifa21_clean.csv"));
        assert_eq!(config.table_name, "fifa21_clean");
        assert_eq!(config.log_file, PathBuf::from("logs/etl.log"));
        assert!(config.write_csv);
        assert!(config.write_database);
    }

    #[test]
    fn test_builder_requires_database_settings() {
        let result = EtlConfig::builder().build();
        assert!(matches!(
            result,
            Err(ConfigValidationError::MissingDatabaseSettings)
        ));

        let config = EtlConfig::builder().database(db()).build().unwrap();
        assert_eq!(config.database.unwrap().host, "localhost");
    }

    #[test]
    fn test_builder_without_database() {
        let config = EtlConfig::builder()
            .input_path("in.csv")
            .output_path("out/clean.csv")
            .write_database(false)
            .build()
            .unwrap();

        assert_eq!(config.input_path, PathBuf::from("in.csv"));
        assert!(!config.write_database);
        assert!(config.database.is_none());
    }

    #[test]
    fn test_validation_empty_input() {
        let result = EtlConfig::builder()
            .input_path("")
            .write_database(false)
            .build();
        assert!(matches!(result, Err(ConfigValidationError::EmptyPath(f)) if f == "input_path"));
    }

    #[test]
    fn test_validation_invalid_table_name() {
        let result = EtlConfig::builder()
            .table_name("players; DROP TABLE x")
            .database(db())
            .build();
        assert!(matches!(
            result,
            Err(ConfigValidationError::InvalidTableName(_))
        ));
    }

    #[test]
    fn test_database_from_lookup() {
        let config = DatabaseConfig::from_lookup(lookup(&[
            ("DB_HOST", "db.local"),
            ("DB_NAME", "fifa"),
            ("DB_USER", "etl"),
            ("DB_PASSWORD", "pw"),
        ]))
        .unwrap();

        assert_eq!(config.host, "db.local");
        assert_eq!(config.port, 5432);
        assert_eq!(config.password, "pw");
    }

    #[test]
    fn test_database_from_lookup_errors() {
        let missing = DatabaseConfig::from_lookup(lookup(&[("DB_HOST", "h")]));
        assert!(matches!(missing, Err(ConfigValidationError::MissingEnvVar(k)) if k == "DB_NAME"));

        let bad_port = DatabaseConfig::from_lookup(lookup(&[
            ("DB_HOST", "h"),
            ("DB_PORT", "abc"),
            ("DB_NAME", "n"),
            ("DB_USER", "u"),
        ]));
        assert!(matches!(bad_port, Err(ConfigValidationError::InvalidPort(_))));
    }

    #[test]
    fn test_debug_hides_password() {
        let text = format!("{:?}", db());
        assert!(!text.contains("secret"));
        assert!(text.contains("localhost"));
    }

    #[test]
    fn test_config_serialization_skips_password() {
        let config = EtlConfig::builder().database(db()).build().unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));

        let back: EtlConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.table_name, "fifa21_clean");
        assert_eq!(back.database.map(|d| d.password), Some(String::new()));
    }
}
