use std::env;
use std::path::PathBuf;

use crate::error::AppError;
use crate::storage::LATEST_SCHEMA_VERSION;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub catalog: CatalogConfig,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
    /// Schema version to open the database at.
    pub schema_version: i64,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Locations of externally supplied form catalogs and display labels.
///
/// Any path left unset falls back to the built-in catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogConfig {
    pub surveys_path: Option<PathBuf>,
    pub registrations_path: Option<PathBuf>,
    pub field_labels_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let schema_version = match env::var("SCHEMA_VERSION") {
            Ok(raw) => raw.trim().parse::<i64>().ok().filter(|v| *v >= 1).ok_or_else(|| {
                AppError::Config {
                    message: format!("SCHEMA_VERSION must be a positive integer, got '{}'", raw),
                }
            })?,
            Err(_) => LATEST_SCHEMA_VERSION,
        };

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/survey.db".to_string()),
            ),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            schema_version,
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let catalog = CatalogConfig {
            surveys_path: optional_path("SURVEYS_PATH"),
            registrations_path: optional_path("REGISTRATIONS_PATH"),
            field_labels_path: optional_path("FIELD_LABELS_PATH"),
        };

        Ok(Config {
            database,
            logging,
            catalog,
        })
    }
}

fn optional_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/survey.db"),
            max_connections: 5,
            schema_version: LATEST_SCHEMA_VERSION,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
