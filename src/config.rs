use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_LOG_FILTER: &str = "info";

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Backend API connection settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Where the signed-in session is persisted
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SessionConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default)]
    pub filter: Option<String>,
    /// Log file path; defaults to the data directory
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from default paths
    /// Priority: local (.courseguide/config.local.toml) > project (.courseguide/config.toml)
    /// > user (~/.courseguide/config.toml) > built-in defaults
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".courseguide").join("config.toml");
            if user_config.exists() {
                let user = Self::load_from(&user_config)?;
                config.merge(user);
            }
        }

        let project_config = Path::new(".courseguide").join("config.toml");
        if project_config.exists() {
            let project = Self::load_from(&project_config)?;
            config.merge(project);
        }

        // Should be gitignored
        let local_config = Path::new(".courseguide").join("config.local.toml");
        if local_config.exists() {
            let local = Self::load_from(&local_config)?;
            config.merge(local);
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes priority where set)
    pub fn merge(&mut self, other: Config) {
        if other.api.base_url.is_some() {
            self.api.base_url = other.api.base_url;
        }
        if other.api.timeout_ms.is_some() {
            self.api.timeout_ms = other.api.timeout_ms;
        }
        if other.session.file.is_some() {
            self.session.file = other.session.file;
        }
        if other.logging.filter.is_some() {
            self.logging.filter = other.logging.filter;
        }
        if other.logging.file.is_some() {
            self.logging.file = other.logging.file;
        }
    }

    pub fn base_url(&self) -> &str {
        self.api.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn timeout_ms(&self) -> u64 {
        self.api.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)
    }

    pub fn log_filter(&self) -> &str {
        self.logging.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let base_url = self.base_url();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            errors.push(ValidationError {
                field: "api.base_url".to_string(),
                message: format!("Must start with http:// or https://, got '{}'", base_url),
            });
        }

        if self.api.timeout_ms == Some(0) {
            errors.push(ValidationError {
                field: "api.timeout_ms".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if let Some(filter) = &self.logging.filter {
            if tracing_subscriber::EnvFilter::try_new(filter).is_err() {
                errors.push(ValidationError {
                    field: "logging.filter".to_string(),
                    message: format!("Invalid filter directive '{}'", filter),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
