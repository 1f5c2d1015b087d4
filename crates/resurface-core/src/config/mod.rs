//! Configuration system for resurface.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use crate::error::{ResurfaceError, ResurfaceResult};
use crate::types::{DEFAULT_SESSION_SIZE, MAX_SESSION_SIZE};

/// Largest accepted UTC offset, in minutes (±18h).
const MAX_UTC_OFFSET_MINUTES: i32 = 18 * 60;

/// Main resurface configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResurfaceConfig {
    /// Path to the SQLite database.
    pub database_path: PathBuf,
    /// Fixed offset from UTC used to decide the calendar day.
    pub utc_offset_minutes: i32,
    /// Seed for all review randomness. Entropy-seeded when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rng_seed: Option<u64>,
    /// Session size used when a user has no usable setting.
    pub default_session_size: u32,
}

impl Default for ResurfaceConfig {
    fn default() -> Self {
        let resurface_dir = dirs::home_dir()
            .map(|h| h.join(".resurface"))
            .unwrap_or_else(|| PathBuf::from(".resurface"));

        Self {
            database_path: resurface_dir.join("resurface.db"),
            utc_offset_minutes: 0,
            rng_seed: None,
            default_session_size: DEFAULT_SESSION_SIZE,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable environment variable");
            None
        }
    }
}

impl ResurfaceConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> ResurfaceResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| ResurfaceError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| ResurfaceError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| ResurfaceError::Configuration(e.to_string()))?,
            _ => {
                return Err(ResurfaceError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    ///
    /// Variables that are set but fail to parse are ignored with a warning.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `RESURFACE_*` environment overrides on top of this configuration.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var("RESURFACE_DB_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(offset) = env_parse("RESURFACE_UTC_OFFSET_MINUTES") {
            self.utc_offset_minutes = offset;
        }
        if let Some(seed) = env_parse("RESURFACE_RNG_SEED") {
            self.rng_seed = Some(seed);
        }
        if let Some(size) = env_parse("RESURFACE_DEFAULT_SESSION_SIZE") {
            self.default_session_size = size;
        }
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> ResurfaceResult<()> {
        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(ResurfaceError::Configuration(format!(
                "utc_offset_minutes must be within ±{}, got {}",
                MAX_UTC_OFFSET_MINUTES, self.utc_offset_minutes
            )));
        }
        if self.default_session_size == 0 || self.default_session_size > MAX_SESSION_SIZE {
            return Err(ResurfaceError::Configuration(format!(
                "default_session_size must be between 1 and {}, got {}",
                MAX_SESSION_SIZE, self.default_session_size
            )));
        }
        Ok(())
    }

    /// The configured offset used to compute "today".
    pub fn utc_offset(&self) -> ResurfaceResult<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            ResurfaceError::Configuration(format!(
                "invalid utc_offset_minutes: {}",
                self.utc_offset_minutes
            ))
        })
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> ResurfaceConfigBuilder {
        ResurfaceConfigBuilder::default()
    }
}

/// Builder for ResurfaceConfig.
#[derive(Default)]
pub struct ResurfaceConfigBuilder {
    config: ResurfaceConfig,
}

impl ResurfaceConfigBuilder {
    /// Set the database path.
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = path.into();
        self
    }

    /// Set the UTC offset in minutes.
    pub fn utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.config.utc_offset_minutes = minutes;
        self
    }

    /// Seed review randomness for reproducible sessions.
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.config.rng_seed = Some(seed);
        self
    }

    /// Set the fallback session size.
    pub fn default_session_size(mut self, size: u32) -> Self {
        self.config.default_session_size = size;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ResurfaceResult<ResurfaceConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
