//! TOML-based application configuration.
//!
//! Stores:
//! - Streak settings (gap tolerance, ranking tie-break)
//! - Backend identifiers (endpoint, project, database and collection ids)
//!
//! Configuration is stored at `~/.config/habitrack/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::streak::{StreakEngine, TieBreak, DEFAULT_TOLERANCE_DAYS};

/// Streak computation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakConfig {
    #[serde(default = "default_tolerance_days")]
    pub tolerance_days: f64,
    #[serde(default)]
    pub tie_break: TieBreak,
}

/// Backend-as-a-service identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub database_id: String,
    #[serde(default)]
    pub habits_collection: String,
    #[serde(default)]
    pub completions_collection: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/habitrack/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub streak: StreakConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

fn default_tolerance_days() -> f64 {
    DEFAULT_TOLERANCE_DAYS
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self {
            tolerance_days: default_tolerance_days(),
            tie_break: TieBreak::default(),
        }
    }
}

impl StreakConfig {
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] for a negative or non-finite tolerance.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine().map(|_| ())
    }

    /// Build an engine from these settings.
    pub fn engine(&self) -> Result<StreakEngine, ConfigError> {
        StreakEngine::with_tolerance(self.tolerance_days).map_err(|e| ConfigError::InvalidValue {
            key: "streak.tolerance_days".to_string(),
            message: e.to_string(),
        })
    }
}

const ENV_ENDPOINT: &str = "HABITRACK_ENDPOINT";
const ENV_PROJECT_ID: &str = "HABITRACK_PROJECT_ID";
const ENV_PLATFORM: &str = "HABITRACK_PLATFORM";
const ENV_DB_ID: &str = "HABITRACK_DB_ID";
const ENV_HABITS_COLLECTION: &str = "HABITRACK_HABITS_COLLECTION";
const ENV_COMPLETIONS_COLLECTION: &str = "HABITRACK_COMPLETIONS_COLLECTION";

impl BackendConfig {
    /// Read backend settings from the process environment.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingKey`] when endpoint, project id or
    /// platform is unset or blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`BackendConfig::from_env`] with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, ConfigError> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingKey(key.to_string()))
        };
        let optional = |key: &str| lookup(key).unwrap_or_default();

        Ok(Self {
            endpoint: required(ENV_ENDPOINT)?,
            project_id: required(ENV_PROJECT_ID)?,
            platform: required(ENV_PLATFORM)?,
            database_id: optional(ENV_DB_ID),
            habits_collection: optional(ENV_HABITS_COLLECTION),
            completions_collection: optional(ENV_COMPLETIONS_COLLECTION),
        })
    }

    /// Realtime channel name for a collection's documents.
    pub fn documents_channel(&self, collection: &str) -> String {
        format!("databases.{}.collections.{}.documents", self.database_id, collection)
    }
}

/// Returns `~/.config/habitrack[-dev]/` based on HABITRACK_ENV.
///
/// Set HABITRACK_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("HABITRACK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("habitrack-dev")
    } else {
        base_dir.join("habitrack")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::LoadFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::InvalidValue {
            key: key.to_string(),
            message: "unknown config key".to_string(),
        };
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| {
                                    invalid(format!("cannot parse '{value}' as number"))
                                })?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default on-disk location.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(Self::path_in(&data_dir()?))
    }

    /// Config file location inside `dir`.
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join("config.toml")
    }

    /// Load from the default location, writing defaults if absent.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_in(&data_dir()?)
    }

    /// Load from `dir`, writing defaults there if no config file exists yet.
    pub fn load_in(dir: &Path) -> Result<Self, ConfigError> {
        let path = Self::path_in(dir);
        if !path.exists() {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            return Ok(cfg);
        }
        Self::load_from(&path)
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_in(&data_dir()?)
    }

    /// Persist to the config file inside `dir`.
    pub fn save_in(&self, dir: &Path) -> Result<(), ConfigError> {
        self.save_to(&Self::path_in(dir))
    }

    /// Load from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the parsed streak settings are invalid.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };
        let cfg: Config = toml::from_str(&content)?;
        cfg.streak.validate()?;
        Ok(cfg)
    }

    /// Write pretty TOML to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        tracing::debug!(path = %path.display(), "saved config");
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key. Returns error if key is unknown or the
    /// result does not validate.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.streak.validate()?;
        *self = updated;
        Ok(())
    }
}
