//! Core error types for habitrack-core.
//!
//! This module defines the error hierarchy using thiserror. Domain-specific
//! enums convert into [`CoreError`] so callers can use `?` across module
//! boundaries.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for habitrack-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Validation errors (malformed records, mixed input, bad forms)
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors reported by the completion store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validation errors.
///
/// Every record-level variant carries the offending record's id so the
/// caller can surface exactly which document was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A timestamp could not be parsed as ISO-8601
    #[error("Invalid timestamp '{value}' on record {record_id}: {reason}")]
    InvalidTimestamp {
        record_id: String,
        value: String,
        reason: String,
    },

    /// A completion belongs to a different habit than the one analysed
    #[error("Completion {record_id} references habit {found}, expected {expected}")]
    HabitMismatch {
        record_id: String,
        expected: String,
        found: String,
    },

    /// A completion is owned by a different user than its habit
    #[error("Completion {record_id} is owned by {found}, expected {expected}")]
    OwnerMismatch {
        record_id: String,
        expected: String,
        found: String,
    },

    /// Unknown habit frequency
    #[error("Invalid frequency '{0}': expected daily, weekly or monthly")]
    InvalidFrequency(String),

    /// A required text field was blank
    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    /// Invalid window bounds
    #[error("Invalid window: end ({end}) must be after start ({start})")]
    InvalidWindow {
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Missing required configuration key
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Errors raised at the completion store seam.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Referenced habit does not exist (or is not visible to this user)
    #[error("Habit not found: {0}")]
    NotFound(String),

    /// A record with this id is already stored
    #[error("Duplicate record id: {0}")]
    Duplicate(String),

    /// The habit already has a completion in the current window
    #[error("Habit {habit_id} is already completed for today")]
    AlreadyCompleted { habit_id: String },

    /// Backend could not be reached or refused the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
