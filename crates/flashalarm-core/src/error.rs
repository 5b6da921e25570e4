//! Core error types for flashalarm-core.
//!
//! This module defines the error hierarchy using thiserror. Errors that the
//! alarm must survive (delivery failures, missing sound assets, wrong
//! answers) are never raised through here; they are logged and recovered
//! where they happen.

use std::path::PathBuf;
use thiserror::Error;

use crate::alarm::AlarmId;

/// Core error type for flashalarm-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Alarm list / pending notification storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Scheduling precondition violations
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
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

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDirUnavailable(String),
}

/// Errors from the persisted alarm list and pending notification files.
#[derive(Error, Debug)]
pub enum StorageError {
    /// File could not be read
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File could not be written
    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File contents did not decode
    #[error("Corrupt data in {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No alarm with this id in the list
    #[error("Alarm not found: {0}")]
    AlarmNotFound(AlarmId),

    /// An alarm with this id is already in the list
    #[error("Alarm already exists: {0}")]
    DuplicateAlarm(AlarmId),
}

/// Precondition violations for the repeat scheduler.
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// Only enabled alarms may be scheduled
    #[error("Alarm {0} is disabled and cannot be scheduled")]
    AlarmDisabled(AlarmId),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Value outside its allowed range
    #[error("{field} must be within {min}..={max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: String,
        max: String,
        value: String,
    },

    /// Time of day could not be parsed
    #[error("Invalid time of day '{0}': expected HH:MM")]
    InvalidTimeOfDay(String),
}

impl ValidationError {
    pub(crate) fn out_of_range<T: std::fmt::Display>(
        field: &'static str,
        min: T,
        max: T,
        value: T,
    ) -> Self {
        ValidationError::OutOfRange {
            field,
            min: min.to_string(),
            max: max.to_string(),
            value: value.to_string(),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
