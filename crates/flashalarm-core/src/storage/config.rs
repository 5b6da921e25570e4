//! TOML-based application configuration.
//!
//! Stores the user settings the core consumes:
//! - Maximum challenge attempts before the alarm can be abandoned
//! - Snooze interval between repeat notifications
//! - Audio fallback preference
//!
//! Configuration is stored at `~/.config/flashalarm/config.toml`. Values are
//! read by callers at the moment they schedule an alarm or start a
//! challenge; the core components never cache them.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;

const MAX_ATTEMPTS_RANGE: RangeInclusive<u32> = 1..=10;
const SNOOZE_INTERVAL_RANGE: RangeInclusive<u32> = 1..=10;

/// Challenge configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

/// Repeat scheduling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmConfig {
    /// Minutes between repeat notifications.
    #[serde(default = "default_snooze_interval")]
    pub snooze_interval_minutes: u32,
}

/// Audio configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Always use the alert-beep loop instead of the sound asset.
    #[serde(default)]
    pub fallback_beep: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/flashalarm/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub challenge: ChallengeSettings,
    #[serde(default)]
    pub alarm: AlarmConfig,
    #[serde(default)]
    pub audio: AudioConfig,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_snooze_interval() -> u32 {
    2
}

impl Default for ChallengeSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            snooze_interval_minutes: default_snooze_interval(),
        }
    }
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
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?
                            .into(),
                    ),
                    serde_json::Value::Object(_) => return Err(unknown()),
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing defaults if no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path. Out-of-range values fall back to their
    /// defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                Ok(cfg.sanitized())
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to the data directory.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key without saving.
    ///
    /// The updated config must pass [`validate`](Self::validate); otherwise
    /// `self` is left unchanged.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a value by key and persist.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("challenge.max_attempts", self.challenge.max_attempts, &MAX_ATTEMPTS_RANGE)?;
        check_range(
            "alarm.snooze_interval_minutes",
            self.alarm.snooze_interval_minutes,
            &SNOOZE_INTERVAL_RANGE,
        )
    }

    /// Replace out-of-range values with their defaults.
    pub fn sanitized(mut self) -> Self {
        if !MAX_ATTEMPTS_RANGE.contains(&self.challenge.max_attempts) {
            tracing::warn!(value = self.challenge.max_attempts, "challenge.max_attempts out of range, using default");
            self.challenge.max_attempts = default_max_attempts();
        }
        if !SNOOZE_INTERVAL_RANGE.contains(&self.alarm.snooze_interval_minutes) {
            tracing::warn!(
                value = self.alarm.snooze_interval_minutes,
                "alarm.snooze_interval_minutes out of range, using default"
            );
            self.alarm.snooze_interval_minutes = default_snooze_interval();
        }
        self
    }

    /// Check an attempt limit given outside the config file.
    pub fn check_max_attempts(value: u32) -> Result<u32, ConfigError> {
        check_range("challenge.max_attempts", value, &MAX_ATTEMPTS_RANGE)?;
        Ok(value)
    }

    pub fn max_attempts(&self) -> u32 {
        self.challenge.max_attempts
    }

    pub fn snooze_interval_minutes(&self) -> u32 {
        self.alarm.snooze_interval_minutes
    }
}

fn check_range(key: &str, value: u32, range: &RangeInclusive<u32>) -> Result<(), ConfigError> {
    if range.contains(&value) {
        return Ok(());
    }
    Err(ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("must be within {}..={}, got {value}", range.start(), range.end()),
    })
}
