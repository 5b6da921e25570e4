mod alarm_store;
mod config;
mod notifications;

pub use alarm_store::AlarmStore;
pub use config::{AlarmConfig, AudioConfig, ChallengeSettings, Config};
pub use notifications::JsonNotificationCenter;

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ConfigError, StorageError};

/// Returns `~/.config/flashalarm[-dev]/` based on FLASHALARM_ENV.
///
/// Set FLASHALARM_ENV=dev to use development data directory.
/// FLASHALARM_DATA_DIR overrides the location entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("FLASHALARM_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("FLASHALARM_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("flashalarm-dev")
            } else {
                base_dir.join("flashalarm")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDirUnavailable(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Read a JSON file, returning `None` if it does not exist.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StorageError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| StorageError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

/// Write a JSON file via a temporary sibling so readers never see a torn file.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let content = serde_json::to_string_pretty(value).map_err(|source| StorageError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    let write_failed = |source| StorageError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };
    std::fs::write(&tmp, content).map_err(write_failed)?;
    std::fs::rename(&tmp, path).map_err(write_failed)
}
