//! File-backed notification center.
//!
//! Pending notifications live in `<data_dir>/pending.json` so that a
//! scheduling command and a separate `watch` process share them. Every
//! mutation is written through immediately.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::{read_json, write_json};
use crate::error::StorageError;
use crate::schedule::notification::{
    DeliveryError, InMemoryNotificationCenter, NotificationCenter, NotificationRequest,
};

#[derive(Debug)]
pub struct JsonNotificationCenter {
    path: PathBuf,
    inner: InMemoryNotificationCenter,
}

impl JsonNotificationCenter {
    /// Open the pending-notification file, starting empty if it is missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let inner = read_json(&path)?.unwrap_or_default();
        Ok(Self { path, inner })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file, picking up changes made by other processes.
    pub fn reload(&mut self) -> Result<(), StorageError> {
        self.inner = read_json(&self.path)?.unwrap_or_default();
        Ok(())
    }

    /// Remove and return every request due at or before `now`.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Result<Vec<NotificationRequest>, StorageError> {
        let due = self.inner.take_due(now);
        if !due.is_empty() {
            self.persist()?;
        }
        Ok(due)
    }

    fn persist(&self) -> Result<(), StorageError> {
        write_json(&self.path, &self.inner)
    }

    fn persist_or_log(&self) {
        if let Err(e) = self.persist() {
            tracing::warn!(error = %e, "failed to persist pending notifications");
        }
    }
}

impl NotificationCenter for JsonNotificationCenter {
    fn request_authorization(&mut self) -> bool {
        true
    }

    fn add(&mut self, request: NotificationRequest) -> Result<(), DeliveryError> {
        self.inner.add(request)?;
        self.persist()
            .map_err(|e| DeliveryError::Unavailable(e.to_string()))
    }

    fn remove_pending(&mut self, identifiers: &[String]) {
        self.inner.remove_pending(identifiers);
        self.persist_or_log();
    }

    fn remove_all_pending(&mut self) {
        self.inner.remove_all_pending();
        self.persist_or_log();
    }

    fn pending(&self) -> Vec<NotificationRequest> {
        self.inner.pending()
    }
}
