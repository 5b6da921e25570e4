//! Notification delivery collaborator.
//!
//! The repeat scheduler never talks to a platform notification service
//! directly; it goes through [`NotificationCenter`]. Requests are keyed by a
//! delivery identifier derived from the alarm id and repeat index, so the
//! same identifiers can be recomputed for cancellation.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alarm::AlarmId;

/// Category attached to every alarm notification.
pub const ALARM_CATEGORY: &str = "ALARM_CATEGORY";

/// Title shown on every alarm notification.
pub const ALARM_TITLE: &str = "Alarm";

/// Delivery identifier for the repeat at `index`.
///
/// `"<id>"` for the primary trigger, `"<id>-repeat-<i>"` for repeats.
pub fn delivery_identifier(alarm_id: &AlarmId, index: u32) -> String {
    if index == 0 {
        alarm_id.to_string()
    } else {
        format!("{alarm_id}-repeat-{index}")
    }
}

/// Every identifier an alarm can own under the given repeat budget.
pub fn delivery_identifiers(alarm_id: &AlarmId, repeat_budget: u32) -> Vec<String> {
    (0..repeat_budget)
        .map(|i| delivery_identifier(alarm_id, i))
        .collect()
}

/// Routing data carried by each notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub alarm_id: AlarmId,
}

/// A single pending notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub identifier: String,
    pub title: String,
    pub body: String,
    pub sound: String,
    pub category: String,
    pub fire_at: DateTime<Utc>,
    pub payload: NotificationPayload,
}

/// Failure reported by the delivery subsystem for one request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("notification '{identifier}' rejected: {reason}")]
    Rejected { identifier: String, reason: String },

    #[error("notification service unavailable: {0}")]
    Unavailable(String),
}

/// Platform notification service as seen by the scheduler.
///
/// Adding a request whose identifier is already pending replaces it.
/// Removing identifiers that are not pending is a no-op.
pub trait NotificationCenter {
    /// Ask the user for permission to deliver. Returns whether it was granted.
    fn request_authorization(&mut self) -> bool;

    fn add(&mut self, request: NotificationRequest) -> Result<(), DeliveryError>;

    fn remove_pending(&mut self, identifiers: &[String]);

    fn remove_all_pending(&mut self);

    /// Snapshot of all pending requests, ordered by identifier.
    fn pending(&self) -> Vec<NotificationRequest>;
}

/// In-process notification center.
///
/// Keeps requests in memory and hands them out through [`take_due`]. Used by
/// tests and as the state behind the file-backed center.
///
/// [`take_due`]: InMemoryNotificationCenter::take_due
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryNotificationCenter {
    pending: BTreeMap<String, NotificationRequest>,
    #[serde(skip)]
    deny_authorization: bool,
    #[serde(skip)]
    rejected: HashSet<String>,
}

impl InMemoryNotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A center whose authorization prompt is always declined.
    pub fn denying_authorization() -> Self {
        Self {
            deny_authorization: true,
            ..Self::default()
        }
    }

    /// Make `add` fail for this identifier.
    pub fn reject(&mut self, identifier: impl Into<String>) {
        self.rejected.insert(identifier.into());
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.pending.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove and return every request due at or before `now`, earliest first.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<NotificationRequest> {
        let due: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, r)| r.fire_at <= now)
            .map(|(id, _)| id.clone())
            .collect();
        let mut delivered: Vec<NotificationRequest> = due
            .iter()
            .filter_map(|id| self.pending.remove(id))
            .collect();
        delivered.sort_by_key(|r| r.fire_at);
        delivered
    }
}

impl NotificationCenter for InMemoryNotificationCenter {
    fn request_authorization(&mut self) -> bool {
        !self.deny_authorization
    }

    fn add(&mut self, request: NotificationRequest) -> Result<(), DeliveryError> {
        if self.rejected.contains(&request.identifier) {
            return Err(DeliveryError::Rejected {
                identifier: request.identifier,
                reason: "rejected by delivery service".into(),
            });
        }
        self.pending.insert(request.identifier.clone(), request);
        Ok(())
    }

    fn remove_pending(&mut self, identifiers: &[String]) {
        for id in identifiers {
            self.pending.remove(id);
        }
    }

    fn remove_all_pending(&mut self) {
        self.pending.clear();
    }

    fn pending(&self) -> Vec<NotificationRequest> {
        self.pending.values().cloned().collect()
    }
}
