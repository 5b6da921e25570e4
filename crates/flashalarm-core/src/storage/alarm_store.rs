//! Persisted alarm list.
//!
//! The store is the alarm-list owner: it keeps the ordered list in
//! `<data_dir>/alarms.json` and drives the [`RepeatScheduler`] on every
//! transition (add, edit, enable, disable, delete, dismissal), which is the
//! only way the scheduler learns about alarm state.
//!
//! Opening a store never touches pending notifications. A long-running
//! front end calls [`AlarmStore::reconcile`] once at launch to restore
//! schedules that went missing.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};

use super::{read_json, write_json};
use crate::alarm::{Alarm, AlarmId};
use crate::error::{Result, StorageError};
use crate::schedule::{NotificationCenter, RepeatScheduler};

#[derive(Debug)]
pub struct AlarmStore<N: NotificationCenter> {
    path: PathBuf,
    alarms: Vec<Alarm>,
    scheduler: RepeatScheduler<N>,
}

impl<N: NotificationCenter> AlarmStore<N> {
    /// Load the alarm list, starting empty if the file is missing.
    pub fn open(path: impl Into<PathBuf>, scheduler: RepeatScheduler<N>) -> Result<Self> {
        let path = path.into();
        let alarms: Vec<Alarm> = read_json(&path)?.unwrap_or_default();
        Ok(Self {
            path,
            alarms,
            scheduler,
        })
    }

    /// Re-read the alarm list, picking up edits made by other processes.
    pub fn reload(&mut self) -> Result<()> {
        self.alarms = read_json(&self.path)?.unwrap_or_default();
        Ok(())
    }

    /// Schedule every enabled alarm that has no pending notification.
    ///
    /// Alarms with repeats still in flight are left alone. Returns the ids
    /// that were scheduled.
    pub fn reconcile<Tz: TimeZone>(&mut self, snooze_minutes: u32, now: &DateTime<Tz>) -> Result<Vec<AlarmId>> {
        let mut scheduled = Vec::new();
        for alarm in self.alarms.iter().filter(|a| a.enabled) {
            if !self.scheduler.entries_for(&alarm.id).is_empty() {
                continue;
            }
            self.scheduler.schedule(alarm, snooze_minutes, now)?;
            scheduled.push(alarm.id.clone());
        }
        Ok(scheduled)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn alarms(&self) -> &[Alarm] {
        &self.alarms
    }

    pub fn get(&self, id: &AlarmId) -> Option<&Alarm> {
        self.alarms.iter().find(|a| a.id == *id)
    }

    /// Look up an alarm by full id or unique id prefix.
    pub fn find(&self, id_or_prefix: &str) -> Option<&Alarm> {
        if let Some(alarm) = self.alarms.iter().find(|a| a.id.as_str() == id_or_prefix) {
            return Some(alarm);
        }
        let mut matches = self
            .alarms
            .iter()
            .filter(|a| a.id.as_str().starts_with(id_or_prefix));
        match (matches.next(), matches.next()) {
            (Some(alarm), None) if !id_or_prefix.is_empty() => Some(alarm),
            _ => None,
        }
    }

    pub fn scheduler(&self) -> &RepeatScheduler<N> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut RepeatScheduler<N> {
        &mut self.scheduler
    }

    pub fn add<Tz: TimeZone>(&mut self, alarm: Alarm, snooze_minutes: u32, now: &DateTime<Tz>) -> Result<()> {
        if self.get(&alarm.id).is_some() {
            return Err(StorageError::DuplicateAlarm(alarm.id).into());
        }
        self.alarms.push(alarm.clone());
        self.save()?;
        if alarm.enabled {
            self.scheduler.schedule(&alarm, snooze_minutes, now)?;
        }
        Ok(())
    }

    /// Replace an alarm (matched by id) and resync its notifications.
    pub fn update<Tz: TimeZone>(&mut self, alarm: Alarm, snooze_minutes: u32, now: &DateTime<Tz>) -> Result<()> {
        let slot = self
            .alarms
            .iter_mut()
            .find(|a| a.id == alarm.id)
            .ok_or_else(|| StorageError::AlarmNotFound(alarm.id.clone()))?;
        *slot = alarm.clone();
        self.save()?;

        self.scheduler.cancel(&alarm.id);
        if alarm.enabled {
            self.scheduler.schedule(&alarm, snooze_minutes, now)?;
        }
        Ok(())
    }

    pub fn set_enabled<Tz: TimeZone>(
        &mut self,
        id: &AlarmId,
        enabled: bool,
        snooze_minutes: u32,
        now: &DateTime<Tz>,
    ) -> Result<()> {
        let mut alarm = self
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::AlarmNotFound(id.clone()))?;
        alarm.enabled = enabled;
        self.update(alarm, snooze_minutes, now)
    }

    pub fn delete(&mut self, id: &AlarmId) -> Result<Alarm> {
        let index = self
            .alarms
            .iter()
            .position(|a| a.id == *id)
            .ok_or_else(|| StorageError::AlarmNotFound(id.clone()))?;
        let removed = self.alarms.remove(index);
        self.save()?;
        self.scheduler.cancel(id);
        Ok(removed)
    }

    /// A challenge for this alarm finished. Whatever the outcome, the
    /// repeats are retracted and the alarm is disabled.
    pub fn complete(&mut self, id: &AlarmId, solved: bool) -> Result<()> {
        self.scheduler.cancel(id);
        let alarm = self
            .alarms
            .iter_mut()
            .find(|a| a.id == *id)
            .ok_or_else(|| StorageError::AlarmNotFound(id.clone()))?;
        alarm.enabled = false;
        tracing::info!(alarm_id = %id, solved, "alarm dismissed");
        self.save()
    }

    pub fn save(&self) -> Result<()> {
        write_json(&self.path, &self.alarms)?;
        Ok(())
    }
}
