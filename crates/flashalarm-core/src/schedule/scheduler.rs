//! Repeat scheduler.
//!
//! Keeps an alarm ringing until it is dismissed by scheduling a fixed budget
//! of notifications: the primary trigger plus repeats spaced by the snooze
//! interval. Every operation is idempotent with respect to the alarm id:
//! scheduling always retracts the previous set first, and cancelling ids
//! that are not pending does nothing.
//!
//! The scheduler does not track whether an alarm is enabled. The alarm list
//! owner calls [`RepeatScheduler::schedule`] / [`RepeatScheduler::cancel`]
//! on every enable, disable, edit and delete.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::notification::{
    delivery_identifier, delivery_identifiers, DeliveryError, NotificationCenter,
    NotificationPayload, NotificationRequest, ALARM_CATEGORY, ALARM_TITLE,
};
use super::window::{primary_trigger, repeat_trigger, REPEAT_BUDGET};
use crate::alarm::{Alarm, AlarmId};
use crate::error::ScheduleError;

/// One occurrence of an alarm's notification set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub alarm_id: AlarmId,
    pub repeat_index: u32,
    pub fire_at: DateTime<Utc>,
}

impl ScheduleEntry {
    pub fn identifier(&self) -> String {
        delivery_identifier(&self.alarm_id, self.repeat_index)
    }
}

/// Result of one `schedule` call.
///
/// Entries the delivery service refused are listed in `failed`; they never
/// prevent the remaining entries from being scheduled.
#[derive(Debug, Clone, Default)]
pub struct ScheduleReport {
    pub scheduled: Vec<ScheduleEntry>,
    pub failed: Vec<(ScheduleEntry, DeliveryError)>,
}

impl ScheduleReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Owns the pending repeat notifications for all alarms.
#[derive(Debug)]
pub struct RepeatScheduler<N: NotificationCenter> {
    center: N,
    repeat_budget: u32,
    authorized: Option<bool>,
}

impl<N: NotificationCenter> RepeatScheduler<N> {
    pub fn new(center: N) -> Self {
        Self::with_repeat_budget(center, REPEAT_BUDGET)
    }

    pub fn with_repeat_budget(center: N, repeat_budget: u32) -> Self {
        Self {
            center,
            repeat_budget: repeat_budget.max(1),
            authorized: None,
        }
    }

    pub fn repeat_budget(&self) -> u32 {
        self.repeat_budget
    }

    pub fn center(&self) -> &N {
        &self.center
    }

    pub fn center_mut(&mut self) -> &mut N {
        &mut self.center
    }

    /// Ask for delivery permission.
    ///
    /// The prompt is shown once; later calls return the remembered answer.
    /// A denial is not fatal: scheduling keeps working, it just will not be
    /// delivered.
    pub fn request_permissions(&mut self) -> bool {
        if let Some(granted) = self.authorized {
            return granted;
        }
        let granted = self.center.request_authorization();
        if !granted {
            tracing::warn!("notification permission denied; alarms will not be delivered");
        }
        self.authorized = Some(granted);
        granted
    }

    /// Compute the entries `schedule` would create, without touching the
    /// delivery service.
    pub fn plan<Tz: TimeZone>(
        &self,
        alarm: &Alarm,
        snooze_minutes: u32,
        now: &DateTime<Tz>,
    ) -> Vec<ScheduleEntry> {
        let primary = primary_trigger(alarm.time, now);
        (0..self.repeat_budget)
            .map(|i| ScheduleEntry {
                alarm_id: alarm.id.clone(),
                repeat_index: i,
                fire_at: repeat_trigger(&primary, i, snooze_minutes).with_timezone(&Utc),
            })
            .collect()
    }

    /// Replace the alarm's pending notifications with a fresh set.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::AlarmDisabled`] if the alarm is disabled; in
    /// that case nothing is added or removed.
    pub fn schedule<Tz: TimeZone>(
        &mut self,
        alarm: &Alarm,
        snooze_minutes: u32,
        now: &DateTime<Tz>,
    ) -> Result<ScheduleReport, ScheduleError> {
        if !alarm.enabled {
            return Err(ScheduleError::AlarmDisabled(alarm.id.clone()));
        }

        self.cancel(&alarm.id);

        let mut report = ScheduleReport::default();
        for entry in self.plan(alarm, snooze_minutes, now) {
            let request = NotificationRequest {
                identifier: entry.identifier(),
                title: ALARM_TITLE.to_string(),
                body: alarm.label.clone(),
                sound: alarm.sound.clone(),
                category: ALARM_CATEGORY.to_string(),
                fire_at: entry.fire_at,
                payload: NotificationPayload {
                    alarm_id: alarm.id.clone(),
                },
            };
            match self.center.add(request) {
                Ok(()) => report.scheduled.push(entry),
                Err(e) => {
                    tracing::warn!(identifier = %entry.identifier(), error = %e, "failed to schedule notification");
                    report.failed.push((entry, e));
                }
            }
        }

        tracing::debug!(
            alarm_id = %alarm.id,
            scheduled = report.scheduled.len(),
            failed = report.failed.len(),
            "alarm scheduled"
        );
        Ok(report)
    }

    /// Retract every notification the alarm can own. Safe to call
    /// speculatively.
    pub fn cancel(&mut self, alarm_id: &AlarmId) {
        let identifiers = delivery_identifiers(alarm_id, self.repeat_budget);
        self.center.remove_pending(&identifiers);
    }

    /// Retract every pending notification.
    pub fn cancel_all(&mut self) {
        self.center.remove_all_pending();
    }

    /// Pending entries belonging to `alarm_id`, in repeat order.
    pub fn entries_for(&self, alarm_id: &AlarmId) -> Vec<ScheduleEntry> {
        let identifiers = delivery_identifiers(alarm_id, self.repeat_budget);
        let mut entries: Vec<ScheduleEntry> = self
            .center
            .pending()
            .into_iter()
            .filter_map(|r| {
                let index = identifiers.iter().position(|id| *id == r.identifier)?;
                Some(ScheduleEntry {
                    alarm_id: alarm_id.clone(),
                    repeat_index: index as u32,
                    fire_at: r.fire_at,
                })
            })
            .collect();
        entries.sort_by_key(|e| e.repeat_index);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::TimeOfDay;
    use crate::schedule::notification::InMemoryNotificationCenter;
    use chrono::Duration;

    fn alarm() -> Alarm {
        Alarm::new(TimeOfDay::new(7, 0).unwrap(), "Morning")
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 6, 0, 0).unwrap()
    }

    #[test]
    fn schedule_creates_full_budget() {
        let mut scheduler = RepeatScheduler::new(InMemoryNotificationCenter::new());
        let alarm = alarm();
        let report = scheduler.schedule(&alarm, 3, &now()).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.scheduled.len(), 10);
        assert_eq!(scheduler.center().len(), 10);

        let t0 = Utc.with_ymd_and_hms(2026, 4, 1, 7, 0, 0).unwrap();
        for (i, entry) in report.scheduled.iter().enumerate() {
            assert_eq!(entry.fire_at, t0 + Duration::minutes(3 * i as i64));
        }
    }

    #[test]
    fn payload_and_content_follow_alarm() {
        let mut scheduler = RepeatScheduler::new(InMemoryNotificationCenter::new());
        let alarm = alarm().with_sound("bell");
        scheduler.schedule(&alarm, 2, &now()).unwrap();
        for request in scheduler.center().pending() {
            assert_eq!(request.payload.alarm_id, alarm.id);
            assert_eq!(request.body, "Morning");
            assert_eq!(request.sound, "bell");
            assert_eq!(request.category, ALARM_CATEGORY);
        }
    }

    #[test]
    fn disabled_alarm_is_rejected_untouched() {
        let mut scheduler = RepeatScheduler::new(InMemoryNotificationCenter::new());
        let mut alarm = alarm();
        scheduler.schedule(&alarm, 2, &now()).unwrap();
        alarm.enabled = false;
        let result = scheduler.schedule(&alarm, 2, &now());
        assert!(matches!(result, Err(ScheduleError::AlarmDisabled(_))));
        assert_eq!(scheduler.center().len(), 10);
    }

    #[test]
    fn failed_entry_does_not_abort_the_rest() {
        let alarm = alarm();
        let mut center = InMemoryNotificationCenter::new();
        center.reject(format!("{}-repeat-4", alarm.id));
        let mut scheduler = RepeatScheduler::new(center);
        let report = scheduler.schedule(&alarm, 2, &now()).unwrap();
        assert_eq!(report.scheduled.len(), 9);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0.repeat_index, 4);
        assert_eq!(scheduler.center().len(), 9);
    }

    #[test]
    fn permission_prompt_is_asked_once() {
        let mut scheduler = RepeatScheduler::new(InMemoryNotificationCenter::denying_authorization());
        assert!(!scheduler.request_permissions());
        assert!(!scheduler.request_permissions());
        // Scheduling still executes after a denial.
        scheduler.schedule(&alarm(), 2, &now()).unwrap();
        assert_eq!(scheduler.center().len(), 10);
    }

    #[test]
    fn custom_budget_is_honored() {
        let mut scheduler = RepeatScheduler::with_repeat_budget(InMemoryNotificationCenter::new(), 4);
        let alarm = alarm();
        scheduler.schedule(&alarm, 5, &now()).unwrap();
        assert_eq!(scheduler.entries_for(&alarm.id).len(), 4);
        scheduler.cancel(&alarm.id);
        assert!(scheduler.center().is_empty());
    }
}
