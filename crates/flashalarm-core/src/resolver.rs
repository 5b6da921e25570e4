//! Active alarm resolution.
//!
//! Notifications may fire while the app is in the foreground, or the app may
//! be launched well after an alarm's primary trigger. In both cases the user
//! must still pass the challenge, so the resolver reconciles what was
//! delivered with what is ringing and surfaces at most one alarm at a time
//! through a single activation channel.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::alarm::{Alarm, AlarmId};
use crate::events::Event;
use crate::schedule::notification::NotificationPayload;
use crate::schedule::window::{active_window, REPEAT_BUDGET};

/// How an alarm came to be active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationSource {
    /// A notification was delivered while the app was running.
    Delivered,
    /// The app was opened from a notification.
    Opened,
    /// A launch/foreground check found the alarm inside its active window.
    Window,
}

/// The "alarm became active" signal.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmActivation {
    pub alarm: Alarm,
    pub source: ActivationSource,
}

impl AlarmActivation {
    pub fn to_event(&self) -> Event {
        Event::AlarmActivated {
            alarm_id: self.alarm.id.clone(),
            source: self.source,
            at: Utc::now(),
        }
    }
}

/// First enabled alarm, in list order, whose active window contains `now`.
pub fn find_active<'a, Tz: TimeZone>(
    alarms: &'a [Alarm],
    now: &DateTime<Tz>,
    snooze_minutes: u32,
    repeat_budget: u32,
) -> Option<&'a Alarm> {
    alarms
        .iter()
        .filter(|a| a.enabled)
        .find(|a| active_window(a.time, snooze_minutes, repeat_budget, now).contains(now))
}

/// Routes deliveries, notification taps and launch checks into activations.
#[derive(Debug)]
pub struct ActiveAlarmResolver {
    tx: UnboundedSender<AlarmActivation>,
    opened: Option<AlarmId>,
    surfaced: Option<AlarmId>,
    repeat_budget: u32,
}

impl ActiveAlarmResolver {
    /// Create a resolver and the receiving end of its activation channel.
    pub fn channel() -> (Self, UnboundedReceiver<AlarmActivation>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let resolver = Self {
            tx,
            opened: None,
            surfaced: None,
            repeat_budget: REPEAT_BUDGET,
        };
        (resolver, rx)
    }

    pub fn with_repeat_budget(mut self, repeat_budget: u32) -> Self {
        self.repeat_budget = repeat_budget;
        self
    }

    /// The alarm currently surfaced, if any.
    pub fn active(&self) -> Option<&AlarmId> {
        self.surfaced.as_ref()
    }

    /// A notification arrived while the app is running: activate now.
    pub fn notification_delivered(&mut self, payload: &NotificationPayload, alarms: &[Alarm]) -> bool {
        match alarms.iter().find(|a| a.id == payload.alarm_id) {
            Some(alarm) => self.surface(alarm, ActivationSource::Delivered),
            None => {
                tracing::debug!(alarm_id = %payload.alarm_id, "delivered notification for unknown alarm");
                false
            }
        }
    }

    /// The user tapped a notification. The alarm is surfaced on the next
    /// [`on_activate`](Self::on_activate).
    pub fn notification_opened(&mut self, payload: &NotificationPayload) {
        self.opened = Some(payload.alarm_id.clone());
    }

    /// App launch or return to foreground.
    ///
    /// An alarm opened from a notification wins; otherwise the first enabled
    /// alarm whose active window contains `now` is surfaced.
    pub fn on_activate<Tz: TimeZone>(
        &mut self,
        alarms: &[Alarm],
        now: &DateTime<Tz>,
        snooze_minutes: u32,
    ) -> bool {
        if let Some(id) = self.opened.take() {
            if let Some(alarm) = alarms.iter().find(|a| a.id == id) {
                return self.surface(alarm, ActivationSource::Opened);
            }
        }
        match find_active(alarms, now, snooze_minutes, self.repeat_budget) {
            Some(alarm) => self.surface(alarm, ActivationSource::Window),
            None => false,
        }
    }

    /// The session for `alarm_id` ended; another alarm may be surfaced.
    pub fn finish(&mut self, alarm_id: &AlarmId) {
        if self.surfaced.as_ref() == Some(alarm_id) {
            self.surfaced = None;
        }
    }

    fn surface(&mut self, alarm: &Alarm, source: ActivationSource) -> bool {
        if let Some(active) = &self.surfaced {
            tracing::debug!(active = %active, ignored = %alarm.id, "an alarm is already active");
            return false;
        }
        let activation = AlarmActivation {
            alarm: alarm.clone(),
            source,
        };
        if self.tx.send(activation).is_err() {
            tracing::warn!(alarm_id = %alarm.id, "activation receiver dropped");
            return false;
        }
        tracing::info!(alarm_id = %alarm.id, ?source, "alarm activated");
        self.surfaced = Some(alarm.id.clone());
        true
    }
}
