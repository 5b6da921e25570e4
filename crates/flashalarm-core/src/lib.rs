//! # FlashAlarm Core Library
//!
//! This library provides the core logic for FlashAlarm, an alarm clock that
//! can only be silenced by solving a flash anzan challenge: a sequence of
//! numbers is flashed one at a time and the user must enter their sum.
//!
//! ## Architecture
//!
//! - **Repeat scheduling**: every enabled alarm owns a fixed budget of
//!   notifications (primary trigger plus snooze repeats) that are retracted
//!   and recreated idempotently
//! - **Challenge engine**: a tick-driven state machine that requires the
//!   caller to periodically invoke `tick()`; it owns the looping alarm sound
//! - **Active alarm resolution**: catch-up detection on launch and routing
//!   of delivered notifications into a single activation channel
//! - **Storage**: JSON alarm list, JSON pending notifications and TOML
//!   configuration
//!
//! ## Key Components
//!
//! - [`RepeatScheduler`]: schedule/cancel repeat notifications
//! - [`ChallengeEngine`]: flash anzan state machine
//! - [`AudioLoop`]: looping sound with alert-beep fallback
//! - [`ActiveAlarmResolver`]: decides which alarm is ringing
//! - [`AlarmStore`]: persisted alarm list, owner of the scheduler

pub mod alarm;
pub mod audio;
pub mod challenge;
pub mod continuation;
pub mod error;
pub mod events;
pub mod resolver;
pub mod schedule;
pub mod storage;

pub use alarm::{Alarm, AlarmId, ChallengeConfig, TimeOfDay, DEFAULT_SOUND};
pub use audio::{AudioBackend, AudioError, AudioLoop, RecordingBackend};
pub use challenge::{ChallengeAction, ChallengeEngine, ChallengeSession, ChallengeState};
pub use error::{ConfigError, CoreError, ScheduleError, StorageError, ValidationError};
pub use events::Event;
pub use resolver::{find_active, ActivationSource, ActiveAlarmResolver, AlarmActivation};
pub use schedule::{
    InMemoryNotificationCenter, NotificationCenter, NotificationPayload, NotificationRequest,
    RepeatScheduler, ScheduleEntry, ScheduleReport, REPEAT_BUDGET,
};
pub use storage::{AlarmStore, Config, JsonNotificationCenter};
