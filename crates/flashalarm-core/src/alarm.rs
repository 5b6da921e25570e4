//! Alarm data model.
//!
//! An [`Alarm`] is a wall-clock time of day plus the flash anzan
//! [`ChallengeConfig`] that must be solved to silence it. Alarms are the only
//! persisted entity; schedule entries and challenge sessions are derived from
//! them on demand.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Sound selector used when an alarm does not name one.
pub const DEFAULT_SOUND: &str = "default";

/// Stable alarm identity.
///
/// Immutable for the alarm's lifetime; it is the sole key used to correlate
/// and cancel the alarm's notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmId(String);

impl AlarmId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AlarmId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for AlarmId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for AlarmId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Wall-clock time of day with minute precision.
///
/// Serialized as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self, ValidationError> {
        if hour > 23 {
            return Err(ValidationError::out_of_range("hour", 0, 23, hour));
        }
        if minute > 59 {
            return Err(ValidationError::out_of_range("minute", 0, 59, minute));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(self) -> u8 {
        self.hour
    }

    pub fn minute(self) -> u8 {
        self.minute
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour as u32, self.minute as u32, 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidTimeOfDay(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour = h.parse::<u8>().map_err(|_| invalid())?;
        let minute = m.parse::<u8>().map_err(|_| invalid())?;
        Self::new(hour, minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

/// Per-alarm flash anzan parameters.
///
/// All three values are bounded; construction and deserialization reject
/// anything outside [`ChallengeConfig::DIGIT_COUNT`],
/// [`ChallengeConfig::NUMBER_COUNT`] and [`ChallengeConfig::SPEED_SECS`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawChallengeConfig")]
pub struct ChallengeConfig {
    digit_count: u8,
    number_count: u8,
    speed_secs: f64,
}

#[derive(Deserialize)]
struct RawChallengeConfig {
    digit_count: u8,
    number_count: u8,
    speed_secs: f64,
}

impl TryFrom<RawChallengeConfig> for ChallengeConfig {
    type Error = ValidationError;

    fn try_from(raw: RawChallengeConfig) -> Result<Self, Self::Error> {
        Self::new(raw.digit_count, raw.number_count, raw.speed_secs)
    }
}

impl ChallengeConfig {
    pub const DIGIT_COUNT: RangeInclusive<u8> = 1..=5;
    pub const NUMBER_COUNT: RangeInclusive<u8> = 3..=20;
    pub const SPEED_SECS: RangeInclusive<f64> = 0.1..=3.0;

    pub fn new(digit_count: u8, number_count: u8, speed_secs: f64) -> Result<Self, ValidationError> {
        if !Self::DIGIT_COUNT.contains(&digit_count) {
            return Err(ValidationError::out_of_range(
                "digit_count",
                *Self::DIGIT_COUNT.start(),
                *Self::DIGIT_COUNT.end(),
                digit_count,
            ));
        }
        if !Self::NUMBER_COUNT.contains(&number_count) {
            return Err(ValidationError::out_of_range(
                "number_count",
                *Self::NUMBER_COUNT.start(),
                *Self::NUMBER_COUNT.end(),
                number_count,
            ));
        }
        // NaN fails `contains` as well.
        if !Self::SPEED_SECS.contains(&speed_secs) {
            return Err(ValidationError::out_of_range(
                "speed_secs",
                *Self::SPEED_SECS.start(),
                *Self::SPEED_SECS.end(),
                speed_secs,
            ));
        }
        Ok(Self {
            digit_count,
            number_count,
            speed_secs,
        })
    }

    pub fn digit_count(&self) -> u8 {
        self.digit_count
    }

    pub fn number_count(&self) -> u8 {
        self.number_count
    }

    pub fn speed_secs(&self) -> f64 {
        self.speed_secs
    }

    /// How long each operand stays on screen.
    pub fn display_duration(&self) -> Duration {
        Duration::from_secs_f64(self.speed_secs)
    }
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            digit_count: 1,
            number_count: 5,
            speed_secs: 1.0,
        }
    }
}

fn default_sound() -> String {
    DEFAULT_SOUND.to_string()
}

fn default_true() -> bool {
    true
}

/// A single alarm as stored in the alarm list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: AlarmId,
    pub time: TimeOfDay,
    pub label: String,
    pub enabled: bool,
    #[serde(default = "default_sound")]
    pub sound: String,
    #[serde(default)]
    pub challenge: ChallengeConfig,
    #[serde(default = "default_true")]
    pub repeat_on_failure: bool,
}

impl Alarm {
    /// Create an enabled alarm with a fresh id and default challenge.
    pub fn new(time: TimeOfDay, label: impl Into<String>) -> Self {
        Self {
            id: AlarmId::new(),
            time,
            label: label.into(),
            enabled: true,
            sound: default_sound(),
            challenge: ChallengeConfig::default(),
            repeat_on_failure: true,
        }
    }

    pub fn with_challenge(mut self, challenge: ChallengeConfig) -> Self {
        self.challenge = challenge;
        self
    }

    pub fn with_sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = sound.into();
        self
    }
}
