use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alarm::AlarmId;
use crate::resolver::ActivationSource;

/// Every state change in the system produces an Event.
/// Front ends render from them; the terminal front end prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// An alarm became active and must be dismissed through a challenge.
    AlarmActivated {
        alarm_id: AlarmId,
        source: ActivationSource,
        at: DateTime<Utc>,
    },
    /// A new operand sequence started flashing.
    RoundStarted {
        attempt: u32,
        number_count: usize,
        at: DateTime<Utc>,
    },
    NumberShown {
        index: usize,
        value: u32,
        at: DateTime<Utc>,
    },
    /// The blank gap after an operand began.
    NumberHidden {
        index: usize,
        at: DateTime<Utc>,
    },
    AnswerRequested {
        at: DateTime<Utc>,
    },
    AnswerChecked {
        correct: bool,
        attempts: u32,
        remaining_attempts: u32,
        at: DateTime<Utc>,
    },
    /// Terminal result of a challenge session. Emitted exactly once.
    ChallengeCompleted {
        solved: bool,
        attempts: u32,
        at: DateTime<Utc>,
    },
}
