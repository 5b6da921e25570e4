use serde::{Deserialize, Serialize};

/// Flash anzan state.
///
/// ```text
/// Ready -> Playing -> Input -> Success
///             ^                  |
///             |    retry         v
///             +------------- Failure -> Abandoned
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeState {
    Ready,
    /// Operands are being flashed.
    Playing,
    /// Waiting for the user's sum.
    Input,
    Success,
    Failure,
    /// Attempts exhausted and the user gave up.
    Abandoned,
}

impl ChallengeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ChallengeState::Success | ChallengeState::Abandoned)
    }
}

/// What the user may do from `Failure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeAction {
    Retry,
    Abandon,
}

/// Transient state of one challenge session.
///
/// Lives for the duration of one active alarm, across retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeSession {
    pub(crate) state: ChallengeState,
    pub(crate) operands: Vec<u32>,
    pub(crate) reveal_index: usize,
    /// Operand currently on screen; `None` during the blank gap.
    pub(crate) displayed: Option<u32>,
    pub(crate) answer: String,
    pub(crate) attempts: u32,
}

impl ChallengeSession {
    pub(crate) fn new() -> Self {
        Self {
            state: ChallengeState::Ready,
            operands: Vec::new(),
            reveal_index: 0,
            displayed: None,
            answer: String::new(),
            attempts: 0,
        }
    }

    pub fn state(&self) -> ChallengeState {
        self.state
    }

    pub fn operands(&self) -> &[u32] {
        &self.operands
    }

    pub fn reveal_index(&self) -> usize {
        self.reveal_index
    }

    pub fn displayed(&self) -> Option<u32> {
        self.displayed
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
