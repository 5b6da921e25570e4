//! Flash anzan challenge engine.
//!
//! Like the rest of the core, the engine has no internal threads. The
//! caller invokes [`ChallengeEngine::tick`] periodically with the current
//! instant; the reveal loop, the success delay and the audio fallback all
//! advance from there.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = ChallengeEngine::for_alarm(&alarm, max_attempts, AudioLoop::new(backend));
//! engine.start(Instant::now());
//! // In a loop:
//! for event in engine.tick(Instant::now()) { render(event) }
//! // Once in Input:
//! engine.push_digit('4');
//! engine.submit(Instant::now());
//! ```

use std::time::{Duration, Instant};

use chrono::Utc;
use rand::{Rng, SeedableRng};
use rand_pcg::Mcg128Xsl64;

use super::operands::{expected_sum, generate_operands};
use super::session::{ChallengeAction, ChallengeSession, ChallengeState};
use crate::alarm::{Alarm, ChallengeConfig};
use crate::audio::{AudioBackend, AudioLoop};
use crate::continuation::{Continuation, Liveness};
use crate::events::Event;

/// Blank between two operands, independent of display speed.
pub const REVEAL_GAP: Duration = Duration::from_millis(200);

/// Time the success screen stays up before completion is reported.
pub const SUCCESS_DISPLAY_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RevealStep {
    /// Blank the operand at `index`.
    Hide { index: usize },
    /// Move on to the next operand or to input.
    Advance,
    /// Report a solved challenge.
    Complete,
}

/// Core challenge state machine.
#[derive(Debug)]
pub struct ChallengeEngine<B: AudioBackend, R: Rng = Mcg128Xsl64> {
    config: ChallengeConfig,
    sound: String,
    max_attempts: u32,
    audio: AudioLoop<B>,
    rng: R,
    session: ChallengeSession,
    liveness: Liveness,
    pending: Option<Continuation<RevealStep>>,
    audio_started: bool,
    completion: Option<bool>,
}

impl<B: AudioBackend> ChallengeEngine<B> {
    pub fn new(config: ChallengeConfig, sound: impl Into<String>, max_attempts: u32, audio: AudioLoop<B>) -> Self {
        Self::with_rng(config, sound, max_attempts, audio, Mcg128Xsl64::from_entropy())
    }

    /// Engine for an alarm's own challenge settings and sound.
    ///
    /// An alarm with `repeat_on_failure` off gets a single attempt.
    pub fn for_alarm(alarm: &Alarm, max_attempts: u32, audio: AudioLoop<B>) -> Self {
        let max_attempts = if alarm.repeat_on_failure { max_attempts } else { 1 };
        Self::new(alarm.challenge, alarm.sound.clone(), max_attempts, audio)
    }
}

impl<B: AudioBackend, R: Rng> ChallengeEngine<B, R> {
    /// Create an engine drawing operands from `rng`.
    ///
    /// `max_attempts` below 1 is treated as 1.
    pub fn with_rng(
        config: ChallengeConfig,
        sound: impl Into<String>,
        max_attempts: u32,
        audio: AudioLoop<B>,
        rng: R,
    ) -> Self {
        Self {
            config,
            sound: sound.into(),
            max_attempts: max_attempts.max(1),
            audio,
            rng,
            session: ChallengeSession::new(),
            liveness: Liveness::new(),
            pending: None,
            audio_started: false,
            completion: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> ChallengeState {
        self.session.state
    }

    pub fn session(&self) -> &ChallengeSession {
        &self.session
    }

    pub fn config(&self) -> &ChallengeConfig {
        &self.config
    }

    pub fn displayed_number(&self) -> Option<u32> {
        self.session.displayed
    }

    pub fn answer(&self) -> &str {
        &self.session.answer
    }

    pub fn attempts(&self) -> u32 {
        self.session.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn remaining_attempts(&self) -> u32 {
        self.max_attempts.saturating_sub(self.session.attempts)
    }

    pub fn expected_sum(&self) -> u64 {
        expected_sum(&self.session.operands)
    }

    pub fn audio(&self) -> &AudioLoop<B> {
        &self.audio
    }

    /// `Some(solved)` once the completion has been emitted.
    pub fn completion(&self) -> Option<bool> {
        self.completion
    }

    pub fn can_retry(&self) -> bool {
        self.session.state == ChallengeState::Failure && self.session.attempts < self.max_attempts
    }

    /// Actions offered to the user in the current state.
    pub fn available_actions(&self) -> Vec<ChallengeAction> {
        match self.session.state {
            ChallengeState::Failure if self.can_retry() => vec![ChallengeAction::Retry],
            ChallengeState::Failure => vec![ChallengeAction::Abandon],
            _ => Vec::new(),
        }
    }

    /// Earliest instant at which `tick` has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        let reveal = self.pending.as_ref().map(Continuation::due);
        let beep = self.audio.next_beep_at();
        match (reveal, beep) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Leave `Ready` and start flashing the first round.
    pub fn start(&mut self, now: Instant) -> Vec<Event> {
        if self.session.state != ChallengeState::Ready {
            return Vec::new();
        }
        self.begin_round(now)
    }

    /// Append a digit to the answer. Only digits are accepted, only in `Input`.
    pub fn push_digit(&mut self, digit: char) -> bool {
        if self.session.state != ChallengeState::Input || !digit.is_ascii_digit() {
            return false;
        }
        self.session.answer.push(digit);
        true
    }

    pub fn backspace(&mut self) -> bool {
        if self.session.state != ChallengeState::Input {
            return false;
        }
        self.session.answer.pop().is_some()
    }

    /// Check the answer. Always lands in `Success` or `Failure`.
    ///
    /// An empty or unparsable answer counts as wrong.
    pub fn submit(&mut self, now: Instant) -> Vec<Event> {
        if self.session.state != ChallengeState::Input {
            return Vec::new();
        }
        self.session.attempts += 1;
        let correct = self
            .session
            .answer
            .parse::<u64>()
            .is_ok_and(|answer| answer == self.expected_sum());

        if correct {
            self.session.state = ChallengeState::Success;
            self.audio.stop();
            let generation = self.liveness.renew();
            self.pending = Some(Continuation::new(
                now + SUCCESS_DISPLAY_DELAY,
                generation,
                RevealStep::Complete,
            ));
        } else {
            self.session.state = ChallengeState::Failure;
        }

        tracing::debug!(correct, attempts = self.session.attempts, "answer checked");
        vec![Event::AnswerChecked {
            correct,
            attempts: self.session.attempts,
            remaining_attempts: self.remaining_attempts(),
            at: Utc::now(),
        }]
    }

    /// Start another round with fresh operands. Attempts carry over.
    pub fn retry(&mut self, now: Instant) -> Vec<Event> {
        if !self.can_retry() {
            return Vec::new();
        }
        self.begin_round(now)
    }

    /// Give up after exhausting all attempts. Stops audio and reports
    /// `solved = false`.
    pub fn abandon(&mut self) -> Vec<Event> {
        if self.session.state != ChallengeState::Failure || self.can_retry() {
            return Vec::new();
        }
        self.audio.stop();
        self.liveness.revoke();
        self.session.state = ChallengeState::Abandoned;
        self.complete(false).into_iter().collect()
    }

    /// Advance the reveal loop, success delay and fallback audio.
    pub fn tick(&mut self, now: Instant) -> Vec<Event> {
        self.audio.tick(now);

        let mut events = Vec::new();
        while let Some(continuation) = self.pending.take() {
            if !continuation.is_due(now) {
                self.pending = Some(continuation);
                break;
            }
            let generation = continuation.generation();
            let Some(step) = continuation.resume(&self.liveness) else {
                break;
            };
            match step {
                RevealStep::Hide { index } => {
                    self.session.displayed = None;
                    self.pending = Some(Continuation::new(now + REVEAL_GAP, generation, RevealStep::Advance));
                    events.push(Event::NumberHidden { index, at: Utc::now() });
                }
                RevealStep::Advance => {
                    self.session.reveal_index += 1;
                    events.extend(self.show_current(now));
                }
                RevealStep::Complete => {
                    events.extend(self.complete(true));
                }
            }
        }
        events
    }

    /// Tear the session down without reporting a result.
    ///
    /// Audio stops and every pending continuation becomes a no-op.
    pub fn dismiss(&mut self) {
        self.liveness.revoke();
        self.audio.stop();
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn begin_round(&mut self, now: Instant) -> Vec<Event> {
        self.session.operands = generate_operands(&self.config, &mut self.rng);
        self.session.reveal_index = 0;
        self.session.answer.clear();
        self.session.state = ChallengeState::Playing;

        if !self.audio_started {
            self.audio.start(&self.sound, now);
            self.audio_started = true;
        }

        let mut events = vec![Event::RoundStarted {
            attempt: self.session.attempts + 1,
            number_count: self.session.operands.len(),
            at: Utc::now(),
        }];
        events.extend(self.show_current(now));
        events
    }

    fn show_current(&mut self, now: Instant) -> Vec<Event> {
        let index = self.session.reveal_index;
        match self.session.operands.get(index).copied() {
            Some(value) => {
                self.session.displayed = Some(value);
                let generation = self.liveness.renew();
                self.pending = Some(Continuation::new(
                    now + self.config.display_duration(),
                    generation,
                    RevealStep::Hide { index },
                ));
                vec![Event::NumberShown { index, value, at: Utc::now() }]
            }
            None => {
                self.session.displayed = None;
                self.session.state = ChallengeState::Input;
                vec![Event::AnswerRequested { at: Utc::now() }]
            }
        }
    }

    fn complete(&mut self, solved: bool) -> Option<Event> {
        if self.completion.is_some() {
            return None;
        }
        self.completion = Some(solved);
        tracing::info!(solved, attempts = self.session.attempts, "challenge completed");
        Some(Event::ChallengeCompleted {
            solved,
            attempts: self.session.attempts,
            at: Utc::now(),
        })
    }
}

impl<B: AudioBackend, R: Rng> Drop for ChallengeEngine<B, R> {
    fn drop(&mut self) {
        self.dismiss();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::RecordingBackend;

    fn engine(max_attempts: u32) -> ChallengeEngine<RecordingBackend, Mcg128Xsl64> {
        ChallengeEngine::with_rng(
            ChallengeConfig::new(2, 3, 0.5).unwrap(),
            "default",
            max_attempts,
            AudioLoop::new(RecordingBackend::new().with_asset("default")),
            Mcg128Xsl64::seed_from_u64(1),
        )
    }

    /// Tick in small steps until the engine asks for input.
    fn run_reveal(engine: &mut ChallengeEngine<RecordingBackend, Mcg128Xsl64>, start: Instant) -> Instant {
        let mut now = start;
        for _ in 0..1000 {
            if engine.state() == ChallengeState::Input {
                return now;
            }
            now += Duration::from_millis(50);
            engine.tick(now);
        }
        panic!("reveal loop never reached input");
    }

    fn type_answer(engine: &mut ChallengeEngine<RecordingBackend, Mcg128Xsl64>, answer: &str) {
        for c in answer.chars() {
            engine.push_digit(c);
        }
    }

    #[test]
    fn starts_in_ready() {
        let engine = engine(3);
        assert_eq!(engine.state(), ChallengeState::Ready);
        assert!(!engine.audio().is_playing());
    }

    #[test]
    fn start_flashes_first_operand_and_starts_audio() {
        let mut engine = engine(3);
        let events = engine.start(Instant::now());
        assert_eq!(engine.state(), ChallengeState::Playing);
        assert_eq!(engine.session().operands().len(), 3);
        assert_eq!(engine.displayed_number(), Some(engine.session().operands()[0]));
        assert!(engine.audio().is_playing());
        assert!(matches!(events[0], Event::RoundStarted { attempt: 1, number_count: 3, .. }));
        assert!(matches!(events[1], Event::NumberShown { index: 0, .. }));
    }

    #[test]
    fn reveal_timing_shows_then_blanks() {
        let t0 = Instant::now();
        let mut engine = engine(3);
        engine.start(t0);

        assert!(engine.tick(t0 + Duration::from_millis(499)).is_empty());
        let events = engine.tick(t0 + Duration::from_millis(500));
        assert!(matches!(events[0], Event::NumberHidden { index: 0, .. }));
        assert_eq!(engine.displayed_number(), None);

        let events = engine.tick(t0 + Duration::from_millis(700));
        assert!(matches!(events[0], Event::NumberShown { index: 1, .. }));
        assert_eq!(engine.session().reveal_index(), 1);
    }

    #[test]
    fn input_follows_last_gap() {
        let t0 = Instant::now();
        let mut engine = engine(3);
        engine.start(t0);
        run_reveal(&mut engine, t0);
        assert_eq!(engine.state(), ChallengeState::Input);
        assert_eq!(engine.displayed_number(), None);
    }

    #[test]
    fn digits_only_accepted_in_input() {
        let t0 = Instant::now();
        let mut engine = engine(3);
        assert!(!engine.push_digit('1'));
        engine.start(t0);
        assert!(!engine.push_digit('1'));
        run_reveal(&mut engine, t0);
        assert!(engine.push_digit('1'));
        assert!(!engine.push_digit('x'));
        assert!(engine.push_digit('2'));
        assert!(engine.backspace());
        assert_eq!(engine.answer(), "1");
    }

    #[test]
    fn correct_answer_stops_audio_then_completes() {
        let t0 = Instant::now();
        let mut engine = engine(3);
        engine.start(t0);
        let now = run_reveal(&mut engine, t0);
        let sum = engine.expected_sum().to_string();
        type_answer(&mut engine, &sum);

        let events = engine.submit(now);
        assert!(matches!(events[0], Event::AnswerChecked { correct: true, .. }));
        assert_eq!(engine.state(), ChallengeState::Success);
        assert!(!engine.audio().is_playing());
        assert_eq!(engine.completion(), None);

        assert!(engine.tick(now + Duration::from_millis(1000)).is_empty());
        let events = engine.tick(now + SUCCESS_DISPLAY_DELAY);
        assert!(matches!(events[0], Event::ChallengeCompleted { solved: true, .. }));
        assert_eq!(engine.completion(), Some(true));
        assert!(engine.tick(now + Duration::from_secs(10)).is_empty());
    }

    #[test]
    fn sum_of_known_operands() {
        for (answer, expected) in [("50", ChallengeState::Success), ("51", ChallengeState::Failure), ("050", ChallengeState::Success)] {
            let t0 = Instant::now();
            let mut engine = engine(3);
            engine.start(t0);
            let now = run_reveal(&mut engine, t0);
            engine.session.operands = vec![12, 7, 31];
            type_answer(&mut engine, answer);
            engine.submit(now);
            assert_eq!(engine.state(), expected, "answer {answer}");
        }
    }

    #[test]
    fn empty_answer_is_wrong_not_error() {
        let t0 = Instant::now();
        let mut engine = engine(3);
        engine.start(t0);
        let now = run_reveal(&mut engine, t0);
        engine.submit(now);
        assert_eq!(engine.state(), ChallengeState::Failure);
        assert_eq!(engine.attempts(), 1);
        assert_eq!(engine.available_actions(), vec![ChallengeAction::Retry]);
    }

    #[test]
    fn retry_regenerates_and_keeps_attempts() {
        let t0 = Instant::now();
        let mut engine = engine(3);
        engine.start(t0);
        let now = run_reveal(&mut engine, t0);
        engine.submit(now);
        let loops_before = engine.audio().backend().loops_started;

        let events = engine.retry(now);
        assert!(matches!(events[0], Event::RoundStarted { attempt: 2, .. }));
        assert_eq!(engine.state(), ChallengeState::Playing);
        assert_eq!(engine.attempts(), 1);
        assert_eq!(engine.answer(), "");
        assert_eq!(engine.audio().backend().loops_started, loops_before);
    }

    #[test]
    fn abandon_only_after_exhaustion() {
        let t0 = Instant::now();
        let mut engine = engine(2);
        engine.start(t0);
        let now = run_reveal(&mut engine, t0);
        engine.submit(now);
        assert!(engine.abandon().is_empty());

        engine.retry(now);
        let now = run_reveal(&mut engine, now);
        engine.submit(now);
        assert!(engine.retry(now).is_empty());
        assert_eq!(engine.available_actions(), vec![ChallengeAction::Abandon]);

        let events = engine.abandon();
        assert!(matches!(events[0], Event::ChallengeCompleted { solved: false, attempts: 2, .. }));
        assert_eq!(engine.state(), ChallengeState::Abandoned);
        assert!(!engine.audio().is_playing());
        assert!(engine.abandon().is_empty());
    }

    #[test]
    fn dismiss_makes_pending_steps_noops() {
        let t0 = Instant::now();
        let mut engine = engine(3);
        engine.start(t0);
        engine.dismiss();
        assert!(engine.tick(t0 + Duration::from_secs(5)).is_empty());
        assert_eq!(engine.state(), ChallengeState::Playing);
        assert!(!engine.audio().is_playing());
    }

    #[test]
    fn no_repeat_on_failure_means_one_attempt() {
        let mut alarm = Alarm::new(crate::alarm::TimeOfDay::new(7, 0).unwrap(), "x");
        let audio = || AudioLoop::new(RecordingBackend::new());
        assert_eq!(ChallengeEngine::for_alarm(&alarm, 3, audio()).max_attempts(), 3);
        alarm.repeat_on_failure = false;
        assert_eq!(ChallengeEngine::for_alarm(&alarm, 3, audio()).max_attempts(), 1);
    }

    #[test]
    fn next_deadline_tracks_reveal() {
        let t0 = Instant::now();
        let mut engine = engine(3);
        assert!(engine.next_deadline().is_none());
        engine.start(t0);
        assert_eq!(engine.next_deadline(), Some(t0 + Duration::from_millis(500)));
    }

    #[test]
    fn next_deadline_ignores_beep_once_solved() {
        let t0 = Instant::now();
        let mut engine = ChallengeEngine::with_rng(
            ChallengeConfig::new(2, 3, 0.5).unwrap(),
            "missing",
            3,
            AudioLoop::new(RecordingBackend::new()),
            Mcg128Xsl64::seed_from_u64(1),
        );
        engine.start(t0);
        let now = run_reveal(&mut engine, t0);
        assert!(engine.audio().next_beep_at().is_some());

        let answer = engine.expected_sum().to_string();
        type_answer(&mut engine, &answer);
        engine.submit(now);
        assert_eq!(engine.state(), ChallengeState::Success);
        assert_eq!(engine.next_deadline(), Some(now + SUCCESS_DISPLAY_DELAY));
    }
}
