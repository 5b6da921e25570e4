//! Interactive challenge session on a terminal.
//!
//! A tokio interval drives [`ChallengeEngine::tick`] while typed lines
//! arrive over a channel fed by a stdin thread. Lines typed before the
//! engine can use them are queued, so answers may be piped in.

use std::collections::VecDeque;
use std::error::Error;
use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

use flashalarm_core::{AudioBackend, AudioError, ChallengeAction, ChallengeEngine, ChallengeState, Event};
use tokio::sync::mpsc::{self, UnboundedReceiver};

const TICK_INTERVAL: Duration = Duration::from_millis(20);

/// Audio backend for terminals: no decoder, so every sound falls back to
/// the bell.
#[derive(Debug, Default)]
pub struct TerminalBell;

impl AudioBackend for TerminalBell {
    fn play_looping(&mut self, sound: &str) -> Result<(), AudioError> {
        Err(AudioError::Unsupported(format!("no audio decoder for '{sound}'")))
    }

    fn stop_looping(&mut self) {}

    fn play_alert(&mut self) {
        let mut stderr = std::io::stderr();
        let _ = stderr.write_all(b"\x07");
        let _ = stderr.flush();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Text,
    Json,
}

impl Output {
    pub fn new(json: bool) -> Self {
        if json {
            Output::Json
        } else {
            Output::Text
        }
    }

    /// Status line that is not an event. Kept off stdout in JSON mode.
    pub fn note(self, message: &str) {
        match self {
            Output::Text => println!("{message}"),
            Output::Json => eprintln!("{message}"),
        }
    }

    pub fn emit(self, events: &[Event]) -> Result<(), Box<dyn Error>> {
        for event in events {
            match self {
                Output::Json => println!("{}", serde_json::to_string(event)?),
                Output::Text => render(event),
            }
        }
        std::io::stdout().flush()?;
        Ok(())
    }
}

fn render(event: &Event) {
    match event {
        Event::AlarmActivated { alarm_id, source, .. } => {
            println!("ALARM {alarm_id} ({source:?})");
        }
        Event::RoundStarted {
            attempt,
            number_count,
            ..
        } => println!("round {attempt}: {number_count} numbers"),
        Event::NumberShown { value, .. } => println!("{value:>12}"),
        Event::NumberHidden { .. } => {}
        Event::AnswerRequested { .. } => println!("sum?"),
        Event::AnswerChecked {
            correct: true,
            ..
        } => println!("correct"),
        Event::AnswerChecked {
            remaining_attempts,
            ..
        } => println!("wrong, {remaining_attempts} attempt(s) left"),
        Event::ChallengeCompleted { solved: true, .. } => println!("alarm dismissed"),
        Event::ChallengeCompleted { solved: false, .. } => println!("alarm abandoned"),
    }
}

/// Lines typed on stdin.
pub struct Input {
    rx: UnboundedReceiver<String>,
    queued: VecDeque<String>,
    closed: bool,
}

impl Input {
    /// Start reading stdin on a dedicated thread.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        Self {
            rx,
            queued: VecDeque::new(),
            closed: false,
        }
    }

    fn exhausted(&self) -> bool {
        self.closed && self.queued.is_empty()
    }
}

/// Run a challenge until it completes.
///
/// Returns `Some(solved)`, or `None` if stdin closed while the engine was
/// waiting for the user; the session is dismissed in that case.
pub async fn run_challenge<B: AudioBackend>(
    engine: &mut ChallengeEngine<B>,
    input: &mut Input,
    output: Output,
) -> Result<Option<bool>, Box<dyn Error>> {
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    output.emit(&engine.start(Instant::now()))?;

    loop {
        if let Some(solved) = engine.completion() {
            return Ok(Some(solved));
        }

        tokio::select! {
            _ = ticker.tick() => {
                output.emit(&engine.tick(Instant::now()))?;
            }
            line = input.rx.recv(), if !input.closed => match line {
                Some(line) => input.queued.push_back(line),
                None => input.closed = true,
            },
        }

        while let Some(line) = input.queued.front() {
            let Some(events) = apply_line(engine, line, output) else {
                break;
            };
            input.queued.pop_front();
            output.emit(&events)?;
            if engine.state() == ChallengeState::Failure {
                prompt_actions(engine, output);
            }
        }

        let waiting = matches!(engine.state(), ChallengeState::Input | ChallengeState::Failure);
        if waiting && input.exhausted() {
            engine.dismiss();
            tracing::warn!("input closed before the challenge was finished");
            return Ok(None);
        }
    }
}

/// Feed one line to the engine. `None` means the engine cannot take a line
/// in its current state and the line stays queued.
fn apply_line<B: AudioBackend>(engine: &mut ChallengeEngine<B>, line: &str, output: Output) -> Option<Vec<Event>> {
    let line = line.trim();
    match engine.state() {
        ChallengeState::Input => {
            // Anything but plain digits is submitted empty and counts as wrong.
            if line.chars().all(|c| c.is_ascii_digit()) {
                for c in line.chars() {
                    engine.push_digit(c);
                }
            }
            Some(engine.submit(Instant::now()))
        }
        ChallengeState::Failure => {
            let action = match line.to_ascii_lowercase().as_str() {
                "r" | "retry" => Some(ChallengeAction::Retry),
                "a" | "abandon" => Some(ChallengeAction::Abandon),
                _ => None,
            };
            match action {
                Some(action) if engine.available_actions().contains(&action) => Some(match action {
                    ChallengeAction::Retry => engine.retry(Instant::now()),
                    ChallengeAction::Abandon => engine.abandon(),
                }),
                _ => {
                    output.note(&format!("'{line}' is not available here"));
                    prompt_actions(engine, output);
                    Some(Vec::new())
                }
            }
        }
        _ => None,
    }
}

fn prompt_actions<B: AudioBackend>(engine: &ChallengeEngine<B>, output: Output) {
    let actions: Vec<&str> = engine
        .available_actions()
        .into_iter()
        .map(|action| match action {
            ChallengeAction::Retry => "[r]etry",
            ChallengeAction::Abandon => "[a]bandon",
        })
        .collect();
    if !actions.is_empty() {
        output.note(&actions.join(" "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashalarm_core::{AudioLoop, ChallengeConfig, RecordingBackend, DEFAULT_SOUND};

    #[test]
    fn bell_never_loops() {
        let mut bell = TerminalBell;
        assert!(matches!(
            bell.play_looping("default"),
            Err(AudioError::Unsupported(_))
        ));
    }

    fn engine_awaiting_answer() -> ChallengeEngine<RecordingBackend> {
        let config = ChallengeConfig::new(2, 3, 0.1).unwrap();
        let audio = AudioLoop::new(RecordingBackend::new());
        let mut engine = ChallengeEngine::new(config, DEFAULT_SOUND, 3, audio);
        let mut now = Instant::now();
        engine.start(now);
        for _ in 0..1000 {
            if engine.state() == ChallengeState::Input {
                return engine;
            }
            now += Duration::from_millis(20);
            engine.tick(now);
        }
        panic!("reveal never finished");
    }

    #[test]
    fn digits_only_answer_is_checked() {
        let mut engine = engine_awaiting_answer();
        let answer = format!(" {} ", engine.expected_sum());
        apply_line(&mut engine, &answer, Output::Json).unwrap();
        assert_eq!(engine.state(), ChallengeState::Success);
    }

    #[test]
    fn answer_with_stray_characters_is_wrong() {
        for garble in ["{d}x{rest}", "-{all}", "{d} {rest}", "+{all}"] {
            let mut engine = engine_awaiting_answer();
            let sum = engine.expected_sum().to_string();
            let (d, rest) = sum.split_at(1);
            let line = garble
                .replace("{d}", d)
                .replace("{rest}", rest)
                .replace("{all}", &sum);

            let events = apply_line(&mut engine, &line, Output::Json).unwrap();
            assert_eq!(engine.state(), ChallengeState::Failure, "{line:?} was accepted");
            assert!(matches!(events[..], [Event::AnswerChecked { correct: false, .. }]));
            assert_eq!(engine.session().attempts(), 1);
        }
    }

    #[test]
    fn output_mode_from_flag() {
        assert_eq!(Output::new(true), Output::Json);
        assert_eq!(Output::new(false), Output::Text);
    }
}
