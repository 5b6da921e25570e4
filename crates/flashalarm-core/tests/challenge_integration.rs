//! Integration tests for the flash anzan challenge.
//!
//! The engine is driven with synthetic instants so the reveal timing is
//! exact, and with a seeded generator so operand draws are repeatable.

use std::time::{Duration, Instant};

use flashalarm_core::challenge::{generate_operands, operand_range, REVEAL_GAP};
use flashalarm_core::{
    AudioLoop, ChallengeAction, ChallengeConfig, ChallengeEngine, ChallengeState, Event, RecordingBackend,
};
use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;

type Engine = ChallengeEngine<RecordingBackend, Mcg128Xsl64>;

fn engine(config: ChallengeConfig, max_attempts: u32, backend: RecordingBackend) -> Engine {
    ChallengeEngine::with_rng(
        config,
        "chime",
        max_attempts,
        AudioLoop::new(backend),
        Mcg128Xsl64::seed_from_u64(42),
    )
}

/// Tick until the engine asks for input, collecting every event.
fn reveal(engine: &mut Engine, start: Instant) -> (Instant, Vec<Event>) {
    let mut now = start;
    let mut events = Vec::new();
    while engine.state() != ChallengeState::Input {
        now += Duration::from_millis(10);
        events.extend(engine.tick(now));
        assert!(now - start < Duration::from_secs(120), "reveal never finished");
    }
    (now, events)
}

fn answer(engine: &mut Engine, text: &str, now: Instant) -> Vec<Event> {
    for c in text.chars() {
        engine.push_digit(c);
    }
    engine.submit(now)
}

#[test]
fn test_reveal_shows_every_operand_once() {
    let config = ChallengeConfig::new(3, 5, 0.3).unwrap();
    let mut engine = engine(config, 3, RecordingBackend::new().with_asset("chime"));
    let t0 = Instant::now();
    let mut events = engine.start(t0);
    let (_, more) = reveal(&mut engine, t0);
    events.extend(more);

    let shown: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            Event::NumberShown { value, .. } => Some(*value),
            _ => None,
        })
        .collect();
    assert_eq!(shown, engine.session().operands());
    assert!(shown.iter().all(|v| (100..1000).contains(v)));
    assert!(matches!(events.last(), Some(Event::AnswerRequested { .. })));
}

#[test]
fn test_reveal_duration_is_speed_plus_gap_per_operand() {
    let config = ChallengeConfig::new(1, 4, 0.5).unwrap();
    let mut engine = engine(config, 3, RecordingBackend::new().with_asset("chime"));
    let t0 = Instant::now();
    engine.start(t0);
    let (done, _) = reveal(&mut engine, t0);

    let expected = (Duration::from_millis(500) + REVEAL_GAP) * 4;
    assert!(done - t0 >= expected);
    assert!(done - t0 < expected + Duration::from_millis(50));
}

#[test]
fn test_lockout_after_max_attempts() {
    let config = ChallengeConfig::new(2, 3, 0.1).unwrap();
    let mut engine = engine(config, 3, RecordingBackend::new().with_asset("chime"));
    let mut now = Instant::now();
    engine.start(now);

    for attempt in 1..=3 {
        let (t, _) = reveal(&mut engine, now);
        now = t;
        // Two-digit operands never sum to zero.
        let events = answer(&mut engine, "0", now);
        assert!(matches!(
            events[0],
            Event::AnswerChecked { correct: false, attempts, .. } if attempts == attempt
        ));
        assert_eq!(engine.state(), ChallengeState::Failure);
        if attempt < 3 {
            assert_eq!(engine.available_actions(), vec![ChallengeAction::Retry]);
            engine.retry(now);
        }
    }

    assert!(!engine.can_retry());
    assert!(engine.retry(now).is_empty());
    assert_eq!(engine.available_actions(), vec![ChallengeAction::Abandon]);
    assert!(engine.audio().is_playing());

    let events = engine.abandon();
    assert!(matches!(events[0], Event::ChallengeCompleted { solved: false, attempts: 3, .. }));
    assert_eq!(engine.completion(), Some(false));
    assert!(!engine.audio().is_playing());
    assert!(engine.state().is_terminal());
}

#[test]
fn test_solved_after_a_failed_round() {
    let config = ChallengeConfig::new(1, 3, 0.1).unwrap();
    let mut engine = engine(config, 3, RecordingBackend::new().with_asset("chime"));
    let mut now = Instant::now();
    engine.start(now);

    let (t, _) = reveal(&mut engine, now);
    now = t;
    answer(&mut engine, "", now);
    let first_round = engine.session().operands().to_vec();
    engine.retry(now);

    let (t, _) = reveal(&mut engine, now);
    now = t;
    assert_eq!(engine.session().operands().len(), first_round.len());
    let sum = engine.expected_sum().to_string();
    answer(&mut engine, &sum, now);
    assert_eq!(engine.state(), ChallengeState::Success);
    assert!(!engine.audio().is_playing());

    let events = engine.tick(now + Duration::from_secs(2));
    assert!(matches!(events[0], Event::ChallengeCompleted { solved: true, attempts: 2, .. }));
    // The loop was started exactly once for the whole session.
    assert_eq!(engine.audio().backend().loops_started, 1);
}

#[test]
fn test_missing_sound_falls_back_to_beeps() {
    let config = ChallengeConfig::new(1, 3, 1.0).unwrap();
    let mut engine = engine(config, 3, RecordingBackend::new());
    let t0 = Instant::now();
    engine.start(t0);
    assert!(engine.audio().is_fallback());
    assert_eq!(engine.audio().backend().alerts_played, 1);

    engine.tick(t0 + Duration::from_secs(2));
    assert_eq!(engine.audio().backend().alerts_played, 2);

    engine.dismiss();
    engine.tick(t0 + Duration::from_secs(10));
    assert_eq!(engine.audio().backend().alerts_played, 2);
}

#[test]
fn test_operand_ranges_by_digit_count() {
    assert_eq!(operand_range(1), 0..10);
    assert_eq!(operand_range(3), 100..1000);
    assert_eq!(operand_range(5), 10_000..100_000);

    let mut rng = Mcg128Xsl64::seed_from_u64(7);
    let config = ChallengeConfig::new(1, 20, 1.0).unwrap();
    for _ in 0..50 {
        let operands = generate_operands(&config, &mut rng);
        assert_eq!(operands.len(), 20);
        assert!(operands.iter().all(|v| *v < 10));
    }
}

#[test]
fn test_config_bounds_are_enforced() {
    assert!(ChallengeConfig::new(0, 5, 1.0).is_err());
    assert!(ChallengeConfig::new(6, 5, 1.0).is_err());
    assert!(ChallengeConfig::new(1, 2, 1.0).is_err());
    assert!(ChallengeConfig::new(1, 21, 1.0).is_err());
    assert!(ChallengeConfig::new(1, 5, 0.05).is_err());
    assert!(ChallengeConfig::new(1, 5, 3.5).is_err());
    assert!(ChallengeConfig::new(5, 20, 3.0).is_ok());
}
