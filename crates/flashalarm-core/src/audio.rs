//! Looping alarm sound.
//!
//! [`AudioLoop`] plays the alarm's sound asset on repeat through an
//! [`AudioBackend`]. When the asset cannot be found or opened it falls back
//! to the platform alert sound, repeated every [`FALLBACK_BEEP_INTERVAL`].
//! The fallback is tick-driven: each beep schedules the next one as a
//! [`Continuation`], and [`AudioLoop::stop`] revokes liveness so a beep that
//! is already pending never plays.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::continuation::{Continuation, Liveness};

/// Spacing between fallback beeps.
pub const FALLBACK_BEEP_INTERVAL: Duration = Duration::from_secs(2);

/// Why a sound asset could not be played.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("sound asset '{0}' not found")]
    NotFound(String),

    #[error("sound asset '{sound}' could not be opened: {reason}")]
    Unreadable { sound: String, reason: String },

    #[error("looping playback unavailable: {0}")]
    Unsupported(String),
}

/// Platform audio primitives.
pub trait AudioBackend {
    /// Begin indefinite looping playback of the asset for `sound`.
    fn play_looping(&mut self, sound: &str) -> Result<(), AudioError>;

    fn stop_looping(&mut self);

    /// Play the short system alert sound once.
    fn play_alert(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Playback {
    Idle,
    Looping,
    Fallback,
}

#[derive(Debug, Clone, Copy)]
struct Beep;

/// Scoped looping playback of an alarm sound.
#[derive(Debug)]
pub struct AudioLoop<B: AudioBackend> {
    backend: B,
    playback: Playback,
    liveness: Liveness,
    pending: Option<Continuation<Beep>>,
    force_fallback: bool,
}

impl<B: AudioBackend> AudioLoop<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            playback: Playback::Idle,
            liveness: Liveness::new(),
            pending: None,
            force_fallback: false,
        }
    }

    /// Skip the asset and go straight to the alert-sound loop.
    pub fn with_forced_fallback(mut self, force: bool) -> Self {
        self.force_fallback = force;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn is_playing(&self) -> bool {
        self.playback != Playback::Idle
    }

    pub fn is_fallback(&self) -> bool {
        self.playback == Playback::Fallback
    }

    /// When the next fallback beep is due, if one is pending.
    pub fn next_beep_at(&self) -> Option<Instant> {
        self.pending.as_ref().map(Continuation::due)
    }

    /// Start looping `sound`. Restarts cleanly if already playing.
    pub fn start(&mut self, sound: &str, now: Instant) {
        self.stop();
        let generation = self.liveness.renew();

        let result = if self.force_fallback {
            Err(AudioError::Unsupported("fallback forced by configuration".into()))
        } else {
            self.backend.play_looping(sound)
        };

        match result {
            Ok(()) => {
                self.playback = Playback::Looping;
            }
            Err(e) => {
                tracing::warn!(sound, error = %e, "alarm sound unavailable, using alert beep");
                self.playback = Playback::Fallback;
                self.backend.play_alert();
                self.pending = Some(Continuation::new(
                    now + FALLBACK_BEEP_INTERVAL,
                    generation,
                    Beep,
                ));
            }
        }
    }

    /// Run a due fallback beep. Returns whether a beep was played.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(continuation) = self.pending.take() else {
            return false;
        };
        if !continuation.is_due(now) {
            self.pending = Some(continuation);
            return false;
        }
        let generation = continuation.generation();
        match continuation.resume(&self.liveness) {
            Some(Beep) => {
                self.backend.play_alert();
                self.pending = Some(Continuation::new(
                    now + FALLBACK_BEEP_INTERVAL,
                    generation,
                    Beep,
                ));
                true
            }
            None => false,
        }
    }

    /// Stop playback. Idempotent.
    ///
    /// A pending fallback beep is dropped and its generation revoked.
    pub fn stop(&mut self) {
        self.liveness.revoke();
        self.pending = None;
        if self.playback == Playback::Looping {
            self.backend.stop_looping();
        }
        self.playback = Playback::Idle;
    }
}

/// Backend that records calls instead of producing sound.
///
/// Only sounds registered with [`RecordingBackend::with_asset`] can loop;
/// everything else reports [`AudioError::NotFound`].
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    assets: HashSet<String>,
    pub looping: Option<String>,
    pub loops_started: u32,
    pub alerts_played: u32,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, sound: impl Into<String>) -> Self {
        self.assets.insert(sound.into());
        self
    }
}

impl AudioBackend for RecordingBackend {
    fn play_looping(&mut self, sound: &str) -> Result<(), AudioError> {
        if !self.assets.contains(sound) {
            return Err(AudioError::NotFound(sound.to_string()));
        }
        self.looping = Some(sound.to_string());
        self.loops_started += 1;
        Ok(())
    }

    fn stop_looping(&mut self) {
        self.looping = None;
    }

    fn play_alert(&mut self) {
        self.alerts_played += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn available_asset_loops() {
        let mut audio = AudioLoop::new(RecordingBackend::new().with_asset("default"));
        audio.start("default", Instant::now());
        assert!(audio.is_playing());
        assert!(!audio.is_fallback());
        assert_eq!(audio.backend().looping.as_deref(), Some("default"));

        audio.stop();
        assert!(!audio.is_playing());
        assert!(audio.backend().looping.is_none());
    }

    #[test]
    fn missing_asset_falls_back_to_beeps() {
        let t0 = Instant::now();
        let mut audio = AudioLoop::new(RecordingBackend::new());
        audio.start("missing", t0);
        assert!(audio.is_fallback());
        assert_eq!(audio.backend().alerts_played, 1);

        assert!(!audio.tick(t0 + secs(1.9)));
        assert!(audio.tick(t0 + secs(2.0)));
        assert!(audio.tick(t0 + secs(4.1)));
        assert_eq!(audio.backend().alerts_played, 3);
    }

    #[test]
    fn stop_during_pending_beep_prevents_it() {
        let t0 = Instant::now();
        let mut audio = AudioLoop::new(RecordingBackend::new());
        audio.start("missing", t0);
        assert!(audio.next_beep_at().is_some());

        audio.stop();
        assert!(audio.next_beep_at().is_none());
        assert!(!audio.tick(t0 + secs(2.5)));
        assert!(!audio.tick(t0 + secs(10.0)));
        assert_eq!(audio.backend().alerts_played, 1);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut audio = AudioLoop::new(RecordingBackend::new().with_asset("default"));
        audio.stop();
        audio.start("default", Instant::now());
        audio.stop();
        audio.stop();
        assert!(!audio.is_playing());
    }

    #[test]
    fn restart_does_not_revive_old_beeps() {
        let t0 = Instant::now();
        let mut audio = AudioLoop::new(RecordingBackend::new().with_asset("default"));
        audio.start("missing", t0);
        audio.start("default", t0 + secs(1.0));
        assert!(!audio.tick(t0 + secs(3.0)));
        assert_eq!(audio.backend().alerts_played, 1);
        assert_eq!(audio.backend().loops_started, 1);
    }

    #[test]
    fn forced_fallback_skips_asset() {
        let mut audio =
            AudioLoop::new(RecordingBackend::new().with_asset("default")).with_forced_fallback(true);
        audio.start("default", Instant::now());
        assert!(audio.is_fallback());
        assert_eq!(audio.backend().loops_started, 0);
    }
}
