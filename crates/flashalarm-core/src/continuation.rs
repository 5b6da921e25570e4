//! Deferred, liveness-checked steps.
//!
//! The reveal loop, the success delay and the fallback beep all wait for a
//! moment in the future and then act. Instead of timers that must be
//! revoked, each wait is a [`Continuation`] stamped with the [`Generation`]
//! that created it. When it comes due, [`Continuation::resume`] hands the
//! step back only if that generation is still live; stopping a loop just
//! revokes the [`Liveness`] and every outstanding continuation becomes a
//! no-op.

use std::time::Instant;

/// Identifies one run of a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

/// Liveness flag shared by a loop and its continuations.
#[derive(Debug, Default)]
pub struct Liveness {
    current: u64,
    alive: bool,
}

impl Liveness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new run. Continuations from previous runs go stale.
    pub fn renew(&mut self) -> Generation {
        self.current += 1;
        self.alive = true;
        Generation(self.current)
    }

    pub fn revoke(&mut self) {
        self.alive = false;
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_live(&self, generation: Generation) -> bool {
        self.alive && generation.0 == self.current
    }
}

/// A step waiting to run at `due`.
#[derive(Debug, Clone)]
pub struct Continuation<S> {
    due: Instant,
    generation: Generation,
    step: S,
}

impl<S> Continuation<S> {
    pub fn new(due: Instant, generation: Generation, step: S) -> Self {
        Self {
            due,
            generation,
            step,
        }
    }

    pub fn due(&self) -> Instant {
        self.due
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.due
    }

    pub fn step(&self) -> &S {
        &self.step
    }

    /// Check the liveness flag, then hand back the step if it may still act.
    pub fn resume(self, liveness: &Liveness) -> Option<S> {
        liveness.is_live(self.generation).then_some(self.step)
    }
}
