#![forbid(unsafe_code)]

//! Leading-edge rate limiting for continuous pan gestures.
//!
//! A pan fires a `Move` event per animation frame. Reconciling the marker
//! registry on every one of them is wasted work, so [`ThrottleGate`] admits
//! at most one run per interval. The first move of a gesture always passes.
//!
//! The gate never schedules anything: a skipped move is simply dropped. The
//! `MoveEnd` that terminates every gesture bypasses the gate via
//! [`ThrottleGate::force`], which corrects whatever intermediate state was
//! skipped.
//!
//! # Invariants
//!
//! 1. Two admitted runs are at least `interval` apart.
//! 2. `force` always runs and does not move the window; a move right after a
//!    move end is judged against the last admitted move.
//! 3. A clock that steps backwards never keeps the gate shut.

use std::time::Duration;

/// Default interval between admitted moves.
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(150);

/// Counters for observing gate behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThrottleStats {
    /// Moves that passed the gate.
    pub admitted: u64,
    /// Moves dropped inside the window.
    pub suppressed: u64,
    /// Unconditional runs (move end).
    pub forced: u64,
}

impl ThrottleStats {
    /// Total reconciliation runs triggered through the gate.
    pub const fn runs(&self) -> u64 {
        self.admitted + self.forced
    }
}

/// Leading-edge throttle over an externally supplied clock.
#[derive(Debug, Clone)]
pub struct ThrottleGate {
    interval: Duration,
    last_admitted: Option<Duration>,
    stats: ThrottleStats,
}

impl ThrottleGate {
    /// Create a gate admitting one move per `interval`.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_admitted: None,
            stats: ThrottleStats::default(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Decide whether a move at `now` should reconcile.
    ///
    /// A `now` earlier than the last admitted move (a host clock reset) opens
    /// the gate and re-anchors the window at `now`.
    pub fn admit(&mut self, now: Duration) -> bool {
        let open = self
            .last_admitted
            .is_none_or(|last| now < last || now - last >= self.interval);
        if open {
            self.last_admitted = Some(now);
            self.stats.admitted += 1;
        } else {
            self.stats.suppressed += 1;
            tracing::trace!(
                elapsed_ms = self
                    .last_admitted
                    .map(|last| now.saturating_sub(last).as_millis() as u64),
                "move throttled"
            );
        }
        open
    }

    /// Record an unconditional run. Always returns `true`.
    pub fn force(&mut self) -> bool {
        self.stats.forced += 1;
        true
    }

    /// Forget the last admitted move so the next one passes.
    pub fn reset(&mut self) {
        self.last_admitted = None;
    }

    pub fn stats(&self) -> ThrottleStats {
        self.stats
    }
}

impl Default for ThrottleGate {
    fn default() -> Self {
        Self::new(DEFAULT_THROTTLE)
    }
}
