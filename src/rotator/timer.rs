//! Rotation timer state machine.
//!
//! ```text
//!            start / PointerLeave
//!   Paused ───────────────────────▶ Running ──┐ every period: advance
//!     ▲                               │  ◀────┘
//!     └────────── PointerEnter ───────┘
//! ```
//!
//! There is at most one armed deadline. Starting while already running
//! replaces it, so restarts never stack timers.

use std::time::Duration;

use tokio::time::Instant;

/// Whether the rotation is advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationState {
    Running,
    Paused,
}

/// Single-deadline periodic timer.
#[derive(Debug, Clone)]
pub struct RotationTimer {
    period: Duration,
    state: RotationState,
    deadline: Option<Instant>,
}

impl RotationTimer {
    /// Create a timer that is not yet armed.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            state: RotationState::Paused,
            deadline: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn state(&self) -> RotationState {
        self.state
    }

    /// Next instant the rotation should advance, if running.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Arm the timer with a full period from `now`, cancelling any previous deadline.
    pub fn start(&mut self, now: Instant) {
        self.state = RotationState::Running;
        self.deadline = Some(now + self.period);
    }

    /// Cancel the deadline.
    pub fn pause(&mut self) {
        self.state = RotationState::Paused;
        self.deadline = None;
    }

    /// Whether the deadline has passed.
    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| d <= now)
    }

    /// Re-arm after the deadline fired.
    ///
    /// Keeps the established cadence; periods missed entirely are skipped rather
    /// than replayed.
    pub fn fired(&mut self, now: Instant) {
        if let Some(deadline) = self.deadline {
            let next = deadline + self.period;
            self.deadline = Some(if next > now { next } else { now + self.period });
        }
    }
}
