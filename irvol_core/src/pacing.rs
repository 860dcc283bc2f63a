//! Minimum spacing between relative volume pulses.
//!
//! Many receivers ignore the first volume key after their on-screen display
//! times out. The guard tracks the last send and, when the pacing window is
//! about to close, waits it out so the caller can send a compensating
//! duplicate pulse.

use std::time::{Duration, Instant};

use irvol_traits::Clock;

use crate::command::SendKind;

/// Pacing parameters; `window = None` disables pacing entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingCfg {
    /// Time after the last send during which the device registers pulses.
    pub window: Option<Duration>,
    /// Tail of the window in which the guard sleeps and asks for a duplicate.
    pub duplicate_band: Duration,
}

impl Default for PacingCfg {
    fn default() -> Self {
        Self {
            window: None,
            duplicate_band: Duration::from_millis(irvol_config::DEFAULT_DUPLICATE_BAND_MS),
        }
    }
}

/// Outcome of consulting the guard before a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Send right away; nothing to compensate.
    Ready,
    /// The guard slept out the rest of the window; send one duplicate pulse first.
    NearlyReady,
    /// Well inside the window; send right away without a duplicate.
    NotReady,
}

#[derive(Debug, Clone)]
pub struct PacingGuard {
    cfg: PacingCfg,
    last_send: Option<Instant>,
}

impl PacingGuard {
    pub fn new(cfg: PacingCfg) -> Self {
        Self {
            cfg,
            last_send: None,
        }
    }

    pub fn last_send(&self) -> Option<Instant> {
        self.last_send
    }

    /// Time left in the pacing window, or `None` when pacing does not apply
    /// (no window configured, nothing sent yet).
    pub fn remaining(&self, clock: &dyn Clock) -> Option<Duration> {
        let window = self.cfg.window?;
        let last = self.last_send?;
        Some(window.saturating_sub(clock.elapsed_since(last)))
    }

    /// Decide how the next send should proceed, sleeping through `clock` when
    /// the window is nearly over.
    pub fn await_ready(&self, kind: SendKind, clock: &dyn Clock) -> Readiness {
        if kind == SendKind::Absolute {
            return Readiness::Ready;
        }
        let Some(remaining) = self.remaining(clock) else {
            return Readiness::Ready;
        };
        if remaining.is_zero() {
            Readiness::Ready
        } else if remaining <= self.cfg.duplicate_band {
            tracing::debug!(
                remaining_ms = remaining.as_millis() as u64,
                "pacing window nearly over; waiting before duplicate pulse"
            );
            clock.sleep(remaining);
            Readiness::NearlyReady
        } else {
            Readiness::NotReady
        }
    }

    /// Record a successful send at `at`.
    pub fn record_send(&mut self, at: Instant) {
        self.last_send = Some(at);
    }
}
