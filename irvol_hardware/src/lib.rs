//! Transmitter backends for the IR link.
//!
//! Only a simulated blaster lives here; real blasters plug in by implementing
//! `irvol_traits::Transmitter`.
pub mod error;

use error::HwError;
use irvol_traits::Transmitter;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared view of what a `SimulatedTransmitter` has sent.
///
/// Cloned from [`SimulatedTransmitter::log`] before the transmitter is moved
/// into a session, so callers can inspect traffic afterwards.
#[derive(Debug, Clone, Default)]
pub struct SimLog {
    sent: Arc<Mutex<Vec<String>>>,
    attempts: Arc<AtomicU64>,
}

impl SimLog {
    /// Payloads that were accepted, in send order.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Number of accepted payloads.
    pub fn len(&self) -> usize {
        self.sent.lock().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of send attempts, including failed ones.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }
}

/// Simulated IR blaster.
///
/// Logs every payload, optionally sleeps to mimic link latency, and can fail
/// or time out the Nth attempt (1-based) to exercise error paths.
#[derive(Debug, Default)]
pub struct SimulatedTransmitter {
    log: SimLog,
    latency: Duration,
    fail_on: Option<u64>,
    timeout_on: Option<u64>,
}

impl SimulatedTransmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every send.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail the `n`th send attempt (1-based) with a link error.
    pub fn fail_on(mut self, n: u64) -> Self {
        self.fail_on = Some(n);
        self
    }

    /// Time out the `n`th send attempt (1-based), as an unreachable blaster would.
    pub fn timeout_on(mut self, n: u64) -> Self {
        self.timeout_on = Some(n);
        self
    }

    pub fn log(&self) -> SimLog {
        self.log.clone()
    }
}

impl Transmitter for SimulatedTransmitter {
    fn send(&mut self, payload: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let attempt = self.log.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        if payload.is_empty() {
            return Err(Box::new(HwError::Payload("empty payload".into())));
        }
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        if self.timeout_on == Some(attempt) {
            tracing::warn!(attempt, "simulated blaster not answering");
            return Err(Box::new(HwError::Timeout));
        }
        if self.fail_on == Some(attempt) {
            tracing::warn!(attempt, "simulated blaster dropping send");
            return Err(Box::new(HwError::Link(format!(
                "simulated failure on send {attempt}"
            ))));
        }
        tracing::debug!(attempt, payload, "ir send (simulated)");
        if let Ok(mut sent) = self.log.sent.lock() {
            sent.push(payload.to_string());
        }
        Ok(())
    }
}
