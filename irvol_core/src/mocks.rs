//! Test and helper transmitters for irvol_core

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Payloads accepted by a `RecordingTransmitter`, shared with the test.
#[derive(Debug, Clone, Default)]
pub struct SentLog {
    sent: Arc<Mutex<Vec<String>>>,
    attempts: Arc<AtomicU64>,
}

impl SentLog {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count of `payload` among accepted sends.
    pub fn count(&self, payload: &str) -> usize {
        self.sent
            .lock()
            .map(|g| g.iter().filter(|p| *p == payload).count())
            .unwrap_or(0)
    }

    /// Send attempts including failed ones.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    fn push(&self, payload: &str) {
        if let Ok(mut g) = self.sent.lock() {
            g.push(payload.to_string());
        }
    }
}

/// Transmitter that records every payload and can fail chosen attempts.
#[derive(Debug, Default)]
pub struct RecordingTransmitter {
    log: SentLog,
    fail_on: Vec<u64>,
}

impl RecordingTransmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`th send attempt (1-based). May be chained.
    pub fn fail_on(mut self, n: u64) -> Self {
        self.fail_on.push(n);
        self
    }

    pub fn log(&self) -> SentLog {
        self.log.clone()
    }
}

impl irvol_traits::Transmitter for RecordingTransmitter {
    fn send(&mut self, payload: &str) -> Result<(), BoxError> {
        let n = self.log.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.contains(&n) {
            return Err(Box::new(std::io::Error::other(format!(
                "injected failure on send {n}"
            ))));
        }
        self.log.push(payload);
        Ok(())
    }
}

/// Test-side handle of a `GatedTransmitter`.
#[derive(Debug)]
pub struct Gate {
    reached: Receiver<u64>,
    release: Sender<()>,
}

impl Gate {
    /// Block until the held attempt is reached; returns its number.
    pub fn wait_reached(&self, timeout: Duration) -> Option<u64> {
        self.reached.recv_timeout(timeout).ok()
    }

    /// Let the held attempt proceed.
    pub fn release(&self) {
        let _ = self.release.send(());
    }
}

/// Recording transmitter that parks on one chosen attempt until released.
///
/// Lets threaded tests issue a competing request while a send is in flight.
#[derive(Debug)]
pub struct GatedTransmitter {
    inner: RecordingTransmitter,
    hold_on: u64,
    reached: Sender<u64>,
    release: Receiver<()>,
}

impl GatedTransmitter {
    /// Hold the `hold_on`th attempt (1-based) before it is recorded.
    pub fn gated(hold_on: u64) -> (Self, Gate) {
        let (reached_tx, reached_rx) = bounded(1);
        let (release_tx, release_rx) = bounded(1);
        let tx = Self {
            inner: RecordingTransmitter::new(),
            hold_on,
            reached: reached_tx,
            release: release_rx,
        };
        let gate = Gate {
            reached: reached_rx,
            release: release_tx,
        };
        (tx, gate)
    }

    pub fn log(&self) -> SentLog {
        self.inner.log()
    }
}

impl irvol_traits::Transmitter for GatedTransmitter {
    fn send(&mut self, payload: &str) -> Result<(), BoxError> {
        let next = self.inner.log.attempts() + 1;
        if next == self.hold_on {
            let _ = self.reached.send(next);
            let _ = self.release.recv();
        }
        self.inner.send(payload)
    }
}
