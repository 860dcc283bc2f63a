//! Type-state builder for `DeviceSession`.
//!
//! The builder enforces at compile time that a transmitter and a codebook are
//! provided before `build()` is available. `try_build()` is always available
//! for dynamic checks.

use std::marker::PhantomData;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use eyre::WrapErr;
use irvol_traits::{Clock, MonotonicClock, Transmitter};

use crate::calibration::CalibrationTable;
use crate::codebook::{Capabilities, Codebook, ConfigCodebook};
use crate::error::{BuildError, IrError, Result};
use crate::link::Link;
use crate::pacing::PacingCfg;
use crate::session::{DeviceSession, Shared};
use crate::status::DeviceState;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

#[derive(Default)]
struct Parts {
    transmitter: Option<Box<dyn Transmitter + Send>>,
    codebook: Option<Arc<dyn Codebook>>,
    table: Option<CalibrationTable>,
    pacing: Option<PacingCfg>,
    digit_delay: Option<Duration>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    initial_state: Option<DeviceState>,
    name: Option<String>,
}

/// Builder for `DeviceSession`. Optional pieces fall back to defaults on `build()`.
pub struct DeviceSessionBuilder<T, C> {
    parts: Parts,
    _t: PhantomData<T>,
    _c: PhantomData<C>,
}

impl Default for DeviceSessionBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            parts: Parts::default(),
            _t: PhantomData,
            _c: PhantomData,
        }
    }
}

impl DeviceSession {
    /// Start building a session.
    pub fn builder() -> DeviceSessionBuilder<Missing, Missing> {
        DeviceSessionBuilder::default()
    }
}

impl<T, C> DeviceSessionBuilder<T, C> {
    fn advance<T2, C2>(self) -> DeviceSessionBuilder<T2, C2> {
        DeviceSessionBuilder {
            parts: self.parts,
            _t: PhantomData,
            _c: PhantomData,
        }
    }

    /// Fallible build available in any type-state; returns a detailed error for missing pieces.
    pub fn try_build(self) -> Result<DeviceSession> {
        let p = self.parts;
        let transmitter = p
            .transmitter
            .ok_or_else(|| build_error(BuildError::MissingTransmitter))?;
        let codebook = p
            .codebook
            .ok_or_else(|| build_error(BuildError::MissingCodebook))?;

        let pacing = p.pacing.unwrap_or_default();
        if let Some(window) = pacing.window
            && pacing.duplicate_band >= window
        {
            return Err(build_error(BuildError::InvalidConfig(format!(
                "duplicate band ({} ms) must be shorter than the pacing window ({} ms)",
                pacing.duplicate_band.as_millis(),
                window.as_millis()
            ))));
        }

        let clock: Arc<dyn Clock + Send + Sync> = match p.clock {
            Some(c) => c,
            None => Arc::new(MonotonicClock::new()),
        };
        let capabilities = Capabilities::detect(&*codebook, p.table.is_some());
        let name = p
            .name
            .unwrap_or_else(|| irvol_config::DEFAULT_NAME.to_string());
        tracing::debug!(device = %name, ?capabilities, "session built");

        Ok(DeviceSession {
            shared: Arc::new(Shared {
                name,
                link: Mutex::new(Link::new(transmitter, pacing, clock.clone())),
                state: RwLock::new(p.initial_state.unwrap_or_default()),
                generation: AtomicU64::new(0),
                table: p.table,
                codebook,
                capabilities,
                digit_delay: p
                    .digit_delay
                    .unwrap_or(Duration::from_millis(irvol_config::DEFAULT_DIGIT_DELAY_MS)),
                clock,
            }),
        })
    }
}

/// `BuildError` under an `IrError::Config` context; both downcast.
fn build_error(e: BuildError) -> eyre::Report {
    let context = IrError::from(e.clone());
    eyre::Report::new(e).wrap_err(context)
}

/// Chainable setters that do not affect type-state.
impl<T, C> DeviceSessionBuilder<T, C> {
    pub fn with_calibration(mut self, table: CalibrationTable) -> Self {
        self.parts.table = Some(table);
        self
    }
    pub fn with_pacing(mut self, pacing: PacingCfg) -> Self {
        self.parts.pacing = Some(pacing);
        self
    }
    pub fn with_digit_delay(mut self, delay: Duration) -> Self {
        self.parts.digit_delay = Some(delay);
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.parts.clock = Some(clock);
        self
    }
    /// Seed the session with a previously persisted state.
    pub fn with_initial_state(mut self, state: DeviceState) -> Self {
        self.parts.initial_state = Some(state);
        self
    }
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.parts.name = Some(name.into());
        self
    }
}

// Setters that advance type-state
impl<C> DeviceSessionBuilder<Missing, C> {
    pub fn with_transmitter(
        mut self,
        transmitter: impl Transmitter + Send + 'static,
    ) -> DeviceSessionBuilder<Set, C> {
        self.parts.transmitter = Some(Box::new(transmitter));
        self.advance()
    }
}

impl<T> DeviceSessionBuilder<T, Missing> {
    pub fn with_codebook(
        mut self,
        codebook: impl Codebook + 'static,
    ) -> DeviceSessionBuilder<T, Set> {
        self.parts.codebook = Some(Arc::new(codebook));
        self.advance()
    }

    /// Take codebook, calibration, pacing, digit delay and name from a loaded
    /// config. Calibration CSV files must already be merged into `levels`.
    pub fn with_config(
        mut self,
        cfg: &irvol_config::Config,
    ) -> Result<DeviceSessionBuilder<T, Set>> {
        if let Some(vol) = &cfg.volume {
            let table = CalibrationTable::try_from(vol).wrap_err("building calibration table")?;
            self.parts.table = Some(table);
            self.parts.pacing = Some(PacingCfg::from(vol));
        }
        self.parts.digit_delay = Some(Duration::from_millis(cfg.digits.delay_ms));
        self.parts.name = Some(cfg.device.name.clone());
        self.parts.codebook = Some(Arc::new(ConfigCodebook::from(&cfg.codes)));
        Ok(self.advance())
    }
}

impl DeviceSessionBuilder<Set, Set> {
    /// Build the session. Only available once a transmitter and codebook are set.
    pub fn build(self) -> Result<DeviceSession> {
        self.try_build()
    }
}
