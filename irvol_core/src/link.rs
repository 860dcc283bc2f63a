//! The transmit link: transmitter, pacing guard and clock, held together
//! behind the session's exclusive scope.

use std::sync::Arc;

use eyre::WrapErr;
use irvol_traits::{Clock, Transmitter};

use crate::command::{Command, SendKind};
use crate::error::Result;
use crate::hw_error::map_hw_error;
use crate::pacing::{PacingCfg, PacingGuard, Readiness};

pub struct Link {
    transmitter: Box<dyn Transmitter + Send>,
    pacing: PacingGuard,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl core::fmt::Debug for Link {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Link")
            .field("pacing", &self.pacing)
            .finish_non_exhaustive()
    }
}

impl Link {
    pub fn new(
        transmitter: Box<dyn Transmitter + Send>,
        pacing: PacingCfg,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            transmitter,
            pacing: PacingGuard::new(pacing),
            clock,
        }
    }

    pub fn clock(&self) -> &dyn Clock {
        &*self.clock
    }

    pub fn pacing(&self) -> &PacingGuard {
        &self.pacing
    }

    /// Send a command that sets state outright. Not paced.
    pub fn send_absolute(&mut self, cmd: &Command) -> Result<()> {
        self.transmit(cmd)
    }

    /// Send one relative pulse, preceded by a duplicate when the pacing window
    /// is nearly over. Returns whether a duplicate was sent.
    pub fn send_relative(&mut self, cmd: &Command) -> Result<bool> {
        let readiness = self.pacing.await_ready(SendKind::Relative, &*self.clock);
        let duplicated = readiness == Readiness::NearlyReady;
        if duplicated {
            self.transmit(cmd).wrap_err("duplicate pulse")?;
        }
        self.transmit(cmd)?;
        Ok(duplicated)
    }

    fn transmit(&mut self, cmd: &Command) -> Result<()> {
        tracing::debug!(payload = cmd.payload(), "transmit");
        self.transmitter
            .send(cmd.payload())
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err_with(|| format!("sending '{}'", cmd.payload()))?;
        self.pacing.record_send(self.clock.now());
        self.clock.sleep(cmd.delay());
        Ok(())
    }
}
