//! `DeviceSession`: the only place commands are emitted.
//!
//! Every command-issuing operation runs inside one exclusive scope (the link
//! mutex). Device state sits behind its own `RwLock` so status queries never
//! wait on a slow volume ramp; it is only written while the link is held.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use eyre::WrapErr;
use irvol_traits::Clock;

use crate::calibration::CalibrationTable;
use crate::codebook::{Capabilities, Codebook};
use crate::command::{Action, Command};
use crate::error::{IrError, Report, Result};
use crate::link::Link;
use crate::status::{DeviceState, Power};
use crate::stepper::{Adjustment, Outcome, StepStatus, VolumeStepper};

/// Follow-up `set_volume(restore)` started by `turn_on`.
pub type RestoreHandle = JoinHandle<Result<Adjustment>>;

pub(crate) struct Shared {
    pub(crate) name: String,
    pub(crate) link: Mutex<Link>,
    pub(crate) state: RwLock<DeviceState>,
    pub(crate) generation: AtomicU64,
    pub(crate) table: Option<CalibrationTable>,
    pub(crate) codebook: Arc<dyn Codebook>,
    pub(crate) capabilities: Capabilities,
    pub(crate) digit_delay: Duration,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
}

/// Cheap-to-clone handle to one device.
#[derive(Clone)]
pub struct DeviceSession {
    pub(crate) shared: Arc<Shared>,
}

impl core::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("name", &self.shared.name)
            .field("state", &*self.read_state())
            .field("generation", &self.current_generation())
            .finish()
    }
}

impl DeviceSession {
    // ── Power ────────────────────────────────────────────────────────────────

    /// Power the device on.
    ///
    /// When a restore level is configured and volume-set is available, a
    /// `set_volume(restore)` runs on its own thread once the link is free.
    pub fn turn_on(&self) -> Result<Option<RestoreHandle>> {
        let cmd = self.resolve(Action::PowerOn)?;
        {
            let mut link = self.lock_link();
            link.send_absolute(&cmd).wrap_err("turn_on")?;
            self.write_state().power = Power::On;
        }
        tracing::info!(device = %self.shared.name, "powered on");

        let Some(level) = self.restore_level() else {
            return Ok(None);
        };
        // The restore is requested now; a later set_volume must supersede it.
        let generation = self.next_generation();
        let session = self.clone();
        let handle = thread::Builder::new()
            .name("irvol-restore".into())
            .spawn(move || session.set_volume_at(level, generation))
            .wrap_err("spawning volume restore")?;
        Ok(Some(handle))
    }

    pub fn turn_off(&self) -> Result<()> {
        let cmd = self.resolve(Action::PowerOff)?;
        let mut link = self.lock_link();
        link.send_absolute(&cmd).wrap_err("turn_off")?;
        self.write_state().power = Power::Off;
        tracing::info!(device = %self.shared.name, "powered off");
        Ok(())
    }

    // ── Mute ─────────────────────────────────────────────────────────────────

    /// Mute or unmute, preferring discrete codes over the toggle.
    pub fn mute(&self, on: bool) -> Result<()> {
        let discrete = if on { Action::MuteOn } else { Action::MuteOff };
        if let Some(cmd) = self.shared.codebook.resolve(&discrete) {
            let mut link = self.lock_link();
            link.send_absolute(&cmd).wrap_err_with(|| discrete.to_string())?;
            self.write_state().muted = Some(on);
            return Ok(());
        }

        let toggle = self
            .shared
            .codebook
            .resolve(&Action::Mute)
            .ok_or_else(|| unconfigured("volume_mute"))?;
        let mut link = self.lock_link();
        let known = self.read_state().muted;
        if known == Some(on) {
            tracing::debug!(muted = on, "mute state already matches; toggle skipped");
            return Ok(());
        }
        link.send_absolute(&toggle).wrap_err("mute toggle")?;
        self.write_state().muted = known.map(|m| !m);
        Ok(())
    }

    // ── Volume ───────────────────────────────────────────────────────────────

    /// One paced pulse up. Supersedes any in-flight `set_volume`.
    pub fn step_volume_up(&self) -> Result<()> {
        self.step_volume(Action::VolumeUp, 1.0)
    }

    /// One paced pulse down. Supersedes any in-flight `set_volume`.
    pub fn step_volume_down(&self) -> Result<()> {
        self.step_volume(Action::VolumeDown, -1.0)
    }

    fn step_volume(&self, action: Action, sign: f64) -> Result<()> {
        let cmd = self.resolve(action.clone())?;
        self.next_generation();
        let mut link = self.lock_link();
        link.send_relative(&cmd)
            .wrap_err_with(|| action.to_string())?;
        let step = self.shared.table.as_ref().map(CalibrationTable::step_size);
        let mut state = self.write_state();
        state.volume = match (state.volume, step) {
            (Some(v), Some(s)) => Some(v + sign * s),
            _ => None,
        };
        Ok(())
    }

    /// Move the device to the normalized `target` level.
    ///
    /// Returns `Outcome::Superseded` (not an error) when a newer volume
    /// request took over. On a transmit failure the estimate reflects the
    /// pulses that went out before the error is returned.
    pub fn set_volume(&self, target: f64) -> Result<Adjustment> {
        self.volume_request(target)?;
        let generation = self.next_generation();
        self.set_volume_at(target, generation)
    }

    /// Validate a volume target and resolve the table and pulse commands.
    fn volume_request(&self, target: f64) -> Result<(&CalibrationTable, Command, Command)> {
        if !target.is_finite() {
            return Err(Report::new(IrError::State(format!(
                "volume target must be finite (got {target})"
            ))));
        }
        let table = match (&self.shared.table, self.shared.capabilities.volume_set) {
            (Some(t), true) => t,
            _ => return Err(unconfigured("volume_set")),
        };
        let up = self.resolve(Action::VolumeUp)?;
        let down = self.resolve(Action::VolumeDown)?;
        Ok((table, up, down))
    }

    /// Run a volume request under a generation issued when it was made.
    fn set_volume_at(&self, target: f64, generation: u64) -> Result<Adjustment> {
        let (table, up, down) = self.volume_request(target)?;
        let is_current = || self.shared.generation.load(Ordering::SeqCst) == generation;

        let mut link = self.lock_link();
        if !is_current() {
            tracing::debug!(level = target, generation, "volume request stale before start");
            return Ok(Adjustment {
                outcome: Outcome::Superseded,
                target,
                pulses: 0,
                duplicates: 0,
                estimate: self.read_state().volume,
                generation,
            });
        }

        let estimate = self.read_state().volume;
        let mut stepper = VolumeStepper::new(table, target, estimate, up, down);
        self.write_state().volume = Some(stepper.provisional_estimate());

        let status = loop {
            match stepper.step(&mut link, &is_current) {
                Ok(StepStatus::Running) => continue,
                Ok(done) => break done,
                Err(e) => {
                    let settled = stepper.settled_estimate();
                    self.write_state().volume = settled;
                    tracing::warn!(
                        level = target,
                        pulses = stepper.pulses_sent(),
                        estimate = ?settled,
                        error = %e,
                        "volume adjustment aborted"
                    );
                    return Err(e.wrap_err(format!("set_volume({target})")));
                }
            }
        };

        let estimate = stepper.settled_estimate();
        self.write_state().volume = estimate;
        let outcome = match status {
            StepStatus::Superseded => Outcome::Superseded,
            _ => Outcome::Completed,
        };
        tracing::info!(
            level = target,
            ?outcome,
            pulses = stepper.pulses_sent(),
            duplicates = stepper.duplicates_sent(),
            "volume adjustment finished"
        );
        Ok(Adjustment {
            outcome,
            target,
            pulses: stepper.pulses_sent(),
            duplicates: stepper.duplicates_sent(),
            estimate,
            generation,
        })
    }

    // ── Sources, modes, transport ────────────────────────────────────────────

    pub fn select_source(&self, name: &str) -> Result<()> {
        let cmd = self.resolve(Action::Source(name.to_string()))?;
        let mut link = self.lock_link();
        link.send_absolute(&cmd)
            .wrap_err_with(|| format!("select_source({name})"))?;
        self.write_state().source = Some(name.to_string());
        Ok(())
    }

    pub fn select_sound_mode(&self, name: &str) -> Result<()> {
        let cmd = self.resolve(Action::SoundMode(name.to_string()))?;
        let mut link = self.lock_link();
        link.send_absolute(&cmd)
            .wrap_err_with(|| format!("select_sound_mode({name})"))?;
        self.write_state().sound_mode = Some(name.to_string());
        Ok(())
    }

    pub fn next_track(&self) -> Result<()> {
        self.send_action(Action::NextTrack)
    }

    pub fn previous_track(&self) -> Result<()> {
        self.send_action(Action::PreviousTrack)
    }

    /// Dial `digits`, pausing the configured digit delay after each one.
    ///
    /// Every character is resolved before anything is sent.
    pub fn send_digits(&self, digits: &str) -> Result<()> {
        if digits.is_empty() {
            return Err(Report::new(IrError::State("no digits given".into())));
        }
        let cmds = digits
            .chars()
            .map(|c| {
                if c.is_ascii_digit() {
                    self.resolve(Action::Digit(c))
                } else {
                    Err(Report::new(IrError::State(format!(
                        "'{c}' is not a digit"
                    ))))
                }
            })
            .collect::<Result<Vec<Command>>>()?;

        let mut link = self.lock_link();
        for (i, cmd) in cmds.iter().enumerate() {
            link.send_absolute(cmd)
                .wrap_err_with(|| format!("digit {} of '{digits}'", i + 1))?;
            link.clock().sleep(self.shared.digit_delay);
        }
        Ok(())
    }

    // ── Status ───────────────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn power(&self) -> Power {
        self.read_state().power
    }

    pub fn volume(&self) -> Option<f64> {
        self.read_state().volume
    }

    pub fn muted(&self) -> Option<bool> {
        self.read_state().muted
    }

    pub fn source(&self) -> Option<String> {
        self.read_state().source.clone()
    }

    pub fn sound_mode(&self) -> Option<String> {
        self.read_state().sound_mode.clone()
    }

    /// Full snapshot of the last-known state.
    pub fn state(&self) -> DeviceState {
        self.read_state().clone()
    }

    pub fn source_list(&self) -> Vec<String> {
        self.shared.codebook.sources()
    }

    pub fn sound_mode_list(&self) -> Vec<String> {
        self.shared.codebook.sound_modes()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.shared.capabilities
    }

    pub fn calibration(&self) -> Option<&CalibrationTable> {
        self.shared.table.as_ref()
    }

    /// Generation of the newest volume request.
    pub fn current_generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    pub fn clock(&self) -> &dyn Clock {
        &*self.shared.clock
    }

    // ── Private ──────────────────────────────────────────────────────────────

    fn restore_level(&self) -> Option<f64> {
        if !self.shared.capabilities.volume_set {
            return None;
        }
        self.shared.table.as_ref()?.restore_level()
    }

    /// Issue a new generation; any in-flight ramp stops at its next pulse.
    fn next_generation(&self) -> u64 {
        self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn send_action(&self, action: Action) -> Result<()> {
        let cmd = self.resolve(action.clone())?;
        let mut link = self.lock_link();
        link.send_absolute(&cmd)
            .wrap_err_with(|| action.to_string())
    }

    fn resolve(&self, action: Action) -> Result<Command> {
        self.shared
            .codebook
            .resolve(&action)
            .ok_or_else(|| unconfigured(&action.to_string()))
    }

    fn lock_link(&self) -> MutexGuard<'_, Link> {
        self.shared
            .link
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn read_state(&self) -> RwLockReadGuard<'_, DeviceState> {
        self.shared
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, DeviceState> {
        self.shared
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn unconfigured(what: &str) -> Report {
    Report::new(IrError::Unconfigured(what.to_string()))
}
