//! The volume stepper: turns an absolute target into an anchor command plus a
//! run of paced relative pulses.
//!
//! `VolumeStepper::step` advances one pulse at a time; the caller owns the
//! loop and decides when to stop.

use crate::calibration::CalibrationTable;
use crate::command::Command;
use crate::error::Result;
use crate::link::Link;

/// Anchor choice and signed pulse count for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub anchor_level: f64,
    /// `None` when the live estimate is the anchor ("already there").
    pub anchor_command: Option<Command>,
    /// Positive means up, negative down.
    pub steps: i64,
}

/// Most pulses a single request will send in either direction.
pub const MAX_STEPS: i64 = u32::MAX as i64;

impl Plan {
    /// Pick the anchor and pulse count. The count is capped at `MAX_STEPS`
    /// so that every derived level matches what is actually sent.
    pub fn compute(table: &CalibrationTable, target: f64, estimate: Option<f64>) -> Self {
        let (anchor_level, command) = table.nearest_anchor(target, estimate);
        let steps = ((target - anchor_level) / table.step_size()).round() as i64;
        Self {
            anchor_level,
            anchor_command: command.cloned(),
            steps: steps.clamp(-MAX_STEPS, MAX_STEPS),
        }
    }

    /// Number of relative pulses.
    pub fn pulses(&self) -> u32 {
        u32::try_from(self.steps.unsigned_abs()).unwrap_or(u32::MAX)
    }

    /// Level reached once every pulse lands.
    pub fn final_level(&self, step_size: f64) -> f64 {
        self.anchor_level + step_size * self.steps as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Plan made, nothing sent yet.
    Computing,
    Stepping,
    Completed,
    Superseded,
    /// A send failed; the stepper will not advance again.
    Failed,
}

/// Result of one `VolumeStepper::step` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// More pulses to send.
    Running,
    Completed,
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    Superseded,
}

/// What a finished `set_volume` request did.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Adjustment {
    pub outcome: Outcome,
    pub target: f64,
    /// Primary relative pulses actually sent.
    pub pulses: u32,
    /// Extra pulses sent to compensate for the pacing window.
    pub duplicates: u32,
    /// Estimate after the request; `None` while the level is unknown.
    pub estimate: Option<f64>,
    pub generation: u64,
}

pub struct VolumeStepper {
    target: f64,
    step_size: f64,
    plan: Plan,
    prior: Option<f64>,
    up: Command,
    down: Command,
    phase: Phase,
    done: u32,
    duplicates: u32,
    anchored: bool,
}

impl core::fmt::Debug for VolumeStepper {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VolumeStepper")
            .field("target", &self.target)
            .field("anchor", &self.plan.anchor_level)
            .field("steps", &self.plan.steps)
            .field("done", &self.done)
            .field("phase", &self.phase)
            .finish()
    }
}

impl VolumeStepper {
    /// Plan a move from `estimate` (the live estimate, if known) to `target`.
    pub fn new(
        table: &CalibrationTable,
        target: f64,
        estimate: Option<f64>,
        up: Command,
        down: Command,
    ) -> Self {
        let plan = Plan::compute(table, target, estimate);
        tracing::info!(
            level = target,
            anchor = plan.anchor_level,
            steps = plan.steps,
            absolute = plan.anchor_command.is_some(),
            "volume plan"
        );
        Self {
            target,
            step_size: table.step_size(),
            plan,
            prior: estimate,
            up,
            down,
            phase: Phase::Computing,
            done: 0,
            duplicates: 0,
            anchored: false,
        }
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pulses_sent(&self) -> u32 {
        self.done
    }

    pub fn duplicates_sent(&self) -> u32 {
        self.duplicates
    }

    /// Estimate published before any pulse goes out.
    pub fn provisional_estimate(&self) -> f64 {
        self.plan.final_level(self.step_size)
    }

    /// Estimate matching what was actually sent so far.
    ///
    /// If the anchor command never made it out, the device is where it was
    /// before the request.
    pub fn settled_estimate(&self) -> Option<f64> {
        if self.phase == Phase::Completed {
            return Some(self.provisional_estimate());
        }
        if self.plan.anchor_command.is_some() && !self.anchored {
            return self.prior;
        }
        let signed = if self.plan.steps < 0 {
            -(self.done as f64)
        } else {
            self.done as f64
        };
        Some(self.plan.anchor_level + self.step_size * signed)
    }

    /// Send the next command of the plan.
    ///
    /// `is_current` reports whether this request still holds the newest
    /// generation; it is consulted at pulse boundaries while pulses remain.
    pub fn step(&mut self, link: &mut Link, is_current: &dyn Fn() -> bool) -> Result<StepStatus> {
        match self.phase {
            Phase::Completed => return Ok(StepStatus::Completed),
            Phase::Superseded => return Ok(StepStatus::Superseded),
            Phase::Failed => {
                return Err(eyre::Report::new(crate::error::IrError::State(
                    "volume stepper already failed".into(),
                )));
            }
            Phase::Computing => {
                if let Some(cmd) = self.plan.anchor_command.clone() {
                    self.guard(link.send_absolute(&cmd))?;
                    self.anchored = true;
                }
                self.phase = Phase::Stepping;
                return Ok(self.after_send(is_current));
            }
            Phase::Stepping => {}
        }

        let pulse = if self.plan.steps > 0 {
            self.up.clone()
        } else {
            self.down.clone()
        };
        let duplicated = self.guard(link.send_relative(&pulse))?;
        if duplicated {
            self.duplicates += 1;
        }
        self.done += 1;
        tracing::debug!(done = self.done, total = self.plan.pulses(), duplicated, "pulse");
        Ok(self.after_send(is_current))
    }

    fn after_send(&mut self, is_current: &dyn Fn() -> bool) -> StepStatus {
        if self.done >= self.plan.pulses() {
            self.phase = Phase::Completed;
            return StepStatus::Completed;
        }
        if !is_current() {
            tracing::warn!(
                level = self.target,
                done = self.done,
                total = self.plan.pulses(),
                "volume adjustment superseded"
            );
            self.phase = Phase::Superseded;
            return StepStatus::Superseded;
        }
        StepStatus::Running
    }

    fn guard<T>(&mut self, r: Result<T>) -> Result<T> {
        if r.is_err() {
            self.phase = Phase::Failed;
        }
        r
    }
}
