#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Absolute volume control over a relative-only IR link (hardware-agnostic).
//!
//! The device only understands "volume up" / "volume down" pulses and gives
//! no feedback. This crate keeps a best-effort estimate of its level and turns
//! absolute requests into anchor commands plus paced pulses. All I/O goes
//! through `irvol_traits::Transmitter`.
//!
//! ## Architecture
//!
//! - **Commands**: opaque payloads with a post-send delay (`command` module)
//! - **Codebook**: semantic action to command lookup and capabilities (`codebook`)
//! - **Calibration**: normalized anchors and step size (`calibration`)
//! - **Pacing**: duplicate-pulse compensation for the device's busy window (`pacing`)
//! - **Stepper**: the per-request state machine (`stepper`)
//! - **Session**: exclusive scope, device state and generation counter (`session`)
//!
//! Levels are normalized: `(absolute - min) / (max - min)`, not clamped.

pub mod builder;
pub mod calibration;
pub mod codebook;
pub mod command;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod link;
pub mod mocks;
pub mod pacing;
pub mod session;
pub mod status;
pub mod stepper;

pub use builder::{DeviceSessionBuilder, Missing, Set};
pub use calibration::{Anchor, CalibrationTable};
pub use codebook::{Capabilities, Codebook, ConfigCodebook};
pub use command::{Action, Command, SendKind};
pub use error::{BuildError, IrError, Result};
pub use pacing::{PacingCfg, PacingGuard, Readiness};
pub use session::{DeviceSession, RestoreHandle};
pub use status::{DeviceState, Power};
pub use stepper::{Adjustment, Outcome, Plan, VolumeStepper};
