//! Last-known device state as reported to callers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Power {
    #[default]
    Off,
    On,
}

/// Snapshot of what the session believes about the device.
///
/// `None` means unknown. Only successful sends change it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceState {
    pub power: Power,
    pub muted: Option<bool>,
    /// Normalized volume estimate; not clamped to 0..1.
    pub volume: Option<f64>,
    pub source: Option<String>,
    pub sound_mode: Option<String>,
}
