//! Conversions from `irvol_config` types to `irvol_core` types.

use std::time::Duration;

use crate::calibration::CalibrationTable;
use crate::command::Command;
use crate::error::Report;
use crate::pacing::PacingCfg;

// ── CalibrationTable ─────────────────────────────────────────────────────────

impl TryFrom<&irvol_config::VolumeCfg> for CalibrationTable {
    type Error = Report;

    fn try_from(c: &irvol_config::VolumeCfg) -> Result<Self, Self::Error> {
        let levels = c
            .levels
            .iter()
            .map(|(level, entry)| (*level, Command::from(entry)))
            .collect();
        CalibrationTable::new(c.min, c.max, c.step, levels, c.restore)
    }
}

// ── PacingCfg ────────────────────────────────────────────────────────────────

impl From<&irvol_config::VolumeCfg> for PacingCfg {
    fn from(c: &irvol_config::VolumeCfg) -> Self {
        Self {
            window: c.timeout_ms.map(Duration::from_millis),
            duplicate_band: Duration::from_millis(c.duplicate_band_ms),
        }
    }
}
