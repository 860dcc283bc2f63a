//! Calibration table: absolute anchors on the normalized 0..1 scale plus the
//! size of one relative pulse.

use crate::command::Command;
use crate::error::{IrError, Report, Result};

/// A level the device reaches reliably with one absolute command.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub level: f64,
    pub command: Command,
}

/// Normalized calibration built once from absolute device levels.
///
/// Anchors are sorted ascending by level and never change after construction.
#[derive(Debug, Clone)]
pub struct CalibrationTable {
    anchors: Vec<Anchor>,
    step_size: f64,
    restore_level: Option<f64>,
}

impl CalibrationTable {
    /// Normalize absolute `levels`, `step` and `restore` against `[min, max]`.
    ///
    /// Fails with `IrError::Config` when the range is empty or inverted, the
    /// step is not positive, any value is non-finite, or no levels are given.
    pub fn new(
        min: f64,
        max: f64,
        step: f64,
        levels: Vec<(f64, Command)>,
        restore: Option<f64>,
    ) -> Result<Self> {
        let scale = max - min;
        if !(min.is_finite() && max.is_finite() && scale.is_finite()) || scale <= 0.0 {
            return Err(config_err(format!(
                "volume range must satisfy max > min (min={min}, max={max})"
            )));
        }
        let step_size = step / scale;
        if !step_size.is_finite() || step_size <= 0.0 {
            return Err(config_err(format!("volume step must be > 0 (step={step})")));
        }
        if levels.is_empty() {
            return Err(config_err(
                "volume calibration needs at least one level".to_string(),
            ));
        }
        let mut anchors = Vec::with_capacity(levels.len());
        for (absolute, command) in levels {
            if !absolute.is_finite() {
                return Err(config_err(format!(
                    "calibration level {absolute} is not finite"
                )));
            }
            anchors.push(Anchor {
                level: (absolute - min) / scale,
                command,
            });
        }
        anchors.sort_by(|a, b| a.level.total_cmp(&b.level));

        let restore_level = match restore {
            Some(r) if !r.is_finite() => {
                return Err(config_err(format!("restore level {r} is not finite")));
            }
            Some(r) => Some((r - min) / scale),
            None => None,
        };

        Ok(Self {
            anchors,
            step_size,
            restore_level,
        })
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    /// Normalized level change of one relative pulse; always > 0.
    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    pub fn restore_level(&self) -> Option<f64> {
        self.restore_level
    }

    /// The known level closest to `target`.
    ///
    /// Candidates are every anchor plus the live `estimate` (if known), which
    /// acts as a pseudo-anchor without a command. The estimate wins ties; among
    /// anchors the lower level wins.
    pub fn nearest_anchor(&self, target: f64, estimate: Option<f64>) -> (f64, Option<&Command>) {
        let mut best: Option<(f64, Option<&Command>, f64)> = estimate
            .filter(|e| e.is_finite())
            .map(|e| (e, None, (target - e).abs()));
        for anchor in &self.anchors {
            let dist = (target - anchor.level).abs();
            match best {
                Some((_, _, best_dist)) if dist >= best_dist => {}
                _ => best = Some((anchor.level, Some(&anchor.command), dist)),
            }
        }
        match best {
            Some((level, command, _)) => (level, command),
            // Unreachable in practice: construction guarantees one anchor.
            None => (target, None),
        }
    }
}

fn config_err(msg: String) -> Report {
    Report::new(IrError::Config(msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CalibrationTable {
        CalibrationTable::new(
            0.0,
            50.0,
            1.0,
            vec![(50.0, Command::new("B")), (0.0, Command::new("A"))],
            Some(20.0),
        )
        .unwrap()
    }

    #[test]
    fn normalizes_levels_step_and_restore() {
        let t = table();
        assert!((t.step_size() - 0.02).abs() < 1e-12);
        assert_eq!(t.restore_level(), Some(0.4));
        let levels: Vec<f64> = t.anchors().iter().map(|a| a.level).collect();
        assert_eq!(levels, vec![0.0, 1.0]);
    }

    #[test]
    fn picks_closest_anchor_from_unknown_estimate() {
        let t = table();
        let (level, cmd) = t.nearest_anchor(0.3, None);
        assert_eq!(level, 0.0);
        assert_eq!(cmd, Some(&Command::new("A")));
        // 0.6 is 0.4 away from the top anchor and 0.6 from the bottom one.
        let (level, cmd) = t.nearest_anchor(0.6, None);
        assert_eq!(level, 1.0);
        assert_eq!(cmd, Some(&Command::new("B")));
    }

    #[test]
    fn estimate_wins_ties_and_carries_no_command() {
        let t = table();
        // 0.25 is equally far from anchor 0.0 and from the estimate 0.5.
        let (level, cmd) = t.nearest_anchor(0.25, Some(0.5));
        assert_eq!(level, 0.5);
        assert!(cmd.is_none());
    }

    #[test]
    fn lower_anchor_wins_anchor_ties() {
        let t = table();
        let (level, _) = t.nearest_anchor(0.5, None);
        assert_eq!(level, 0.0);
    }

    #[test]
    fn rejects_degenerate_inputs() {
        let lv = || vec![(0.0, Command::new("A"))];
        assert!(CalibrationTable::new(10.0, 10.0, 1.0, lv(), None).is_err());
        assert!(CalibrationTable::new(0.0, 50.0, 0.0, lv(), None).is_err());
        assert!(CalibrationTable::new(0.0, 50.0, 1.0, Vec::new(), None).is_err());
        assert!(CalibrationTable::new(0.0, f64::NAN, 1.0, lv(), None).is_err());
    }
}
