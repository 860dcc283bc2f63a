use std::sync::Arc;

use irvol_core::mocks::RecordingTransmitter;
use irvol_core::{
    Action, CalibrationTable, Command, ConfigCodebook, DeviceSession, DeviceState, Plan,
};
use irvol_traits::clock::test_clock::TestClock;
use proptest::prelude::*;

fn anchors(levels: &[f64]) -> Vec<(f64, Command)> {
    levels
        .iter()
        .enumerate()
        .map(|(i, l)| (*l, Command::new(format!("L{i}"))))
        .collect()
}

proptest! {
    #[test]
    fn step_size_is_positive_for_any_valid_range(
        min in -1000.0f64..1000.0,
        span in 0.001f64..1000.0,
        step_frac in 0.0001f64..1.0,
    ) {
        let max = min + span;
        let t = CalibrationTable::new(min, max, span * step_frac, anchors(&[min]), None).unwrap();
        prop_assert!(t.step_size() > 0.0);
        prop_assert!(t.step_size().is_finite());
    }

    #[test]
    fn nearest_anchor_minimizes_distance(
        levels in prop::collection::vec(0.0f64..100.0, 1..8),
        target in -0.5f64..1.5,
        estimate in prop::option::of(-0.5f64..1.5),
    ) {
        let t = CalibrationTable::new(0.0, 100.0, 1.0, anchors(&levels), None).unwrap();
        let (level, cmd) = t.nearest_anchor(target, estimate);
        let best = (target - level).abs();
        for a in t.anchors() {
            prop_assert!(best <= (target - a.level).abs());
        }
        if let Some(e) = estimate {
            prop_assert!(best <= (target - e).abs());
            // ties go to the estimate
            if (target - e).abs() == best {
                prop_assert!(cmd.is_none());
            }
        }
        if cmd.is_none() {
            prop_assert_eq!(Some(level), estimate);
        }
    }

    #[test]
    fn plan_lands_within_half_a_step(
        target in 0.0f64..1.0,
        estimate in prop::option::of(0.0f64..1.0),
    ) {
        let t = CalibrationTable::new(
            0.0, 50.0, 1.0,
            anchors(&[0.0, 25.0, 50.0]),
            None,
        ).unwrap();
        let plan = Plan::compute(&t, target, estimate);
        let landed = plan.final_level(t.step_size());
        prop_assert!((landed - target).abs() <= t.step_size() / 2.0 + 1e-9);
    }

    #[test]
    fn repeated_set_volume_is_stable(target in 0.0f64..1.0, start in prop::option::of(0.0f64..1.0)) {
        let table = CalibrationTable::new(
            0.0, 50.0, 1.0,
            anchors(&[0.0, 50.0]),
            None,
        ).unwrap();
        let s = DeviceSession::builder()
            .with_transmitter(RecordingTransmitter::new())
            .with_codebook(
                ConfigCodebook::new()
                    .with(Action::VolumeUp, Command::new("UP"))
                    .with(Action::VolumeDown, Command::new("DN")),
            )
            .with_calibration(table)
            .with_clock(Arc::new(TestClock::new()))
            .with_initial_state(DeviceState { volume: start, ..DeviceState::default() })
            .build()
            .unwrap();
        let first = s.set_volume(target).unwrap().estimate.unwrap();
        let second = s.set_volume(target).unwrap().estimate.unwrap();
        prop_assert!((first - second).abs() < 1e-9);
        prop_assert!((second - target).abs() <= 0.02);
    }
}
