use std::sync::Arc;
use std::time::Duration;

use irvol_core::mocks::{RecordingTransmitter, SentLog};
use irvol_core::{
    Action, CalibrationTable, Command, ConfigCodebook, DeviceSession, DeviceState, IrError,
    Outcome, PacingCfg,
};
use irvol_traits::clock::test_clock::TestClock;
use rstest::rstest;

const WINDOW_MS: u64 = 2000;
const BAND_MS: u64 = 500;

fn session(clock: &TestClock, estimate: Option<f64>) -> (DeviceSession, SentLog) {
    session_with(RecordingTransmitter::new(), clock, estimate)
}

fn session_with(
    tx: RecordingTransmitter,
    clock: &TestClock,
    estimate: Option<f64>,
) -> (DeviceSession, SentLog) {
    let log = tx.log();
    let table = CalibrationTable::new(
        0.0,
        50.0,
        1.0,
        vec![(0.0, Command::new("A")), (50.0, Command::new("B"))],
        None,
    )
    .unwrap();
    let s = DeviceSession::builder()
        .with_transmitter(tx)
        .with_codebook(
            ConfigCodebook::new()
                .with(Action::VolumeUp, Command::new("UP"))
                .with(Action::VolumeDown, Command::new("DN")),
        )
        .with_calibration(table)
        .with_pacing(PacingCfg {
            window: Some(Duration::from_millis(WINDOW_MS)),
            duplicate_band: Duration::from_millis(BAND_MS),
        })
        .with_clock(Arc::new(clock.clone()))
        .with_initial_state(DeviceState {
            volume: estimate,
            ..DeviceState::default()
        })
        .build()
        .unwrap();
    (s, log)
}

#[rstest]
#[case::well_inside_window(100, 0)]
#[case::just_before_band(1499, 0)]
#[case::band_start(1500, 1)]
#[case::inside_band(1800, 1)]
#[case::last_millisecond(1999, 1)]
#[case::window_elapsed(2000, 0)]
#[case::long_after(10_000, 0)]
fn duplicate_only_in_band(#[case] elapsed_ms: u64, #[case] duplicates: usize) {
    let clock = TestClock::new();
    let (s, log) = session(&clock, Some(0.5));
    s.step_volume_up().unwrap();
    clock.advance(Duration::from_millis(elapsed_ms));
    s.step_volume_up().unwrap();

    assert_eq!(log.count("UP"), 2 + duplicates);
    let expected_sleeps: Vec<Duration> = if duplicates == 1 {
        vec![Duration::from_millis(WINDOW_MS - elapsed_ms)]
    } else {
        Vec::new()
    };
    assert_eq!(clock.sleeps(), expected_sleeps);
    // a duplicate compensates a swallowed pulse; it never moves the estimate
    assert!((s.volume().unwrap() - 0.54).abs() < 1e-9);
}

#[rstest]
fn ramp_duplicates_only_the_first_pulse() {
    let clock = TestClock::new();
    let (s, log) = session(&clock, Some(0.0));
    s.step_volume_up().unwrap();
    clock.advance(Duration::from_millis(1700));

    let adj = s.set_volume(0.1).unwrap();
    assert_eq!(adj.pulses, 4);
    assert_eq!(adj.duplicates, 1);
    assert_eq!(log.count("UP"), 1 + 1 + 4);
    assert_eq!(clock.sleeps(), vec![Duration::from_millis(300)]);
}

#[rstest]
fn anchor_command_is_never_paced_but_resets_the_window() {
    let clock = TestClock::new();
    let (s, log) = session(&clock, None);
    s.step_volume_up().unwrap();
    clock.advance(Duration::from_millis(1900));

    // from unknown: absolute "A" then 5 up pulses, all within the new window
    let adj = s.set_volume(0.1).unwrap();
    assert_eq!(adj.duplicates, 0);
    assert!(clock.sleeps().is_empty());
    assert_eq!(log.sent(), vec!["UP", "A", "UP", "UP", "UP", "UP", "UP"]);
}

// Send 1 is a manual pulse; the ramp's first pulse lands in the band, so
// send 2 is its duplicate and send 3 its primary.
#[rstest]
#[case::duplicate_fails(2, 0.02, 4, 5)]
#[case::primary_after_duplicate_fails(3, 0.02, 4, 6)]
#[case::second_pulse_fails(4, 0.04, 3, 6)]
fn failure_around_duplicate_keeps_partial_estimate(
    #[case] fail_on: u64,
    #[case] estimate_after_error: f64,
    #[case] retry_pulses: u32,
    #[case] total_up: usize,
) {
    let clock = TestClock::new();
    let tx = RecordingTransmitter::new().fail_on(fail_on);
    let (s, log) = session_with(tx, &clock, Some(0.0));
    s.step_volume_up().unwrap();
    clock.advance(Duration::from_millis(1700));

    let err = s.set_volume(0.1).unwrap_err();
    assert!(
        err.downcast_ref::<IrError>()
            .is_some_and(IrError::is_transmit),
        "unexpected error: {err:?}"
    );
    assert!((s.volume().unwrap() - estimate_after_error).abs() < 1e-9);

    // the session stays usable and resumes from the partial estimate
    let adj = s.set_volume(0.1).unwrap();
    assert_eq!(adj.outcome, Outcome::Completed);
    assert_eq!(adj.pulses, retry_pulses);
    assert_eq!(adj.duplicates, 0);
    assert!((s.volume().unwrap() - 0.1).abs() < 1e-9);
    assert_eq!(log.count("UP"), total_up);
}
