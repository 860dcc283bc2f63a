use std::sync::Arc;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use irvol_core::mocks::RecordingTransmitter;
use irvol_core::{
    Action, CalibrationTable, Command, ConfigCodebook, DeviceSession, DeviceState, Plan,
};
use irvol_traits::clock::test_clock::TestClock;

// Dense calibration: one anchor every 5 absolute units over 0..100
fn dense_table() -> CalibrationTable {
    let levels = (0..=20)
        .map(|i| (f64::from(i) * 5.0, Command::new(format!("ABS{i}"))))
        .collect();
    CalibrationTable::new(0.0, 100.0, 1.0, levels, Some(30.0)).unwrap()
}

fn bench_nearest_anchor(c: &mut Criterion) {
    let table = dense_table();
    c.bench_function("nearest_anchor/21_anchors", |b| {
        let mut t = 0.0f64;
        b.iter(|| {
            t = (t + 0.137) % 1.0;
            black_box(table.nearest_anchor(black_box(t), Some(0.42)));
        })
    });
}

fn bench_plan(c: &mut Criterion) {
    let table = dense_table();
    c.bench_function("plan/compute", |b| {
        b.iter(|| black_box(Plan::compute(&table, black_box(0.731), black_box(Some(0.2)))))
    });
}

fn bench_set_volume(c: &mut Criterion) {
    c.bench_function("session/set_volume_ramp", |b| {
        b.iter_batched(
            || {
                DeviceSession::builder()
                    .with_transmitter(RecordingTransmitter::new())
                    .with_codebook(
                        ConfigCodebook::new()
                            .with(Action::VolumeUp, Command::new("UP"))
                            .with(Action::VolumeDown, Command::new("DN")),
                    )
                    .with_calibration(dense_table())
                    .with_clock(Arc::new(TestClock::new()))
                    .with_initial_state(DeviceState {
                        volume: Some(0.0),
                        ..DeviceState::default()
                    })
                    .build()
                    .unwrap()
            },
            |s| black_box(s.set_volume(0.02).unwrap()),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_nearest_anchor, bench_plan, bench_set_volume);
criterion_main!(benches);
