//! # Drive Loop Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use comms_if::tc::Tc;
use rov_lib::{drive_ctrl::RecordingMotors, Rover, RoverParams};
use util::time::ManualClock;

fn inner_loop_tick(c: &mut Criterion) {
    let clock = Arc::new(ManualClock::new(0));
    let rover = Rover::new(
        RoverParams::default(),
        RecordingMotors::default(),
        clock.clone(),
    )
    .unwrap();
    rover.arm();
    rover.exec_tc(&Tc::ManualMode { enabled: true }).unwrap();

    c.bench_function("inner_loop_tick", |b| {
        b.iter(|| {
            // Keep the manual command fresh so the loop is never stopped
            rover
                .exec_tc(&Tc::manual_drive("forward", 60).unwrap())
                .unwrap();
            clock.advance(20);
            black_box(rover.inner_loop_tick())
        })
    });
}

criterion_group!(benches, inner_loop_tick);
criterion_main!(benches);
