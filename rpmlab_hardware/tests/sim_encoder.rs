use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use rpmlab_hardware::{MotorModel, SimulatedEncoder, SimulatedMotor};
use rpmlab_traits::clock::MonotonicClock;
use rpmlab_traits::{BridgeLevels, Motor};
use rstest::rstest;

fn counting_encoder(motor: &SimulatedMotor, edges: &Arc<AtomicU32>) -> SimulatedEncoder {
    let e = Arc::clone(edges);
    SimulatedEncoder::spawn(
        motor.handle(),
        MotorModel::new(6_000.0, 1, 20),
        MonotonicClock::new(),
        move |_us| {
            e.fetch_add(1, Ordering::Relaxed);
        },
    )
}

#[rstest]
fn edges_flow_while_driven_and_stop_on_drop() {
    let mut motor = SimulatedMotor::new();
    motor
        .set_bridge(BridgeLevels {
            in1: true,
            in2: false,
        })
        .unwrap();
    motor.set_duty_u16(u16::MAX).unwrap();

    let edges = Arc::new(AtomicU32::new(0));
    let enc = counting_encoder(&motor, &edges);
    std::thread::sleep(Duration::from_millis(100));
    drop(enc);

    let after_drop = edges.load(Ordering::Relaxed);
    assert!(after_drop > 0, "no edges generated");
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(edges.load(Ordering::Relaxed), after_drop);
}

#[rstest]
fn coasting_motor_produces_no_edges() {
    let mut motor = SimulatedMotor::new();
    motor.set_duty_u16(u16::MAX).unwrap();

    let edges = Arc::new(AtomicU32::new(0));
    let enc = counting_encoder(&motor, &edges);
    std::thread::sleep(Duration::from_millis(30));
    drop(enc);
    assert_eq!(edges.load(Ordering::Relaxed), 0);
}
