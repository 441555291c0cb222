//! Simulated H-bridge motor with a first-order speed response.
//!
//! `SimulatedMotor` records what the driver writes; `SimulatedEncoder` runs
//! a background thread that integrates the speed model and fires the edge
//! callback the way a GPIO interrupt would.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU16, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use rpmlab_traits::clock::{Clock, ticks_diff};
use rpmlab_traits::{BridgeLevels, Motor};

/// Model step of the encoder thread.
const SIM_PERIOD: Duration = Duration::from_millis(1);

#[derive(Debug, Default)]
struct MotorShared {
    duty: AtomicU16,
    /// bit 0 = IN1, bit 1 = IN2
    bridge: AtomicU8,
}

/// Motor backend that only stores the commanded duty and bridge levels.
#[derive(Debug, Default)]
pub struct SimulatedMotor {
    shared: Arc<MotorShared>,
}

impl SimulatedMotor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view used by the encoder simulator and tests.
    pub fn handle(&self) -> SimMotorHandle {
        SimMotorHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Motor for SimulatedMotor {
    fn set_duty_u16(&mut self, duty: u16) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.shared.duty.store(duty, Ordering::Relaxed);
        tracing::trace!(duty, "sim duty");
        Ok(())
    }

    fn set_bridge(
        &mut self,
        levels: BridgeLevels,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let bits = u8::from(levels.in1) | (u8::from(levels.in2) << 1);
        self.shared.bridge.store(bits, Ordering::Relaxed);
        tracing::trace!(in1 = levels.in1, in2 = levels.in2, "sim bridge");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SimMotorHandle {
    shared: Arc<MotorShared>,
}

impl SimMotorHandle {
    pub fn duty_u16(&self) -> u16 {
        self.shared.duty.load(Ordering::Relaxed)
    }

    pub fn bridge(&self) -> BridgeLevels {
        let bits = self.shared.bridge.load(Ordering::Relaxed);
        BridgeLevels {
            in1: bits & 0b01 != 0,
            in2: bits & 0b10 != 0,
        }
    }

    /// Effective drive in `0.0..=1.0`: zero while the bridge coasts or is
    /// shorted, otherwise the duty fraction. Direction does not change the
    /// magnitude seen by a single-channel encoder.
    pub fn drive(&self) -> f32 {
        let b = self.bridge();
        if b.in1 == b.in2 {
            return 0.0;
        }
        f32::from(self.duty_u16()) / f32::from(u16::MAX)
    }
}

/// First-order speed response plus pulse generation.
#[derive(Debug, Clone, PartialEq)]
pub struct MotorModel {
    max_rpm: f32,
    time_constant_ms: f32,
    pulses_per_rev: u32,
    rpm: f32,
    /// Fractional pulses carried between steps.
    phase: f32,
}

impl MotorModel {
    pub fn new(max_rpm: f32, time_constant_ms: u32, pulses_per_rev: u32) -> Self {
        Self {
            max_rpm: max_rpm.max(0.0),
            time_constant_ms: time_constant_ms.max(1) as f32,
            pulses_per_rev: pulses_per_rev.max(1),
            rpm: 0.0,
            phase: 0.0,
        }
    }

    pub fn rpm(&self) -> f32 {
        self.rpm
    }

    /// Integrate `dt_ms` at `drive` and return the edges produced.
    pub fn advance(&mut self, dt_ms: f32, drive: f32) -> u32 {
        let target = self.max_rpm * drive.clamp(0.0, 1.0);
        let alpha = 1.0 - (-dt_ms / self.time_constant_ms).exp();
        self.rpm += (target - self.rpm) * alpha;
        self.phase += self.rpm * self.pulses_per_rev as f32 * dt_ms / 60_000.0;
        let edges = self.phase.floor();
        self.phase -= edges;
        edges as u32
    }
}

/// Background thread feeding simulated encoder edges.
///
/// The thread is stopped and joined when this value is dropped.
pub struct SimulatedEncoder {
    shutdown: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

impl SimulatedEncoder {
    /// `on_edge` receives the edge time in wrapping microseconds of `clock`.
    pub fn spawn<C, F>(motor: SimMotorHandle, mut model: MotorModel, clock: C, on_edge: F) -> Self
    where
        C: Clock + Send + 'static,
        F: Fn(u32) + Send + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);
        let join_handle = std::thread::spawn(move || {
            let mut last_us = clock.ticks_us();
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }
                let now_us = clock.ticks_us();
                let dt_ms = ticks_diff(now_us, last_us) as f32 / 1_000.0;
                last_us = now_us;
                for _ in 0..model.advance(dt_ms, motor.drive()) {
                    on_edge(now_us);
                }
                clock.sleep(SIM_PERIOD);
            }
            tracing::trace!("encoder simulator exiting");
        });
        Self {
            shutdown,
            join_handle: Some(join_handle),
        }
    }
}

impl Drop for SimulatedEncoder {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("encoder simulator thread panicked");
        }
    }
}
