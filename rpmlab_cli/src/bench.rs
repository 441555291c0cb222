//! Wires a [`Rig`] to either the simulator or the Raspberry Pi GPIO.

use eyre::WrapErr;
use rpmlab_config::Config;
use rpmlab_core::Rig;
use rpmlab_core::config::{CaptureCfg, EncoderCfg, ReportCfg};
use rpmlab_traits::clock::MonotonicClock;

/// Keeps the edge source alive for as long as the rig runs.
enum EdgeSource {
    Sim(#[allow(dead_code)] rpmlab_hardware::SimulatedEncoder),
    #[cfg(feature = "hardware")]
    Gpio(#[allow(dead_code)] rpmlab_hardware::hardware::HardwareEncoder),
}

pub struct Bench {
    pub rig: Rig,
    edges: EdgeSource,
}

impl Bench {
    pub fn backend(&self) -> &'static str {
        match self.edges {
            EdgeSource::Sim(_) => "sim",
            #[cfg(feature = "hardware")]
            EdgeSource::Gpio(_) => "gpio",
        }
    }
}

/// Optional per-run overrides from the command line.
#[derive(Debug, Default, Clone, Copy)]
pub struct Overrides {
    pub step_duration_ms: Option<u32>,
}

fn capture_cfg(cfg: &Config, ov: Overrides) -> CaptureCfg {
    let mut capture = CaptureCfg::from(&cfg.capture);
    if let Some(ms) = ov.step_duration_ms {
        capture.step_duration_ms = ms;
    }
    capture
}

#[cfg(not(feature = "hardware"))]
pub fn assemble(cfg: &Config, ov: Overrides) -> eyre::Result<Bench> {
    assemble_sim(cfg, ov)
}

#[cfg(feature = "hardware")]
pub fn assemble(cfg: &Config, ov: Overrides) -> eyre::Result<Bench> {
    use rpmlab_hardware::hardware::{HardwareEncoder, HardwareMotor};

    let pins = &cfg.pins;
    let motor = HardwareMotor::try_new(pins.ena, pins.in1, pins.in2, cfg.pwm.frequency_hz)
        .wrap_err("open motor pins")?;
    let rig = Rig::builder()
        .with_motor(motor)
        .with_clock(MonotonicClock::new())
        .with_encoder(EncoderCfg::from(&cfg.encoder))
        .with_capture(capture_cfg(cfg, ov))
        .with_report(ReportCfg::from(&cfg.report))
        .build()
        .wrap_err("build rig")?;
    let edge = rig.edge_handle();
    let encoder = HardwareEncoder::try_new(pins.encoder, move |us| edge.on_edge_at(us))
        .wrap_err("open encoder pin")?;
    tracing::info!(
        ena = pins.ena,
        in1 = pins.in1,
        in2 = pins.in2,
        encoder = pins.encoder,
        "GPIO rig ready"
    );
    Ok(Bench {
        rig,
        edges: EdgeSource::Gpio(encoder),
    })
}

#[cfg_attr(feature = "hardware", allow(dead_code))]
pub fn assemble_sim(cfg: &Config, ov: Overrides) -> eyre::Result<Bench> {
    use rpmlab_hardware::{MotorModel, SimulatedEncoder, SimulatedMotor};

    let clock = MonotonicClock::new();
    let motor = SimulatedMotor::new();
    let handle = motor.handle();
    let rig = Rig::builder()
        .with_motor(motor)
        .with_clock(clock)
        .with_encoder(EncoderCfg::from(&cfg.encoder))
        .with_capture(capture_cfg(cfg, ov))
        .with_report(ReportCfg::from(&cfg.report))
        .build()
        .wrap_err("build rig")?;
    let edge = rig.edge_handle();
    let model = MotorModel::new(
        cfg.sim.max_rpm,
        cfg.sim.time_constant_ms,
        cfg.encoder.pulses_per_rev,
    );
    let encoder = SimulatedEncoder::spawn(handle, model, clock, move |us| edge.on_edge_at(us));
    tracing::info!(
        max_rpm = cfg.sim.max_rpm,
        time_constant_ms = cfg.sim.time_constant_ms,
        "simulated rig ready"
    );
    Ok(Bench {
        rig,
        edges: EdgeSource::Sim(encoder),
    })
}
