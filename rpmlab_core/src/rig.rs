//! The rig: one owned context tying the driver, counter, schedulers and
//! sequencer together, plus its type-state builder.
//!
//! Everything runs on the caller's thread through `handle` (one console
//! command) and `step` (one cooperative tick). The only state shared with
//! other threads is the pulse counter, fed through an [`EdgeHandle`], and
//! the cancel flag.

use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rpmlab_traits::Motor;
use rpmlab_traits::clock::{Clock, ticks_diff};

use crate::actuator::{Direction, MotorDriver, MotorState};
use crate::buffer::{Sample, SampleBuffer};
use crate::command::Command;
use crate::config::{CaptureCfg, EncoderCfg, ReportCfg};
use crate::counter::{EdgeHandle, PulseCounter};
use crate::error::{BuildError, Result, RigError, RigResult};
use crate::estimator::{RateEstimator, linear_speed_kmh};
use crate::report::{ReportSink, StatusLine};
use crate::scheduler::SamplingScheduler;
use crate::staircase::{CaptureKind, CapturePlan, LevelEvent, Sequencer, SequencerState};

/// Acknowledgement of a handled command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Nothing to acknowledge (blank line).
    Nothing,
    DutySet(u8),
    DirectionSet(Direction),
    Stopped,
    CaptureStarted(CaptureKind),
    /// `STOP` during a capture; the run ends on the next `step`.
    CancelRequested,
}

impl Reply {
    /// Console line for this reply, if any.
    pub fn message(&self) -> Option<String> {
        let text = match self {
            Reply::Nothing | Reply::DirectionSet(Direction::Unset) => return None,
            Reply::DutySet(p) => format!("PWM ajustado a: {p} %"),
            Reply::DirectionSet(Direction::Forward) => "Dirección: adelante.".to_string(),
            Reply::DirectionSet(Direction::Reverse) => "Dirección: atrás.".to_string(),
            Reply::Stopped => "Sistema detenido.".to_string(),
            Reply::CaptureStarted(CaptureKind::Staircase { step }) => {
                format!("Iniciando captura con incremento de PWM: {step}")
            }
            Reply::CaptureStarted(CaptureKind::Hold { duty }) => {
                format!("Iniciando captura a PWM fijo: {duty} %")
            }
            Reply::CancelRequested => "Deteniendo captura.".to_string(),
        };
        Some(text)
    }
}

/// Totals of a finished or cancelled run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub kind: CaptureKind,
    pub samples: usize,
    pub dropped: usize,
    pub elapsed_ms: u32,
}

/// What one `step` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigStatus {
    /// Nothing running and nothing to report.
    Idle,
    /// Continuous mode: duty > 0 and the status line is active.
    Reporting,
    /// A capture is running at this duty level.
    Capturing { level: u8 },
    /// The capture finished this step; the buffer has been flushed.
    Completed(RunReport),
    /// The capture was cancelled this step; the buffer has been flushed.
    Cancelled(RunReport),
}

enum RunEnd {
    Completed,
    Cancelled,
}

pub struct Rig {
    driver: MotorDriver<Box<dyn Motor>>,
    counter: PulseCounter,
    capture: SamplingScheduler,
    report: SamplingScheduler,
    buffer: SampleBuffer,
    sequencer: Sequencer,
    clock: Arc<dyn Clock + Send + Sync>,
    encoder: EncoderCfg,
    capture_cfg: CaptureCfg,
    /// Continuous status reporting enabled (cleared by STOP).
    active: bool,
    cancel: Arc<AtomicBool>,
}

impl core::fmt::Debug for Rig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Rig")
            .field("motor", &self.driver.state())
            .field("sequencer", &self.sequencer.state())
            .field("buffered", &self.buffer.len())
            .field("active", &self.active)
            .finish()
    }
}

impl Rig {
    /// Start building a Rig.
    pub fn builder() -> RigBuilder<Missing, Missing> {
        RigBuilder::default()
    }

    /// Handle for the edge callback (GPIO interrupt or simulator thread).
    pub fn edge_handle(&self) -> EdgeHandle {
        self.counter.edge_handle()
    }

    /// Flag that cancels a running capture on the next `step`.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_capturing(&self) -> bool {
        self.sequencer.is_running()
    }

    pub fn sequencer_state(&self) -> SequencerState {
        self.sequencer.state()
    }

    pub fn motor_state(&self) -> MotorState {
        self.driver.state()
    }

    pub fn encoder(&self) -> &EncoderCfg {
        &self.encoder
    }

    /// Samples buffered by the current run.
    pub fn buffered(&self) -> &[Sample] {
        self.buffer.as_slice()
    }

    pub fn total_pulses(&self) -> u32 {
        self.counter.total()
    }

    fn reporting(&self) -> bool {
        self.active && self.driver.duty_percent() > 0
    }

    /// Apply one console command.
    ///
    /// While a capture runs the sequencer owns the duty, so everything but
    /// `STOP` and blank lines is refused with `CaptureInProgress`.
    pub fn handle(&mut self, cmd: Command) -> RigResult<Reply> {
        if self.is_capturing() {
            return match cmd {
                Command::Empty => Ok(Reply::Nothing),
                Command::Stop => {
                    self.cancel();
                    Ok(Reply::CancelRequested)
                }
                _ => Err(RigError::CaptureInProgress),
            };
        }
        match cmd {
            Command::Empty => Ok(Reply::Nothing),
            Command::Pwm(p) => self.set_pwm(p).map(Reply::DutySet),
            Command::Start(step) => self.start_capture(step),
            Command::Stop => {
                self.driver.stop()?;
                self.active = false;
                tracing::info!("system stopped");
                Ok(Reply::Stopped)
            }
            Command::Direction(dir) => {
                self.driver.set_direction(dir)?;
                Ok(Reply::DirectionSet(dir))
            }
        }
    }

    /// Manual duty from the console. Out-of-range values are rejected
    /// before the driver is touched.
    fn set_pwm(&mut self, percent: i32) -> RigResult<u8> {
        if !(0..=100).contains(&percent) {
            return Err(RigError::invalid(format!(
                "duty must be in 0..=100, got {percent}"
            )));
        }
        let was_reporting = self.reporting();
        let applied = self.driver.set_duty(percent)?;
        self.active = true;
        if !was_reporting && self.reporting() {
            let now = self.clock.ticks_ms();
            self.report.restart(now, &mut self.counter);
        }
        tracing::info!(duty_percent = applied, "duty set");
        Ok(applied)
    }

    /// Begin a staircase capture with step increment `step`.
    pub fn start_capture(&mut self, step: i32) -> RigResult<Reply> {
        if self.is_capturing() {
            return Err(RigError::CaptureInProgress);
        }
        let plan = CapturePlan::staircase(step, self.capture_cfg.step_duration_ms)?;
        self.begin_plan(plan)
    }

    /// Begin a fixed-duty capture. `duration_ms` of `None` uses the
    /// configured hold duration.
    pub fn start_hold(&mut self, duty: i32, duration_ms: Option<u32>) -> RigResult<Reply> {
        if self.is_capturing() {
            return Err(RigError::CaptureInProgress);
        }
        let ms = duration_ms.unwrap_or(self.capture_cfg.hold_duration_ms);
        let plan = CapturePlan::hold(duty, ms)?;
        self.begin_plan(plan)
    }

    fn begin_plan(&mut self, plan: CapturePlan) -> RigResult<Reply> {
        let kind = plan.kind;
        let levels = plan.levels.len();
        let total_ms = plan.total_ms();
        let now = self.clock.ticks_ms();
        self.buffer.clear();
        self.cancel.store(false, Ordering::SeqCst);
        let first = self.sequencer.begin(plan, now)?;
        if let Err(e) = self.driver.set_duty(i32::from(first)) {
            self.sequencer.cancel();
            return Err(e);
        }
        self.capture.restart(now, &mut self.counter);
        self.active = false;
        tracing::info!(?kind, levels, total_ms, "capture start");
        Ok(Reply::CaptureStarted(kind))
    }

    /// One cooperative tick: sample if due, move to the next level when its
    /// dwell has elapsed, flush at the end of a run, or emit the continuous
    /// status line.
    pub fn step(&mut self, sink: &mut dyn ReportSink) -> RigResult<RigStatus> {
        let now = self.clock.ticks_ms();
        if self.sequencer.is_running() {
            if self.cancel.swap(false, Ordering::SeqCst) {
                return self.finish_run(now, sink, RunEnd::Cancelled);
            }
            let duty = self.driver.duty_percent();
            self.capture
                .tick(now, &mut self.counter, duty, &mut self.buffer);
            return match self.sequencer.advance(now) {
                LevelEvent::Hold(level) => Ok(RigStatus::Capturing { level }),
                LevelEvent::Next(level) => {
                    if let Err(e) = self.driver.set_duty(i32::from(level)) {
                        self.abort_run();
                        return Err(e);
                    }
                    tracing::debug!(duty_percent = level, t_ms = ticks_diff(now, self.capture.run_start_ms()), "level");
                    Ok(RigStatus::Capturing { level })
                }
                LevelEvent::Finished => self.finish_run(now, sink, RunEnd::Completed),
            };
        }

        if !self.reporting() {
            return Ok(RigStatus::Idle);
        }
        let duty = self.driver.duty_percent();
        if let Some(sample) = self.report.poll(now, &mut self.counter, duty) {
            let status = StatusLine {
                duty_percent: duty,
                rpm: sample.rpm,
                speed_kmh: linear_speed_kmh(sample.rpm, self.encoder.wheel_radius_m),
            };
            sink.status(&status).map_err(io_error)?;
        }
        Ok(RigStatus::Reporting)
    }

    /// Stop the motor, flush the buffer, and return to Idle.
    fn finish_run(
        &mut self,
        now: u32,
        sink: &mut dyn ReportSink,
        end: RunEnd,
    ) -> RigResult<RigStatus> {
        self.sequencer.cancel();
        if let Err(e) = self.driver.stop() {
            tracing::warn!(error = %e, "motor stop failed at end of capture");
        }
        let kind = self
            .sequencer
            .plan()
            .map_or(CaptureKind::Staircase { step: 0 }, |p| p.kind);
        let report = RunReport {
            kind,
            samples: self.buffer.len(),
            dropped: self.buffer.dropped(),
            elapsed_ms: ticks_diff(now, self.capture.run_start_ms()),
        };
        let flushed = flush(&self.buffer, sink, &end);
        self.buffer.clear();
        self.report.restart(now, &mut self.counter);
        self.active = false;
        match end {
            RunEnd::Completed => {
                tracing::info!(samples = report.samples, dropped = report.dropped, elapsed_ms = report.elapsed_ms, "capture complete");
            }
            RunEnd::Cancelled => {
                tracing::info!(samples = report.samples, elapsed_ms = report.elapsed_ms, "capture cancelled");
            }
        }
        flushed.map_err(io_error)?;
        Ok(match end {
            RunEnd::Completed => RigStatus::Completed(report),
            RunEnd::Cancelled => RigStatus::Cancelled(report),
        })
    }

    /// Hardware failure mid-run: best-effort stop, samples discarded.
    fn abort_run(&mut self) {
        self.sequencer.cancel();
        if let Err(e) = self.driver.stop() {
            tracing::warn!(error = %e, "motor stop failed after hardware error");
        }
        tracing::error!(discarded = self.buffer.len(), "capture aborted");
        self.buffer.clear();
    }

    /// Sleep on the rig's clock between cooperative ticks.
    pub fn pause(&self, d: Duration) {
        self.clock.sleep(d);
    }

    /// Duty to 0 regardless of mode (shutdown path).
    pub fn stop_motor(&mut self) -> RigResult<()> {
        self.active = false;
        self.driver.stop()
    }
}

fn flush(buffer: &SampleBuffer, sink: &mut dyn ReportSink, end: &RunEnd) -> std::io::Result<()> {
    sink.header()?;
    for s in buffer.iter() {
        sink.sample(s)?;
    }
    match end {
        RunEnd::Completed => sink.completed(),
        RunEnd::Cancelled => sink.cancelled(),
    }
}

fn io_error(e: std::io::Error) -> RigError {
    RigError::Sink(e.to_string())
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Rig`. Motor and clock are required; everything else has
/// defaults. All values are validated on `build()`.
pub struct RigBuilder<M, C> {
    motor: Option<Box<dyn Motor>>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    counter: Option<PulseCounter>,
    encoder: Option<EncoderCfg>,
    capture: Option<CaptureCfg>,
    report: Option<ReportCfg>,
    _m: PhantomData<M>,
    _c: PhantomData<C>,
}

impl Default for RigBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            motor: None,
            clock: None,
            counter: None,
            encoder: None,
            capture: None,
            report: None,
            _m: PhantomData,
            _c: PhantomData,
        }
    }
}

impl<M, C> RigBuilder<M, C> {
    pub fn with_encoder(mut self, encoder: EncoderCfg) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn with_capture(mut self, capture: CaptureCfg) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn with_report(mut self, report: ReportCfg) -> Self {
        self.report = Some(report);
        self
    }

    /// Use an existing counter, e.g. one whose edge handle is already wired
    /// to an interrupt.
    pub fn with_counter(mut self, counter: PulseCounter) -> Self {
        self.counter = Some(counter);
        self
    }

    fn retype<M2, C2>(self) -> RigBuilder<M2, C2> {
        RigBuilder {
            motor: self.motor,
            clock: self.clock,
            counter: self.counter,
            encoder: self.encoder,
            capture: self.capture,
            report: self.report,
            _m: PhantomData,
            _c: PhantomData,
        }
    }

    /// Build with runtime checks only; available in every builder state.
    pub fn try_build(self) -> Result<Rig> {
        let motor = self
            .motor
            .ok_or_else(|| eyre::Report::new(BuildError::MissingMotor))?;
        let clock = self
            .clock
            .ok_or_else(|| eyre::Report::new(BuildError::MissingClock))?;
        let encoder = self.encoder.unwrap_or_default();
        let capture_cfg = self.capture.unwrap_or_default();
        let report_cfg = self.report.unwrap_or_default();
        validate(&encoder, &capture_cfg, &report_cfg).map_err(eyre::Report::new)?;

        let estimator = RateEstimator::new(encoder.pulses_per_rev);
        let mut counter = self.counter.unwrap_or_default();
        let now = clock.ticks_ms();
        let mut capture = SamplingScheduler::new(capture_cfg.interval_ms, estimator, encoder.mode);
        let mut report = SamplingScheduler::new(report_cfg.interval_ms, estimator, encoder.mode);
        capture.restart(now, &mut counter);
        report.restart(now, &mut counter);

        tracing::debug!(
            pulses_per_rev = encoder.pulses_per_rev,
            wheel_radius_m = encoder.wheel_radius_m,
            capture_interval_ms = capture_cfg.interval_ms,
            report_interval_ms = report_cfg.interval_ms,
            max_samples = capture_cfg.max_samples,
            "rig built"
        );

        Ok(Rig {
            driver: MotorDriver::new(motor),
            counter,
            capture,
            report,
            buffer: SampleBuffer::with_capacity(capture_cfg.max_samples),
            sequencer: Sequencer::new(),
            clock,
            encoder,
            capture_cfg,
            active: false,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }
}

fn validate(
    encoder: &EncoderCfg,
    capture: &CaptureCfg,
    report: &ReportCfg,
) -> std::result::Result<(), BuildError> {
    if encoder.pulses_per_rev == 0 {
        return Err(BuildError::InvalidConfig("pulses_per_rev must be >= 1"));
    }
    if !(encoder.wheel_radius_m.is_finite() && encoder.wheel_radius_m > 0.0) {
        return Err(BuildError::InvalidConfig("wheel_radius_m must be > 0"));
    }
    if capture.interval_ms == 0 {
        return Err(BuildError::InvalidConfig("capture interval must be >= 1 ms"));
    }
    if capture.step_duration_ms == 0 || capture.hold_duration_ms == 0 {
        return Err(BuildError::InvalidConfig("capture durations must be >= 1 ms"));
    }
    if capture.step_duration_ms < capture.interval_ms {
        return Err(BuildError::InvalidConfig(
            "step duration must be >= capture interval",
        ));
    }
    if capture.max_samples == 0 {
        return Err(BuildError::InvalidConfig("max_samples must be >= 1"));
    }
    if report.interval_ms == 0 {
        return Err(BuildError::InvalidConfig("report interval must be >= 1 ms"));
    }
    Ok(())
}

impl<C> RigBuilder<Missing, C> {
    pub fn with_motor(self, motor: impl Motor + 'static) -> RigBuilder<Set, C> {
        let mut next = self.retype::<Set, C>();
        next.motor = Some(Box::new(motor));
        next
    }
}

impl<M> RigBuilder<M, Missing> {
    pub fn with_clock(self, clock: impl Clock + Send + Sync + 'static) -> RigBuilder<M, Set> {
        let mut next = self.retype::<M, Set>();
        next.clock = Some(Arc::new(clock));
        next
    }
}

impl RigBuilder<Set, Set> {
    /// Build a Rig. Only available once motor and clock are set.
    pub fn build(self) -> Result<Rig> {
        self.try_build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{FailingMotor, NullMotor, RecordingMotor};
    use crate::report::TextReport;
    use rpmlab_traits::ManualClock;

    fn rig_with(clock: &ManualClock) -> Rig {
        Rig::builder()
            .with_motor(NullMotor)
            .with_clock(clock.clone())
            .with_capture(CaptureCfg {
                step_duration_ms: 20,
                ..CaptureCfg::default()
            })
            .build()
            .unwrap()
    }

    #[test]
    fn try_build_reports_missing_parts() {
        let err = Rig::builder().try_build().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::MissingMotor)
        ));
        let err = Rig::builder().with_motor(NullMotor).try_build().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::MissingClock)
        ));
    }

    #[test]
    fn build_rejects_zero_radius() {
        let err = Rig::builder()
            .with_motor(NullMotor)
            .with_clock(ManualClock::new())
            .with_encoder(EncoderCfg {
                wheel_radius_m: 0.0,
                ..EncoderCfg::default()
            })
            .build()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::InvalidConfig(_))
        ));
    }

    #[test]
    fn pwm_out_of_range_leaves_motor_untouched() {
        let motor = RecordingMotor::default();
        let log = motor.log();
        let mut rig = Rig::builder()
            .with_motor(motor)
            .with_clock(ManualClock::new())
            .build()
            .unwrap();
        let err = rig.handle(Command::Pwm(150)).unwrap_err();
        assert!(matches!(err, RigError::InvalidArgument(_)));
        assert!(log.lock().unwrap().duty_writes.is_empty());
    }

    #[test]
    fn commands_refused_while_capturing() {
        let clock = ManualClock::new();
        let mut rig = rig_with(&clock);
        rig.handle(Command::Start(50)).unwrap();
        assert_eq!(
            rig.handle(Command::Start(10)),
            Err(RigError::CaptureInProgress)
        );
        assert_eq!(rig.handle(Command::Pwm(10)), Err(RigError::CaptureInProgress));
        assert_eq!(rig.handle(Command::Empty), Ok(Reply::Nothing));
    }

    #[test]
    fn stop_during_capture_cancels_and_flushes() {
        let clock = ManualClock::new();
        let mut rig = rig_with(&clock);
        let mut sink = TextReport::new(Vec::new());
        rig.handle(Command::Start(50)).unwrap();
        clock.advance_ms(8);
        rig.step(&mut sink).unwrap();
        assert_eq!(rig.handle(Command::Stop), Ok(Reply::CancelRequested));
        let status = rig.step(&mut sink).unwrap();
        assert!(matches!(status, RigStatus::Cancelled(r) if r.samples == 1));
        assert!(!rig.is_capturing());
        assert_eq!(rig.motor_state().duty_percent, 0);
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert!(text.ends_with("Secuencia cancelada.\n"));
        assert!(!text.contains("Secuencia completada."));
    }

    #[test]
    fn hardware_failure_at_start_leaves_rig_idle() {
        let mut rig = Rig::builder()
            .with_motor(FailingMotor)
            .with_clock(ManualClock::new())
            .build()
            .unwrap();
        let err = rig.start_capture(20).unwrap_err();
        assert!(matches!(err, RigError::Hardware(_)));
        assert!(!rig.is_capturing());
    }

    #[test]
    fn reply_messages() {
        assert_eq!(
            Reply::DutySet(40).message().as_deref(),
            Some("PWM ajustado a: 40 %")
        );
        assert_eq!(Reply::Nothing.message(), None);
    }
}
