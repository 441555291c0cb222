//! Fixed-cadence sampling driven by a cooperative `tick(now)`.
//!
//! The scheduler never sleeps; the caller invokes `tick` as often as it can
//! and the scheduler decides whether a sampling window has closed. All time
//! arithmetic is wrapping so a millisecond counter overflow is harmless.

use rpmlab_traits::clock::ticks_diff;

use crate::buffer::{Sample, SampleBuffer};
use crate::counter::PulseCounter;
use crate::estimator::{MeasurementMode, RateEstimator};

/// Sample period of the staircase capture.
pub const CAPTURE_INTERVAL_MS: u32 = 4;
/// Period of the continuous status line.
pub const REPORT_INTERVAL_MS: u32 = 500;

/// Result of one `tick`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The sampling window has not closed yet.
    Idle,
    /// A sample was taken and stored.
    Sampled(Sample),
    /// A sample was taken but the buffer was full.
    Dropped(Sample),
}

impl TickOutcome {
    pub fn sample(&self) -> Option<Sample> {
        match self {
            TickOutcome::Idle => None,
            TickOutcome::Sampled(s) | TickOutcome::Dropped(s) => Some(*s),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SamplingScheduler {
    interval_ms: u32,
    last_sample_ms: u32,
    run_start_ms: u32,
    estimator: RateEstimator,
    mode: MeasurementMode,
    /// Time since the last window that saw an edge (edge-period mode).
    quiet_ms: u32,
}

impl SamplingScheduler {
    /// `interval_ms` is clamped to at least 1 so the estimator never sees a
    /// zero-length window.
    pub fn new(interval_ms: u32, estimator: RateEstimator, mode: MeasurementMode) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            last_sample_ms: 0,
            run_start_ms: 0,
            estimator,
            mode,
            quiet_ms: 0,
        }
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    pub fn estimator(&self) -> &RateEstimator {
        &self.estimator
    }

    pub fn mode(&self) -> MeasurementMode {
        self.mode
    }

    pub fn run_start_ms(&self) -> u32 {
        self.run_start_ms
    }

    /// Anchor a new run at `now_ms` and discard pulses counted before it.
    pub fn restart(&mut self, now_ms: u32, counter: &mut PulseCounter) {
        self.run_start_ms = now_ms;
        self.last_sample_ms = now_ms;
        self.quiet_ms = 0;
        counter.reset_baseline();
    }

    /// True once `interval_ms` has elapsed since the last sample.
    #[inline]
    pub fn is_due(&self, now_ms: u32) -> bool {
        ticks_diff(now_ms, self.last_sample_ms) >= self.interval_ms
    }

    /// Take a measurement without storing it (continuous reporting).
    /// Returns `None` while the window is still open.
    pub fn poll(&mut self, now_ms: u32, counter: &mut PulseCounter, duty_percent: u8) -> Option<Sample> {
        if !self.is_due(now_ms) {
            return None;
        }
        Some(self.measure(now_ms, counter, duty_percent))
    }

    /// Take a measurement if due and append it to `buffer`.
    pub fn tick(
        &mut self,
        now_ms: u32,
        counter: &mut PulseCounter,
        duty_percent: u8,
        buffer: &mut SampleBuffer,
    ) -> TickOutcome {
        if !self.is_due(now_ms) {
            return TickOutcome::Idle;
        }
        let sample = self.measure(now_ms, counter, duty_percent);
        match buffer.push(sample) {
            Ok(()) => {
                tracing::trace!(
                    t_ms = sample.timestamp_ms,
                    duty = sample.duty_percent,
                    rpm = sample.rpm,
                    "sample"
                );
                TickOutcome::Sampled(sample)
            }
            Err(_) => {
                if buffer.dropped() == 1 {
                    tracing::warn!(capacity = buffer.capacity(), "sample buffer full, dropping");
                }
                TickOutcome::Dropped(sample)
            }
        }
    }

    fn measure(&mut self, now_ms: u32, counter: &mut PulseCounter, duty_percent: u8) -> Sample {
        let elapsed_ms = ticks_diff(now_ms, self.last_sample_ms);
        let delta = counter.take_delta();
        let rpm = match self.mode {
            MeasurementMode::PulseWindow => self.estimator.estimate(delta, elapsed_ms),
            MeasurementMode::EdgePeriod => self.edge_period_rpm(delta, elapsed_ms, counter),
        };
        self.last_sample_ms = now_ms;
        Sample {
            timestamp_ms: ticks_diff(now_ms, self.run_start_ms),
            duty_percent,
            rpm,
        }
    }

    /// Windows shorter than the edge period often see no edge at all; the
    /// last period still holds until twice that period passes without one.
    fn edge_period_rpm(&mut self, delta: u32, elapsed_ms: u32, counter: &PulseCounter) -> f32 {
        if delta > 0 {
            self.quiet_ms = 0;
        } else {
            self.quiet_ms = self.quiet_ms.saturating_add(elapsed_ms);
        }
        let Some(period_us) = counter.last_period_us() else {
            return 0.0;
        };
        if u64::from(self.quiet_ms) * 1_000 > 2 * u64::from(period_us) {
            counter.clear_period();
            return 0.0;
        }
        self.estimator.estimate_from_period(period_us)
    }
}
