//! `From` implementations bridging `rpmlab_config` types to `rpmlab_core` types.

use crate::buffer::Sample;
use crate::config::{CaptureCfg, EncoderCfg, ReportCfg};
use crate::estimator::MeasurementMode;

// ── EncoderCfg ───────────────────────────────────────────────────────────────

impl From<rpmlab_config::EncoderMode> for MeasurementMode {
    fn from(m: rpmlab_config::EncoderMode) -> Self {
        match m {
            rpmlab_config::EncoderMode::Window => MeasurementMode::PulseWindow,
            rpmlab_config::EncoderMode::Period => MeasurementMode::EdgePeriod,
        }
    }
}

impl From<&rpmlab_config::EncoderCfg> for EncoderCfg {
    fn from(c: &rpmlab_config::EncoderCfg) -> Self {
        Self {
            pulses_per_rev: c.pulses_per_rev,
            wheel_radius_m: c.wheel_radius_m,
            mode: c.mode.into(),
        }
    }
}

// ── CaptureCfg ───────────────────────────────────────────────────────────────

impl From<&rpmlab_config::CaptureCfg> for CaptureCfg {
    fn from(c: &rpmlab_config::CaptureCfg) -> Self {
        Self {
            interval_ms: c.interval_ms,
            step_duration_ms: c.step_duration_ms,
            hold_duration_ms: c.hold_duration_ms,
            max_samples: c.max_samples,
        }
    }
}

// ── ReportCfg ────────────────────────────────────────────────────────────────

impl From<&rpmlab_config::ReportCfg> for ReportCfg {
    fn from(c: &rpmlab_config::ReportCfg) -> Self {
        Self {
            interval_ms: c.interval_ms,
        }
    }
}

// ── Sample ───────────────────────────────────────────────────────────────────

impl From<&rpmlab_config::CaptureRow> for Sample {
    fn from(r: &rpmlab_config::CaptureRow) -> Self {
        Self {
            timestamp_ms: r.timestamp_ms,
            duty_percent: r.pwm_percent,
            rpm: r.rpm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_mode_maps_to_edge_period() {
        let c = rpmlab_config::EncoderCfg {
            pulses_per_rev: 40,
            wheel_radius_m: 0.05,
            mode: rpmlab_config::EncoderMode::Period,
        };
        let e = EncoderCfg::from(&c);
        assert_eq!(e.pulses_per_rev, 40);
        assert_eq!(e.mode, MeasurementMode::EdgePeriod);
    }
}
