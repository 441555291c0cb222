//! Runtime configuration consumed by the rig.
//!
//! These are separate from the TOML-deserialized structs in `rpmlab_config`;
//! see `conversions` for the mapping.

use crate::buffer::DEFAULT_MAX_SAMPLES;
use crate::estimator::MeasurementMode;
use crate::scheduler::{CAPTURE_INTERVAL_MS, REPORT_INTERVAL_MS};
use crate::staircase::{DEFAULT_HOLD_DURATION_MS, DEFAULT_STEP_DURATION_MS};

/// Encoder geometry, fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderCfg {
    pub pulses_per_rev: u32,
    /// Radius used for the linear-speed conversion, in metres.
    pub wheel_radius_m: f32,
    pub mode: MeasurementMode,
}

impl Default for EncoderCfg {
    fn default() -> Self {
        Self {
            pulses_per_rev: 20,
            wheel_radius_m: 0.03,
            mode: MeasurementMode::PulseWindow,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureCfg {
    pub interval_ms: u32,
    pub step_duration_ms: u32,
    pub hold_duration_ms: u32,
    pub max_samples: usize,
}

impl Default for CaptureCfg {
    fn default() -> Self {
        Self {
            interval_ms: CAPTURE_INTERVAL_MS,
            step_duration_ms: DEFAULT_STEP_DURATION_MS,
            hold_duration_ms: DEFAULT_HOLD_DURATION_MS,
            max_samples: DEFAULT_MAX_SAMPLES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportCfg {
    pub interval_ms: u32,
}

impl Default for ReportCfg {
    fn default() -> Self {
        Self {
            interval_ms: REPORT_INTERVAL_MS,
        }
    }
}
