//! Pulse-rate to speed conversions.
//!
//! Two estimators are provided:
//! - pulse window: pulses counted over a known elapsed time (the default,
//!   used by the staircase capture and the continuous status line);
//! - edge period: time between the two most recent edges, which reacts
//!   faster at low speed but is noisier.
//!
//! Linear speed always uses the full circumference formula
//! `v = 2π · r · rpm / 60` (m/s), reported in km/h.

use std::f32::consts::PI;

use crate::util::MILLIS_PER_MIN;

/// Which estimator the scheduler feeds its samples from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeasurementMode {
    #[default]
    PulseWindow,
    EdgePeriod,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateEstimator {
    pulses_per_rev: u32,
}

impl RateEstimator {
    /// `pulses_per_rev` is clamped to at least 1.
    pub fn new(pulses_per_rev: u32) -> Self {
        Self {
            pulses_per_rev: pulses_per_rev.max(1),
        }
    }

    pub fn pulses_per_rev(&self) -> u32 {
        self.pulses_per_rev
    }

    /// RPM from `delta_pulses` counted over `elapsed_ms`.
    ///
    /// `rpm = (delta / ppr) * (60000 / elapsed_ms)`. An `elapsed_ms` of 0 has
    /// no meaningful rate and yields 0.0.
    #[inline]
    pub fn estimate(&self, delta_pulses: u32, elapsed_ms: u32) -> f32 {
        if elapsed_ms == 0 {
            return 0.0;
        }
        let revs = delta_pulses as f32 / self.pulses_per_rev as f32;
        revs * (MILLIS_PER_MIN as f32 / elapsed_ms as f32)
    }

    /// RPM from the period between two consecutive edges.
    #[inline]
    pub fn estimate_from_period(&self, period_us: u32) -> f32 {
        if period_us == 0 {
            return 0.0;
        }
        let revs_per_sec = 1e6_f32 / period_us as f32 / self.pulses_per_rev as f32;
        revs_per_sec * 60.0
    }
}

/// Linear speed in km/h of a wheel of radius `wheel_radius_m` turning at `rpm`.
#[inline]
pub fn linear_speed_kmh(rpm: f32, wheel_radius_m: f32) -> f32 {
    let mps = 2.0 * PI * wheel_radius_m * rpm / 60.0;
    mps * 3.6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_scenario_gives_sixty_rpm() {
        let est = RateEstimator::new(20);
        assert!((est.estimate(10, 500) - 60.0).abs() < 1e-4);
    }

    #[test]
    fn zero_pulses_or_zero_window_is_zero() {
        let est = RateEstimator::new(20);
        assert_eq!(est.estimate(0, 4), 0.0);
        assert_eq!(est.estimate(7, 0), 0.0);
        assert_eq!(est.estimate_from_period(0), 0.0);
    }

    #[test]
    fn period_estimate_matches_window_estimate() {
        let est = RateEstimator::new(20);
        // 20 pulses per second -> 1 rev/s -> 60 rpm
        assert!((est.estimate_from_period(50_000) - 60.0).abs() < 1e-3);
        assert!((est.estimate(20, 1_000) - 60.0).abs() < 1e-3);
    }

    #[test]
    fn linear_speed_uses_circumference() {
        // r = 0.03 m, 60 rpm -> 2π·0.03 m/s ≈ 0.18850 m/s ≈ 0.67858 km/h
        let v = linear_speed_kmh(60.0, 0.03);
        assert!((v - 0.678_584).abs() < 1e-4, "got {v}");
        assert_eq!(linear_speed_kmh(0.0, 0.03), 0.0);
    }
}
