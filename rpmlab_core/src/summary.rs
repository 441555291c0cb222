//! Per-level statistics of a recorded capture.

use crate::buffer::Sample;

/// One contiguous run of samples at the same duty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelSummary {
    pub duty_percent: u8,
    /// Timestamp of the first sample at this level.
    pub start_ms: u32,
    pub samples: usize,
    pub mean_rpm: f32,
    pub max_rpm: f32,
}

/// Group samples into contiguous same-duty levels, in order.
///
/// A staircase visits most duties twice (ascending and descending); those
/// stay separate entries.
pub fn summarize_levels(samples: &[Sample]) -> Vec<LevelSummary> {
    let mut out: Vec<LevelSummary> = Vec::new();
    let mut sum = 0.0f64;
    for s in samples {
        match out.last_mut() {
            Some(level) if level.duty_percent == s.duty_percent => {
                level.samples += 1;
                level.max_rpm = level.max_rpm.max(s.rpm);
                sum += f64::from(s.rpm);
                level.mean_rpm = (sum / level.samples as f64) as f32;
            }
            _ => {
                sum = f64::from(s.rpm);
                out.push(LevelSummary {
                    duty_percent: s.duty_percent,
                    start_ms: s.timestamp_ms,
                    samples: 1,
                    mean_rpm: s.rpm,
                    max_rpm: s.rpm,
                });
            }
        }
    }
    out
}
