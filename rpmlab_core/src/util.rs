//! Common time and duty helpers for rpmlab_core.

/// Number of milliseconds in one minute.
pub const MILLIS_PER_MIN: u32 = 60_000;

/// Full-scale raw duty value of the PWM output.
pub const DUTY_FULL_SCALE: u32 = 65_535;

/// Clamp a requested duty percentage into `0..=100`.
#[inline]
pub fn clamp_percent(percent: i32) -> u8 {
    percent.clamp(0, 100) as u8
}

/// Map a duty percentage to the 16-bit hardware range, rounding to nearest.
///
/// `round(percent * 65535 / 100)` in integer arithmetic.
#[inline]
pub fn percent_to_u16(percent: u8) -> u16 {
    let p = u32::from(percent.min(100));
    ((p * DUTY_FULL_SCALE + 50) / 100) as u16
}
