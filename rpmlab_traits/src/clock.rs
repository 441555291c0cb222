use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Wrapping millisecond time base shared by the scheduler and sequencer.
///
/// - ticks_ms(): a monotonic millisecond counter that wraps at `u32::MAX`
/// - ticks_us(): the same in microseconds, also wrapping
/// - sleep(): sleeps for the provided duration (implementations may simulate)
///
/// Consumers must compare ticks with [`ticks_diff`], never with `<`/`>`.
pub trait Clock {
    fn ticks_ms(&self) -> u32;
    fn ticks_us(&self) -> u32;
    fn sleep(&self, d: Duration);
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn ticks_ms(&self) -> u32 {
        (**self).ticks_ms()
    }
    fn ticks_us(&self) -> u32 {
        (**self).ticks_us()
    }
    fn sleep(&self, d: Duration) {
        (**self).sleep(d);
    }
}

/// Elapsed ticks from `earlier` to `later`, correct across one wraparound.
#[inline]
pub fn ticks_diff(later: u32, earlier: u32) -> u32 {
    later.wrapping_sub(earlier)
}

/// Default, real-time monotonic clock backed by std::time::Instant.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn ticks_ms(&self) -> u32 {
        // Truncation is the wraparound.
        self.origin.elapsed().as_millis() as u32
    }

    #[inline]
    fn ticks_us(&self) -> u32 {
        self.origin.elapsed().as_micros() as u32
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

/// Deterministic clock whose time only moves when advanced.
///
/// sleep(d) advances internal time by d without actually sleeping, so a
/// cooperative loop driven by this clock runs as fast as the CPU allows.
/// Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start at an arbitrary tick, e.g. just before the wrap point.
    pub fn starting_at_ms(ms: u32) -> Self {
        let clock = Self::new();
        clock.set_ms(ms);
        clock
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, d: Duration) {
        let us = u64::try_from(d.as_micros()).unwrap_or(u64::MAX);
        self.micros.fetch_add(us, Ordering::Relaxed);
    }

    pub fn advance_ms(&self, ms: u32) {
        self.micros.fetch_add(u64::from(ms) * 1_000, Ordering::Relaxed);
    }

    /// Set the absolute time in milliseconds.
    pub fn set_ms(&self, ms: u32) {
        self.micros.store(u64::from(ms) * 1_000, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn ticks_ms(&self) -> u32 {
        (self.micros.load(Ordering::Relaxed) / 1_000) as u32
    }

    fn ticks_us(&self) -> u32 {
        self.micros.load(Ordering::Relaxed) as u32
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}
