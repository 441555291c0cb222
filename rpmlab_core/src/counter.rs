//! Interrupt-safe pulse counting.
//!
//! The edge callback only increments; the main control flow owns the
//! baseline and derives deltas. The only shared state is a handful of
//! atomics, so the handler never blocks and a read can never tear.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Sentinel for "no timestamped edge seen yet".
const NO_EDGE: u32 = u32::MAX;

#[derive(Debug, Default)]
struct Shared {
    count: AtomicU32,
    last_edge_us: AtomicU32,
    period_us: AtomicU32,
}

impl Shared {
    fn new() -> Self {
        Self {
            count: AtomicU32::new(0),
            last_edge_us: AtomicU32::new(NO_EDGE),
            period_us: AtomicU32::new(0),
        }
    }
}

/// Cloneable handle given to the edge source (GPIO interrupt or simulator).
#[derive(Debug, Clone)]
pub struct EdgeHandle {
    shared: Arc<Shared>,
}

impl EdgeHandle {
    /// Count one rising edge.
    #[inline]
    pub fn on_edge(&self) {
        self.shared.count.fetch_add(1, Ordering::Release);
    }

    /// Count one rising edge and record the period since the previous
    /// timestamped edge. `now_us` is a wrapping microsecond tick.
    ///
    /// Must only be called from a single edge source; the period bookkeeping
    /// assumes one writer.
    #[inline]
    pub fn on_edge_at(&self, now_us: u32) {
        let prev = self.shared.last_edge_us.swap(now_us, Ordering::AcqRel);
        if prev != NO_EDGE {
            self.shared
                .period_us
                .store(now_us.wrapping_sub(prev), Ordering::Release);
        }
        self.on_edge();
    }
}

/// Consumer side of the encoder counter. Exactly one owner derives deltas,
/// which `&mut self` on [`PulseCounter::take_delta`] enforces.
#[derive(Debug)]
pub struct PulseCounter {
    shared: Arc<Shared>,
    baseline: u32,
}

impl Default for PulseCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseCounter {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::new()),
            baseline: 0,
        }
    }

    /// Handle for the edge source. Any number may exist.
    pub fn edge_handle(&self) -> EdgeHandle {
        EdgeHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Same as `edge_handle().on_edge()`; handy in tests and simulations.
    pub fn on_edge(&self) {
        self.shared.count.fetch_add(1, Ordering::Release);
    }

    /// Raw running total (wraps at `u32::MAX`).
    pub fn total(&self) -> u32 {
        self.shared.count.load(Ordering::Acquire)
    }

    /// Pulses since the previous call (or since `reset_baseline`).
    ///
    /// A single atomic load snapshots the counter; an edge racing with the
    /// call lands either in this delta or the next one, never in neither.
    pub fn take_delta(&mut self) -> u32 {
        let now = self.shared.count.load(Ordering::Acquire);
        let delta = now.wrapping_sub(self.baseline);
        self.baseline = now;
        delta
    }

    /// Discard pulses accumulated so far, e.g. before a capture run.
    pub fn reset_baseline(&mut self) {
        self.baseline = self.shared.count.load(Ordering::Acquire);
    }

    /// Period between the last two timestamped edges, in microseconds.
    /// `None` until two timestamped edges have been seen.
    pub fn last_period_us(&self) -> Option<u32> {
        match self.shared.period_us.load(Ordering::Acquire) {
            0 => None,
            p => Some(p),
        }
    }

    /// Microsecond tick of the most recent timestamped edge.
    pub fn last_edge_us(&self) -> Option<u32> {
        match self.shared.last_edge_us.load(Ordering::Acquire) {
            NO_EDGE => None,
            t => Some(t),
        }
    }

    /// Forget the recorded edge period so a stopped motor reads 0 rpm.
    ///
    /// The last edge time is kept: the next edge measures its period
    /// against it.
    pub fn clear_period(&self) {
        self.shared.period_us.store(0, Ordering::Release);
    }

    #[cfg(test)]
    pub(crate) fn preload(&mut self, value: u32) {
        self.shared.count.store(value, Ordering::Release);
        self.baseline = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_survives_counter_wrap() {
        let mut c = PulseCounter::new();
        c.preload(u32::MAX - 2);
        for _ in 0..5 {
            c.on_edge();
        }
        assert_eq!(c.total(), 2);
        assert_eq!(c.take_delta(), 5);
    }

    #[test]
    fn reset_baseline_discards_pending() {
        let mut c = PulseCounter::new();
        let h = c.edge_handle();
        h.on_edge();
        h.on_edge();
        c.reset_baseline();
        assert_eq!(c.take_delta(), 0);
    }

    #[test]
    fn period_needs_two_timestamped_edges() {
        let c = PulseCounter::new();
        let h = c.edge_handle();
        h.on_edge_at(1_000);
        assert_eq!(c.last_period_us(), None);
        h.on_edge_at(4_000);
        assert_eq!(c.last_period_us(), Some(3_000));
        assert_eq!(c.last_edge_us(), Some(4_000));
        c.clear_period();
        assert_eq!(c.last_period_us(), None);
        assert_eq!(c.last_edge_us(), Some(4_000));
        h.on_edge_at(9_000);
        assert_eq!(c.last_period_us(), Some(5_000));
    }
}
