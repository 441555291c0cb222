//! Bounded, insertion-ordered sample storage for one capture run.

use crate::error::{RigError, RigResult};

/// Default capacity: 20 s of capture at the 4 ms cadence.
pub const DEFAULT_MAX_SAMPLES: usize = 5_000;

/// One measurement. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Milliseconds since the start of the run.
    pub timestamp_ms: u32,
    pub duty_percent: u8,
    pub rpm: f32,
}

#[derive(Debug)]
pub struct SampleBuffer {
    samples: Vec<Sample>,
    capacity: usize,
    dropped: usize,
}

impl SampleBuffer {
    /// Storage is reserved up front so pushes never reallocate mid-run.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Append a sample. Once full, the sample is dropped (never overwriting
    /// older ones) and `BufferFull` is returned so the caller can count it.
    pub fn push(&mut self, sample: Sample) -> RigResult<()> {
        if self.samples.len() >= self.capacity {
            self.dropped = self.dropped.saturating_add(1);
            return Err(RigError::BufferFull);
        }
        self.samples.push(sample);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples rejected since the last `clear`.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    /// Logical reset; the allocation is kept for the next run.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.dropped = 0;
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_SAMPLES)
    }
}
