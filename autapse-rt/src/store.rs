//! Fixed-capacity sample storage. Stores never grow after construction, so
//! appending from the tick path cannot allocate.

use crate::error::{AutapseError, AutapseResult};

/// One acquired tick: (elapsed s, voltage mV, logged conductance nS, current A).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    pub time: f64,
    pub voltage: f64,
    pub conductance: f64,
    pub current: f64,
}

pub trait SampleStore {
    /// Append without reallocating; `BufferFull` once capacity is reached.
    fn push(&mut self, sample: Sample) -> AutapseResult<()>;
    fn clear(&mut self);
    fn as_slice(&self) -> &[Sample];
    fn capacity(&self) -> usize;

    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

/// Heap buffer reserved once up front.
#[derive(Debug, Clone)]
pub struct VecStore {
    samples: Vec<Sample>,
    limit: usize,
}

impl VecStore {
    pub fn with_capacity(limit: usize) -> Self {
        Self {
            samples: Vec::with_capacity(limit),
            limit,
        }
    }
}

impl SampleStore for VecStore {
    #[inline]
    fn push(&mut self, sample: Sample) -> AutapseResult<()> {
        if self.samples.len() >= self.limit {
            return Err(AutapseError::BufferFull);
        }
        self.samples.push(sample);
        Ok(())
    }

    fn clear(&mut self) {
        self.samples.clear();
    }

    fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    fn capacity(&self) -> usize {
        self.limit
    }
}

#[cfg(feature = "embedded")]
impl<const N: usize> SampleStore for heapless::Vec<Sample, N> {
    #[inline]
    fn push(&mut self, sample: Sample) -> AutapseResult<()> {
        heapless::Vec::push(self, sample).map_err(|_| AutapseError::BufferFull)
    }

    fn clear(&mut self) {
        heapless::Vec::clear(self);
    }

    fn as_slice(&self) -> &[Sample] {
        self
    }

    fn capacity(&self) -> usize {
        N
    }
}
