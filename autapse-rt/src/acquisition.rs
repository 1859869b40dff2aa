//! Acquisition buffer: per-tick samples of a recording, tagged with the cell
//! they belong to, handed to a [`RecordSink`] in one piece when the recording
//! stops.

use core::convert::Infallible;
use core::fmt;

use tracing::warn;

use crate::store::{Sample, SampleStore, VecStore};

/// Metadata passed along with the samples of a flushed recording.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordHeader<'a> {
    pub cell: u32,
    pub prefix: &'a str,
    pub info: &'a str,
    /// Tick period, s
    pub dt: f64,
    /// Samples lost because the store was full.
    pub dropped: u64,
}

/// Persistent storage for finished recordings. Called synchronously from the
/// tick that observes the end of a recording.
pub trait RecordSink {
    type Error: fmt::Display;

    fn write_record(&mut self, header: &RecordHeader<'_>, samples: &[Sample]) -> Result<(), Self::Error>;
}

/// Sink for hosts that do not persist anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RecordSink for NullSink {
    type Error = Infallible;

    fn write_record(&mut self, _header: &RecordHeader<'_>, _samples: &[Sample]) -> Result<(), Infallible> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AcquisitionBuffer<S: SampleStore = VecStore> {
    store: S,
    cell: u32,
    clock: f64,
    dropped: u64,
}

impl AcquisitionBuffer<VecStore> {
    pub fn with_capacity(cell: u32, capacity: usize) -> Self {
        Self::new(cell, VecStore::with_capacity(capacity))
    }
}

impl<S: SampleStore> AcquisitionBuffer<S> {
    pub fn new(cell: u32, mut store: S) -> Self {
        store.clear();
        Self {
            store,
            cell,
            clock: 0.0,
            dropped: 0,
        }
    }

    pub fn cell(&self) -> u32 {
        self.cell
    }

    pub fn samples(&self) -> &[Sample] {
        self.store.as_slice()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Recording clock (s): time stamp the next recorded sample will carry.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Append a sample. Once the store is full further samples are counted and
    /// discarded; the first loss per recording is logged.
    pub fn append(&mut self, sample: Sample) {
        if self.store.push(sample).is_err() {
            if self.dropped == 0 {
                warn!(
                    cell = self.cell,
                    capacity = self.store.capacity(),
                    "acquisition store full, dropping samples"
                );
            }
            self.dropped += 1;
        }
    }

    /// Append a tick stamped with the recording clock, then advance the clock by `dt` seconds.
    pub fn record(&mut self, dt: f64, voltage: f64, conductance: f64, current: f64) {
        let sample = Sample {
            time: self.clock,
            voltage,
            conductance,
            current,
        };
        self.append(sample);
        self.clock += dt;
    }

    /// Hand the buffered samples to `sink`. The buffer is left untouched; pair
    /// with [`reset`](Self::reset). Returns the number of samples written.
    pub fn flush<K: RecordSink>(
        &self,
        sink: &mut K,
        prefix: &str,
        info: &str,
        dt: f64,
    ) -> Result<usize, K::Error> {
        let header = RecordHeader {
            cell: self.cell,
            prefix,
            info,
            dt,
            dropped: self.dropped,
        };
        let samples = self.store.as_slice();
        sink.write_record(&header, samples)?;
        Ok(samples.len())
    }

    /// Start a fresh recording.
    pub fn reset(&mut self) {
        self.store.clear();
        self.clock = 0.0;
        self.dropped = 0;
    }

    /// Switch to a new cell; always starts a fresh recording.
    pub fn rebind(&mut self, cell: u32) {
        self.cell = cell;
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collect {
        records: Vec<(u32, String, String, u64, Vec<Sample>)>,
    }

    impl RecordSink for Collect {
        type Error = Infallible;

        fn write_record(&mut self, h: &RecordHeader<'_>, samples: &[Sample]) -> Result<(), Infallible> {
            self.records
                .push((h.cell, h.prefix.to_string(), h.info.to_string(), h.dropped, samples.to_vec()));
            Ok(())
        }
    }

    struct Broken;

    impl RecordSink for Broken {
        type Error = &'static str;

        fn write_record(&mut self, _h: &RecordHeader<'_>, _s: &[Sample]) -> Result<(), &'static str> {
            Err("disk gone")
        }
    }

    #[test]
    fn record_stamps_chronological_time() {
        let mut buf = AcquisitionBuffer::with_capacity(1, 16);
        for i in 0..4 {
            buf.record(0.5, -60.0, i as f64, 0.0);
        }
        let times: Vec<f64> = buf.samples().iter().map(|s| s.time).collect();
        assert_eq!(times, vec![0.0, 0.5, 1.0, 1.5]);
        assert_eq!(buf.clock(), 2.0);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut buf = AcquisitionBuffer::with_capacity(1, 16);
        buf.record(0.1, 0.0, 0.0, 0.0);
        buf.reset();
        assert!(buf.is_empty());
        buf.reset();
        assert!(buf.is_empty());
        assert_eq!(buf.clock(), 0.0);
    }

    #[test]
    fn flush_then_reset_leaves_nothing() {
        let mut buf = AcquisitionBuffer::with_capacity(7, 16);
        let mut sink = Collect::default();
        buf.record(0.1, -60.0, 1.0, -1e-12);
        buf.record(0.1, -59.0, 1.0, -1e-12);
        assert_eq!(buf.flush(&mut sink, "autapse", "[x]info", 0.1), Ok(2));
        buf.reset();
        assert!(buf.is_empty());
        let (cell, prefix, info, dropped, samples) = &sink.records[0];
        assert_eq!((*cell, prefix.as_str(), info.as_str(), *dropped), (7, "autapse", "[x]info", 0));
        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn overflow_counts_dropped_samples() {
        let mut buf = AcquisitionBuffer::with_capacity(1, 3);
        for _ in 0..10 {
            buf.record(1.0, 0.0, 0.0, 0.0);
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.dropped(), 7);
        buf.reset();
        assert_eq!(buf.dropped(), 0);
    }

    #[test]
    fn rebind_changes_cell_and_clears() {
        let mut buf = AcquisitionBuffer::with_capacity(1, 4);
        buf.record(1.0, 0.0, 0.0, 0.0);
        buf.rebind(5);
        assert_eq!(buf.cell(), 5);
        assert!(buf.is_empty());
    }

    #[test]
    fn sink_errors_surface() {
        let buf = AcquisitionBuffer::with_capacity(1, 4);
        assert_eq!(buf.flush(&mut Broken, "p", "i", 0.001), Err("disk gone"));
    }
}
