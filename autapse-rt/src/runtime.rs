//! Tick orchestrator: owns the detector, synaptic current, protocol and
//! acquisition buffer, and advances them once per host period.
//!
//! Semantics:
//! - `tick()` runs voltage read -> spike detection -> protocol advance ->
//!   current synthesis -> output write -> acquisition, in that order.
//! - `handle()` applies lifecycle events and must only be called between ticks.
//! - Nothing on the tick path allocates; the only blocking call is the record
//!   flush when a recording ends.

use autapse_core::{
    Phase, ProtocolController, ProtocolStep, SpikeDetector, SpikeState, SynapticCurrent,
};
use tracing::{debug, error, info, warn};

use crate::acquisition::{AcquisitionBuffer, RecordSink};
use crate::config::{period_to_dt, AutapseConfig};
use crate::store::{SampleStore, VecStore};

/// V -> mV
const VOLTS_TO_MV: f64 = 1e3;

/// Host life-cycle callbacks, dispatched by [`AutapseRuntime::handle`].
#[derive(Debug, Clone, PartialEq)]
pub enum Lifecycle {
    /// Stamp the annotation and push the current configuration into the engine.
    Init,
    /// Replace the configuration (a parameter edit on the host).
    Reconfigure(AutapseConfig),
    /// Zero both outputs; protocol state is kept.
    Pause,
    /// The host period changed (µs).
    PeriodChange { period_us: f64 },
}

/// What the host writes to its output channels after a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickOutput {
    /// Synaptic current, A
    pub current: f64,
    /// Maximum conductance in effect, nS
    pub conductance: f64,
    /// The protocol completed this tick and cleared `active`.
    pub protocol_finished: bool,
    /// A recording was flushed this tick and `acquire` was cleared.
    pub acquisition_flushed: bool,
}

impl TickOutput {
    /// The configuration changed under the host; its parameter display is stale.
    pub fn config_changed(&self) -> bool {
        self.protocol_finished || self.acquisition_flushed
    }
}

/// Host-visible state for inspection or checkpointing.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AutapseSnapshot {
    pub active: bool,
    pub running: bool,
    pub onset_elapsed: f64,
    pub hold_elapsed: f64,
    pub conductance: f64,
    pub spiking: bool,
    pub buffered: usize,
    pub dropped: u64,
}

pub struct AutapseRuntime<K: RecordSink, S: SampleStore = VecStore> {
    config: AutapseConfig,
    /// s
    dt: f64,
    detector: SpikeDetector,
    synapse: SynapticCurrent,
    protocol: ProtocolController,
    buffer: AcquisitionBuffer<S>,
    sink: K,
    outputs: TickOutput,
    spike: SpikeState,
    voltage: f64,
}

impl<K: RecordSink> AutapseRuntime<K, VecStore> {
    /// `capacity` is the number of samples one recording can hold.
    pub fn new(config: AutapseConfig, period_us: f64, capacity: usize, sink: K) -> Self {
        let store = VecStore::with_capacity(capacity);
        Self::with_store(config, period_us, store, sink)
    }
}

impl<K: RecordSink, S: SampleStore> AutapseRuntime<K, S> {
    pub fn with_store(config: AutapseConfig, period_us: f64, store: S, sink: K) -> Self {
        let dt = match period_to_dt(period_us) {
            Ok(dt) => dt,
            Err(e) => {
                warn!(period_us, error = %e, "falling back to a 1 ms tick");
                1e-3
            }
        };
        let mut me = Self {
            buffer: AcquisitionBuffer::new(config.cell, store),
            config,
            dt,
            detector: SpikeDetector::default(),
            synapse: SynapticCurrent::default(),
            protocol: ProtocolController::default(),
            sink,
            outputs: TickOutput::default(),
            spike: SpikeState::NotSpiking,
            voltage: 0.0,
        };
        me.handle(Lifecycle::Init);
        me
    }

    pub fn config(&self) -> &AutapseConfig {
        &self.config
    }

    /// Tick period, s
    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn outputs(&self) -> TickOutput {
        self.outputs
    }

    pub fn protocol(&self) -> &ProtocolController {
        &self.protocol
    }

    pub fn synapse(&self) -> &SynapticCurrent {
        &self.synapse
    }

    pub fn buffer(&self) -> &AcquisitionBuffer<S> {
        &self.buffer
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    /// Seconds spent in the onset delay of the current run.
    pub fn onset_elapsed(&self) -> f64 {
        self.protocol.onset_elapsed()
    }

    pub fn spike_state(&self) -> SpikeState {
        self.spike
    }

    /// Last voltage sample, mV
    pub fn voltage(&self) -> f64 {
        self.voltage
    }

    pub fn snapshot(&self) -> AutapseSnapshot {
        AutapseSnapshot {
            active: self.protocol.is_active(),
            running: matches!(self.protocol.phase(), Phase::Running(_)),
            onset_elapsed: self.protocol.onset_elapsed(),
            hold_elapsed: self.protocol.hold_elapsed(),
            conductance: self.protocol.conductance(),
            spiking: self.spike.is_spiking(),
            buffered: self.buffer.len(),
            dropped: self.buffer.dropped(),
        }
    }

    /// One host period. `voltage` is the membrane voltage in volts.
    pub fn tick(&mut self, voltage: f64) -> TickOutput {
        let v = voltage * VOLTS_TO_MV;
        let dt_ms = self.dt * 1e3;
        self.voltage = v;

        let step = self.protocol.advance(self.dt);
        // the detector only sees the cell once the onset delay is over
        self.spike = match step {
            ProtocolStep::Running { .. } | ProtocolStep::Finished => self.detector.update(v, dt_ms),
            ProtocolStep::Idle | ProtocolStep::Waiting => SpikeState::NotSpiking,
        };

        let mut out = TickOutput::default();
        // conductance as logged: zero until the onset delay is over
        let mut logged = 0.0;
        match step {
            ProtocolStep::Running { conductance } => {
                self.synapse.set_spike_state(self.spike);
                self.synapse.set_max_conductance(conductance);
                out.current = self.synapse.update(v, dt_ms);
                out.conductance = conductance;
                logged = conductance;
            }
            ProtocolStep::Finished => {
                self.synapse.set_max_conductance(0.0);
                self.config.active = false;
                out.protocol_finished = true;
                info!(cell = self.config.cell, "protocol finished");
            }
            ProtocolStep::Idle | ProtocolStep::Waiting => {}
        }

        if self.config.acquire {
            if self.protocol.is_active() {
                self.buffer.record(self.dt, v, logged, out.current);
            } else {
                // stop collecting before the blocking write
                self.config.acquire = false;
                self.flush_buffer();
                out.acquisition_flushed = true;
            }
        }

        self.outputs = out;
        out
    }

    pub fn handle(&mut self, event: Lifecycle) {
        match event {
            Lifecycle::Init => {
                self.config.annotate();
                self.apply_config();
                info!(info = %self.config.info, "autapse initialised");
            }
            Lifecycle::Reconfigure(config) => {
                let flushed = !self.buffer.is_empty();
                if flushed {
                    // keep what was recorded under the labels it was recorded with
                    self.flush_buffer();
                }
                let cell = config.cell;
                self.config = config;
                if flushed && self.config.acquire && !self.config.active {
                    // the stopped run is already written; the tick path would
                    // otherwise follow up with an empty record
                    self.config.acquire = false;
                }
                self.config.annotate();
                self.apply_config();
                if cell != self.buffer.cell() {
                    self.buffer.rebind(cell);
                } else {
                    self.buffer.reset();
                }
                info!(
                    info = %self.config.info,
                    active = self.config.active,
                    acquire = self.config.acquire,
                    cell,
                    "autapse reconfigured"
                );
            }
            Lifecycle::Pause => {
                self.outputs.current = 0.0;
                self.outputs.conductance = 0.0;
                debug!("outputs zeroed for pause");
            }
            Lifecycle::PeriodChange { period_us } => match period_to_dt(period_us) {
                Ok(dt) => {
                    self.dt = dt;
                    info!(period_us, "tick period changed");
                }
                Err(e) => warn!(period_us, error = %e, "ignoring period change"),
            },
        }
    }

    fn apply_config(&mut self) {
        self.protocol.configure(self.config.protocol(), self.config.active);
        self.synapse.set_max_conductance(self.protocol.conductance());
        self.synapse.set_delay(self.config.delay);
    }

    fn flush_buffer(&mut self) {
        let result = self.buffer.flush(
            &mut self.sink,
            &self.config.file_prefix,
            &self.config.info,
            self.dt,
        );
        match result {
            Ok(samples) => info!(
                cell = self.buffer.cell(),
                samples,
                dropped = self.buffer.dropped(),
                "acquisition flushed"
            ),
            Err(e) => error!(cell = self.buffer.cell(), error = %e, "record sink failed, recording lost"),
        }
        self.buffer.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::NullSink;
    use autapse_core::Schedule;

    fn runtime(config: AutapseConfig) -> AutapseRuntime<NullSink> {
        let mut rt = AutapseRuntime::new(AutapseConfig::default(), 1000.0, 1024, NullSink);
        rt.handle(Lifecycle::Reconfigure(config));
        rt
    }

    #[test]
    fn init_stamps_annotation_once() {
        let rt = AutapseRuntime::new(AutapseConfig::default(), 100.0, 8, NullSink);
        assert_eq!(rt.config().info, "[10 -- 0:1:2 -- 3]n/a");
        assert!((rt.dt() - 1e-4).abs() < 1e-15);
        assert_eq!(rt.protocol().phase(), Phase::Idle);
    }

    #[test]
    fn idle_ticks_output_nothing() {
        let mut rt = runtime(AutapseConfig::default());
        for _ in 0..10 {
            assert_eq!(rt.tick(0.02), TickOutput::default());
        }
        assert_eq!(rt.spike_state(), SpikeState::NotSpiking);
    }

    #[test]
    fn onset_wait_outputs_zero_and_counts() {
        let cfg = AutapseConfig { active: true, onset_delay: 0.005, start_conductance: 1.0, ..Default::default() };
        let mut rt = runtime(cfg);
        for _ in 0..5 {
            let out = rt.tick(-0.065);
            assert_eq!(out.conductance, 0.0);
        }
        assert!((rt.onset_elapsed() - 0.005).abs() < 1e-12);
        assert_eq!(rt.tick(-0.065).conductance, 1.0);
        assert_eq!(rt.protocol().phase(), Phase::Running(Schedule::Ramp));
    }

    #[test]
    fn pause_zeroes_outputs_but_keeps_protocol() {
        let cfg = AutapseConfig { active: true, onset_delay: 0.0, start_conductance: 1.0, ..Default::default() };
        let mut rt = runtime(cfg);
        rt.tick(-0.065);
        assert_eq!(rt.outputs().conductance, 1.0);
        let before = rt.protocol().conductance();
        rt.handle(Lifecycle::Pause);
        assert_eq!(rt.outputs().conductance, 0.0);
        assert_eq!(rt.outputs().current, 0.0);
        assert_eq!(rt.protocol().conductance(), before);
        assert!(rt.protocol().is_active());
    }

    #[test]
    fn period_change_updates_dt() {
        let mut rt = runtime(AutapseConfig::default());
        rt.handle(Lifecycle::PeriodChange { period_us: 50.0 });
        assert!((rt.dt() - 5e-5).abs() < 1e-15);
        rt.handle(Lifecycle::PeriodChange { period_us: -1.0 });
        assert!((rt.dt() - 5e-5).abs() < 1e-15);
    }

    #[test]
    fn spikes_drive_current_while_running() {
        let cfg = AutapseConfig {
            active: true,
            onset_delay: 0.0,
            start_conductance: 5.0,
            end_conductance: 10.0,
            delay: 1.0,
            ..Default::default()
        };
        let mut rt = runtime(cfg);
        let mut min_current = 0.0f64;
        for i in 0..200 {
            // 1 ms wide action potential every 50 ms
            let v = if i % 50 == 10 { 0.02 } else { -0.065 };
            min_current = min_current.min(rt.tick(v).current);
        }
        // inward current at rest with E_syn = 0
        assert!(min_current < -1e-10, "{min_current}");
    }

    #[test]
    fn detector_is_silent_during_onset_wait() {
        let cfg = AutapseConfig { active: true, onset_delay: 0.01, start_conductance: 1.0, ..Default::default() };
        let mut rt = runtime(cfg);
        // crossings while waiting are neither reported nor counted
        for i in 0..10 {
            let v = if i % 2 == 0 { 0.02 } else { -0.065 };
            rt.tick(v);
            assert_eq!(rt.spike_state(), SpikeState::NotSpiking);
        }
        for _ in 0..5 {
            rt.tick(-0.065);
        }
        assert!(matches!(rt.protocol().phase(), Phase::Running(_)));
        rt.tick(0.02);
        assert_eq!(rt.spike_state(), SpikeState::Spiking);
    }

    #[cfg(feature = "embedded")]
    #[test]
    fn runs_on_heapless_store() {
        let store: heapless::Vec<crate::Sample, 8> = heapless::Vec::new();
        let mut rt = AutapseRuntime::with_store(AutapseConfig::default(), 1000.0, store, NullSink);
        let cfg = AutapseConfig { active: true, acquire: true, onset_delay: 0.0, ..Default::default() };
        rt.handle(Lifecycle::Reconfigure(cfg));
        for _ in 0..12 {
            rt.tick(-0.065);
        }
        assert_eq!(rt.buffer().len(), 8);
        assert_eq!(rt.buffer().dropped(), 4);
    }

    #[test]
    fn snapshot_reflects_state() {
        let cfg = AutapseConfig { active: true, onset_delay: 1.0, acquire: true, ..Default::default() };
        let mut rt = runtime(cfg);
        for _ in 0..3 {
            rt.tick(-0.065);
        }
        let snap = rt.snapshot();
        assert!(snap.active);
        assert!(!snap.running);
        assert_eq!(snap.buffered, 3);
        assert!((snap.onset_elapsed - 0.003).abs() < 1e-12);
    }
}
