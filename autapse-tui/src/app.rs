// Application state for the TUI: the autapse runtime closed around a cell, plus
// downsampled voltage/current traces for display.

use std::collections::VecDeque;

use autapse_rt::{AutapseConfig, AutapseRuntime, Lifecycle, TickOutput};
use tracing::info;

use crate::backend::CellBackend;
use crate::sink::CsvSink;

/// Display points kept per trace.
const HISTORY: usize = 2000;
/// Display resolution, s
const POINT_INTERVAL: f64 = 1e-3;
/// Shortest host period the simulated loop accepts, µs
pub const MIN_PERIOD_US: f64 = 10.0;

pub struct App<B: CellBackend> {
    pub backend: B,
    pub runtime: AutapseRuntime<CsvSink>,
    pub tick: u64,
    pub running: bool,
    /// Peak voltage per display point, mV
    pub voltage: VecDeque<f64>,
    /// Peak inward current per display point, pA
    pub current: VecDeque<f64>,
    stride: u64,
    v_peak: f64,
    i_peak: f64,
    last: TickOutput,
}

impl<B: CellBackend> App<B> {
    pub fn new(backend: B, runtime: AutapseRuntime<CsvSink>) -> Self {
        let stride = Self::stride_for(runtime.dt());
        Self {
            backend,
            runtime,
            tick: 0,
            running: false,
            voltage: VecDeque::with_capacity(HISTORY),
            current: VecDeque::with_capacity(HISTORY),
            stride,
            v_peak: f64::MIN,
            i_peak: 0.0,
            last: TickOutput::default(),
        }
    }

    fn stride_for(dt: f64) -> u64 {
        ((POINT_INTERVAL / dt).round() as u64).max(1)
    }

    pub fn toggle_running(&mut self) {
        self.running = !self.running;
        if !self.running {
            self.runtime.handle(Lifecycle::Pause);
            self.last = self.runtime.outputs();
        }
    }

    pub fn last_output(&self) -> TickOutput {
        self.last
    }

    /// Advance one host period: inject the previous clamp output, read the
    /// cell, run the autapse on the new voltage.
    pub fn step(&mut self) {
        let dt = self.runtime.dt();
        // membrane convention: positive current is outward, so inject its negative
        let v = self.backend.step(-self.last.current, dt);
        let out = self.runtime.tick(v);
        if out.protocol_finished {
            info!(tick = self.tick, "protocol run complete");
        }
        self.last = out;
        self.tick = self.tick.saturating_add(1);

        self.v_peak = self.v_peak.max(v * 1e3);
        self.i_peak = self.i_peak.min(out.current * 1e12);
        if self.tick % self.stride == 0 {
            push_capped(&mut self.voltage, self.v_peak);
            push_capped(&mut self.current, self.i_peak);
            self.v_peak = f64::MIN;
            self.i_peak = 0.0;
        }
    }

    /// Run `ticks` periods back to back.
    pub fn advance(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }

    fn edit(&mut self, edit: impl FnOnce(&mut AutapseConfig)) {
        let mut config = self.runtime.config().clone();
        edit(&mut config);
        self.runtime.handle(Lifecycle::Reconfigure(config));
    }

    pub fn toggle_active(&mut self) {
        self.edit(|c| c.active = !c.active);
    }

    pub fn toggle_acquire(&mut self) {
        self.edit(|c| c.acquire = !c.acquire);
    }

    pub fn next_cell(&mut self) {
        self.edit(|c| c.cell = c.cell.saturating_add(1));
    }

    /// Shift the cell's holding current (pA).
    pub fn adjust_bias(&mut self, delta_pa: f64) {
        let bias = self.backend.bias() + delta_pa;
        self.backend.set_bias(bias);
    }

    /// Periods below [`MIN_PERIOD_US`] are raised to it.
    pub fn set_period(&mut self, period_us: f64) {
        let period_us = period_us.max(MIN_PERIOD_US);
        self.runtime.handle(Lifecycle::PeriodChange { period_us });
        self.stride = Self::stride_for(self.runtime.dt());
    }
}

fn push_capped(trace: &mut VecDeque<f64>, value: f64) {
    if trace.len() == HISTORY {
        trace.pop_front();
    }
    trace.push_back(value);
}
