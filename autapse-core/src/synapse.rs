//! Bi-exponential synaptic current driven by detected spikes.
//!
//! A spike does not act immediately: it arms a single-slot pending event that
//! fires `delay` ms later. Firing kicks both kinetic accumulators by one unit;
//! the conductance waveform is their difference, so it starts at zero, peaks
//! after roughly one rise time and decays with the fall time constant.
//!
//! Units: time in ms, voltage in mV, conductance in nS, current in A.

use crate::detector::SpikeState;

/// Synaptic reversal potential (mV).
pub const E_SYN_MV: f64 = 0.0;
/// Rise time constant (ms).
pub const TAU_RISE_MS: f64 = 0.3;
/// Fall time constant (ms).
pub const TAU_FALL_MS: f64 = 5.6;
/// Default propagation delay (ms).
pub const DEFAULT_DELAY_MS: f64 = 3.0;
/// nS * mV = pA
pub const NS_MV_TO_AMPS: f64 = 1e-12;

/// Peak of `exp(-t/fall) - exp(-t/rise)` so that the normalised waveform tops out at 1.
fn peak_normalisation(rise: f64, fall: f64) -> f64 {
    if !(fall > rise && rise > 0.0) {
        return 1.0;
    }
    let t_peak = (rise * fall / (fall - rise)) * (fall / rise).ln();
    (-t_peak / fall).exp() - (-t_peak / rise).exp()
}

#[derive(Clone, Debug)]
pub struct SynapticCurrent {
    pub e_rev: f64,
    tau_rise: f64,
    tau_fall: f64,
    norm: f64,
    g_max: f64,
    delay: f64,
    rise: f64,
    fall: f64,
    /// Time left until the armed event fires, if any.
    pending: Option<f64>,
    spike: SpikeState,
    conductance: f64,
}

impl SynapticCurrent {
    pub fn new(g_max: f64, e_rev: f64, tau_rise: f64, tau_fall: f64, delay: f64) -> Self {
        Self {
            e_rev,
            tau_rise,
            tau_fall,
            norm: peak_normalisation(tau_rise, tau_fall),
            g_max,
            delay,
            rise: 0.0,
            fall: 0.0,
            pending: None,
            spike: SpikeState::NotSpiking,
            conductance: 0.0,
        }
    }

    pub fn set_max_conductance(&mut self, g_max: f64) {
        self.g_max = g_max;
    }

    pub fn max_conductance(&self) -> f64 {
        self.g_max
    }

    pub fn set_delay(&mut self, delay: f64) {
        self.delay = delay;
    }

    pub fn delay(&self) -> f64 {
        self.delay
    }

    /// Latch the detector output for the next [`update`](Self::update).
    pub fn set_spike_state(&mut self, state: SpikeState) {
        self.spike = state;
    }

    /// Conductance (nS) computed on the last update.
    pub fn conductance(&self) -> f64 {
        self.conductance
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop all kinetic state, keeping parameters.
    pub fn clear(&mut self) {
        self.rise = 0.0;
        self.fall = 0.0;
        self.pending = None;
        self.spike = SpikeState::NotSpiking;
        self.conductance = 0.0;
    }

    /// Advance by `dt` ms at membrane voltage `voltage` (mV); returns the current in amperes.
    pub fn update(&mut self, voltage: f64, dt: f64) -> f64 {
        // A new spike overwrites whatever event is still armed.
        if self.spike.is_spiking() {
            self.pending = Some(self.delay);
            self.spike = SpikeState::NotSpiking;
        }

        if let Some(remaining) = self.pending {
            // fire on the tick nearest to the requested delay
            if remaining < 0.5 * dt {
                self.rise += 1.0;
                self.fall += 1.0;
                self.pending = None;
            } else {
                self.pending = Some(remaining - dt);
            }
        }

        let wave = ((self.fall - self.rise) / self.norm).max(0.0);
        self.conductance = self.g_max * wave;

        self.rise *= (-dt / self.tau_rise).exp();
        self.fall *= (-dt / self.tau_fall).exp();

        self.conductance * (voltage - self.e_rev) * NS_MV_TO_AMPS
    }
}

impl Default for SynapticCurrent {
    fn default() -> Self {
        Self::new(0.0, E_SYN_MV, TAU_RISE_MS, TAU_FALL_MS, DEFAULT_DELAY_MS)
    }
}
