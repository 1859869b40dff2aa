//! Threshold spike detector with a refractory cooldown

/// Fixed detection threshold (mV).
pub const SPIKE_THRESHOLD_MV: f64 = -20.0;

/// Default minimum inter-spike interval (ms). Kept short enough to swallow the
/// doublets a recorded action potential often produces.
pub const DEFAULT_REFRACTORY_MS: f64 = 3.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpikeState {
    #[default]
    NotSpiking,
    Spiking,
}

impl SpikeState {
    #[inline]
    pub fn is_spiking(self) -> bool {
        matches!(self, SpikeState::Spiking)
    }
}

#[derive(Clone, Debug)]
pub struct SpikeDetector {
    pub threshold: f64,
    refractory: f64,
    cooldown: f64,
    /// Last finite sample was at or below threshold.
    below: bool,
    state: SpikeState,
}

impl SpikeDetector {
    /// `refractory` shares the time unit of the `dt` later passed to [`update`](Self::update).
    pub fn new(threshold: f64, refractory: f64) -> Self {
        Self {
            threshold,
            refractory,
            cooldown: refractory,
            below: true,
            state: SpikeState::NotSpiking,
        }
    }

    pub fn refractory(&self) -> f64 {
        self.refractory
    }

    pub fn set_refractory(&mut self, refractory: f64) {
        self.refractory = refractory;
        self.cooldown = self.cooldown.min(refractory);
    }

    /// Last reported state.
    pub fn state(&self) -> SpikeState {
        self.state
    }

    pub fn cooldown(&self) -> f64 {
        self.cooldown
    }

    /// Feed one voltage sample (mV). Reports `Spiking` only on the sample that
    /// crosses above threshold once the cooldown has elapsed; a crossing inside
    /// the cooldown is swallowed. NaN never spikes and leaves the crossing
    /// state untouched.
    pub fn update(&mut self, voltage: f64, dt: f64) -> SpikeState {
        let crossed = self.below && voltage > self.threshold;
        if crossed && self.cooldown <= 0.0 {
            self.cooldown = self.refractory;
            self.state = SpikeState::Spiking;
        } else {
            self.cooldown = (self.cooldown - dt).max(0.0);
            self.state = SpikeState::NotSpiking;
        }
        if !voltage.is_nan() {
            self.below = voltage <= self.threshold;
        }
        self.state
    }
}

impl Default for SpikeDetector {
    fn default() -> Self {
        Self::new(SPIKE_THRESHOLD_MV, DEFAULT_REFRACTORY_MS)
    }
}
