// Cell abstraction for the host so the autapse can be closed around different membrane models.

/// A cell the host records from and injects current into.
pub trait CellBackend {
    /// Advance by `dt` seconds with `injected` amperes of clamp current; returns the membrane voltage in volts.
    fn step(&mut self, injected: f64, dt: f64) -> f64;
    /// Membrane voltage in volts without advancing.
    fn voltage(&self) -> f64;
    /// Constant holding current (pA). Default no-op for backends without one.
    fn set_bias(&mut self, _bias_pa: f64) {}
    fn bias(&self) -> f64 {
        0.0
    }
}

/// Leaky integrate-and-fire cell with a one-sample action potential peak,
/// tall enough to cross the autapse spike threshold.
pub struct LifCell {
    /// mV
    v: f64,
    pub rest: f64,
    pub threshold: f64,
    pub reset: f64,
    pub peak: f64,
    /// ms
    pub tau: f64,
    /// pF
    pub capacitance: f64,
    /// pA
    bias: f64,
    fired: bool,
}

impl LifCell {
    pub fn new(bias_pa: f64) -> Self {
        Self {
            v: -65.0,
            rest: -65.0,
            threshold: -50.0,
            reset: -70.0,
            peak: 20.0,
            tau: 20.0,
            capacitance: 100.0,
            bias: bias_pa,
            fired: false,
        }
    }
}

impl CellBackend for LifCell {
    fn step(&mut self, injected: f64, dt: f64) -> f64 {
        if self.fired {
            self.v = self.reset;
            self.fired = false;
        } else {
            let dt_ms = dt * 1e3;
            // pA / pF = mV / ms
            let input_pa = self.bias + injected * 1e12;
            self.v += (-(self.v - self.rest) / self.tau + input_pa / self.capacitance) * dt_ms;
            if self.v >= self.threshold {
                self.v = self.peak;
                self.fired = true;
            }
        }
        self.voltage()
    }

    fn voltage(&self) -> f64 {
        self.v * 1e-3
    }

    fn set_bias(&mut self, bias_pa: f64) {
        self.bias = bias_pa;
    }

    fn bias(&self) -> f64 {
        self.bias
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rests_without_input() {
        let mut cell = LifCell::new(0.0);
        for _ in 0..1000 {
            cell.step(0.0, 1e-4);
        }
        assert!((cell.voltage() + 0.065).abs() < 1e-9);
    }

    #[test]
    fn suprathreshold_bias_fires_and_resets() {
        let mut cell = LifCell::new(200.0);
        let mut peaks = 0;
        for _ in 0..10_000 {
            let v = cell.step(0.0, 1e-4);
            if v > 0.0 {
                peaks += 1;
                assert!(cell.step(0.0, 1e-4) < -0.069);
            }
        }
        assert!(peaks > 5, "{peaks}");
    }

    #[test]
    fn injected_current_depolarises() {
        let mut a = LifCell::new(0.0);
        let mut b = LifCell::new(0.0);
        for _ in 0..100 {
            a.step(0.0, 1e-4);
            b.step(50e-12, 1e-4);
        }
        assert!(b.voltage() > a.voltage());
    }
}
