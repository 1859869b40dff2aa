//! Conductance protocol: onset delay, then either a linear ramp of the
//! maximum conductance from `start` to `end`, or a constant hold at `start`.
//!
//! Schedule strings like `[0:0.1:1]` read start:rate:end. A ramp `[0:0.1:1]`
//! climbs from 0 nS to 1 nS at 0.1 nS/s; `[2:10:2]` holds 2 nS for 10 s
//! (in hold mode the rate doubles as the hold duration in seconds).

/// |end - start| below this runs a hold instead of a ramp.
pub const HOLD_TOLERANCE: f64 = 1e-3;
/// Slack for onset and ramp-end comparisons.
pub const EPS: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProtocolParams {
    /// nS
    pub start: f64,
    /// nS
    pub end: f64,
    /// nS/s for a ramp, seconds of hold otherwise
    pub rate: f64,
    /// s
    pub onset_delay: f64,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: 2.0,
            rate: 1.0,
            onset_delay: 10.0,
        }
    }
}

impl ProtocolParams {
    pub fn schedule(&self) -> Schedule {
        if (self.end - self.start).abs() < HOLD_TOLERANCE {
            Schedule::Hold
        } else {
            Schedule::Ramp
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schedule {
    Ramp,
    Hold,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    OnsetWait,
    Running(Schedule),
}

/// Outcome of one [`ProtocolController::advance`] call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProtocolStep {
    /// Not armed.
    Idle,
    /// Armed, onset delay still running.
    Waiting,
    /// Apply `conductance` (nS) this tick.
    Running { conductance: f64 },
    /// Schedule completed on this tick; the controller is idle again.
    Finished,
}

#[derive(Clone, Debug)]
pub struct ProtocolController {
    params: ProtocolParams,
    schedule: Schedule,
    active: bool,
    onset_elapsed: f64,
    hold_elapsed: f64,
    conductance: f64,
}

impl ProtocolController {
    pub fn new(params: ProtocolParams) -> Self {
        let mut me = Self {
            params,
            schedule: params.schedule(),
            active: false,
            onset_elapsed: 0.0,
            hold_elapsed: 0.0,
            conductance: 0.0,
        };
        me.configure(params, false);
        me
    }

    /// Apply new parameters and arm/disarm. Restarts the onset delay and any
    /// ramp or hold already in progress.
    pub fn configure(&mut self, params: ProtocolParams, active: bool) {
        self.params = params;
        self.schedule = params.schedule();
        self.active = active;
        self.onset_elapsed = 0.0;
        self.hold_elapsed = 0.0;
        self.conductance = if active { params.start } else { 0.0 };
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Live conductance (nS). Already seeded to `start` during the onset wait.
    pub fn conductance(&self) -> f64 {
        self.conductance
    }

    /// Seconds spent waiting for onset since the last configure.
    pub fn onset_elapsed(&self) -> f64 {
        self.onset_elapsed
    }

    pub fn hold_elapsed(&self) -> f64 {
        self.hold_elapsed
    }

    #[inline]
    fn onset_done(&self) -> bool {
        self.onset_elapsed > self.params.onset_delay - EPS
    }

    pub fn phase(&self) -> Phase {
        if !self.active {
            Phase::Idle
        } else if self.onset_done() {
            Phase::Running(self.schedule)
        } else {
            Phase::OnsetWait
        }
    }

    /// Advance by `dt` seconds.
    ///
    /// While running, the returned conductance is the value in effect at the
    /// start of the tick; the ramp increment lands on the next tick.
    pub fn advance(&mut self, dt: f64) -> ProtocolStep {
        if !self.active {
            return ProtocolStep::Idle;
        }
        if !self.onset_done() {
            self.onset_elapsed += dt;
            return ProtocolStep::Waiting;
        }

        let conductance = self.conductance;
        match self.schedule {
            Schedule::Ramp if conductance <= self.params.end - EPS => {
                self.conductance += self.params.rate * dt;
            }
            Schedule::Hold if self.hold_elapsed < self.params.rate => {
                self.hold_elapsed += dt;
            }
            _ => {
                self.conductance = 0.0;
                self.hold_elapsed = 0.0;
                self.active = false;
                return ProtocolStep::Finished;
            }
        }
        ProtocolStep::Running { conductance }
    }
}

impl Default for ProtocolController {
    fn default() -> Self {
        Self::new(ProtocolParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn armed(start: f64, end: f64, rate: f64, onset_delay: f64) -> ProtocolController {
        let mut p = ProtocolController::default();
        p.configure(ProtocolParams { start, end, rate, onset_delay }, true);
        p
    }

    #[test]
    fn inactive_is_inert() {
        let mut p = ProtocolController::default();
        for _ in 0..10 {
            assert_eq!(p.advance(0.001), ProtocolStep::Idle);
        }
        assert_eq!(p.onset_elapsed(), 0.0);
        assert_eq!(p.conductance(), 0.0);
        assert_eq!(p.phase(), Phase::Idle);
    }

    #[test]
    fn zero_onset_runs_on_first_tick() {
        let mut p = armed(0.5, 2.0, 1.0, 0.0);
        assert_eq!(p.phase(), Phase::Running(Schedule::Ramp));
        assert_eq!(p.advance(0.001), ProtocolStep::Running { conductance: 0.5 });
    }

    #[test]
    fn onset_delay_counts_seconds() {
        let mut p = armed(1.0, 2.0, 1.0, 0.01);
        for _ in 0..10 {
            assert_eq!(p.advance(0.001), ProtocolStep::Waiting);
            assert_eq!(p.conductance(), 1.0);
        }
        assert_eq!(p.advance(0.001), ProtocolStep::Running { conductance: 1.0 });
    }

    #[test]
    fn ramp_reaches_end_then_finishes() {
        let mut p = armed(0.0, 2.0, 1.0, 0.0);
        let mut last = -1.0;
        for _ in 0..2000 {
            match p.advance(0.001) {
                ProtocolStep::Running { conductance } => {
                    assert!(conductance >= last);
                    last = conductance;
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        assert!((p.conductance() - 2.0).abs() < 1e-9);
        assert_eq!(p.advance(0.001), ProtocolStep::Finished);
        assert!(!p.is_active());
        assert_eq!(p.conductance(), 0.0);
        assert_eq!(p.advance(0.001), ProtocolStep::Idle);
    }

    #[test]
    fn hold_keeps_start_for_rate_seconds() {
        let mut p = armed(2.0, 2.0, 0.5, 0.0);
        assert_eq!(p.schedule(), Schedule::Hold);
        let mut ticks = 0;
        loop {
            match p.advance(0.001) {
                ProtocolStep::Running { conductance } => {
                    assert_eq!(conductance, 2.0);
                    ticks += 1;
                }
                ProtocolStep::Finished => break,
                other => panic!("unexpected {other:?}"),
            }
        }
        assert!((500..=501).contains(&ticks), "{ticks}");
        assert_eq!(p.hold_elapsed(), 0.0);
    }

    #[test]
    fn descending_schedule_finishes_immediately() {
        let mut p = armed(3.0, 1.0, 1.0, 0.0);
        assert_eq!(p.schedule(), Schedule::Ramp);
        assert_eq!(p.advance(0.001), ProtocolStep::Finished);
    }

    #[test]
    fn negative_rate_sticks_without_panicking() {
        let mut p = armed(0.0, 1.0, -1.0, 0.0);
        for _ in 0..10_000 {
            assert!(matches!(p.advance(0.001), ProtocolStep::Running { .. }));
        }
        assert!(p.is_active());
    }

    #[test]
    fn reconfigure_restarts_mid_run() {
        let mut p = armed(0.0, 2.0, 1.0, 0.0);
        for _ in 0..500 {
            p.advance(0.001);
        }
        let params = *p.params();
        p.configure(params, true);
        assert_eq!(p.conductance(), 0.0);
        assert_eq!(p.onset_elapsed(), 0.0);
        p.configure(ProtocolParams { start: 1.0, ..params }, false);
        assert_eq!(p.conductance(), 0.0);
        assert_eq!(p.phase(), Phase::Idle);
    }
}
