//! Host-editable configuration and the protocol summary tag kept at the front
//! of the annotation string, e.g. `[10 -- 0:1:2 -- 3]n/a`
//! (`[onset -- start:rate:end -- delay]`).

use autapse_core::{ProtocolParams, DEFAULT_DELAY_MS};

use crate::error::{AutapseError, AutapseResult};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AutapseConfig {
    /// nS
    pub start_conductance: f64,
    /// nS
    pub end_conductance: f64,
    /// nS/s (ramp) or seconds (hold)
    pub rate: f64,
    /// Synaptic delay, ms
    pub delay: f64,
    /// s
    pub onset_delay: f64,
    pub active: bool,
    pub acquire: bool,
    pub cell: u32,
    pub file_prefix: String,
    pub info: String,
}

impl Default for AutapseConfig {
    fn default() -> Self {
        let protocol = ProtocolParams::default();
        Self {
            start_conductance: protocol.start,
            end_conductance: protocol.end,
            rate: protocol.rate,
            delay: DEFAULT_DELAY_MS,
            onset_delay: protocol.onset_delay,
            active: false,
            acquire: false,
            cell: 1,
            file_prefix: "autapse".to_string(),
            info: "n/a".to_string(),
        }
    }
}

impl AutapseConfig {
    pub fn protocol(&self) -> ProtocolParams {
        ProtocolParams {
            start: self.start_conductance,
            end: self.end_conductance,
            rate: self.rate,
            onset_delay: self.onset_delay,
        }
    }

    /// `[onset -- start:rate:end -- delay]`
    pub fn summary(&self) -> String {
        format!(
            "[{} -- {}:{}:{} -- {}]",
            self.onset_delay, self.start_conductance, self.rate, self.end_conductance, self.delay
        )
    }

    /// Replace any leading summary in `info` with one for the current values.
    pub fn annotate(&mut self) {
        let rest = strip_summary(&self.info);
        self.info = format!("{}{}", self.summary(), rest);
    }

    /// The annotation without its summary tag.
    pub fn user_info(&self) -> &str {
        strip_summary(&self.info)
    }

    /// Rejects values that cannot be represented on the tick path. Out-of-range
    /// but finite protocol numbers are left alone; they only stall the protocol.
    pub fn validate(&self) -> AutapseResult<()> {
        let numbers = [
            self.start_conductance,
            self.end_conductance,
            self.rate,
            self.delay,
            self.onset_delay,
        ];
        if numbers.iter().any(|x| !x.is_finite()) {
            return Err(AutapseError::InvalidConfiguration("non-finite protocol value"));
        }
        if self.delay < 0.0 {
            return Err(AutapseError::InvalidConfiguration("negative synaptic delay"));
        }
        if self.onset_delay < 0.0 {
            return Err(AutapseError::InvalidConfiguration("negative onset delay"));
        }
        Ok(())
    }
}

fn strip_summary(info: &str) -> &str {
    if info.starts_with('[') {
        if let Some(pos) = info.find(']') {
            return &info[pos + 1..];
        }
    }
    info
}

/// Tick period in seconds from a host period in microseconds.
pub fn period_to_dt(period_us: f64) -> AutapseResult<f64> {
    if !(period_us.is_finite() && period_us > 0.0) {
        return Err(AutapseError::InvalidInput("tick period must be positive"));
    }
    Ok(period_us * 1e-6)
}
