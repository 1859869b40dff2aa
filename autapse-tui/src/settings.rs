// Host settings: a TOML file with a [host] table and a [protocol] table
// (an autapse_rt::AutapseConfig), overridable from the command line.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use autapse_rt::AutapseConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HostConfig {
    /// Tick period, µs
    pub period_us: f64,
    /// Holding current into the synthetic cell, pA
    pub bias_pa: f64,
    /// Samples one recording can hold
    pub capacity: usize,
    pub output_dir: PathBuf,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            period_us: 100.0,
            bias_pa: 90.0,
            // one minute at 10 kHz
            capacity: 600_000,
            output_dir: PathBuf::from("recordings"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub host: HostConfig,
    pub protocol: AutapseConfig,
}

impl Settings {
    pub fn from_toml(text: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(text).context("failed to parse settings")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file: {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        autapse_rt::period_to_dt(self.host.period_us)?;
        self.protocol.validate()?;
        anyhow::ensure!(self.host.capacity > 0, "capacity must be at least one sample");
        anyhow::ensure!(self.host.bias_pa.is_finite(), "bias must be finite");
        Ok(())
    }
}
