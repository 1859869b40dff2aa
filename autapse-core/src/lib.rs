//! autapse-core: Zero-dependency numerics for a self-synapse dynamic clamp
//!
//! Everything here is allocation-free and advances one fixed step at a time,
//! so it can sit inside a hard real-time tick.

pub mod detector;
pub mod synapse;
pub mod protocol;

// Re-exports
pub use detector::{SpikeDetector, SpikeState, SPIKE_THRESHOLD_MV, DEFAULT_REFRACTORY_MS};
pub use synapse::{SynapticCurrent, E_SYN_MV, TAU_RISE_MS, TAU_FALL_MS, DEFAULT_DELAY_MS, NS_MV_TO_AMPS};
pub use protocol::{Phase, ProtocolController, ProtocolParams, ProtocolStep, Schedule, EPS, HOLD_TOLERANCE};
