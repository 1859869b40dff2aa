//! autapse-rt: Real-time runtime around autapse-core
//!
//! Additions over the core numerics:
//! - Tick orchestrator with a fixed per-tick ordering and no allocation
//! - Acquisition buffer over pre-sized sample stores, flushed to a pluggable sink
//! - Host configuration with the protocol summary annotation
//! - Closed life-cycle enum (init / reconfigure / pause / period change)
//! - Optional heapless store (feature "embedded") and serde derives (feature "serde")

pub mod acquisition;
pub mod config;
pub mod runtime;
pub mod store;

// Error module
pub mod error;

// Re-exports
pub use acquisition::{AcquisitionBuffer, NullSink, RecordHeader, RecordSink};
pub use config::{period_to_dt, AutapseConfig};
pub use error::{AutapseError, AutapseResult};
pub use runtime::{AutapseRuntime, AutapseSnapshot, Lifecycle, TickOutput};
pub use store::{Sample, SampleStore, VecStore};
