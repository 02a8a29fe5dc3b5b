//! Relay statistics

pub mod metrics;

pub use metrics::{FrameStats, RelayCounters, RelayStats};
