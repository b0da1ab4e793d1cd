//! Data models shared by the benchmark engine and its reporters

pub mod config;
pub mod metrics;

// Re-export main model types
pub use config::{BenchmarkConfig, Config, PhaseTimings};
pub use metrics::{AggregateResult, CallOutcome, TransportSummary};
