//! RPC Transport Bench
//!
//! A concurrent load generator that measures echo RPC latency, throughput and
//! error rate over HTTP/2 and HTTP/3 while a network emulation router injects
//! delay and packet loss. For every test case both transports are benchmarked
//! back to back under the same condition, and the results are reported side by
//! side.

pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod emulation;
pub mod error;
pub mod executor;
pub mod logging;
pub mod matrix;
pub mod models;
pub mod output;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use executor::{BenchmarkExecutor, BenchmarkRunner};
pub use matrix::{MatrixOutcome, TestMatrixScheduler};
pub use models::{AggregateResult, BenchmarkConfig, CallOutcome, Config};
pub use types::{NetworkCondition, TestCase, TransportKind};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
pub const BUILD_TIME: &str = env!("BUILD_TIME");
pub const GIT_COMMIT: &str = env!("GIT_COMMIT");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_REQUESTS: usize = 50_000;
    pub const DEFAULT_CONNECTIONS: usize = 100;
    pub const DEFAULT_MAX_CONCURRENT: usize = 100;

    pub const DEFAULT_TARGET_HOST: &str = "172.30.0.2";
    pub const DEFAULT_SCHEME: &str = "https";
    pub const DEFAULT_HTTP2_PORT: u16 = 443;
    pub const DEFAULT_HTTP3_PORT: u16 = 4433;

    /// (delay ms, loss %)
    pub const DEFAULT_TEST_CASES: &[(u32, u32)] = &[(0, 3), (75, 3), (150, 3), (225, 3)];

    pub const DEFAULT_STABILIZE_WAIT: Duration = Duration::from_secs(30);
    pub const DEFAULT_INTER_TRANSPORT_WAIT: Duration = Duration::from_secs(30);
    pub const DEFAULT_INTER_CASE_WAIT: Duration = Duration::from_secs(15);

    pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    pub const DEFAULT_OUTPUT_DIR: &str = "logs";
}
