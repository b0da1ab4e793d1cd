//! Configuration data model and validation

use crate::types::{AppError, Result, TestCase, TransportKind};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Total calls per benchmark run, split across all connections
    #[serde(default = "default_requests")]
    pub requests: usize,

    /// Number of persistent connections (one worker each)
    #[serde(default = "default_connections")]
    pub connections: usize,

    /// Concurrency cap; reserved, never enforced
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Worker threads for the async runtime
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Host serving the echo endpoint
    #[serde(default = "default_target_host")]
    pub target_host: String,

    /// URL scheme used for both transports
    #[serde(default = "default_scheme")]
    pub scheme: String,

    #[serde(default = "default_http2_port")]
    pub http2_port: u16,

    #[serde(default = "default_http3_port")]
    pub http3_port: u16,

    /// Ordered list of network conditions to measure under
    #[serde(default = "default_test_cases")]
    pub test_cases: Vec<TestCase>,

    /// Optional bandwidth cap applied with every condition
    #[serde(default)]
    pub bandwidth_mbps: Option<u32>,

    /// Base URL of the network emulation router; `None` records conditions only
    #[serde(default)]
    pub controller_url: Option<String>,

    #[serde(default = "default_stabilize_wait_secs")]
    pub stabilize_wait_secs: u64,

    #[serde(default = "default_inter_transport_wait_secs")]
    pub inter_transport_wait_secs: u64,

    #[serde(default = "default_inter_case_wait_secs")]
    pub inter_case_wait_secs: u64,

    /// Poll the controller until it reports the condition instead of sleeping blind
    #[serde(default)]
    pub readiness_probe: bool,

    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,

    /// Transport-level timeout of a single call
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_seconds: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_seconds: u64,

    /// Accept self-signed server certificates
    #[serde(default = "default_true")]
    pub accept_invalid_certs: bool,

    /// Speak HTTP/2 without ALPN negotiation (required for cleartext h2c)
    #[serde(default = "default_true")]
    pub http2_prior_knowledge: bool,

    /// Parent directory for timestamped report directories
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    #[serde(default = "default_true")]
    pub write_reports: bool,

    /// Clear the emulated condition once the matrix is done
    #[serde(default = "default_true")]
    pub clear_on_finish: bool,

    /// Log progress every N recorded outcomes; 0 disables
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,

    #[serde(default)]
    pub log_level: Option<String>,

    /// console, json or compact; unset picks json in debug mode
    #[serde(default)]
    pub log_format: Option<String>,

    /// Enable colored terminal output
    #[serde(default = "default_true")]
    pub enable_color: bool,

    #[serde(default)]
    pub verbose: bool,

    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            requests: default_requests(),
            connections: default_connections(),
            max_concurrent: default_max_concurrent(),
            worker_threads: default_worker_threads(),
            target_host: default_target_host(),
            scheme: default_scheme(),
            http2_port: default_http2_port(),
            http3_port: default_http3_port(),
            test_cases: default_test_cases(),
            bandwidth_mbps: None,
            controller_url: None,
            stabilize_wait_secs: default_stabilize_wait_secs(),
            inter_transport_wait_secs: default_inter_transport_wait_secs(),
            inter_case_wait_secs: default_inter_case_wait_secs(),
            readiness_probe: false,
            probe_interval_ms: default_probe_interval_ms(),
            call_timeout_seconds: default_call_timeout_secs(),
            connect_timeout_seconds: default_connect_timeout_secs(),
            accept_invalid_certs: true,
            http2_prior_knowledge: true,
            output_dir: default_output_dir(),
            write_reports: true,
            clear_on_finish: true,
            progress_interval: default_progress_interval(),
            log_level: None,
            log_format: None,
            enable_color: true,
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn transport_port(&self, kind: TransportKind) -> u16 {
        match kind {
            TransportKind::Http2 => self.http2_port,
            TransportKind::Http3 => self.http3_port,
        }
    }

    /// Base URL of the echo endpoint for a transport, e.g. `https://172.30.0.2:4433`
    pub fn transport_address(&self, kind: TransportKind) -> String {
        format!("{}://{}:{}", self.scheme, self.target_host, self.transport_port(kind))
    }

    /// Per-run configuration for one transport
    pub fn benchmark_config(&self, kind: TransportKind) -> BenchmarkConfig {
        BenchmarkConfig {
            requests: self.requests,
            connections: self.connections,
            max_concurrent: self.max_concurrent,
            transport: kind,
            target_address: self.transport_address(kind),
            test_cases: self.test_cases.clone(),
        }
    }

    /// Waits between matrix phases
    pub fn phase_timings(&self) -> PhaseTimings {
        PhaseTimings {
            stabilize_wait: Duration::from_secs(self.stabilize_wait_secs),
            inter_transport_wait: Duration::from_secs(self.inter_transport_wait_secs),
            inter_case_wait: Duration::from_secs(self.inter_case_wait_secs),
            probe_interval: self
                .readiness_probe
                .then(|| Duration::from_millis(self.probe_interval_ms.max(1))),
        }
    }

    /// Validate the configuration and return the first hard error
    pub fn validate(&self) -> Result<()> {
        if self.connections == 0 {
            return Err(AppError::validation("Connection count must be greater than 0"));
        }

        if self.worker_threads == 0 {
            return Err(AppError::validation("Worker thread count must be greater than 0"));
        }

        if self.target_host.trim().is_empty() {
            return Err(AppError::validation("Target host cannot be empty"));
        }

        if self.scheme != "http" && self.scheme != "https" {
            return Err(AppError::validation(format!(
                "Unsupported scheme '{}': expected http or https",
                self.scheme
            )));
        }

        if self.http2_port == 0 || self.http3_port == 0 {
            return Err(AppError::validation("Transport ports must be greater than 0"));
        }

        for case in &self.test_cases {
            if case.loss_pct > 100 {
                return Err(AppError::validation(format!(
                    "Packet loss must be between 0 and 100, got {}% in test case '{}'",
                    case.loss_pct, case
                )));
            }
        }

        if let Some(url) = &self.controller_url {
            if let Err(e) = url::Url::parse(url) {
                return Err(AppError::validation(format!("Invalid controller URL '{}': {}", url, e)));
            }
        }

        if self.call_timeout_seconds == 0 {
            return Err(AppError::validation("Call timeout must be greater than 0"));
        }

        if self.connect_timeout_seconds == 0 {
            return Err(AppError::validation("Connect timeout must be greater than 0"));
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
        where
            T::Err: std::fmt::Display,
        {
            match std::env::var(name) {
                Ok(value) if !value.trim().is_empty() => value
                    .trim()
                    .parse()
                    .map(Some)
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", name, value, e))),
                _ => Ok(None),
            }
        }

        if let Some(requests) = parse_env("BENCH_REQUESTS")? {
            self.requests = requests;
        }

        if let Some(connections) = parse_env("BENCH_CONNECTIONS")? {
            self.connections = connections;
        }

        if let Some(max_concurrent) = parse_env("BENCH_MAX_CONCURRENT")? {
            self.max_concurrent = max_concurrent;
        }

        if let Some(threads) = parse_env("BENCH_THREADS")? {
            self.worker_threads = threads;
        }

        if let Ok(host) = std::env::var("TARGET_HOST") {
            if !host.trim().is_empty() {
                self.target_host = host.trim().to_string();
            }
        }

        if let Ok(scheme) = std::env::var("TARGET_SCHEME") {
            if !scheme.trim().is_empty() {
                self.scheme = scheme.trim().to_lowercase();
            }
        }

        if let Some(port) = parse_env("HTTP2_PORT")? {
            self.http2_port = port;
        }

        if let Some(port) = parse_env("HTTP3_PORT")? {
            self.http3_port = port;
        }

        if let Ok(cases) = std::env::var("TEST_CASES") {
            self.test_cases = TestCase::parse_list(&cases)
                .map_err(|e| AppError::config(format!("Invalid TEST_CASES value '{}': {}", cases, e)))?;
        }

        if let Some(bandwidth) = parse_env::<u32>("NETWORK_BANDWIDTH")? {
            self.bandwidth_mbps = (bandwidth > 0).then_some(bandwidth);
        }

        if let Ok(url) = std::env::var("CONTROLLER_URL") {
            self.controller_url = (!url.trim().is_empty()).then(|| url.trim().to_string());
        }

        if let Some(secs) = parse_env("STABILIZE_WAIT_SECS")? {
            self.stabilize_wait_secs = secs;
        }

        if let Some(secs) = parse_env("INTER_TRANSPORT_WAIT_SECS")? {
            self.inter_transport_wait_secs = secs;
        }

        if let Some(secs) = parse_env("INTER_CASE_WAIT_SECS")? {
            self.inter_case_wait_secs = secs;
        }

        if let Some(secs) = parse_env("CALL_TIMEOUT_SECS")? {
            self.call_timeout_seconds = secs;
        }

        if let Ok(dir) = std::env::var("OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.output_dir = dir.trim().to_string();
            }
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            if !level.trim().is_empty() {
                self.log_level = Some(level.trim().to_string());
            }
        }

        if let Ok(format) = std::env::var("LOG_FORMAT") {
            if !format.trim().is_empty() {
                self.log_format = Some(format.trim().to_string());
            }
        }

        if let Some(enable_color) = parse_env("ENABLE_COLOR")? {
            self.enable_color = enable_color;
        }

        Ok(())
    }
}

/// Parameters of one benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    pub requests: usize,
    pub connections: usize,
    /// Declared concurrency cap; carried through but not enforced
    pub max_concurrent: usize,
    pub transport: TransportKind,
    pub target_address: String,
    pub test_cases: Vec<TestCase>,
}

impl BenchmarkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.connections == 0 {
            return Err(AppError::validation("Connection count must be greater than 0"));
        }
        Ok(())
    }
}

/// Durations separating the phases of the test matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTimings {
    /// Wait after applying a condition, or the probe deadline
    pub stabilize_wait: Duration,
    pub inter_transport_wait: Duration,
    pub inter_case_wait: Duration,
    /// Poll interval of the readiness probe; `None` means a fixed sleep
    pub probe_interval: Option<Duration>,
}

impl PhaseTimings {
    /// No waits at all
    pub fn immediate() -> Self {
        Self {
            stabilize_wait: Duration::ZERO,
            inter_transport_wait: Duration::ZERO,
            inter_case_wait: Duration::ZERO,
            probe_interval: None,
        }
    }
}

impl Default for PhaseTimings {
    fn default() -> Self {
        Config::default().phase_timings()
    }
}

// Default value functions for serde
fn default_requests() -> usize {
    crate::defaults::DEFAULT_REQUESTS
}

fn default_connections() -> usize {
    crate::defaults::DEFAULT_CONNECTIONS
}

fn default_max_concurrent() -> usize {
    crate::defaults::DEFAULT_MAX_CONCURRENT
}

fn default_worker_threads() -> usize {
    num_cpus::get().max(1)
}

fn default_target_host() -> String {
    crate::defaults::DEFAULT_TARGET_HOST.to_string()
}

fn default_scheme() -> String {
    crate::defaults::DEFAULT_SCHEME.to_string()
}

fn default_http2_port() -> u16 {
    crate::defaults::DEFAULT_HTTP2_PORT
}

fn default_http3_port() -> u16 {
    crate::defaults::DEFAULT_HTTP3_PORT
}

fn default_test_cases() -> Vec<TestCase> {
    crate::defaults::DEFAULT_TEST_CASES
        .iter()
        .map(|&(delay, loss)| TestCase::new(delay, loss))
        .collect()
}

fn default_stabilize_wait_secs() -> u64 {
    crate::defaults::DEFAULT_STABILIZE_WAIT.as_secs()
}

fn default_inter_transport_wait_secs() -> u64 {
    crate::defaults::DEFAULT_INTER_TRANSPORT_WAIT.as_secs()
}

fn default_inter_case_wait_secs() -> u64 {
    crate::defaults::DEFAULT_INTER_CASE_WAIT.as_secs()
}

fn default_probe_interval_ms() -> u64 {
    500
}

fn default_call_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_CALL_TIMEOUT.as_secs()
}

fn default_connect_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_CONNECT_TIMEOUT.as_secs()
}

fn default_output_dir() -> String {
    crate::defaults::DEFAULT_OUTPUT_DIR.to_string()
}

fn default_progress_interval() -> usize {
    1000
}

fn default_true() -> bool {
    true
}
