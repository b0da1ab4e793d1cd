//! Type definitions shared across the benchmark engine

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Wire transport the echo RPC is carried over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportKind {
    /// HTTP/2 over TCP
    #[serde(rename = "HTTP/2")]
    Http2,
    /// HTTP/3 over QUIC
    #[serde(rename = "HTTP/3")]
    Http3,
}

impl TransportKind {
    /// Tag used in logs, reports and echo messages
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Http2 => "HTTP/2",
            TransportKind::Http3 => "HTTP/3",
        }
    }

    /// Both variants in execution order within a test case
    pub fn all() -> [TransportKind; 2] {
        [TransportKind::Http2, TransportKind::Http3]
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http/2" | "http2" | "h2" => Ok(TransportKind::Http2),
            "http/3" | "http3" | "h3" => Ok(TransportKind::Http3),
            other => Err(AppError::parse(format!("Unknown transport: {}", other))),
        }
    }
}

/// One network condition under test: added delay and packet loss
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestCase {
    /// Added one-way delay in milliseconds
    pub delay_ms: u32,
    /// Packet loss percentage (0-100)
    pub loss_pct: u32,
}

impl TestCase {
    pub fn new(delay_ms: u32, loss_pct: u32) -> Self {
        Self { delay_ms, loss_pct }
    }

    /// Parse a comma separated list such as `0:3,75:3`
    pub fn parse_list(input: &str) -> Result<Vec<TestCase>> {
        input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(TestCase::from_str)
            .collect()
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "delay={}ms loss={}%", self.delay_ms, self.loss_pct)
    }
}

impl FromStr for TestCase {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let (delay, loss) = s
            .split_once(':')
            .ok_or_else(|| AppError::parse(format!("Test case '{}' must be written as delay:loss", s)))?;

        let delay_ms = delay.trim().trim_end_matches("ms").parse::<u32>()?;
        let loss_pct = loss.trim().trim_end_matches('%').parse::<u32>()?;

        Ok(TestCase { delay_ms, loss_pct })
    }
}

/// Condition handed to the network-condition controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkCondition {
    pub delay_ms: u32,
    pub loss_pct: u32,
    /// Bandwidth cap in Mbit/s; `None` leaves bandwidth unlimited
    pub bandwidth_mbps: Option<u32>,
}

impl NetworkCondition {
    pub fn from_case(case: TestCase, bandwidth_mbps: Option<u32>) -> Self {
        Self {
            delay_ms: case.delay_ms,
            loss_pct: case.loss_pct,
            bandwidth_mbps,
        }
    }

    /// Whether a reported status matches the delay/loss pair of a test case
    pub fn matches_case(&self, case: &TestCase) -> bool {
        self.delay_ms == case.delay_ms && self.loss_pct == case.loss_pct
    }
}
