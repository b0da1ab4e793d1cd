//! Call outcome and aggregate result data models

use crate::error::{ErrorCategory, RpcStatus};
use crate::types::{TestCase, TransportKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of a single call, produced once by a worker and consumed once by the aggregator
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    pub success: bool,
    /// Start-to-response wall clock; zero for calls that never went out
    pub latency: Duration,
    pub status: Option<RpcStatus>,
    pub category: Option<ErrorCategory>,
    pub message: Option<String>,
}

impl CallOutcome {
    pub fn success(latency: Duration) -> Self {
        Self {
            success: true,
            latency,
            status: None,
            category: None,
            message: None,
        }
    }

    pub fn failure(latency: Duration, status: RpcStatus, category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            success: false,
            latency,
            status: Some(status),
            category: Some(category),
            message: Some(message.into()),
        }
    }
}

/// Summary of one benchmark run of one transport under one test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub transport: TransportKind,
    pub test_case: TestCase,
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    /// Wall-clock duration of the whole run
    pub total_time: Duration,
    pub avg_latency: Duration,
    pub min_latency: Duration,
    pub max_latency: Duration,
    pub p95_latency: Duration,
    pub p99_latency: Duration,
    /// Successful calls per second of wall clock
    pub throughput: f64,
    /// Failed fraction in 0.0..=1.0
    pub error_rate: f64,
    pub completed_at: DateTime<Utc>,
}

impl AggregateResult {
    /// Zero-valued result for a run that produced no outcomes
    pub fn zero(transport: TransportKind, test_case: TestCase) -> Self {
        Self {
            transport,
            test_case,
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            total_time: Duration::ZERO,
            avg_latency: Duration::ZERO,
            min_latency: Duration::ZERO,
            max_latency: Duration::ZERO,
            p95_latency: Duration::ZERO,
            p99_latency: Duration::ZERO,
            throughput: 0.0,
            error_rate: 0.0,
            completed_at: Utc::now(),
        }
    }

    pub fn total_time_ms(&self) -> f64 {
        as_ms(self.total_time)
    }

    pub fn avg_latency_ms(&self) -> f64 {
        as_ms(self.avg_latency)
    }

    pub fn min_latency_ms(&self) -> f64 {
        as_ms(self.min_latency)
    }

    pub fn max_latency_ms(&self) -> f64 {
        as_ms(self.max_latency)
    }

    pub fn p95_latency_ms(&self) -> f64 {
        as_ms(self.p95_latency)
    }

    pub fn p99_latency_ms(&self) -> f64 {
        as_ms(self.p99_latency)
    }

    /// Error rate as a percentage
    pub fn error_rate_pct(&self) -> f64 {
        self.error_rate * 100.0
    }

    pub fn success_rate_pct(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            100.0 - self.error_rate_pct()
        }
    }
}

/// Averages of all results of one transport across the matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportSummary {
    pub transport: TransportKind,
    pub cases: usize,
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub avg_latency_ms: f64,
    pub avg_p95_latency_ms: f64,
    pub avg_p99_latency_ms: f64,
    pub avg_throughput: f64,
    /// Mean error rate as a percentage
    pub avg_error_rate_pct: f64,
}

impl TransportSummary {
    /// Summarize the results of `transport`; `None` if it has none
    pub fn from_results(transport: TransportKind, results: &[AggregateResult]) -> Option<Self> {
        let matching: Vec<&AggregateResult> = results.iter().filter(|r| r.transport == transport).collect();
        if matching.is_empty() {
            return None;
        }

        let n = matching.len() as f64;
        let mean = |f: fn(&AggregateResult) -> f64| matching.iter().map(|r| f(r)).sum::<f64>() / n;

        Some(Self {
            transport,
            cases: matching.len(),
            total_requests: matching.iter().map(|r| r.total_requests).sum(),
            successful_requests: matching.iter().map(|r| r.successful_requests).sum(),
            failed_requests: matching.iter().map(|r| r.failed_requests).sum(),
            avg_latency_ms: mean(AggregateResult::avg_latency_ms),
            avg_p95_latency_ms: mean(AggregateResult::p95_latency_ms),
            avg_p99_latency_ms: mean(AggregateResult::p99_latency_ms),
            avg_throughput: mean(|r| r.throughput),
            avg_error_rate_pct: mean(AggregateResult::error_rate_pct),
        })
    }

    /// One summary per transport that has results, in transport order
    pub fn for_all(results: &[AggregateResult]) -> Vec<Self> {
        TransportKind::all()
            .into_iter()
            .filter_map(|kind| Self::from_results(kind, results))
            .collect()
    }
}

fn as_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
