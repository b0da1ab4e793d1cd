//! Result aggregation and latency statistics for a single benchmark run


use crate::{
    logging::Logger,
    models::{AggregateResult, CallOutcome},
    types::{TestCase, TransportKind},
};
use chrono::Utc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Failures whose message is logged individually per run
pub const FAILURE_LOG_LIMIT: usize = 5;

/// Collects the outcomes of one run and turns them into an [`AggregateResult`]
///
/// The aggregator is the single reader of the outcome stream; workers only
/// ever touch the sending half, so no other synchronization is needed.
pub struct ResultAggregator {
    transport: TransportKind,
    test_case: TestCase,
    /// Latencies of successful calls only
    latencies: Vec<Duration>,
    successes: usize,
    failures: usize,
    progress_interval: usize,
    expected: Option<usize>,
    logger: Logger,
}

impl ResultAggregator {
    pub fn new(transport: TransportKind, test_case: TestCase, logger: Logger) -> Self {
        Self {
            transport,
            test_case,
            latencies: Vec::new(),
            successes: 0,
            failures: 0,
            progress_interval: 0,
            expected: None,
            logger,
        }
    }

    /// Log progress every `interval` outcomes; 0 disables progress lines
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Number of outcomes the run is expected to produce, for progress lines
    pub fn with_expected_total(mut self, expected: usize) -> Self {
        self.expected = Some(expected);
        self.latencies.reserve(expected);
        self
    }

    pub fn recorded(&self) -> usize {
        self.successes + self.failures
    }

    pub async fn record(&mut self, outcome: CallOutcome) {
        if outcome.success {
            self.successes += 1;
            self.latencies.push(outcome.latency);
        } else {
            self.failures += 1;
            if self.failures <= FAILURE_LOG_LIMIT {
                self.logger
                    .warn(&format!(
                        "{} request failed: {}",
                        self.transport,
                        outcome.message.as_deref().unwrap_or("unknown error")
                    ))
                    .field("status", outcome.status.map(|s| s.as_str()))
                    .field("category", outcome.category.map(|c| c.as_str()))
                    .field("failure_number", self.failures)
                    .log()
                    .await;
            }
        }

        let recorded = self.recorded();
        if self.progress_interval > 0 && recorded % self.progress_interval == 0 {
            let message = match self.expected {
                Some(expected) => format!("{} progress: {}/{} requests", self.transport, recorded, expected),
                None => format!("{} progress: {} requests", self.transport, recorded),
            };
            self.logger
                .info(&message)
                .field("successful", self.successes)
                .field("failed", self.failures)
                .log()
                .await;
        }
    }

    /// Read the stream until every sender is gone and the buffer is drained
    pub async fn consume(mut self, mut outcomes: mpsc::Receiver<CallOutcome>) -> Self {
        while let Some(outcome) = outcomes.recv().await {
            self.record(outcome).await;
        }
        self
    }

    /// Produce the immutable result; `elapsed` is the run's wall-clock time
    pub fn finalize(self, elapsed: Duration) -> AggregateResult {
        build_result(
            self.transport,
            self.test_case,
            self.latencies,
            self.failures,
            elapsed,
        )
    }
}

/// Aggregate an already collected set of outcomes
pub fn summarize(
    transport: TransportKind,
    test_case: TestCase,
    outcomes: &[CallOutcome],
    elapsed: Duration,
) -> AggregateResult {
    let latencies: Vec<Duration> = outcomes.iter().filter(|o| o.success).map(|o| o.latency).collect();
    let failures = outcomes.len() - latencies.len();
    build_result(transport, test_case, latencies, failures, elapsed)
}

fn build_result(
    transport: TransportKind,
    test_case: TestCase,
    mut latencies: Vec<Duration>,
    failures: usize,
    elapsed: Duration,
) -> AggregateResult {
    let successes = latencies.len();
    let total = successes + failures;
    if total == 0 {
        return AggregateResult::zero(transport, test_case);
    }

    latencies.sort_unstable();

    let avg_latency = if successes == 0 {
        Duration::ZERO
    } else {
        let sum: u128 = latencies.iter().map(Duration::as_nanos).sum();
        Duration::from_nanos((sum / successes as u128) as u64)
    };

    let throughput = if elapsed.is_zero() {
        0.0
    } else {
        successes as f64 / elapsed.as_secs_f64()
    };

    AggregateResult {
        transport,
        test_case,
        total_requests: total,
        successful_requests: successes,
        failed_requests: failures,
        total_time: elapsed,
        avg_latency,
        min_latency: latencies.first().copied().unwrap_or_default(),
        max_latency: latencies.last().copied().unwrap_or_default(),
        p95_latency: percentile(&latencies, 0.95),
        p99_latency: percentile(&latencies, 0.99),
        throughput,
        error_rate: failures as f64 / total as f64,
        completed_at: Utc::now(),
    }
}

/// Value at index `floor(len * p)` of an ascending slice, clamped to the last element
pub fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let index = ((sorted.len() as f64) * p).floor() as usize;
    sorted[index.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCategory, RpcStatus};
    use crate::logging::LogLevel;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn failure() -> CallOutcome {
        CallOutcome::failure(Duration::ZERO, RpcStatus::Unavailable, ErrorCategory::TransientRetryable, "refused")
    }

    #[test]
    fn test_zero_outcomes() {
        let case = TestCase::new(150, 3);
        let result = summarize(TransportKind::Http3, case, &[], ms(100));

        assert_eq!(result.transport, TransportKind::Http3);
        assert_eq!(result.test_case, case);
        assert_eq!(result.total_requests, 0);
        assert_eq!(result.throughput, 0.0);
        assert_eq!(result.error_rate, 0.0);
    }

    #[test]
    fn test_all_success() {
        let outcomes: Vec<CallOutcome> = [10, 20, 30, 40].iter().map(|&v| CallOutcome::success(ms(v))).collect();
        let result = summarize(TransportKind::Http2, TestCase::default(), &outcomes, Duration::from_secs(2));

        assert_eq!(result.total_requests, 4);
        assert_eq!(result.error_rate, 0.0);
        assert_eq!(result.throughput, 2.0);
        assert_eq!(result.avg_latency, ms(25));
        assert_eq!(result.min_latency, ms(10));
        assert_eq!(result.max_latency, ms(40));
    }

    #[test]
    fn test_all_failure() {
        let outcomes = vec![failure(), failure(), failure()];
        let result = summarize(TransportKind::Http2, TestCase::default(), &outcomes, ms(50));

        assert_eq!(result.failed_requests, 3);
        assert_eq!(result.error_rate, 1.0);
        assert_eq!(result.avg_latency, Duration::ZERO);
        assert_eq!(result.min_latency, Duration::ZERO);
        assert_eq!(result.max_latency, Duration::ZERO);
        assert_eq!(result.throughput, 0.0);
    }

    #[test]
    fn test_failures_do_not_skew_min() {
        let outcomes = vec![CallOutcome::success(ms(30)), failure(), CallOutcome::success(ms(50))];
        let result = summarize(TransportKind::Http2, TestCase::default(), &outcomes, ms(100));

        assert_eq!(result.min_latency, ms(30));
        assert_eq!(result.max_latency, ms(50));
        assert_eq!(result.avg_latency, ms(40));
        assert!((result.error_rate - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_elapsed_throughput() {
        let outcomes = vec![CallOutcome::success(ms(1))];
        let result = summarize(TransportKind::Http2, TestCase::default(), &outcomes, Duration::ZERO);
        assert_eq!(result.throughput, 0.0);
    }

    #[test]
    fn test_percentile_index_selection() {
        let sorted: Vec<Duration> = (1..=100).map(ms).collect();
        assert_eq!(percentile(&sorted, 0.95), ms(96));
        assert_eq!(percentile(&sorted, 0.99), ms(100));

        let single = vec![ms(7)];
        assert_eq!(percentile(&single, 0.95), ms(7));
        assert_eq!(percentile(&single, 0.99), ms(7));

        assert_eq!(percentile(&[], 0.95), Duration::ZERO);
    }

    #[test]
    fn test_percentiles_from_unsorted_outcomes() {
        let outcomes: Vec<CallOutcome> = (1..=100).rev().map(|v| CallOutcome::success(ms(v))).collect();
        let result = summarize(TransportKind::Http2, TestCase::default(), &outcomes, Duration::from_secs(1));
        assert_eq!(result.p95_latency, ms(96));
        assert_eq!(result.p99_latency, ms(100));
    }

    #[tokio::test]
    async fn test_consume_drains_stream() {
        let (logger, _capture) = Logger::capturing("test");
        let (tx, rx) = mpsc::channel(4);

        let producer = tokio::spawn(async move {
            for v in 1..=10 {
                tx.send(CallOutcome::success(ms(v))).await.unwrap();
            }
        });

        let aggregator = ResultAggregator::new(TransportKind::Http2, TestCase::default(), logger)
            .consume(rx)
            .await;
        producer.await.unwrap();

        assert_eq!(aggregator.recorded(), 10);
        let result = aggregator.finalize(Duration::from_secs(1));
        assert_eq!(result.successful_requests, 10);
        assert_eq!(result.throughput, 10.0);
    }

    #[tokio::test]
    async fn test_only_first_failures_logged() {
        let (logger, capture) = Logger::capturing("test");
        let mut aggregator = ResultAggregator::new(TransportKind::Http3, TestCase::default(), logger);

        for _ in 0..8 {
            aggregator.record(failure()).await;
        }

        let failure_lines = capture
            .entries()
            .iter()
            .filter(|e| e.level == LogLevel::Warn && e.message.contains("request failed"))
            .count();
        assert_eq!(failure_lines, FAILURE_LOG_LIMIT);
    }

    #[tokio::test]
    async fn test_progress_logging() {
        let (logger, capture) = Logger::capturing("test");
        let mut aggregator = ResultAggregator::new(TransportKind::Http2, TestCase::default(), logger)
            .with_progress_interval(2)
            .with_expected_total(5);

        for v in 0..5 {
            aggregator.record(CallOutcome::success(ms(v))).await;
        }

        assert!(capture.contains(LogLevel::Info, "progress: 2/5"));
        assert!(capture.contains(LogLevel::Info, "progress: 4/5"));
        assert!(!capture.contains(LogLevel::Info, "progress: 5/5"));
    }
}
