//! Benchmark execution engine
//!
//! This module contains the load-generation components:
//! - Deterministic distribution of a request budget across connections
//! - [`ConnectionWorker`], one task per persistent connection
//! - [`BenchmarkRunner`], which fans workers out, joins them, and hands the
//!   combined outcome stream to the aggregator

pub mod worker;

pub use worker::{ConnectionWorker, WorkerSummary};

use crate::{
    client::Transport,
    error::{AppError, ErrorClassifier, Result},
    logging::Logger,
    models::{AggregateResult, BenchmarkConfig},
    stats::ResultAggregator,
    types::{TestCase, TransportKind},
};
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Barrier};

/// Capacity of the outcome stream between workers and the aggregator
const OUTCOME_CHANNEL_CAPACITY: usize = 4096;

/// Split `requests` calls across `connections` workers.
///
/// The first `requests % connections` workers get one extra call, so the
/// quotas always sum to `requests` and differ by at most one.
pub fn distribute_quotas(requests: usize, connections: usize) -> Vec<usize> {
    if connections == 0 {
        return Vec::new();
    }

    let base = requests / connections;
    let remainder = requests % connections;

    (0..connections)
        .map(|worker| if worker < remainder { base + 1 } else { base })
        .collect()
}

/// Runs one benchmark pass for a fixed transport
#[async_trait]
pub trait BenchmarkExecutor: Send + Sync {
    fn transport_kind(&self) -> TransportKind;

    /// Run `config` to completion under `test_case`
    async fn run(&self, config: &BenchmarkConfig, test_case: TestCase) -> Result<AggregateResult>;
}

/// Generic runner over any [`Transport`]
pub struct BenchmarkRunner<T: Transport> {
    transport: Arc<T>,
    classifier: Arc<ErrorClassifier>,
    progress_interval: usize,
    logger: Logger,
}

impl<T: Transport> BenchmarkRunner<T> {
    pub fn new(transport: T, logger: Logger) -> Self {
        Self {
            transport: Arc::new(transport),
            classifier: Arc::new(ErrorClassifier::default()),
            progress_interval: 0,
            logger,
        }
    }

    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Start every worker, wait for all of them, then finalize the aggregate
    pub async fn execute(&self, config: &BenchmarkConfig, test_case: TestCase) -> Result<AggregateResult> {
        config.validate()?;

        let kind = self.transport.kind();
        if config.transport != kind {
            return Err(AppError::validation(format!(
                "Benchmark configured for {} handed to the {} runner",
                config.transport, kind
            )));
        }

        let run_id = self.logger.start_operation("benchmark_run").await;
        self.logger
            .info(&format!("Starting {} benchmark ({})", kind, test_case))
            .correlation_id(&run_id)
            .field("target", &config.target_address)
            .field("requests", config.requests)
            .field("connections", config.connections)
            .log()
            .await;

        let quotas = distribute_quotas(config.requests, config.connections);
        let (sender, receiver) = mpsc::channel(OUTCOME_CHANNEL_CAPACITY);

        let aggregator = ResultAggregator::new(kind, test_case, self.logger.child("aggregator"))
            .with_progress_interval(self.progress_interval)
            .with_expected_total(config.requests);
        let collector = tokio::spawn(aggregator.consume(receiver));

        let start_gate = Arc::new(Barrier::new(quotas.len()));
        let worker_logger = self.logger.child("worker");
        let started = Instant::now();

        let tasks: Vec<_> = quotas
            .into_iter()
            .enumerate()
            .map(|(id, quota)| {
                let worker = ConnectionWorker::new(
                    id,
                    quota,
                    config.target_address.clone(),
                    self.transport.clone(),
                    self.classifier.clone(),
                    worker_logger.clone(),
                );
                tokio::spawn(worker.run(sender.clone(), Some(start_gate.clone())))
            })
            .collect();

        // The stream closes once the last worker drops its sender
        drop(sender);

        let joined = join_all(tasks).await;
        let elapsed = started.elapsed();

        let mut unreachable_workers = 0;
        let mut reported = 0;
        for outcome in joined {
            match outcome {
                Ok(summary) => {
                    if !summary.connected {
                        unreachable_workers += 1;
                    }
                    reported += summary.succeeded + summary.failed;
                }
                Err(e) => {
                    self.logger
                        .error(&format!("Worker task aborted: {}", e))
                        .correlation_id(&run_id)
                        .log()
                        .await;
                }
            }
        }

        let aggregator = collector
            .await
            .map_err(|e| AppError::internal(format!("Result collector failed: {}", e)))?;
        let result = aggregator.finalize(elapsed);

        // Outcomes of an aborted worker are gone, the aggregate is short
        if reported != result.total_requests || result.total_requests != config.requests {
            self.logger
                .warn(&format!(
                    "Workers reported {} calls, {} were aggregated out of {} requested",
                    reported, result.total_requests, config.requests
                ))
                .correlation_id(&run_id)
                .log()
                .await;
        }

        if unreachable_workers > 0 {
            self.logger
                .warn(&format!("{} of {} workers could not connect", unreachable_workers, config.connections))
                .correlation_id(&run_id)
                .log()
                .await;
        }

        self.logger
            .info(&format!("{} benchmark completed ({})", kind, test_case))
            .correlation_id(&run_id)
            .result(&result)
            .log()
            .await;
        self.logger.end_operation(&run_id, "benchmark_run", true).await;

        Ok(result)
    }
}

#[async_trait]
impl<T: Transport> BenchmarkExecutor for BenchmarkRunner<T> {
    fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    async fn run(&self, config: &BenchmarkConfig, test_case: TestCase) -> Result<AggregateResult> {
        self.execute(config, test_case).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Connection, EchoRequest, EchoResponse};
    use crate::error::{ErrorCategory, RpcStatus};
    use crate::logging::LogLevel;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// In-process transport with scripted failures
    #[derive(Default)]
    struct FakeTransport {
        refuse_dial: bool,
        /// Every n-th call of a connection fails with UNAVAILABLE
        fail_every: Option<usize>,
        dials: AtomicUsize,
        calls: Arc<AtomicUsize>,
    }

    struct FakeConnection {
        fail_every: Option<usize>,
        seen: usize,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Transport for FakeTransport {
        type Connection = FakeConnection;

        fn kind(&self) -> TransportKind {
            TransportKind::Http2
        }

        async fn dial(&self, address: &str) -> Result<FakeConnection> {
            self.dials.fetch_add(1, Ordering::SeqCst);
            if self.refuse_dial {
                return Err(AppError::connection(format!("connection refused: {}", address)));
            }
            Ok(FakeConnection {
                fail_every: self.fail_every,
                seen: 0,
                calls: self.calls.clone(),
            })
        }
    }

    #[async_trait]
    impl Connection for FakeConnection {
        async fn call(&mut self, request: EchoRequest) -> Result<EchoResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen += 1;
            tokio::time::sleep(Duration::from_millis(1)).await;

            if matches!(self.fail_every, Some(n) if self.seen % n == 0) {
                return Err(AppError::call(RpcStatus::Unavailable, "server busy"));
            }

            Ok(EchoResponse {
                message: request.message,
                timestamp: request.timestamp,
                transport: "HTTP/2".to_string(),
            })
        }
    }

    fn bench_config(requests: usize, connections: usize) -> BenchmarkConfig {
        BenchmarkConfig {
            requests,
            connections,
            max_concurrent: 100,
            transport: TransportKind::Http2,
            target_address: "http://fake:443".to_string(),
            test_cases: vec![TestCase::default()],
        }
    }

    #[test]
    fn test_distribute_quotas_scenarios() {
        assert_eq!(distribute_quotas(10, 3), vec![4, 3, 3]);
        assert_eq!(distribute_quotas(100, 100), vec![1; 100]);
        assert_eq!(distribute_quotas(3, 5), vec![1, 1, 1, 0, 0]);
        assert!(distribute_quotas(10, 0).is_empty());
    }

    #[tokio::test]
    async fn test_runner_executes_full_budget() {
        let (logger, _capture) = Logger::capturing("test");
        let runner = BenchmarkRunner::new(FakeTransport::default(), logger);

        let result = runner.execute(&bench_config(10, 3), TestCase::new(75, 3)).await.unwrap();

        assert_eq!(result.total_requests, 10);
        assert_eq!(result.successful_requests, 10);
        assert_eq!(result.error_rate, 0.0);
        assert_eq!(result.test_case, TestCase::new(75, 3));
        assert!(result.min_latency >= Duration::from_millis(1));
        assert!(result.throughput > 0.0);
        assert_eq!(runner.transport.dials.load(Ordering::SeqCst), 3);
        assert_eq!(runner.transport.calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_throughput_uses_wall_clock() {
        let (logger, capture) = Logger::capturing("test");
        let runner = BenchmarkRunner::new(FakeTransport::default(), logger);

        let result = runner.execute(&bench_config(200, 20), TestCase::default()).await.unwrap();

        assert_eq!(result.successful_requests, 200);
        assert_eq!(
            result.throughput,
            result.successful_requests as f64 / result.total_time.as_secs_f64()
        );
        // Twenty workers in parallel finish well inside the summed call time
        assert!(result.total_time < result.avg_latency * 200);
        assert!(!capture.contains(LogLevel::Warn, "were aggregated"));
    }

    #[tokio::test]
    async fn test_idle_workers_do_not_dial() {
        let (logger, _capture) = Logger::capturing("test");
        let runner = BenchmarkRunner::new(FakeTransport::default(), logger);

        let result = runner.execute(&bench_config(2, 5), TestCase::default()).await.unwrap();

        assert_eq!(result.total_requests, 2);
        assert_eq!(runner.transport.dials.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dial_failure_fails_whole_quota() {
        let (logger, capture) = Logger::capturing("test");
        let transport = FakeTransport {
            refuse_dial: true,
            ..Default::default()
        };
        let runner = BenchmarkRunner::new(transport, logger);

        let result = runner.execute(&bench_config(10, 3), TestCase::default()).await.unwrap();

        assert_eq!(result.total_requests, 10);
        assert_eq!(result.failed_requests, 10);
        assert_eq!(result.error_rate, 1.0);
        assert_eq!(result.avg_latency, Duration::ZERO);
        assert_eq!(runner.transport.calls.load(Ordering::SeqCst), 0);
        assert!(capture.contains(LogLevel::Warn, "3 of 3 workers could not connect"));
    }

    #[tokio::test]
    async fn test_call_failures_are_counted() {
        let (logger, _capture) = Logger::capturing("test");
        let transport = FakeTransport {
            fail_every: Some(2),
            ..Default::default()
        };
        let runner = BenchmarkRunner::new(transport, logger);

        // Two workers with four calls each, every second call fails
        let result = runner.execute(&bench_config(8, 2), TestCase::default()).await.unwrap();

        assert_eq!(result.successful_requests, 4);
        assert_eq!(result.failed_requests, 4);
        assert_eq!(result.error_rate, 0.5);
    }

    #[tokio::test]
    async fn test_zero_requests_yield_zero_result() {
        let (logger, _capture) = Logger::capturing("test");
        let runner = BenchmarkRunner::new(FakeTransport::default(), logger);

        let result = runner.execute(&bench_config(0, 4), TestCase::new(225, 3)).await.unwrap();

        assert_eq!(result.total_requests, 0);
        assert_eq!(result.transport, TransportKind::Http2);
        assert_eq!(result.test_case, TestCase::new(225, 3));
    }

    #[tokio::test]
    async fn test_rejects_zero_connections() {
        let (logger, _capture) = Logger::capturing("test");
        let runner = BenchmarkRunner::new(FakeTransport::default(), logger);

        assert!(runner.execute(&bench_config(10, 0), TestCase::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_mismatched_transport() {
        let (logger, _capture) = Logger::capturing("test");
        let runner = BenchmarkRunner::new(FakeTransport::default(), logger);

        let mut config = bench_config(10, 2);
        config.transport = TransportKind::Http3;
        assert!(runner.execute(&config, TestCase::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_worker_classifies_dial_failure() {
        let (logger, _capture) = Logger::capturing("test");
        let transport = Arc::new(FakeTransport {
            refuse_dial: true,
            ..Default::default()
        });
        let worker = ConnectionWorker::new(
            0,
            3,
            "http://fake:443",
            transport,
            Arc::new(ErrorClassifier::default()),
            logger,
        );

        let (tx, mut rx) = mpsc::channel(8);
        let summary = worker.run(tx, None).await;
        assert!(!summary.connected);
        assert_eq!(summary.failed, 3);

        let mut outcomes = Vec::new();
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
        }
        assert_eq!(summary.succeeded, 0);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| !o.success && o.latency == Duration::ZERO));
        assert!(outcomes
            .iter()
            .all(|o| o.category == Some(ErrorCategory::TransientRetryable)));
    }

    #[tokio::test]
    async fn test_worker_counts_successes() {
        let (logger, capture) = Logger::capturing("test");
        let transport = Arc::new(FakeTransport {
            fail_every: Some(3),
            ..Default::default()
        });
        let worker = ConnectionWorker::new(
            2,
            6,
            "http://fake:443",
            transport,
            Arc::new(ErrorClassifier::default()),
            logger,
        );

        let (tx, mut rx) = mpsc::channel(8);
        let summary = worker.run(tx, None).await;
        assert!(summary.connected);
        assert_eq!(summary.succeeded, 4);
        assert_eq!(summary.failed, 2);

        let mut received = 0;
        while rx.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, 6);
        assert!(capture.contains(LogLevel::Trace, "Call 2-0 ok"));
    }
}
