//! A single connection worker

use crate::{
    client::{Connection, EchoRequest, Transport},
    error::ErrorClassifier,
    logging::{LogLevel, Logger},
    models::CallOutcome,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Barrier};

/// What one worker did, returned when its task finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSummary {
    pub worker_id: usize,
    pub quota: usize,
    /// Whether the dial succeeded; `true` for idle workers that never dialed
    pub connected: bool,
    pub succeeded: usize,
    pub failed: usize,
}

/// Owns one connection and issues its quota of calls strictly in sequence
pub struct ConnectionWorker<T: Transport> {
    id: usize,
    quota: usize,
    address: String,
    transport: Arc<T>,
    classifier: Arc<ErrorClassifier>,
    logger: Logger,
}

impl<T: Transport> ConnectionWorker<T> {
    pub fn new(
        id: usize,
        quota: usize,
        address: impl Into<String>,
        transport: Arc<T>,
        classifier: Arc<ErrorClassifier>,
        logger: Logger,
    ) -> Self {
        Self {
            id,
            quota,
            address: address.into(),
            transport,
            classifier,
            logger,
        }
    }

    /// Run the quota, emitting exactly one outcome per assigned call.
    ///
    /// If `start_gate` is given the worker waits on it first, so no worker
    /// can finish before every worker of the run has been started.
    pub async fn run(self, outcomes: mpsc::Sender<CallOutcome>, start_gate: Option<Arc<Barrier>>) -> WorkerSummary {
        if let Some(gate) = start_gate {
            gate.wait().await;
        }

        let mut summary = WorkerSummary {
            worker_id: self.id,
            quota: self.quota,
            connected: true,
            succeeded: 0,
            failed: 0,
        };

        if self.quota == 0 {
            return summary;
        }

        let mut connection = match self.transport.dial(&self.address).await {
            Ok(connection) => connection,
            Err(e) => {
                // Fail fast: the whole quota is lost, nothing is retried
                summary.connected = false;
                self.logger
                    .warn(&format!("Worker {} failed to connect to {}", self.id, self.address))
                    .field("worker_id", self.id)
                    .field("quota", self.quota)
                    .error_info(&e)
                    .log()
                    .await;

                let status = e.rpc_status();
                let category = self.classifier.classify(&e);
                let message = e.to_string();
                for _ in 0..self.quota {
                    let outcome = CallOutcome::failure(Duration::ZERO, status, category, message.clone());
                    if outcomes.send(outcome).await.is_err() {
                        break;
                    }
                    summary.failed += 1;
                }
                return summary;
            }
        };

        let kind = self.transport.kind();
        for sequence in 0..self.quota {
            let request = EchoRequest::for_call(kind, self.id, sequence);

            let started = Instant::now();
            let result = connection.call(request).await;
            let latency = started.elapsed();

            let outcome = match result {
                Ok(_) => {
                    summary.succeeded += 1;
                    if self.logger.would_log(LogLevel::Trace) {
                        self.logger
                            .trace(&format!("Call {}-{} ok", self.id, sequence))
                            .field("latency_us", latency.as_micros() as u64)
                            .log()
                            .await;
                    }
                    CallOutcome::success(latency)
                }
                Err(e) => {
                    summary.failed += 1;
                    self.logger
                        .debug(&format!("Call {}-{} failed", self.id, sequence))
                        .error_info(&e)
                        .log()
                        .await;
                    CallOutcome::failure(latency, e.rpc_status(), self.classifier.classify(&e), e.to_string())
                }
            };

            if outcomes.send(outcome).await.is_err() {
                self.logger
                    .error(&format!("Worker {} lost its result stream, stopping", self.id))
                    .log()
                    .await;
                break;
            }
        }

        summary
    }
}
