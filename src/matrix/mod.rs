//! Test matrix scheduling
//!
//! For every test case the scheduler walks a fixed sequence of phases:
//! apply the condition, let it settle, benchmark the first transport, pause,
//! benchmark the second transport, pause, then move on. Phases never overlap,
//! so no two benchmark passes share the network and no pass runs under a
//! condition that is still being installed.

use crate::{
    emulation::NetworkConditionController,
    error::{AppError, Result},
    executor::BenchmarkExecutor,
    logging::Logger,
    models::{AggregateResult, BenchmarkConfig, PhaseTimings},
    output::ResultSink,
    types::{NetworkCondition, TestCase},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Phase of the matrix; the index is the test case being processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixState {
    SetConditions(usize),
    StabilizeWait(usize),
    RunTransportA(usize),
    InterTransportWait(usize),
    RunTransportB(usize),
    InterCaseWait(usize),
    Done,
}

/// A test case that was not measured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedCase {
    pub test_case: TestCase,
    pub reason: String,
}

/// Everything the matrix produced, in execution order
#[derive(Debug, Clone, Default)]
pub struct MatrixOutcome {
    pub results: Vec<AggregateResult>,
    pub skipped: Vec<SkippedCase>,
}

/// One transport's executor together with its run parameters
pub struct TransportPass {
    pub executor: Box<dyn BenchmarkExecutor>,
    pub config: BenchmarkConfig,
}

impl TransportPass {
    pub fn new(executor: Box<dyn BenchmarkExecutor>, config: BenchmarkConfig) -> Self {
        Self { executor, config }
    }
}

pub struct TestMatrixScheduler {
    controller: Arc<dyn NetworkConditionController>,
    first: TransportPass,
    second: TransportPass,
    timings: PhaseTimings,
    bandwidth_mbps: Option<u32>,
    clear_on_finish: bool,
    logger: Logger,
}

impl TestMatrixScheduler {
    pub fn new(
        controller: Arc<dyn NetworkConditionController>,
        first: TransportPass,
        second: TransportPass,
        logger: Logger,
    ) -> Self {
        Self {
            controller,
            first,
            second,
            timings: PhaseTimings::default(),
            bandwidth_mbps: None,
            clear_on_finish: true,
            logger,
        }
    }

    pub fn with_timings(mut self, timings: PhaseTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn with_bandwidth(mut self, bandwidth_mbps: Option<u32>) -> Self {
        self.bandwidth_mbps = bandwidth_mbps;
        self
    }

    pub fn with_clear_on_finish(mut self, clear_on_finish: bool) -> Self {
        self.clear_on_finish = clear_on_finish;
        self
    }

    /// Walk every test case in order and collect the results
    pub async fn run(&self, test_cases: &[TestCase]) -> MatrixOutcome {
        self.run_with_sink(test_cases, None).await
    }

    /// Like [`run`](Self::run), also handing each result to `sink` as soon as it exists
    pub async fn run_with_sink(&self, test_cases: &[TestCase], mut sink: Option<&mut dyn ResultSink>) -> MatrixOutcome {
        let mut outcome = MatrixOutcome::default();
        let mut state = if test_cases.is_empty() {
            MatrixState::Done
        } else {
            MatrixState::SetConditions(0)
        };

        self.logger
            .info(&format!("Starting test matrix with {} test cases", test_cases.len()))
            .field("controller", self.controller.name())
            .field("first_transport", self.first.executor.transport_kind().as_str())
            .field("second_transport", self.second.executor.transport_kind().as_str())
            .log()
            .await;

        loop {
            self.logger.debug(&format!("Matrix state: {:?}", state)).log().await;

            state = match state {
                MatrixState::SetConditions(index) => {
                    let case = test_cases[index];
                    self.logger
                        .info(&format!("Test case {}/{}: {}", index + 1, test_cases.len(), case))
                        .log()
                        .await;

                    let condition = NetworkCondition::from_case(case, self.bandwidth_mbps);
                    match self.controller.apply(&condition).await {
                        Ok(()) => MatrixState::StabilizeWait(index),
                        Err(e) => self.skip(&mut outcome, test_cases, index, e).await,
                    }
                }
                MatrixState::StabilizeWait(index) => match self.stabilize(test_cases[index]).await {
                    Ok(()) => MatrixState::RunTransportA(index),
                    Err(e) => self.skip(&mut outcome, test_cases, index, e).await,
                },
                MatrixState::RunTransportA(index) => {
                    self.run_pass(&self.first, test_cases[index], &mut outcome, &mut sink).await;
                    MatrixState::InterTransportWait(index)
                }
                MatrixState::InterTransportWait(index) => {
                    pause(self.timings.inter_transport_wait).await;
                    MatrixState::RunTransportB(index)
                }
                MatrixState::RunTransportB(index) => {
                    self.run_pass(&self.second, test_cases[index], &mut outcome, &mut sink).await;
                    MatrixState::InterCaseWait(index)
                }
                MatrixState::InterCaseWait(index) => {
                    if index + 1 < test_cases.len() {
                        pause(self.timings.inter_case_wait).await;
                        MatrixState::SetConditions(index + 1)
                    } else {
                        MatrixState::Done
                    }
                }
                MatrixState::Done => break,
            };
        }

        if self.clear_on_finish {
            if let Err(e) = self.controller.clear().await {
                self.logger
                    .error("Failed to clear network conditions")
                    .error_info(&e)
                    .log()
                    .await;
            }
        }

        self.logger
            .info("Test matrix completed")
            .field("results", outcome.results.len())
            .field("skipped_cases", outcome.skipped.len())
            .log()
            .await;

        outcome
    }

    /// Record a skipped case and move on without benchmarking it
    async fn skip(&self, outcome: &mut MatrixOutcome, test_cases: &[TestCase], index: usize, error: AppError) -> MatrixState {
        let case = test_cases[index];
        self.logger
            .error(&format!("Failed to set network conditions for {}, skipping test case", case))
            .error_info(&error)
            .log()
            .await;

        outcome.skipped.push(SkippedCase {
            test_case: case,
            reason: error.to_string(),
        });

        if index + 1 < test_cases.len() {
            MatrixState::SetConditions(index + 1)
        } else {
            MatrixState::Done
        }
    }

    /// Fixed wait, or poll the controller until it reports the condition
    async fn stabilize(&self, case: TestCase) -> Result<()> {
        let Some(interval) = self.timings.probe_interval else {
            self.logger
                .info(&format!("Waiting {:?} for network conditions to stabilize", self.timings.stabilize_wait))
                .log()
                .await;
            pause(self.timings.stabilize_wait).await;
            return Ok(());
        };

        let deadline = Instant::now() + self.timings.stabilize_wait;
        loop {
            match self.controller.status().await {
                Ok(status) if status.matches_case(&case) => {
                    self.logger.info(&format!("Network conditions confirmed: {}", case)).log().await;
                    return Ok(());
                }
                Ok(status) => {
                    self.logger
                        .debug("Network conditions not yet active")
                        .field("delay_ms", status.delay_ms)
                        .field("loss_pct", status.loss_pct)
                        .log()
                        .await;
                }
                Err(e) => {
                    self.logger.debug("Status probe failed").error_info(&e).log().await;
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(AppError::condition_apply(format!(
                    "Controller did not confirm {} within {:?}",
                    case, self.timings.stabilize_wait
                )));
            }
            sleep(interval.min(deadline - now)).await;
        }
    }

    async fn run_pass(
        &self,
        pass: &TransportPass,
        case: TestCase,
        outcome: &mut MatrixOutcome,
        sink: &mut Option<&mut dyn ResultSink>,
    ) {
        let kind = pass.executor.transport_kind();
        match pass.executor.run(&pass.config, case).await {
            Ok(result) => {
                if let Some(sink) = sink.as_mut() {
                    if let Err(e) = sink.append(&result) {
                        self.logger.error("Failed to record result").error_info(&e).log().await;
                    }
                }
                outcome.results.push(result);
            }
            Err(e) => {
                self.logger
                    .error(&format!("{} benchmark failed for {}", kind, case))
                    .error_info(&e)
                    .log()
                    .await;
            }
        }
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        sleep(duration).await;
    }
}
