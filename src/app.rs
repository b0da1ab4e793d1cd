//! Main application orchestration and execution

use crate::{
    client::{Http2Transport, Http3Transport, TransportSettings},
    config::{display_config_summary, validate_config, ValidationLevel},
    emulation::{InMemoryController, NetworkConditionController, RouterController},
    error::Result,
    executor::BenchmarkRunner,
    logging::Logger,
    matrix::{MatrixOutcome, TestMatrixScheduler, TransportPass},
    models::Config,
    output::{ConsoleSummary, ReportWriter, ResultSink},
    types::TransportKind,
};
use std::sync::Arc;

/// Main application struct that coordinates all components
pub struct App {
    config: Config,
    logger: Logger,
}

impl App {
    /// Create a new application instance from a resolved configuration
    pub fn new(config: Config) -> Self {
        let logger = Logger::with_config("rtb", &config);
        Self { config, logger }
    }

    /// Replace the root logger
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Run the full test matrix, write reports and print the summary
    pub async fn run(self) -> Result<MatrixOutcome> {
        let config = &self.config;
        let logger = &self.logger;

        logger.set_session_id(uuid::Uuid::new_v4().to_string()).await;
        logger.add_context_field("target_host", &config.target_host).await;

        logger
            .info(&format!("RPC Transport Bench v{}", crate::VERSION))
            .field("commit", crate::GIT_COMMIT)
            .field("built", crate::BUILD_TIME)
            .log()
            .await;

        for warning in validate_config(config)? {
            let entry = match warning.level {
                ValidationLevel::Info => logger.info(&warning.message),
                ValidationLevel::Warning => logger.warn(&warning.message),
                ValidationLevel::Error => logger.error(&warning.message),
            };
            entry.log().await;
        }

        if config.debug {
            println!("\nConfiguration Summary:");
            println!("{}\n", display_config_summary(config));
        }

        let controller = self.build_controller()?;
        let settings = TransportSettings::from_config(config);

        if !Http3Transport::is_supported() {
            logger
                .warn("HTTP/3 support is not compiled in; HTTP/3 runs will record every call as failed")
                .log()
                .await;
        }

        let first = TransportPass::new(
            Box::new(
                BenchmarkRunner::new(Http2Transport::new(settings.clone()), logger.child("http2"))
                    .with_progress_interval(config.progress_interval),
            ),
            config.benchmark_config(TransportKind::Http2),
        );
        let second = TransportPass::new(
            Box::new(
                BenchmarkRunner::new(Http3Transport::new(settings), logger.child("http3"))
                    .with_progress_interval(config.progress_interval),
            ),
            config.benchmark_config(TransportKind::Http3),
        );

        let scheduler = TestMatrixScheduler::new(controller, first, second, logger.child("matrix"))
            .with_timings(config.phase_timings())
            .with_bandwidth(config.bandwidth_mbps)
            .with_clear_on_finish(config.clear_on_finish);

        let outcome = if config.write_reports {
            let mut writer = ReportWriter::create(&config.output_dir)?;
            logger
                .info("Writing reports")
                .field("dir", writer.dir().display().to_string())
                .log()
                .await;

            let outcome = scheduler
                .run_with_sink(&config.test_cases, Some(&mut writer as &mut dyn ResultSink))
                .await;
            writer.finish(&outcome.skipped)?;

            logger
                .info(&format!("Reports written to {}", writer.dir().display()))
                .log()
                .await;
            outcome
        } else {
            scheduler.run(&config.test_cases).await
        };

        println!(
            "{}",
            ConsoleSummary::new(config.enable_color).render(&outcome.results, &outcome.skipped)
        );

        Ok(outcome)
    }

    fn build_controller(&self) -> Result<Arc<dyn NetworkConditionController>> {
        match &self.config.controller_url {
            Some(url) => Ok(Arc::new(RouterController::new(
                url,
                self.config.connect_timeout(),
                self.logger.child("controller"),
            )?)),
            None => Ok(Arc::new(InMemoryController::new())),
        }
    }
}
