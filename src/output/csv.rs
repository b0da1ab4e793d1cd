//! CSV results file, one row per aggregate result

use super::ResultSink;
use crate::{
    error::{AppError, ErrorContext, Result},
    models::AggregateResult,
};
use csv::Writer;
use std::fs::File;
use std::path::{Path, PathBuf};

pub const CSV_HEADER: &str = "Protocol,Delay(ms),Loss(%),TotalRequests,SuccessfulReqs,FailedReqs,TotalTime(ms),AvgLatency(ms),MinLatency(ms),MaxLatency(ms),P95Latency(ms),P99Latency(ms),Throughput(rps),ErrorRate(%)";

/// Appends rows as results arrive, so a crash keeps what was measured
pub struct CsvWriter {
    path: PathBuf,
    writer: Writer<File>,
}

impl CsvWriter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;

        let mut writer = Writer::from_writer(file);
        writer
            .write_record(CSV_HEADER.split(','))
            .map_err(|e| AppError::report(format!("Failed to write {}: {}", path.display(), e)))?;
        writer.flush()?;

        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(result: &AggregateResult) -> [String; 14] {
        [
            result.transport.to_string(),
            result.test_case.delay_ms.to_string(),
            result.test_case.loss_pct.to_string(),
            result.total_requests.to_string(),
            result.successful_requests.to_string(),
            result.failed_requests.to_string(),
            format!("{:.2}", result.total_time_ms()),
            format!("{:.2}", result.avg_latency_ms()),
            format!("{:.2}", result.min_latency_ms()),
            format!("{:.2}", result.max_latency_ms()),
            format!("{:.2}", result.p95_latency_ms()),
            format!("{:.2}", result.p99_latency_ms()),
            format!("{:.2}", result.throughput),
            format!("{:.2}", result.error_rate_pct()),
        ]
    }

    pub fn format_row(result: &AggregateResult) -> String {
        Self::record(result).join(",")
    }
}

impl ResultSink for CsvWriter {
    fn append(&mut self, result: &AggregateResult) -> Result<()> {
        self.writer
            .write_record(Self::record(result))
            .map_err(|e| AppError::report(format!("Failed to write {}: {}", self.path.display(), e)))?;
        self.writer.flush()?;
        Ok(())
    }
}
