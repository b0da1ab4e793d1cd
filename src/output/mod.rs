//! Result reporting
//!
//! The matrix hands its ordered results to one or more sinks. File sinks write
//! into a timestamped directory per benchmark session; the console summary
//! renders the same data for the terminal.

mod console;
mod csv;
mod json;
mod markdown;

pub use console::ConsoleSummary;
pub use csv::CsvWriter;
pub use json::JsonWriter;
pub use markdown::MarkdownReport;

use crate::{
    error::{ErrorContext, Result},
    matrix::SkippedCase,
    models::AggregateResult,
    types::{TestCase, TransportKind},
};
use chrono::Local;
use std::path::{Path, PathBuf};

pub const CSV_FILE_NAME: &str = "benchmark_results.csv";
pub const MARKDOWN_FILE_NAME: &str = "performance_report.md";
pub const JSON_FILE_NAME: &str = "benchmark_results.json";

/// Consumer of the matrix's ordered results
pub trait ResultSink: Send {
    fn append(&mut self, result: &AggregateResult) -> Result<()>;

    /// Called once after the last result
    fn finish(&mut self, _skipped: &[SkippedCase]) -> Result<()> {
        Ok(())
    }
}

/// All file reports of one session, written into one directory
pub struct ReportWriter {
    dir: PathBuf,
    sinks: Vec<Box<dyn ResultSink>>,
}

impl ReportWriter {
    /// Create `<output_dir>/benchmark_<YYYYmmdd_HHMMSS>` and open every report in it
    pub fn create(output_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = output_dir
            .as_ref()
            .join(Local::now().format("benchmark_%Y%m%d_%H%M%S").to_string());
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create report directory {}", dir.display()))?;

        let sinks: Vec<Box<dyn ResultSink>> = vec![
            Box::new(CsvWriter::create(dir.join(CSV_FILE_NAME))?),
            Box::new(MarkdownReport::new(dir.join(MARKDOWN_FILE_NAME))),
            Box::new(JsonWriter::new(dir.join(JSON_FILE_NAME))),
        ];

        Ok(Self { dir, sinks })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ResultSink for ReportWriter {
    fn append(&mut self, result: &AggregateResult) -> Result<()> {
        for sink in &mut self.sinks {
            sink.append(result)?;
        }
        Ok(())
    }

    fn finish(&mut self, skipped: &[SkippedCase]) -> Result<()> {
        for sink in &mut self.sinks {
            sink.finish(skipped)?;
        }
        Ok(())
    }
}

/// HTTP/2 and HTTP/3 averages side by side for one test case
#[derive(Debug, Clone, PartialEq)]
pub struct CaseComparison {
    pub test_case: TestCase,
    pub http2_avg_ms: f64,
    pub http3_avg_ms: f64,
}

impl CaseComparison {
    /// Positive when HTTP/3 is slower
    pub fn difference_ms(&self) -> f64 {
        self.http3_avg_ms - self.http2_avg_ms
    }

    /// Cases measured with both transports, in first-seen order
    pub fn from_results(results: &[AggregateResult]) -> Vec<Self> {
        let mut cases: Vec<TestCase> = Vec::new();
        for result in results {
            if !cases.contains(&result.test_case) {
                cases.push(result.test_case);
            }
        }

        let avg_for = |kind: TransportKind, case: TestCase| {
            results
                .iter()
                .find(|r| r.transport == kind && r.test_case == case)
                .map(AggregateResult::avg_latency_ms)
        };

        cases
            .into_iter()
            .filter_map(|case| {
                Some(Self {
                    test_case: case,
                    http2_avg_ms: avg_for(TransportKind::Http2, case)?,
                    http3_avg_ms: avg_for(TransportKind::Http3, case)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::time::Duration;

    pub fn sample_result(transport: TransportKind, delay_ms: u32, avg_ms: u64) -> AggregateResult {
        AggregateResult {
            total_requests: 1000,
            successful_requests: 990,
            failed_requests: 10,
            total_time: Duration::from_millis(2500),
            avg_latency: Duration::from_millis(avg_ms),
            min_latency: Duration::from_millis(avg_ms / 2),
            max_latency: Duration::from_millis(avg_ms * 4),
            p95_latency: Duration::from_millis(avg_ms * 2),
            p99_latency: Duration::from_millis(avg_ms * 3),
            throughput: 396.0,
            error_rate: 0.01,
            ..AggregateResult::zero(transport, TestCase::new(delay_ms, 3))
        }
    }

    pub fn sample_results() -> Vec<AggregateResult> {
        vec![
            sample_result(TransportKind::Http2, 0, 4),
            sample_result(TransportKind::Http3, 0, 6),
            sample_result(TransportKind::Http2, 75, 160),
            sample_result(TransportKind::Http3, 75, 150),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_case_comparisons() {
        let mut results = sample_results();
        results.push(sample_result(TransportKind::Http2, 150, 300));

        let comparisons = CaseComparison::from_results(&results);
        assert_eq!(comparisons.len(), 2);
        assert_eq!(comparisons[0].test_case, TestCase::new(0, 3));
        assert_eq!(comparisons[0].difference_ms(), 2.0);
        assert_eq!(comparisons[1].difference_ms(), -10.0);
    }

    #[test]
    fn test_report_writer_creates_all_files() {
        let temp = TempDir::new().unwrap();
        let mut writer = ReportWriter::create(temp.path()).unwrap();

        for result in sample_results() {
            writer.append(&result).unwrap();
        }
        writer.finish(&[]).unwrap();

        let dir = writer.dir();
        assert!(dir.starts_with(temp.path()));
        assert!(dir
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("benchmark_")));
        for name in [CSV_FILE_NAME, MARKDOWN_FILE_NAME, JSON_FILE_NAME] {
            assert!(dir.join(name).exists(), "missing {}", name);
        }
    }
}
