//! Markdown performance report

use super::{CaseComparison, ResultSink};
use crate::{
    error::{ErrorContext, Result},
    matrix::SkippedCase,
    models::{AggregateResult, TransportSummary},
};
use chrono::Local;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Collects results and writes the report once the matrix is done
pub struct MarkdownReport {
    path: PathBuf,
    results: Vec<AggregateResult>,
}

impl MarkdownReport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            results: Vec::new(),
        }
    }

    pub fn render(results: &[AggregateResult], skipped: &[SkippedCase]) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "# HTTP/2 vs HTTP/3 Performance Report");
        let _ = writeln!(out);
        let _ = writeln!(out, "Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out);

        let _ = writeln!(out, "## Summary");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "| Protocol | Cases | Requests | Avg Latency (ms) | Avg P95 (ms) | Avg P99 (ms) | Avg Throughput (rps) | Avg Error Rate (%) |"
        );
        let _ = writeln!(out, "|---|---|---|---|---|---|---|---|");
        for summary in TransportSummary::for_all(results) {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} |",
                summary.transport,
                summary.cases,
                summary.total_requests,
                summary.avg_latency_ms,
                summary.avg_p95_latency_ms,
                summary.avg_p99_latency_ms,
                summary.avg_throughput,
                summary.avg_error_rate_pct,
            );
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "## Detailed Results");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "| Protocol | Delay (ms) | Loss (%) | Requests | Success | Failed | Avg (ms) | Min (ms) | Max (ms) | P95 (ms) | P99 (ms) | Throughput (rps) | Error Rate (%) |"
        );
        let _ = writeln!(out, "|---|---|---|---|---|---|---|---|---|---|---|---|---|");
        for r in results {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} | {} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} |",
                r.transport,
                r.test_case.delay_ms,
                r.test_case.loss_pct,
                r.total_requests,
                r.successful_requests,
                r.failed_requests,
                r.avg_latency_ms(),
                r.min_latency_ms(),
                r.max_latency_ms(),
                r.p95_latency_ms(),
                r.p99_latency_ms(),
                r.throughput,
                r.error_rate_pct(),
            );
        }

        let comparisons = CaseComparison::from_results(results);
        if !comparisons.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "## Comparison");
            let _ = writeln!(out);
            for c in comparisons {
                let diff = c.difference_ms();
                let verdict = if diff > 0.0 {
                    format!("HTTP/3 is {:.2} ms slower than HTTP/2", diff)
                } else {
                    format!("HTTP/3 is {:.2} ms faster than HTTP/2", -diff)
                };
                let _ = writeln!(
                    out,
                    "- **{}**: HTTP/2 {:.2} ms, HTTP/3 {:.2} ms. {}",
                    c.test_case, c.http2_avg_ms, c.http3_avg_ms, verdict
                );
            }
        }

        if !skipped.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "## Skipped Test Cases");
            let _ = writeln!(out);
            for s in skipped {
                let _ = writeln!(out, "- {}: {}", s.test_case, s.reason);
            }
        }

        out
    }
}

impl ResultSink for MarkdownReport {
    fn append(&mut self, result: &AggregateResult) -> Result<()> {
        self.results.push(result.clone());
        Ok(())
    }

    fn finish(&mut self, skipped: &[SkippedCase]) -> Result<()> {
        let report = Self::render(&self.results, skipped);
        std::fs::write(&self.path, report).with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::test_support::sample_results;
    use crate::types::TestCase;

    #[test]
    fn test_report_sections() {
        let report = MarkdownReport::render(&sample_results(), &[]);

        assert!(report.starts_with("# HTTP/2 vs HTTP/3 Performance Report"));
        assert!(report.contains("## Summary"));
        assert!(report.contains("| HTTP/2 | 2 | 2000 | 82.00 |"));
        assert!(report.contains("| HTTP/3 | 75 | 3 | 1000 | 990 | 10 | 150.00 |"));
        assert!(report.contains("HTTP/3 is 2.00 ms slower than HTTP/2"));
        assert!(report.contains("HTTP/3 is 10.00 ms faster than HTTP/2"));
        assert!(!report.contains("## Skipped Test Cases"));
    }

    #[test]
    fn test_report_lists_skipped_cases() {
        let skipped = vec![SkippedCase {
            test_case: TestCase::new(225, 3),
            reason: "router returned status 500".to_string(),
        }];
        let report = MarkdownReport::render(&sample_results(), &skipped);

        assert!(report.contains("## Skipped Test Cases"));
        assert!(report.contains("- delay=225ms loss=3%: router returned status 500"));
    }
}
