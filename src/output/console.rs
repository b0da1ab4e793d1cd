//! Terminal summary of a finished matrix

use super::CaseComparison;
use crate::{
    matrix::SkippedCase,
    models::{AggregateResult, TransportSummary},
    types::TransportKind,
};
use colored::*;
use std::fmt::Write as _;

const RULE_WIDTH: usize = 100;

/// Renders results as aligned tables, optionally colored
pub struct ConsoleSummary {
    use_color: bool,
}

impl ConsoleSummary {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.use_color {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        if self.use_color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn transport_color(kind: TransportKind) -> Color {
        match kind {
            TransportKind::Http2 => Color::Cyan,
            TransportKind::Http3 => Color::Magenta,
        }
    }

    /// Error rates above 5% are highlighted
    fn error_rate_cell(&self, rate_pct: f64) -> String {
        let cell = format!("{:>9.2}", rate_pct);
        if rate_pct > 5.0 {
            self.paint(&cell, Color::Red)
        } else if rate_pct > 0.0 {
            self.paint(&cell, Color::Yellow)
        } else {
            self.paint(&cell, Color::Green)
        }
    }

    pub fn render(&self, results: &[AggregateResult], skipped: &[SkippedCase]) -> String {
        let mut out = String::new();
        let rule = "=".repeat(RULE_WIDTH);

        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "{}", self.heading("HTTP/2 and HTTP/3 Benchmark Results"));
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(
            out,
            "{:<8} {:>6} {:>5} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9} {:>10} {:>9}",
            "Protocol", "Delay", "Loss", "Requests", "Success", "Avg(ms)", "P95(ms)", "P99(ms)", "Max(ms)", "RPS", "Err(%)"
        );
        let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));

        for r in results {
            let protocol = self.paint(&format!("{:<8}", r.transport.as_str()), Self::transport_color(r.transport));
            let _ = writeln!(
                out,
                "{} {:>6} {:>5} {:>9} {:>9} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>10.2} {}",
                protocol,
                r.test_case.delay_ms,
                r.test_case.loss_pct,
                r.total_requests,
                r.successful_requests,
                r.avg_latency_ms(),
                r.p95_latency_ms(),
                r.p99_latency_ms(),
                r.max_latency_ms(),
                r.throughput,
                self.error_rate_cell(r.error_rate_pct()),
            );
        }

        let summaries = TransportSummary::for_all(results);
        if !summaries.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", self.heading("Per-transport averages"));
            for s in summaries {
                let _ = writeln!(
                    out,
                    "  {}: avg {:.2} ms, p95 {:.2} ms, p99 {:.2} ms, {:.2} rps, {:.2}% errors over {} cases",
                    self.paint(s.transport.as_str(), Self::transport_color(s.transport)),
                    s.avg_latency_ms,
                    s.avg_p95_latency_ms,
                    s.avg_p99_latency_ms,
                    s.avg_throughput,
                    s.avg_error_rate_pct,
                    s.cases,
                );
            }
        }

        let comparisons = CaseComparison::from_results(results);
        if !comparisons.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", self.heading("Comparison"));
            for c in comparisons {
                let diff = c.difference_ms();
                let verdict = if diff > 0.0 {
                    self.paint(&format!("HTTP/3 is {:.2} ms slower", diff), Color::Yellow)
                } else {
                    self.paint(&format!("HTTP/3 is {:.2} ms faster", -diff), Color::Green)
                };
                let _ = writeln!(
                    out,
                    "  {}: HTTP/2 {:.2} ms, HTTP/3 {:.2} ms ({})",
                    c.test_case, c.http2_avg_ms, c.http3_avg_ms, verdict
                );
            }
        }

        if !skipped.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", self.paint("Skipped test cases", Color::Red));
            for s in skipped {
                let _ = writeln!(out, "  {}: {}", s.test_case, s.reason);
            }
        }

        let _ = write!(out, "{}", rule);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::test_support::sample_results;
    use crate::types::TestCase;

    #[test]
    fn test_plain_rendering() {
        let summary = ConsoleSummary::new(false);
        let output = summary.render(&sample_results(), &[]);

        assert!(output.contains("HTTP/2 and HTTP/3 Benchmark Results"));
        assert!(output.contains("Per-transport averages"));
        assert!(output.contains("HTTP/3 is 10.00 ms faster"));
        assert!(!output.contains("\x1b["));
        assert!(!output.contains("Skipped test cases"));
    }

    #[test]
    fn test_skipped_cases_rendered() {
        let summary = ConsoleSummary::new(false);
        let skipped = vec![SkippedCase {
            test_case: TestCase::new(75, 3),
            reason: "controller unreachable".to_string(),
        }];
        let output = summary.render(&[], &skipped);

        assert!(output.contains("Skipped test cases"));
        assert!(output.contains("delay=75ms loss=3%: controller unreachable"));
        assert!(!output.contains("Per-transport averages"));
    }
}
