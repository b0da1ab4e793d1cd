//! JSON dump of the full session

use super::ResultSink;
use crate::{
    error::{ErrorContext, Result},
    matrix::SkippedCase,
    models::{AggregateResult, TransportSummary},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: DateTime<Utc>,
    results: &'a [AggregateResult],
    summaries: Vec<TransportSummary>,
    skipped: &'a [SkippedCase],
}

pub struct JsonWriter {
    path: PathBuf,
    results: Vec<AggregateResult>,
}

impl JsonWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            results: Vec::new(),
        }
    }
}

impl ResultSink for JsonWriter {
    fn append(&mut self, result: &AggregateResult) -> Result<()> {
        self.results.push(result.clone());
        Ok(())
    }

    fn finish(&mut self, skipped: &[SkippedCase]) -> Result<()> {
        let report = JsonReport {
            generated_at: Utc::now(),
            results: &self.results,
            summaries: TransportSummary::for_all(&self.results),
            skipped,
        };

        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&self.path, json).with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::test_support::sample_results;
    use crate::types::TestCase;
    use tempfile::TempDir;

    #[test]
    fn test_json_report_contents() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("results.json");

        let mut writer = JsonWriter::new(&path);
        for result in sample_results() {
            writer.append(&result).unwrap();
        }
        writer
            .finish(&[SkippedCase {
                test_case: TestCase::new(150, 3),
                reason: "router unreachable".to_string(),
            }])
            .unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["results"].as_array().unwrap().len(), 4);
        assert_eq!(value["results"][1]["transport"], "HTTP/3");
        assert_eq!(value["summaries"].as_array().unwrap().len(), 2);
        assert_eq!(value["skipped"][0]["reason"], "router unreachable");
    }
}
