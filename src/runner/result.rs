use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    Error,
    RetryExhausted,
}

impl ToolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::RetryExhausted => "retry_exhausted",
        }
    }
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one tool against one target, after all attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool: String,
    pub status: ToolStatus,
    /// Process exit code; -1 for launch failures, timeouts and exhausted retries.
    pub returncode: i32,
    pub attempts: u32,
    pub duration_ms: u64,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub error_message: String,
    pub output_file: Option<PathBuf>,
}

impl ToolResult {
    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }

    pub(crate) fn failed(
        tool: &str,
        status: ToolStatus,
        attempts: u32,
        elapsed: Duration,
        error_message: String,
        output_file: Option<PathBuf>,
    ) -> Self {
        Self {
            tool: tool.to_string(),
            status,
            returncode: -1,
            attempts,
            duration_ms: elapsed.as_millis() as u64,
            stdout: None,
            stderr: None,
            error_message,
            output_file,
        }
    }
}

/// Aggregate statistics over a batch of tool results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub success_rate: f64,
    pub total_duration_ms: u64,
    pub avg_duration_ms: f64,
    pub by_status: BTreeMap<ToolStatus, usize>,
}

pub fn summarize(results: &[ToolResult]) -> RunSummary {
    let total = results.len();
    if total == 0 {
        return RunSummary::default();
    }

    let successful = results.iter().filter(|r| r.is_success()).count();
    let total_duration_ms: u64 = results.iter().map(|r| r.duration_ms).sum();
    let mut by_status = BTreeMap::new();
    for result in results {
        *by_status.entry(result.status).or_insert(0) += 1;
    }

    RunSummary {
        total,
        successful,
        failed: total - successful,
        success_rate: successful as f64 / total as f64 * 100.0,
        total_duration_ms,
        avg_duration_ms: total_duration_ms as f64 / total as f64,
        by_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(tool: &str, status: ToolStatus, duration_ms: u64) -> ToolResult {
        ToolResult {
            tool: tool.to_string(),
            status,
            returncode: if status == ToolStatus::Success { 0 } else { -1 },
            attempts: 1,
            duration_ms,
            stdout: None,
            stderr: None,
            error_message: String::new(),
            output_file: None,
        }
    }

    #[test]
    fn test_summary_counts() {
        let results = vec![
            result("trivy", ToolStatus::Success, 100),
            result("semgrep", ToolStatus::Success, 300),
            result("zap", ToolStatus::Error, 200),
            result("syft", ToolStatus::RetryExhausted, 400),
        ];
        let summary = summarize(&results);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.successful, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.success_rate, 50.0);
        assert_eq!(summary.total_duration_ms, 1000);
        assert_eq!(summary.avg_duration_ms, 250.0);
        assert_eq!(summary.by_status[&ToolStatus::Success], 2);
        assert_eq!(summary.by_status[&ToolStatus::Error], 1);
        assert_eq!(summary.by_status[&ToolStatus::RetryExhausted], 1);
    }

    #[test]
    fn test_summary_empty() {
        let summary = summarize(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.success_rate, 0.0);
        assert!(summary.by_status.is_empty());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ToolStatus::RetryExhausted).unwrap();
        assert_eq!(json, "\"retry_exhausted\"");
        assert_eq!(format!("{}", ToolStatus::Success), "success");
    }

    #[test]
    fn test_summary_serializes_status_keys() {
        let summary = summarize(&[result("trivy", ToolStatus::Success, 5)]);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["by_status"]["success"], 1);
    }
}
