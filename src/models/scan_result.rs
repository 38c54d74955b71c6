use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::runner::ToolResult;
use super::targets::TargetType;

/// Per-tool success flags for one target, plus attempt counts for tools
/// that needed more than one launch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolStatuses {
    #[serde(rename = "__attempts__", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attempts: BTreeMap<String, u32>,
    #[serde(flatten)]
    pub statuses: BTreeMap<String, bool>,
}

impl ToolStatuses {
    pub fn get(&self, tool: &str) -> Option<bool> {
        self.statuses.get(tool).copied()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

/// The result of scanning a single target with all applicable tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Path, image ref, URL, GitLab path or `context:namespace`.
    pub target_id: String,
    pub target_type: TargetType,
    pub tool_statuses: ToolStatuses,
    /// Output file per tool, where known.
    pub output_files: BTreeMap<String, PathBuf>,
    /// Errors collected across tools, in the order they were recorded.
    pub errors: Vec<String>,
    pub duration_ms: u64,
    pub metadata: BTreeMap<String, String>,
}

impl ScanResult {
    pub fn new(target_id: impl Into<String>, target_type: TargetType) -> Self {
        Self {
            target_id: target_id.into(),
            target_type,
            tool_statuses: ToolStatuses::default(),
            output_files: BTreeMap::new(),
            errors: Vec::new(),
            duration_ms: 0,
            metadata: BTreeMap::new(),
        }
    }

    /// Record the outcome of one tool run.
    pub fn record(&mut self, result: &ToolResult) {
        self.tool_statuses
            .statuses
            .insert(result.tool.clone(), result.is_success());
        if result.attempts > 1 {
            self.tool_statuses
                .attempts
                .insert(result.tool.clone(), result.attempts);
        }
        if let Some(path) = &result.output_file {
            self.output_files.insert(result.tool.clone(), path.clone());
        }
        if !result.is_success() {
            self.errors.push(result.error_message.clone());
        }
    }

    /// Record a tool that is not installed and got a placeholder output.
    pub fn record_stub(&mut self, tool: &str, output_file: PathBuf) {
        self.tool_statuses.statuses.insert(tool.to_string(), true);
        self.output_files.insert(tool.to_string(), output_file);
        let stubbed = self.metadata.entry("stubbed_tools".to_string()).or_default();
        if !stubbed.is_empty() {
            stubbed.push(',');
        }
        stubbed.push_str(tool);
    }

    pub fn failed_tools(&self) -> Vec<&str> {
        self.tool_statuses
            .statuses
            .iter()
            .filter(|(_, ok)| !**ok)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// No errors and every recorded tool succeeded (or was stubbed).
    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty() && self.tool_statuses.statuses.values().all(|ok| *ok)
    }
}

/// Everything one `scan` invocation produced. Serialized as `scan-summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tools: Vec<String>,
    pub results: Vec<ScanResult>,
    pub duration_ms: u64,
}

impl ScanReport {
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(ScanResult::all_succeeded)
    }

    /// Failed tool runs across all targets. A target that could not be
    /// scanned at all counts once.
    pub fn failed_tool_count(&self) -> usize {
        self.results
            .iter()
            .map(|r| match r.failed_tools().len() {
                0 if !r.errors.is_empty() => 1,
                n => n,
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ToolStatus;

    fn tool_result(tool: &str, status: ToolStatus, attempts: u32) -> ToolResult {
        ToolResult {
            tool: tool.to_string(),
            status,
            returncode: 0,
            attempts,
            duration_ms: 10,
            stdout: None,
            stderr: None,
            error_message: if status == ToolStatus::Success {
                String::new()
            } else {
                format!("{} failed", tool)
            },
            output_file: Some(PathBuf::from(format!("/r/{}.json", tool))),
        }
    }

    #[test]
    fn test_record_success_and_failure() {
        let mut result = ScanResult::new("/src/app", TargetType::Repo);
        result.record(&tool_result("trivy", ToolStatus::Success, 1));
        result.record(&tool_result("semgrep", ToolStatus::RetryExhausted, 3));

        assert_eq!(result.tool_statuses.get("trivy"), Some(true));
        assert_eq!(result.tool_statuses.get("semgrep"), Some(false));
        assert_eq!(result.tool_statuses.attempts.get("semgrep"), Some(&3));
        assert!(!result.tool_statuses.attempts.contains_key("trivy"));
        assert_eq!(result.errors, vec!["semgrep failed".to_string()]);
        assert_eq!(result.failed_tools(), vec!["semgrep"]);
        assert!(!result.all_succeeded());
    }

    #[test]
    fn test_record_stub() {
        let mut result = ScanResult::new("nginx:latest", TargetType::Image);
        result.record_stub("syft", PathBuf::from("/r/syft.json"));
        result.record_stub("trivy", PathBuf::from("/r/trivy.json"));
        assert_eq!(result.tool_statuses.get("syft"), Some(true));
        assert_eq!(result.metadata["stubbed_tools"], "syft,trivy");
        assert!(result.all_succeeded());
    }

    #[test]
    fn test_statuses_serialize_with_attempts_key() {
        let mut result = ScanResult::new("/src/app", TargetType::Repo);
        result.record(&tool_result("trivy", ToolStatus::Success, 2));
        let json = serde_json::to_value(&result.tool_statuses).unwrap();
        assert_eq!(json["trivy"], true);
        assert_eq!(json["__attempts__"]["trivy"], 2);
    }

    #[test]
    fn test_report_failed_tool_count() {
        let mut ok = ScanResult::new("/src/a", TargetType::Repo);
        ok.record(&tool_result("trivy", ToolStatus::Success, 1));

        let mut partial = ScanResult::new("/src/b", TargetType::Repo);
        partial.record(&tool_result("trivy", ToolStatus::Success, 1));
        partial.record(&tool_result("semgrep", ToolStatus::Error, 1));
        partial.record(&tool_result("bandit", ToolStatus::RetryExhausted, 2));

        let mut unscannable = ScanResult::new("ftp://x", TargetType::Url);
        unscannable.errors.push("unsupported URL scheme".into());

        let now = Utc::now();
        let report = ScanReport {
            scan_id: "id".into(),
            started_at: now,
            finished_at: now,
            tools: vec![],
            results: vec![ok, partial, unscannable],
            duration_ms: 0,
        };
        assert_eq!(report.failed_tool_count(), 3);
        assert!(!report.all_succeeded());
    }

    #[test]
    fn test_statuses_omit_empty_attempts() {
        let mut result = ScanResult::new("/src/app", TargetType::Repo);
        result.record(&tool_result("trivy", ToolStatus::Success, 1));
        let json = serde_json::to_value(&result.tool_statuses).unwrap();
        assert!(json.get("__attempts__").is_none());
    }
}
