pub mod definition;
pub mod execute;
pub mod result;
pub mod retry;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info};

pub use definition::{ToolDefinition, ToolDefinitionBuilder, DEFAULT_OK_RETURN_CODES};
pub use execute::run_tool;
pub use result::{summarize, RunSummary, ToolResult, ToolStatus};
pub use retry::{AttemptFailure, RetryPolicy, DEFAULT_RETRY_DELAY};

pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Executes a batch of tool definitions, one batch per runner.
///
/// A runner is consumed by `run_all_serial` / `run_all_parallel`; every
/// worker task it spawns is joined before those return.
pub struct ToolRunner {
    tools: Vec<ToolDefinition>,
    max_workers: usize,
    retry: RetryPolicy,
}

impl ToolRunner {
    pub fn new(tools: Vec<ToolDefinition>) -> Self {
        Self {
            tools,
            max_workers: DEFAULT_MAX_WORKERS,
            retry: RetryPolicy::default(),
        }
    }

    /// Values below 1 are raised to 1.
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn run_all_serial(self) -> Vec<ToolResult> {
        let mut results = Vec::with_capacity(self.tools.len());
        for tool in &self.tools {
            results.push(run_tool(tool, &self.retry).await);
        }
        log_batch("serial", &results);
        results
    }

    /// Run every tool, at most `max_workers` at a time. One result per tool,
    /// whatever happens to the others.
    pub async fn run_all_parallel(self) -> Vec<ToolResult> {
        if self.tools.is_empty() {
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        debug!(tools = self.tools.len(), max_workers = self.max_workers, "Starting tool pool");

        let handles: Vec<_> = self
            .tools
            .into_iter()
            .map(|tool| {
                let name = tool.name().to_string();
                let output_file = tool.output_file().map(|p| p.to_path_buf());
                let semaphore = semaphore.clone();
                let retry = self.retry.clone();
                let handle = tokio::spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            return ToolResult::failed(
                                tool.name(),
                                ToolStatus::Error,
                                0,
                                Duration::ZERO,
                                format!("{}: worker pool closed before launch", tool.name()),
                                tool.output_file().map(|p| p.to_path_buf()),
                            )
                        }
                    };
                    run_tool(&tool, &retry).await
                });
                (name, output_file, handle)
            })
            .collect();

        let joined = futures::future::join_all(handles.into_iter().map(
            |(name, output_file, handle)| async move { (name, output_file, handle.await) },
        ))
        .await;

        let results: Vec<ToolResult> = joined
            .into_iter()
            .map(|(name, output_file, joined)| match joined {
                Ok(result) => result,
                Err(e) => {
                    error!(tool = %name, error = %e, "Tool task panicked");
                    crashed(&name, output_file, &e)
                }
            })
            .collect();

        log_batch("parallel", &results);
        results
    }

    /// Aggregate statistics for a batch of results.
    pub fn summary(results: &[ToolResult]) -> RunSummary {
        summarize(results)
    }
}

fn crashed(name: &str, output_file: Option<PathBuf>, err: &tokio::task::JoinError) -> ToolResult {
    ToolResult::failed(
        name,
        ToolStatus::Error,
        1,
        Duration::ZERO,
        format!("{}: worker task failed: {}", name, err),
        output_file,
    )
}

fn log_batch(mode: &str, results: &[ToolResult]) {
    let summary = summarize(results);
    info!(
        mode,
        total = summary.total,
        successful = summary.successful,
        failed = summary.failed,
        duration_ms = summary.total_duration_ms,
        "Tool batch complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str, argv: &[&str]) -> ToolDefinition {
        ToolDefinition::builder(name, argv.iter().map(|s| s.to_string()).collect())
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_empty_runner() {
        assert!(ToolRunner::new(vec![]).run_all_parallel().await.is_empty());
        assert!(ToolRunner::new(vec![]).run_all_serial().await.is_empty());
    }

    #[test]
    fn test_max_workers_floor() {
        let runner = ToolRunner::new(vec![]).with_max_workers(0);
        assert_eq!(runner.max_workers, 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_serial_preserves_order() {
        let tools = vec![tool("first", &["true"]), tool("second", &["false"]), tool("third", &["true"])];
        let results = ToolRunner::new(tools)
            .with_retry_policy(RetryPolicy::immediate())
            .run_all_serial()
            .await;
        let names: Vec<_> = results.iter().map(|r| r.tool.as_str()).collect();
        assert_eq!(names, ["first", "second", "third"]);
        // `false` exits 1, which is an acceptable code by default
        assert!(results.iter().all(|r| r.is_success()));
    }
}
