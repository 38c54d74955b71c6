pub mod catalog;
pub mod gitlab;
pub mod iac;
pub mod image;
pub mod k8s;
pub mod repo;
pub mod url;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::{ScanConfig, ToolSettings};
use crate::errors::WardenError;
use crate::models::{ScanResult, TargetType};
use crate::runner::{RetryPolicy, ToolDefinition, ToolDefinitionBuilder, ToolRunner, DEFAULT_MAX_WORKERS};
use crate::utils::{sanitize_path_component, validate_output_path, SystemPath, ToolLocator};

pub use gitlab::GitlabScanner;
pub use iac::IacScanner;
pub use image::ImageScanner;
pub use k8s::K8sScanner;
pub use repo::RepoScanner;
pub use url::UrlScanner;

/// Everything a scanner needs besides the target itself.
#[derive(Clone)]
pub struct ScanContext {
    pub results_dir: PathBuf,
    pub timeout: Duration,
    pub retries: u32,
    pub max_workers: usize,
    pub allow_missing_tools: bool,
    pub per_tool: BTreeMap<String, ToolSettings>,
    pub retry_policy: RetryPolicy,
    pub locator: Arc<dyn ToolLocator>,
    pub gitlab_url: String,
    pub gitlab_token: Option<String>,
}

impl ScanContext {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
            timeout: crate::runner::definition::DEFAULT_TOOL_TIMEOUT,
            retries: 0,
            max_workers: DEFAULT_MAX_WORKERS,
            allow_missing_tools: false,
            per_tool: BTreeMap::new(),
            retry_policy: RetryPolicy::default(),
            locator: Arc::new(SystemPath),
            gitlab_url: crate::config::settings::DEFAULT_GITLAB_URL.to_string(),
            gitlab_token: None,
        }
    }

    pub fn from_config(config: &ScanConfig, max_workers: usize) -> Self {
        Self {
            results_dir: config.results_dir.clone(),
            timeout: config.timeout,
            retries: config.retries,
            max_workers: max_workers.max(1),
            allow_missing_tools: config.allow_missing_tools,
            per_tool: config.per_tool.clone(),
            retry_policy: RetryPolicy::default(),
            locator: Arc::new(SystemPath),
            gitlab_url: config.gitlab_url.clone(),
            gitlab_token: None,
        }
    }

    pub fn with_locator(mut self, locator: Arc<dyn ToolLocator>) -> Self {
        self.locator = locator;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_allow_missing_tools(mut self, allow: bool) -> Self {
        self.allow_missing_tools = allow;
        self
    }

    pub fn with_gitlab_token(mut self, token: Option<String>) -> Self {
        self.gitlab_token = token.filter(|t| !t.is_empty());
        self
    }

    /// Start a definition for `tool` with the scan-wide timeout and retries,
    /// then any per-tool override. Override flags land after `argv`.
    pub fn tool(&self, tool: &str, argv: Vec<String>) -> ToolDefinitionBuilder {
        let over = self.per_tool.get(tool);
        let timeout = over.and_then(|o| o.timeout).unwrap_or(self.timeout);
        let mut builder = ToolDefinition::builder(tool, argv)
            .timeout(timeout)
            .retries(self.retries);
        if let Some(over) = over {
            builder = builder.extra_args(over.flags.iter().cloned());
        }
        builder
    }
}

impl std::fmt::Debug for ScanContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanContext")
            .field("results_dir", &self.results_dir)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("max_workers", &self.max_workers)
            .field("allow_missing_tools", &self.allow_missing_tools)
            .field("gitlab_token", &self.gitlab_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A scanner for one kind of target.
#[async_trait]
pub trait Scanner: Send + Sync {
    type Target: Send + Sync;

    fn target_type(&self) -> TargetType;

    fn target_id(&self, target: &Self::Target) -> String;

    /// Directory name for this target's results. Must already be sanitized.
    fn safe_name(&self, target: &Self::Target) -> String;

    fn validate(&self, _target: &Self::Target) -> Result<(), WardenError> {
        Ok(())
    }

    fn metadata(&self, _target: &Self::Target) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn get_applicable_tools(&self, tools: &[String]) -> Vec<String> {
        catalog::applicable_tools(tools, self.target_type())
    }

    /// `Ok(None)` when the tool has nothing to look at for this target.
    fn build_tool(
        &self,
        tool: &str,
        target: &Self::Target,
        out_dir: &Path,
        ctx: &ScanContext,
    ) -> Result<Option<ToolDefinition>, WardenError>;

    async fn scan(
        &self,
        target: &Self::Target,
        tools: &[String],
        ctx: &ScanContext,
    ) -> Result<ScanResult, WardenError> {
        run_scan(self, target, &self.safe_name(target), tools, ctx).await
    }

    /// Like [`Scanner::scan`], with the results directory name chosen by the
    /// caller. The name is sanitized again before use.
    async fn scan_as(
        &self,
        target: &Self::Target,
        dir_name: &str,
        tools: &[String],
        ctx: &ScanContext,
    ) -> Result<ScanResult, WardenError> {
        run_scan(self, target, dir_name, tools, ctx).await
    }
}

/// `base/individual-<type>/<safe_name>`, checked to stay under `base` and
/// created if needed. Calling it again returns the same path.
pub async fn create_output_dir(
    base: &Path,
    target_type: TargetType,
    safe_name: &str,
) -> Result<PathBuf, WardenError> {
    tokio::fs::create_dir_all(base).await?;
    // Relative to `base`; validation anchors it on the canonical base.
    let candidate = Path::new(target_type.results_subdir()).join(sanitize_path_component(safe_name));
    let resolved = validate_output_path(base, &candidate)?;
    tokio::fs::create_dir_all(&resolved).await?;
    Ok(resolved)
}

/// Output file for `tool` inside a target's results directory.
pub fn output_path(out_dir: &Path, tool: &str) -> PathBuf {
    out_dir.join(format!("{}.json", tool))
}

pub(crate) fn argv<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}

async fn run_scan<S: Scanner + ?Sized>(
    scanner: &S,
    target: &S::Target,
    dir_name: &str,
    tools: &[String],
    ctx: &ScanContext,
) -> Result<ScanResult, WardenError> {
    let started = Instant::now();
    scanner.validate(target)?;

    let target_type = scanner.target_type();
    let target_id = scanner.target_id(target);
    let mut result = ScanResult::new(target_id.as_str(), target_type);
    result.metadata = scanner.metadata(target);

    let out_dir = create_output_dir(&ctx.results_dir, target_type, dir_name).await?;
    debug!(target = %target_id, out_dir = %out_dir.display(), "Output directory ready");

    let mut definitions = Vec::new();
    for tool in scanner.get_applicable_tools(tools) {
        let Some(spec) = catalog::lookup(&tool) else {
            continue;
        };

        if !ctx.locator.is_installed(spec.binary) {
            if ctx.allow_missing_tools {
                let stub_path = output_path(&out_dir, &tool);
                tokio::fs::write(&stub_path, spec.stub).await?;
                warn!(tool = %tool, binary = spec.binary, target = %target_id, "Tool not installed, wrote stub output");
                result.record_stub(&tool, stub_path);
            } else {
                warn!(tool = %tool, binary = spec.binary, target = %target_id, "Tool not installed, skipping");
            }
            continue;
        }

        match scanner.build_tool(&tool, target, &out_dir, ctx)? {
            Some(definition) => definitions.push(definition),
            None => debug!(tool = %tool, target = %target_id, "Tool not applicable to this target"),
        }
    }

    info!(
        target = %target_id,
        target_type = %target_type,
        tools = definitions.len(),
        "Scanning target"
    );

    let results = ToolRunner::new(definitions)
        .with_max_workers(ctx.max_workers)
        .with_retry_policy(ctx.retry_policy.clone())
        .run_all_parallel()
        .await;

    for tool_result in &results {
        if tool_result.is_success() {
            if let (Some(stdout), Some(path)) = (&tool_result.stdout, &tool_result.output_file) {
                if let Err(e) = tokio::fs::write(path, stdout).await {
                    warn!(tool = %tool_result.tool, path = %path.display(), error = %e, "Failed to write tool output");
                    result
                        .errors
                        .push(format!("{}: failed to write output: {}", tool_result.tool, e));
                }
            }
        }
        result.record(tool_result);
    }

    result.duration_ms = started.elapsed().as_millis() as u64;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_output_dir_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let first = create_output_dir(dir.path(), TargetType::Image, "nginx_latest").await.unwrap();
        let second = create_output_dir(dir.path(), TargetType::Image, "nginx_latest").await.unwrap();
        assert_eq!(first, second);
        assert!(first.is_dir());
        assert!(first.ends_with("individual-images/nginx_latest"));
    }

    #[tokio::test]
    async fn test_create_output_dir_sanitizes_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_output_dir(dir.path(), TargetType::Repo, "../../etc").await.unwrap();
        let base = std::fs::canonicalize(dir.path()).unwrap();
        assert!(path.starts_with(base.join("individual-repos")));
    }

    #[test]
    fn test_context_applies_overrides() {
        let mut ctx = ScanContext::new("/tmp/r");
        ctx.retries = 2;
        ctx.per_tool.insert(
            "semgrep".to_string(),
            ToolSettings { timeout: Some(Duration::from_secs(42)), flags: vec!["--verbose".into()] },
        );

        let semgrep = ctx.tool("semgrep", argv(["semgrep", "scan"])).build().unwrap();
        assert_eq!(semgrep.timeout(), Duration::from_secs(42));
        assert_eq!(semgrep.retries(), 2);
        assert_eq!(semgrep.command(), ["semgrep", "scan", "--verbose"]);

        let trivy = ctx.tool("trivy", argv(["trivy"])).build().unwrap();
        assert_eq!(trivy.timeout(), ctx.timeout);
        assert_eq!(trivy.command(), ["trivy"]);
    }

    #[test]
    fn test_context_debug_redacts_token() {
        let ctx = ScanContext::new("/tmp/r").with_gitlab_token(Some("glpat-secret".into()));
        let rendered = format!("{:?}", ctx);
        assert!(!rendered.contains("glpat-secret"));
        assert!(rendered.contains("redacted"));
    }
}
