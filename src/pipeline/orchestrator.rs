use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::audit::{write_json_atomic, ScanLog, SUMMARY_FILE};
use crate::config::ScanConfig;
use crate::errors::WardenError;
use crate::gitlab::{GitlabClient, ProjectLister};
use crate::models::{
    GitlabRepo, IacKind, IacTarget, K8sResource, ScanReport, ScanResult, ScanTargets, TargetType,
};
use crate::runner::RetryPolicy;
use crate::scanners::{
    GitlabScanner, IacScanner, ImageScanner, K8sScanner, RepoScanner, ScanContext, Scanner, UrlScanner,
};
use crate::utils::{validate_output_path, SystemPath, ToolLocator};
use super::discovery::{list_subdirectories, read_target_list, TargetSources};
use super::events::ScanEvent;

/// Longest file name most filesystems accept, in bytes.
const MAX_COMPONENT_BYTES: usize = 255;

/// Upper bound for auto-detected tool parallelism.
pub const MAX_AUTO_WORKERS: usize = 8;

pub struct ScanOrchestrator {
    config: ScanConfig,
    locator: Arc<dyn ToolLocator>,
    retry_policy: RetryPolicy,
    project_lister: Option<Arc<dyn ProjectLister>>,
    gitlab_token: Option<String>,
    event_tx: Option<mpsc::UnboundedSender<ScanEvent>>,
}

impl ScanOrchestrator {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            locator: Arc::new(SystemPath),
            retry_policy: RetryPolicy::default(),
            project_lister: None,
            gitlab_token: None,
            event_tx: None,
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

    /// Replace the GitLab REST client used for `--gitlab-group`.
    pub fn with_project_lister(mut self, lister: Arc<dyn ProjectLister>) -> Self {
        self.project_lister = Some(lister);
        self
    }

    pub fn with_gitlab_token(mut self, token: Option<String>) -> Self {
        self.gitlab_token = token.filter(|t| !t.is_empty());
        self
    }

    /// Attach an event channel for streaming progress to a display.
    pub fn with_event_channel(mut self, tx: mpsc::UnboundedSender<ScanEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }

    pub async fn discover_targets(&self, sources: &TargetSources) -> Result<ScanTargets, WardenError> {
        let mut targets = ScanTargets::default();

        // Repositories
        let mut repos = Vec::new();
        if let Some(repo) = &sources.repo {
            if !repo.is_dir() {
                return Err(WardenError::Discovery(format!(
                    "repository not found: {}",
                    repo.display()
                )));
            }
            repos.push(repo.clone());
        }
        if let Some(dir) = &sources.repos_dir {
            if !dir.is_dir() {
                return Err(WardenError::Discovery(format!(
                    "repos directory not found: {}",
                    dir.display()
                )));
            }
            repos.extend(list_subdirectories(dir).await?);
        }
        if let Some(file) = &sources.targets {
            for entry in read_target_list(file).await? {
                let path = PathBuf::from(&entry);
                if path.is_dir() {
                    repos.push(path);
                } else {
                    warn!(path = %entry, list = %file.display(), "Listed repository not found, skipping");
                }
            }
        }
        targets.repos = dedup(self.filter_repos(repos));

        // Images
        let mut images = Vec::new();
        images.extend(sources.image.iter().cloned());
        if let Some(file) = &sources.images_file {
            images.extend(read_target_list(file).await?);
        }
        targets.images = dedup(images);

        // IaC
        let iac = [
            (IacKind::TerraformState, &sources.terraform_state),
            (IacKind::Cloudformation, &sources.cloudformation),
            (IacKind::K8sManifest, &sources.k8s_manifest),
        ];
        for (kind, paths) in iac {
            targets
                .iac_files
                .extend(paths.iter().map(|path| IacTarget { kind, path: path.clone() }));
        }

        // URLs
        let mut urls = Vec::new();
        urls.extend(sources.url.iter().cloned());
        if let Some(file) = &sources.urls_file {
            urls.extend(read_target_list(file).await?);
        }
        targets.urls = dedup(urls);

        // GitLab
        if let Some(full_path) = &sources.gitlab_repo {
            targets
                .gitlab_repos
                .push(GitlabRepo::parse(full_path, &self.config.gitlab_url)?);
        } else if let Some(group) = &sources.gitlab_group {
            targets.gitlab_repos = self.list_gitlab_group(group, sources).await?;
        }

        // Kubernetes
        if sources.wants_k8s() {
            targets.k8s_resources.push(K8sResource::new(
                sources.k8s_context.as_deref(),
                sources.k8s_namespace.as_deref(),
                sources.k8s_all_namespaces,
            ));
        }

        info!(
            repos = targets.repos.len(),
            images = targets.images.len(),
            iac = targets.iac_files.len(),
            urls = targets.urls.len(),
            gitlab = targets.gitlab_repos.len(),
            k8s = targets.k8s_resources.len(),
            "Targets discovered"
        );
        Ok(targets)
    }

    async fn list_gitlab_group(
        &self,
        group: &str,
        sources: &TargetSources,
    ) -> Result<Vec<GitlabRepo>, WardenError> {
        let lister: Arc<dyn ProjectLister> = match &self.project_lister {
            Some(lister) => lister.clone(),
            None => Arc::new(GitlabClient::new(
                &self.config.gitlab_url,
                sources.gitlab_token.clone().or_else(|| self.gitlab_token.clone()),
            )),
        };
        let repos = lister.list_group_projects(group).await?;
        if repos.is_empty() {
            warn!(group, "GitLab group has no projects");
        }
        Ok(repos)
    }

    /// Apply include/exclude globs to repository base names. Exclude wins.
    pub fn filter_repos(&self, repos: Vec<PathBuf>) -> Vec<PathBuf> {
        if self.config.include.is_empty() && self.config.exclude.is_empty() {
            return repos;
        }
        repos
            .into_iter()
            .filter(|repo| {
                let name = repo
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if self.config.exclude.iter().any(|p| p.matches(&name)) {
                    info!(repo = %repo.display(), "Excluded by pattern");
                    return false;
                }
                if !self.config.include.is_empty() && !self.config.include.iter().any(|p| p.matches(&name)) {
                    info!(repo = %repo.display(), "Not matched by any include pattern");
                    return false;
                }
                true
            })
            .collect()
    }

    /// Create `individual-*` directories for the target types present.
    pub async fn setup_results_directories(&self, targets: &ScanTargets) -> Result<Vec<PathBuf>, WardenError> {
        let base = &self.config.results_dir;
        tokio::fs::create_dir_all(base).await?;

        let mut created = Vec::new();
        for target_type in targets.present_types() {
            let dir = validate_output_path(base, Path::new(target_type.results_subdir()))?;
            tokio::fs::create_dir_all(&dir).await?;
            created.push(dir);
        }
        Ok(created)
    }

    pub fn validate_targets(&self, targets: &ScanTargets) -> bool {
        targets.total_count() > 0
    }

    /// Configured worker count, else available parallelism capped at
    /// [`MAX_AUTO_WORKERS`]. Never below 1.
    pub fn get_effective_max_workers(&self) -> usize {
        let workers = match self.config.max_workers {
            Some(n) => n,
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
                .min(MAX_AUTO_WORKERS),
        };
        workers.max(1)
    }

    pub fn scan_context(&self) -> ScanContext {
        ScanContext::from_config(&self.config, self.get_effective_max_workers())
            .with_locator(self.locator.clone())
            .with_retry_policy(self.retry_policy.clone())
            .with_gitlab_token(self.gitlab_token.clone())
    }

    pub async fn run(&self, targets: &ScanTargets) -> Result<ScanReport, WardenError> {
        if !self.validate_targets(targets) {
            return Err(WardenError::NoTargets);
        }

        let started = Instant::now();
        let started_at = Utc::now();
        let scan_id = uuid::Uuid::new_v4().to_string();

        self.setup_results_directories(targets).await?;
        let log = ScanLog::new(&self.config.results_dir);
        if let Err(e) = log.start(&scan_id).await {
            warn!(error = %e, "Failed to start scan log");
        }

        let ctx = self.scan_context();
        let total = targets.total_count();
        info!(
            scan_id = %scan_id,
            targets = total,
            tools = %self.config.tools.join(","),
            max_workers = ctx.max_workers,
            "Scan started"
        );
        self.emit(ScanEvent::ScanStarted { scan_id: scan_id.clone(), total_targets: total });

        let mut results = Vec::with_capacity(total);
        let mut dirs = DirNames::default();
        for repo in &targets.repos {
            let index = results.len();
            results.push(self.scan_target(&RepoScanner, repo, &ctx, &log, &mut dirs, index).await?);
        }
        for image in &targets.images {
            let index = results.len();
            results.push(self.scan_target(&ImageScanner, image, &ctx, &log, &mut dirs, index).await?);
        }
        for iac in &targets.iac_files {
            let index = results.len();
            results.push(self.scan_target(&IacScanner, iac, &ctx, &log, &mut dirs, index).await?);
        }
        for url in &targets.urls {
            let index = results.len();
            results.push(self.scan_target(&UrlScanner, url, &ctx, &log, &mut dirs, index).await?);
        }
        for repo in &targets.gitlab_repos {
            let index = results.len();
            results.push(self.scan_target(&GitlabScanner, repo, &ctx, &log, &mut dirs, index).await?);
        }
        for resource in &targets.k8s_resources {
            let index = results.len();
            results.push(self.scan_target(&K8sScanner, resource, &ctx, &log, &mut dirs, index).await?);
        }

        let report = ScanReport {
            scan_id: scan_id.clone(),
            started_at,
            finished_at: Utc::now(),
            tools: self.config.tools.clone(),
            results,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        let summary_path = self.config.results_dir.join(SUMMARY_FILE);
        write_json_atomic(&summary_path, &report).await?;

        let failed_tools = report.failed_tool_count();
        append_log(
            &log,
            &format!(
                "scan {} finished: {} target(s), {} failed tool run(s), {}ms",
                scan_id,
                report.results.len(),
                failed_tools,
                report.duration_ms
            ),
        )
        .await;
        info!(
            scan_id = %scan_id,
            failed_tools,
            duration_ms = report.duration_ms,
            summary = %summary_path.display(),
            "Scan completed"
        );
        self.emit(ScanEvent::ScanCompleted {
            scan_id,
            failed_tools,
            duration_ms: report.duration_ms,
        });

        Ok(report)
    }

    /// Scan one target. Target-level failures become that target's errors;
    /// only path-safety violations abort the whole scan.
    async fn scan_target<S: Scanner>(
        &self,
        scanner: &S,
        target: &S::Target,
        ctx: &ScanContext,
        log: &ScanLog,
        dirs: &mut DirNames,
        index: usize,
    ) -> Result<ScanResult, WardenError> {
        let target_type = scanner.target_type();
        let target_id = scanner.target_id(target);
        let safe_name = scanner.safe_name(target);
        let dir_name = dirs.claim(target_type, &safe_name);
        if dir_name != safe_name {
            warn!(
                target = %target_id,
                target_type = %target_type,
                taken = %safe_name,
                dir = %dir_name,
                "Results directory name already used by another target, using a suffix"
            );
        }
        self.emit(ScanEvent::TargetStarted {
            target_type,
            target_id: target_id.clone(),
            index,
        });

        let result = match scanner.scan_as(target, &dir_name, &self.config.tools, ctx).await {
            Ok(result) => {
                let failed = result.failed_tools().len();
                let succeeded = result.tool_statuses.len() - failed;
                info!(
                    target = %target_id,
                    target_type = %target_type,
                    succeeded,
                    failed,
                    duration_ms = result.duration_ms,
                    "Target scanned"
                );
                append_log(
                    log,
                    &format!(
                        "{} {}: {}/{} tools succeeded in {}ms",
                        target_type,
                        target_id,
                        succeeded,
                        result.tool_statuses.len(),
                        result.duration_ms
                    ),
                )
                .await;
                for err in &result.errors {
                    append_log(log, &format!("  {}", err)).await;
                }
                self.emit(ScanEvent::TargetCompleted {
                    target_type,
                    target_id,
                    succeeded,
                    failed,
                    duration_ms: result.duration_ms,
                });
                result
            }
            Err(e @ WardenError::PathTraversal { .. }) => {
                error!(target = %target_id, error = %e, "Path traversal blocked");
                append_log(log, &format!("{} {}: ABORTED: {}", target_type, target_id, e)).await;
                return Err(e);
            }
            Err(e) => {
                error!(target = %target_id, target_type = %target_type, error = %e, "Target scan failed");
                append_log(log, &format!("{} {}: FAILED: {}", target_type, target_id, e)).await;
                self.emit(ScanEvent::TargetFailed {
                    target_type,
                    target_id: target_id.clone(),
                    error: e.to_string(),
                });
                let mut result = ScanResult::new(target_id, target_type);
                result.errors.push(e.to_string());
                result
            }
        };
        Ok(result)
    }
}

async fn append_log(log: &ScanLog, message: &str) {
    if let Err(e) = log.log_event(message).await {
        warn!(path = %log.path().display(), error = %e, "Failed to write scan log");
    }
}

/// Results directory names handed out during one scan, per target type.
/// Targets whose names collide get `_2`, `_3`, ... appended.
#[derive(Debug, Default)]
struct DirNames {
    used: HashSet<(TargetType, String)>,
}

impl DirNames {
    fn claim(&mut self, target_type: TargetType, safe_name: &str) -> String {
        if self.used.insert((target_type, safe_name.to_string())) {
            return safe_name.to_string();
        }
        let mut n: u32 = 2;
        loop {
            let candidate = with_suffix(safe_name, n);
            if self.used.insert((target_type, candidate.clone())) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// `name_<n>`, shortening `name` so the result still fits a path component.
fn with_suffix(name: &str, n: u32) -> String {
    let suffix = format!("_{}", n);
    let mut end = name.len().min(MAX_COMPONENT_BYTES - suffix.len());
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &name[..end], suffix)
}

fn dedup<T: PartialEq>(items: Vec<T>) -> Vec<T> {
    let mut unique = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}
