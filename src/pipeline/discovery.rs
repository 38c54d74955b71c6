use std::path::{Path, PathBuf};

use clap::Args;
use tracing::debug;

use crate::errors::WardenError;

/// Where scan targets come from. Every source is optional.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetSources {
    /// Local repository to scan
    #[arg(long, value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// Scan every immediate subdirectory as a repository
    #[arg(long, value_name = "DIR")]
    pub repos_dir: Option<PathBuf>,

    /// File listing repository paths, one per line
    #[arg(long, value_name = "FILE")]
    pub targets: Option<PathBuf>,

    /// Container image reference
    #[arg(long, value_name = "IMAGE")]
    pub image: Option<String>,

    /// File listing image references, one per line
    #[arg(long, value_name = "FILE")]
    pub images_file: Option<PathBuf>,

    /// Terraform state file (repeatable)
    #[arg(long, value_name = "FILE")]
    pub terraform_state: Vec<PathBuf>,

    /// CloudFormation template (repeatable)
    #[arg(long, value_name = "FILE")]
    pub cloudformation: Vec<PathBuf>,

    /// Kubernetes manifest (repeatable)
    #[arg(long, value_name = "FILE")]
    pub k8s_manifest: Vec<PathBuf>,

    /// Web application URL (http or https)
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// File listing URLs, one per line
    #[arg(long, value_name = "FILE")]
    pub urls_file: Option<PathBuf>,

    /// GitLab project as group/project
    #[arg(long, value_name = "GROUP/PROJECT")]
    pub gitlab_repo: Option<String>,

    /// Scan every project in a GitLab group, subgroups included
    #[arg(long, value_name = "GROUP", conflicts_with = "gitlab_repo")]
    pub gitlab_group: Option<String>,

    /// GitLab instance [default: https://gitlab.com]
    #[arg(long, value_name = "URL")]
    pub gitlab_url: Option<String>,

    /// GitLab access token
    #[arg(long, env = "GITLAB_TOKEN", hide_env_values = true)]
    pub gitlab_token: Option<String>,

    /// Kubernetes context [default: current]
    #[arg(long, value_name = "NAME")]
    pub k8s_context: Option<String>,

    /// Kubernetes namespace [default: default]
    #[arg(long, value_name = "NAME")]
    pub k8s_namespace: Option<String>,

    /// Scan all namespaces of the context
    #[arg(long)]
    pub k8s_all_namespaces: bool,
}

impl TargetSources {
    pub fn wants_k8s(&self) -> bool {
        self.k8s_context.is_some() || self.k8s_namespace.is_some() || self.k8s_all_namespaces
    }
}

/// Entries of a newline-delimited list. Blank lines and `#` comments are skipped.
pub fn parse_target_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Read a target list file. A list that was asked for but cannot be read
/// is an error, not an empty list.
pub async fn read_target_list(path: &Path) -> Result<Vec<String>, WardenError> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        WardenError::Discovery(format!("cannot read target list {}: {}", path.display(), e))
    })?;
    let entries = parse_target_lines(&content);
    debug!(path = %path.display(), entries = entries.len(), "Read target list");
    Ok(entries)
}

/// Immediate subdirectories of `dir`, sorted by path.
pub async fn list_subdirectories(dir: &Path) -> Result<Vec<PathBuf>, WardenError> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
        WardenError::Discovery(format!("cannot read repos directory {}: {}", dir.display(), e))
    })?;

    let mut dirs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}
