use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::WardenError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Repo,
    Image,
    Iac,
    Url,
    Gitlab,
    K8s,
}

impl TargetType {
    pub const ALL: [TargetType; 6] = [
        TargetType::Repo,
        TargetType::Image,
        TargetType::Iac,
        TargetType::Url,
        TargetType::Gitlab,
        TargetType::K8s,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Repo => "repo",
            Self::Image => "image",
            Self::Iac => "iac",
            Self::Url => "url",
            Self::Gitlab => "gitlab",
            Self::K8s => "k8s",
        }
    }

    /// Directory under the results root holding one subdirectory per target.
    pub fn results_subdir(&self) -> &'static str {
        match self {
            Self::Repo => "individual-repos",
            Self::Image => "individual-images",
            Self::Iac => "individual-iac",
            Self::Url => "individual-web",
            Self::Gitlab => "individual-gitlab",
            Self::K8s => "individual-k8s",
        }
    }
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IacKind {
    TerraformState,
    Cloudformation,
    K8sManifest,
}

impl IacKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TerraformState => "terraform-state",
            Self::Cloudformation => "cloudformation",
            Self::K8sManifest => "k8s-manifest",
        }
    }

    /// Framework name understood by `checkov --framework`.
    pub fn checkov_framework(&self) -> &'static str {
        match self {
            Self::TerraformState => "terraform_plan",
            Self::Cloudformation => "cloudformation",
            Self::K8sManifest => "kubernetes",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IacTarget {
    pub kind: IacKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitlabRepo {
    /// `group/subgroup/project`
    pub full_path: String,
    pub group: String,
    pub repo: String,
    pub name: String,
    pub url: String,
}

impl GitlabRepo {
    /// Parse `group[/subgroup...]/project` against a GitLab base URL.
    pub fn parse(full_path: &str, base_url: &str) -> Result<Self, WardenError> {
        let full_path = full_path.trim().trim_matches('/');
        let segments: Vec<&str> = full_path.split('/').collect();
        if segments.len() < 2 {
            return Err(WardenError::InvalidTarget(format!(
                "GitLab repo must be 'group/project', got '{}'",
                full_path
            )));
        }
        if segments
            .iter()
            .any(|s| s.is_empty() || *s == "." || *s == "..")
        {
            return Err(WardenError::InvalidTarget(format!(
                "GitLab repo path has an invalid segment: '{}'",
                full_path
            )));
        }

        let repo = segments[segments.len() - 1].to_string();
        let group = segments[..segments.len() - 1].join("/");
        Ok(Self {
            full_path: full_path.to_string(),
            group,
            name: repo.clone(),
            repo,
            url: format!("{}/{}", base_url.trim_end_matches('/'), full_path),
        })
    }
}

pub const CURRENT_CONTEXT: &str = "current";
pub const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct K8sResource {
    pub context: String,
    pub namespace: String,
    pub all_namespaces: bool,
}

impl K8sResource {
    pub fn new(context: Option<&str>, namespace: Option<&str>, all_namespaces: bool) -> Self {
        Self {
            context: context.unwrap_or(CURRENT_CONTEXT).to_string(),
            namespace: namespace.unwrap_or(DEFAULT_NAMESPACE).to_string(),
            all_namespaces,
        }
    }

    /// `context:namespace`, or `context:*` across all namespaces.
    pub fn id(&self) -> String {
        if self.all_namespaces {
            format!("{}:*", self.context)
        } else {
            format!("{}:{}", self.context, self.namespace)
        }
    }
}

/// Everything one scan invocation will look at, grouped by target type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanTargets {
    pub repos: Vec<PathBuf>,
    pub images: Vec<String>,
    pub iac_files: Vec<IacTarget>,
    pub urls: Vec<String>,
    pub gitlab_repos: Vec<GitlabRepo>,
    pub k8s_resources: Vec<K8sResource>,
}

impl ScanTargets {
    pub fn count(&self, target_type: TargetType) -> usize {
        match target_type {
            TargetType::Repo => self.repos.len(),
            TargetType::Image => self.images.len(),
            TargetType::Iac => self.iac_files.len(),
            TargetType::Url => self.urls.len(),
            TargetType::Gitlab => self.gitlab_repos.len(),
            TargetType::K8s => self.k8s_resources.len(),
        }
    }

    pub fn total_count(&self) -> usize {
        TargetType::ALL.iter().map(|t| self.count(*t)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_count() == 0
    }

    /// Target types with at least one target, in scan order.
    pub fn present_types(&self) -> Vec<TargetType> {
        TargetType::ALL
            .into_iter()
            .filter(|t| self.count(*t) > 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_targets() {
        let targets = ScanTargets::default();
        assert_eq!(targets.total_count(), 0);
        assert!(targets.is_empty());
        assert!(targets.present_types().is_empty());
    }

    #[test]
    fn test_total_count_sums_all_types() {
        let targets = ScanTargets {
            repos: vec![PathBuf::from("a"), PathBuf::from("b")],
            images: vec!["nginx:latest".into()],
            urls: vec!["https://example.com".into()],
            k8s_resources: vec![K8sResource::new(None, None, false)],
            ..Default::default()
        };
        assert_eq!(targets.total_count(), 5);
        assert!(!targets.is_empty());
        assert_eq!(
            targets.present_types(),
            vec![TargetType::Repo, TargetType::Image, TargetType::Url, TargetType::K8s]
        );
    }

    #[test]
    fn test_gitlab_repo_parse() {
        let repo = GitlabRepo::parse("security/backend/api", "https://gitlab.com/").unwrap();
        assert_eq!(repo.full_path, "security/backend/api");
        assert_eq!(repo.group, "security/backend");
        assert_eq!(repo.repo, "api");
        assert_eq!(repo.name, "api");
        assert_eq!(repo.url, "https://gitlab.com/security/backend/api");
    }

    #[test]
    fn test_gitlab_repo_parse_rejects_bad_paths() {
        assert!(GitlabRepo::parse("project-only", "https://gitlab.com").is_err());
        assert!(GitlabRepo::parse("group//project", "https://gitlab.com").is_err());
        assert!(GitlabRepo::parse("group/../project", "https://gitlab.com").is_err());
    }

    #[test]
    fn test_k8s_defaults() {
        let res = K8sResource::new(None, None, false);
        assert_eq!(res.context, "current");
        assert_eq!(res.namespace, "default");
        assert_eq!(res.id(), "current:default");
        assert_eq!(K8sResource::new(Some("prod"), None, true).id(), "prod:*");
    }

    #[test]
    fn test_results_subdirs() {
        assert_eq!(TargetType::Repo.results_subdir(), "individual-repos");
        assert_eq!(TargetType::Url.results_subdir(), "individual-web");
        assert_eq!(TargetType::K8s.results_subdir(), "individual-k8s");
    }
}
