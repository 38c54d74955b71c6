use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::errors::WardenError;
use crate::models::GitlabRepo;

const PER_PAGE: u32 = 100;
const MAX_PAGES: u32 = 200;

/// Lists the projects of a GitLab group.
#[async_trait]
pub trait ProjectLister: Send + Sync {
    async fn list_group_projects(&self, group: &str) -> Result<Vec<GitlabRepo>, WardenError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectRecord {
    pub path_with_namespace: String,
    #[serde(default)]
    pub archived: bool,
}

/// GitLab REST v4 client.
pub struct GitlabClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl GitlabClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    fn projects_url(&self, group: &str, page: u32) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(group.as_bytes()).collect();
        format!(
            "{}/api/v4/groups/{}/projects?include_subgroups=true&archived=false&per_page={}&page={}",
            self.base_url, encoded, PER_PAGE, page
        )
    }
}

#[async_trait]
impl ProjectLister for GitlabClient {
    async fn list_group_projects(&self, group: &str) -> Result<Vec<GitlabRepo>, WardenError> {
        let group = group.trim().trim_matches('/');
        if group.is_empty() {
            return Err(WardenError::Discovery("GitLab group must not be empty".into()));
        }

        let mut records = Vec::new();
        let mut page = 1;
        loop {
            let mut request = self.client.get(self.projects_url(group, page));
            if let Some(token) = &self.token {
                request = request.header("PRIVATE-TOKEN", token);
            }
            let resp = request
                .send()
                .await
                .map_err(|e| WardenError::Gitlab(format!("GitLab request failed: {}", e)))?;

            let status = resp.status();
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(WardenError::Gitlab(format!(
                    "GitLab denied access to group '{}' ({})",
                    group, status
                )));
            }
            if status.as_u16() == 404 {
                return Err(WardenError::Discovery(format!("GitLab group '{}' not found", group)));
            }
            if !status.is_success() {
                return Err(WardenError::Gitlab(format!("GitLab returned {} for group '{}'", status, group)));
            }

            let next_page = resp
                .headers()
                .get("x-next-page")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u32>().ok());

            let batch: Vec<ProjectRecord> = resp
                .json()
                .await
                .map_err(|e| WardenError::Gitlab(format!("Failed to parse GitLab projects: {}", e)))?;
            debug!(group, page, count = batch.len(), "Fetched GitLab project page");
            records.extend(batch);

            match next_page {
                Some(next) if next > page && next <= MAX_PAGES => page = next,
                Some(next) if next > MAX_PAGES => {
                    warn!(group, pages = MAX_PAGES, "GitLab group listing truncated");
                    break;
                }
                _ => break,
            }
        }

        let repos = repos_from_records(&records, &self.base_url);
        info!(group, projects = repos.len(), "GitLab group listed");
        Ok(repos)
    }
}

/// Convert API records to targets, skipping archived and unparsable projects.
pub fn repos_from_records(records: &[ProjectRecord], base_url: &str) -> Vec<GitlabRepo> {
    let mut repos: Vec<GitlabRepo> = records
        .iter()
        .filter(|r| !r.archived)
        .filter_map(|r| match GitlabRepo::parse(&r.path_with_namespace, base_url) {
            Ok(repo) => Some(repo),
            Err(e) => {
                warn!(project = %r.path_with_namespace, error = %e, "Skipping GitLab project");
                None
            }
        })
        .collect();
    repos.sort_by(|a, b| a.full_path.cmp(&b.full_path));
    repos.dedup_by(|a, b| a.full_path == b.full_path);
    repos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projects_url_encodes_subgroups() {
        let client = GitlabClient::new("https://gitlab.example.com/", None);
        let url = client.projects_url("platform/payments", 2);
        assert!(url.starts_with("https://gitlab.example.com/api/v4/groups/platform%2Fpayments/projects?"));
        assert!(url.contains("include_subgroups=true"));
        assert!(url.ends_with("page=2"));
    }

    #[test]
    fn test_repos_from_records() {
        let json = r#"[
            {"path_with_namespace": "platform/web", "archived": false},
            {"path_with_namespace": "platform/legacy", "archived": true},
            {"path_with_namespace": "platform/api"},
            {"path_with_namespace": "platform/api"},
            {"path_with_namespace": "broken"}
        ]"#;
        let records: Vec<ProjectRecord> = serde_json::from_str(json).unwrap();
        let repos = repos_from_records(&records, "https://gitlab.com");
        let paths: Vec<_> = repos.iter().map(|r| r.full_path.as_str()).collect();
        assert_eq!(paths, ["platform/api", "platform/web"]);
        assert_eq!(repos[0].url, "https://gitlab.com/platform/api");
    }

    #[tokio::test]
    async fn test_empty_group_rejected() {
        let client = GitlabClient::new("https://gitlab.com", None);
        let err = client.list_group_projects(" / ").await.unwrap_err();
        assert!(matches!(err, WardenError::Discovery(_)));
    }
}
