use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::WardenError;
use crate::models::{GitlabRepo, TargetType};
use crate::runner::ToolDefinition;
use crate::utils::sanitize_path_component;
use super::{argv, output_path, ScanContext, Scanner};

pub const GITLAB_TOKEN_ENV: &str = "GITLAB_TOKEN";

/// Remote GitLab projects, scanned without cloning.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitlabScanner;

impl Scanner for GitlabScanner {
    type Target = GitlabRepo;

    fn target_type(&self) -> TargetType {
        TargetType::Gitlab
    }

    fn target_id(&self, target: &GitlabRepo) -> String {
        target.full_path.clone()
    }

    fn safe_name(&self, target: &GitlabRepo) -> String {
        sanitize_path_component(&target.full_path)
    }

    fn metadata(&self, target: &GitlabRepo) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("group".to_string(), target.group.clone()),
            ("url".to_string(), target.url.clone()),
        ])
    }

    fn build_tool(
        &self,
        tool: &str,
        target: &GitlabRepo,
        out_dir: &Path,
        ctx: &ScanContext,
    ) -> Result<Option<ToolDefinition>, WardenError> {
        if tool != "trufflehog" {
            return Ok(None);
        }

        let mut builder = ctx
            .tool(
                tool,
                argv([
                    "trufflehog", "gitlab", "--endpoint", ctx.gitlab_url.as_str(),
                    "--repo", target.url.as_str(), "--json", "--no-update",
                ]),
            )
            .capture_stdout(true)
            .output_file(output_path(out_dir, tool));
        if let Some(token) = &ctx.gitlab_token {
            builder = builder.env(GITLAB_TOKEN_ENV, token.as_str());
        }
        builder.build().map(Some)
    }
}
