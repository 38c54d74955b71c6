use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::WardenError;
use crate::git;
use crate::models::TargetType;
use crate::runner::ToolDefinition;
use crate::utils::sanitize_path_component;
use super::{argv, output_path, ScanContext, Scanner};

/// Source repositories on local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepoScanner;

impl RepoScanner {
    fn base_name(target: &Path) -> String {
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .or_else(|| {
                std::fs::canonicalize(target)
                    .ok()
                    .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            });
        name.unwrap_or_else(|| target.to_string_lossy().into_owned())
    }
}

impl Scanner for RepoScanner {
    type Target = PathBuf;

    fn target_type(&self) -> TargetType {
        TargetType::Repo
    }

    fn target_id(&self, target: &PathBuf) -> String {
        target.display().to_string()
    }

    fn safe_name(&self, target: &PathBuf) -> String {
        sanitize_path_component(&Self::base_name(target))
    }

    fn validate(&self, target: &PathBuf) -> Result<(), WardenError> {
        if !target.is_dir() {
            return Err(WardenError::InvalidTarget(format!(
                "repository path is not a directory: {}",
                target.display()
            )));
        }
        Ok(())
    }

    fn metadata(&self, target: &PathBuf) -> BTreeMap<String, String> {
        let mut meta = BTreeMap::new();
        if let Some(info) = git::repo_metadata(target) {
            meta.insert("commit".to_string(), info.commit);
            if let Some(branch) = info.branch {
                meta.insert("branch".to_string(), branch);
            }
        }
        meta
    }

    fn build_tool(
        &self,
        tool: &str,
        target: &PathBuf,
        out_dir: &Path,
        ctx: &ScanContext,
    ) -> Result<Option<ToolDefinition>, WardenError> {
        let path = target.to_string_lossy().into_owned();
        let out = output_path(out_dir, tool);
        let out_str = out.to_string_lossy().into_owned();

        let builder = match tool {
            "trufflehog" => ctx
                .tool(
                    tool,
                    argv(["trufflehog", "git", &format!("file://{}", path), "--json", "--no-update"]),
                )
                .capture_stdout(true),
            "semgrep" => ctx.tool(
                tool,
                argv(["semgrep", "--config=auto", "--json", "--output", &out_str, &path]),
            ),
            "trivy" => ctx.tool(
                tool,
                argv([
                    "trivy", "fs", "--format", "json", "--output", &out_str,
                    "--scanners", "vuln,secret,misconfig", &path,
                ]),
            ),
            "syft" => ctx.tool(
                tool,
                argv(["syft", &format!("dir:{}", path), "-o", &format!("json={}", out_str)]),
            ),
            "checkov" => ctx
                .tool(tool, argv(["checkov", "-d", &path, "-o", "json", "--quiet"]))
                .capture_stdout(true),
            "hadolint" => {
                let dockerfile = target.join("Dockerfile");
                if !dockerfile.is_file() {
                    return Ok(None);
                }
                ctx.tool(
                    tool,
                    argv(["hadolint", "-f", "json", &dockerfile.to_string_lossy()]),
                )
                .capture_stdout(true)
            }
            "bandit" => ctx.tool(
                tool,
                argv(["bandit", "-r", &path, "-f", "json", "-o", &out_str, "-q"]),
            ),
            _ => return Ok(None),
        };

        builder.output_file(out).build().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_name_uses_base_name() {
        assert_eq!(RepoScanner.safe_name(&PathBuf::from("/src/team/api-server")), "api-server");
        assert_eq!(RepoScanner.safe_name(&PathBuf::from("/src/.hidden")), "hidden");
    }

    #[test]
    fn test_validate_requires_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RepoScanner.validate(&dir.path().to_path_buf()).is_ok());
        let missing = dir.path().join("missing");
        let err = RepoScanner.validate(&missing).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_hadolint_needs_dockerfile() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().to_path_buf();
        let ctx = ScanContext::new(dir.path());
        assert!(RepoScanner.build_tool("hadolint", &target, dir.path(), &ctx).unwrap().is_none());

        std::fs::write(target.join("Dockerfile"), "FROM alpine\n").unwrap();
        let tool = RepoScanner.build_tool("hadolint", &target, dir.path(), &ctx).unwrap().unwrap();
        assert!(tool.capture_stdout());
        assert!(tool.command().last().unwrap().ends_with("Dockerfile"));
    }

    #[test]
    fn test_semgrep_writes_to_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().to_path_buf();
        let ctx = ScanContext::new(dir.path());
        let tool = RepoScanner.build_tool("semgrep", &target, dir.path(), &ctx).unwrap().unwrap();
        let out = dir.path().join("semgrep.json");
        assert_eq!(tool.output_file(), Some(out.as_path()));
        assert!(tool.command().contains(&out.to_string_lossy().into_owned()));
        assert!(!tool.capture_stdout());
    }

    #[test]
    fn test_unknown_tool_not_built() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ScanContext::new(dir.path());
        let target = dir.path().to_path_buf();
        assert!(RepoScanner.build_tool("nuclei", &target, dir.path(), &ctx).unwrap().is_none());
    }
}
