use std::path::Path;

use url::Url;

use crate::errors::WardenError;
use crate::models::TargetType;
use crate::runner::ToolDefinition;
use crate::utils::sanitize_path_component;
use super::{argv, output_path, ScanContext, Scanner};

const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Live web applications.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlScanner;

impl UrlScanner {
    /// Parse and check a target URL: http(s) with a host.
    pub fn parse_target(target: &str) -> Result<Url, WardenError> {
        let url = Url::parse(target.trim())
            .map_err(|e| WardenError::InvalidTarget(format!("invalid URL '{}': {}", target, e)))?;
        if !ALLOWED_SCHEMES.contains(&url.scheme()) {
            return Err(WardenError::InvalidTarget(format!(
                "unsupported URL scheme '{}' in '{}' (only http and https)",
                url.scheme(),
                target
            )));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(WardenError::InvalidTarget(format!("URL has no host: '{}'", target)));
        }
        Ok(url)
    }
}

impl Scanner for UrlScanner {
    type Target = String;

    fn target_type(&self) -> TargetType {
        TargetType::Url
    }

    fn target_id(&self, target: &String) -> String {
        target.clone()
    }

    fn safe_name(&self, target: &String) -> String {
        let netloc = match Url::parse(target.trim()) {
            Ok(url) => match (url.host_str(), url.port()) {
                (Some(host), Some(port)) => format!("{}:{}", host, port),
                (Some(host), None) => host.to_string(),
                _ => target.clone(),
            },
            Err(_) => target.clone(),
        };
        sanitize_path_component(&netloc)
    }

    fn validate(&self, target: &String) -> Result<(), WardenError> {
        Self::parse_target(target).map(|_| ())
    }

    fn build_tool(
        &self,
        tool: &str,
        target: &String,
        out_dir: &Path,
        ctx: &ScanContext,
    ) -> Result<Option<ToolDefinition>, WardenError> {
        let url = Self::parse_target(target)?;
        let out = output_path(out_dir, tool);
        let out_str = out.to_string_lossy().into_owned();

        let builder = match tool {
            "zap" => ctx.tool(
                tool,
                argv(["zap.sh", "-cmd", "-quickurl", url.as_str(), "-quickout", &out_str]),
            ),
            "nuclei" => ctx.tool(
                tool,
                argv(["nuclei", "-u", url.as_str(), "-jsonl", "-o", &out_str, "-silent"]),
            ),
            _ => return Ok(None),
        };

        builder.output_file(out).build().map(Some)
    }
}
