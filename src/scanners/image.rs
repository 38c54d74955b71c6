use std::path::Path;

use crate::errors::WardenError;
use crate::models::TargetType;
use crate::runner::ToolDefinition;
use crate::utils::sanitize_path_component;
use super::{argv, output_path, ScanContext, Scanner};

/// Container images, by reference (`registry/name:tag` or digest).
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageScanner;

impl Scanner for ImageScanner {
    type Target = String;

    fn target_type(&self) -> TargetType {
        TargetType::Image
    }

    fn target_id(&self, target: &String) -> String {
        target.clone()
    }

    fn safe_name(&self, target: &String) -> String {
        sanitize_path_component(target)
    }

    fn validate(&self, target: &String) -> Result<(), WardenError> {
        if target.trim().is_empty() || target.chars().any(char::is_whitespace) {
            return Err(WardenError::InvalidTarget(format!("invalid image reference: '{}'", target)));
        }
        if target.starts_with('-') {
            return Err(WardenError::InvalidTarget(format!(
                "image reference must not start with '-': '{}'",
                target
            )));
        }
        Ok(())
    }

    fn build_tool(
        &self,
        tool: &str,
        target: &String,
        out_dir: &Path,
        ctx: &ScanContext,
    ) -> Result<Option<ToolDefinition>, WardenError> {
        let out = output_path(out_dir, tool);
        let out_str = out.to_string_lossy().into_owned();

        let builder = match tool {
            "trivy" => ctx.tool(
                tool,
                argv(["trivy", "image", "--format", "json", "--output", &out_str, target.as_str()]),
            ),
            "syft" => ctx.tool(
                tool,
                argv(["syft", target.as_str(), "-o", &format!("json={}", out_str)]),
            ),
            "trufflehog" => ctx
                .tool(
                    tool,
                    argv(["trufflehog", "docker", "--image", target.as_str(), "--json", "--no-update"]),
                )
                .capture_stdout(true),
            _ => return Ok(None),
        };

        builder.output_file(out).build().map(Some)
    }
}
