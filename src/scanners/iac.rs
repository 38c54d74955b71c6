use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::WardenError;
use crate::models::{IacTarget, TargetType};
use crate::runner::ToolDefinition;
use crate::utils::sanitize_path_component;
use super::{argv, output_path, ScanContext, Scanner};

/// Single infrastructure-as-code files.
#[derive(Debug, Clone, Copy, Default)]
pub struct IacScanner;

impl Scanner for IacScanner {
    type Target = IacTarget;

    fn target_type(&self) -> TargetType {
        TargetType::Iac
    }

    fn target_id(&self, target: &IacTarget) -> String {
        target.path.display().to_string()
    }

    fn safe_name(&self, target: &IacTarget) -> String {
        let stem = target
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        sanitize_path_component(&stem)
    }

    fn validate(&self, target: &IacTarget) -> Result<(), WardenError> {
        if !target.path.is_file() {
            return Err(WardenError::InvalidTarget(format!(
                "{} file not found: {}",
                target.kind.as_str(),
                target.path.display()
            )));
        }
        Ok(())
    }

    fn metadata(&self, target: &IacTarget) -> BTreeMap<String, String> {
        BTreeMap::from([("iac_type".to_string(), target.kind.as_str().to_string())])
    }

    fn build_tool(
        &self,
        tool: &str,
        target: &IacTarget,
        out_dir: &Path,
        ctx: &ScanContext,
    ) -> Result<Option<ToolDefinition>, WardenError> {
        let file = target.path.to_string_lossy().into_owned();
        let out = output_path(out_dir, tool);
        let out_str = out.to_string_lossy().into_owned();

        let builder = match tool {
            "checkov" => ctx
                .tool(
                    tool,
                    argv([
                        "checkov", "-f", &file, "--framework",
                        target.kind.checkov_framework(), "-o", "json", "--quiet",
                    ]),
                )
                .capture_stdout(true),
            "trivy" => ctx.tool(
                tool,
                argv(["trivy", "config", "--format", "json", "--output", &out_str, &file]),
            ),
            _ => return Ok(None),
        };

        builder.output_file(out).build().map(Some)
    }
}
