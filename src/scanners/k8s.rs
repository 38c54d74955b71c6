use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::WardenError;
use crate::models::{K8sResource, TargetType, CURRENT_CONTEXT, DEFAULT_NAMESPACE};
use crate::runner::ToolDefinition;
use crate::utils::sanitize_path_component;
use super::{argv, output_path, ScanContext, Scanner};

/// Kubernetes clusters, one context/namespace scope at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct K8sScanner;

impl K8sScanner {
    /// Cluster-scope flags for `trivy k8s`. The current context and the
    /// default namespace are left implicit.
    pub fn scope_args(target: &K8sResource) -> Vec<String> {
        let mut args = Vec::new();
        if target.context != CURRENT_CONTEXT {
            args.push("--context".to_string());
            args.push(target.context.clone());
        }
        if target.all_namespaces {
            args.push("--all-namespaces".to_string());
        } else if target.namespace != DEFAULT_NAMESPACE {
            args.push("-n".to_string());
            args.push(target.namespace.clone());
        }
        args
    }
}

impl Scanner for K8sScanner {
    type Target = K8sResource;

    fn target_type(&self) -> TargetType {
        TargetType::K8s
    }

    fn target_id(&self, target: &K8sResource) -> String {
        target.id()
    }

    fn safe_name(&self, target: &K8sResource) -> String {
        let namespace = if target.all_namespaces {
            "all-namespaces"
        } else {
            target.namespace.as_str()
        };
        format!(
            "{}_{}",
            sanitize_path_component(&target.context),
            sanitize_path_component(namespace)
        )
    }

    fn metadata(&self, target: &K8sResource) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("context".to_string(), target.context.clone()),
            ("namespace".to_string(), target.namespace.clone()),
            ("all_namespaces".to_string(), target.all_namespaces.to_string()),
        ])
    }

    fn build_tool(
        &self,
        tool: &str,
        target: &K8sResource,
        out_dir: &Path,
        ctx: &ScanContext,
    ) -> Result<Option<ToolDefinition>, WardenError> {
        if tool != "trivy" {
            return Ok(None);
        }

        let out = output_path(out_dir, tool);
        let mut command = argv([
            "trivy", "k8s", "--format", "json", "--output", &out.to_string_lossy(),
            "--report", "summary",
        ]);
        command.extend(Self::scope_args(target));

        ctx.tool(tool, command).output_file(out).build().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_args_defaults_are_implicit() {
        let target = K8sResource::new(Some("current"), Some("default"), false);
        assert!(K8sScanner::scope_args(&target).is_empty());
    }

    #[test]
    fn test_scope_args_explicit() {
        let target = K8sResource::new(Some("prod-eu"), Some("payments"), false);
        assert_eq!(K8sScanner::scope_args(&target), ["--context", "prod-eu", "-n", "payments"]);
    }

    #[test]
    fn test_scope_args_all_namespaces() {
        let target = K8sResource::new(None, Some("payments"), true);
        assert_eq!(K8sScanner::scope_args(&target), ["--all-namespaces"]);
    }

    #[test]
    fn test_safe_name() {
        let target = K8sResource::new(Some("arn:aws:eks/prod"), Some("web"), false);
        assert_eq!(K8sScanner.safe_name(&target), "arn_aws_eks_prod_web");
        let target = K8sResource::new(None, None, true);
        assert_eq!(K8sScanner.safe_name(&target), "current_all-namespaces");
    }
}
