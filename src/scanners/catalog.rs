use crate::models::TargetType;

/// A scanner binary the orchestrator knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: &'static str,
    /// Executable looked up on PATH.
    pub binary: &'static str,
    pub targets: &'static [TargetType],
    /// Written in place of real output when the binary is missing and
    /// missing tools are allowed.
    pub stub: &'static str,
}

impl ToolSpec {
    pub fn applies_to(&self, target_type: TargetType) -> bool {
        self.targets.contains(&target_type)
    }
}

pub const TOOL_CATALOG: &[ToolSpec] = &[
    ToolSpec {
        name: "trufflehog",
        binary: "trufflehog",
        targets: &[TargetType::Repo, TargetType::Image, TargetType::Gitlab],
        stub: "",
    },
    ToolSpec {
        name: "semgrep",
        binary: "semgrep",
        targets: &[TargetType::Repo],
        stub: r#"{"results": [], "errors": []}"#,
    },
    ToolSpec {
        name: "trivy",
        binary: "trivy",
        targets: &[TargetType::Repo, TargetType::Image, TargetType::Iac, TargetType::K8s],
        stub: r#"{"Results": []}"#,
    },
    ToolSpec {
        name: "syft",
        binary: "syft",
        targets: &[TargetType::Repo, TargetType::Image],
        stub: r#"{"artifacts": []}"#,
    },
    ToolSpec {
        name: "checkov",
        binary: "checkov",
        targets: &[TargetType::Repo, TargetType::Iac],
        stub: r#"{"results": {"failed_checks": []}}"#,
    },
    ToolSpec {
        name: "hadolint",
        binary: "hadolint",
        targets: &[TargetType::Repo],
        stub: "[]",
    },
    ToolSpec {
        name: "bandit",
        binary: "bandit",
        targets: &[TargetType::Repo],
        stub: r#"{"results": []}"#,
    },
    ToolSpec {
        name: "zap",
        binary: "zap.sh",
        targets: &[TargetType::Url],
        stub: r#"{"site": []}"#,
    },
    ToolSpec {
        name: "nuclei",
        binary: "nuclei",
        targets: &[TargetType::Url],
        stub: "",
    },
];

pub fn lookup(name: &str) -> Option<&'static ToolSpec> {
    TOOL_CATALOG.iter().find(|spec| spec.name == name)
}

pub fn tool_names() -> Vec<&'static str> {
    TOOL_CATALOG.iter().map(|spec| spec.name).collect()
}

/// Tools from `requested` that apply to `target_type`, keeping request order.
pub fn applicable_tools(requested: &[String], target_type: TargetType) -> Vec<String> {
    requested
        .iter()
        .filter(|name| lookup(name).map_or(false, |spec| spec.applies_to(target_type)))
        .cloned()
        .collect()
}
