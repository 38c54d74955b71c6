use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// On-disk YAML configuration. Everything is optional; unset fields fall
/// back to the active profile, then to built-in defaults.
///
/// Numeric fields are signed so that a negative value in the file reaches
/// validation and gets a proper message instead of a parse error.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct WardenConfig {
    pub default_profile: Option<String>,
    pub tools: Option<Vec<String>>,
    pub results_dir: Option<PathBuf>,
    pub timeout: Option<i64>,
    pub retries: Option<i64>,
    pub threads: Option<i64>,
    pub allow_missing_tools: Option<bool>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub gitlab_url: Option<String>,
    pub per_tool: BTreeMap<String, ToolOverride>,
    pub profiles: BTreeMap<String, Profile>,
}

/// A named bundle of tools and execution settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Profile {
    pub description: Option<String>,
    pub tools: Option<Vec<String>>,
    pub timeout: Option<i64>,
    pub retries: Option<i64>,
    pub threads: Option<i64>,
    pub allow_missing_tools: Option<bool>,
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub per_tool: BTreeMap<String, ToolOverride>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ToolOverride {
    /// Seconds; replaces the scan-wide timeout for this tool.
    pub timeout: Option<i64>,
    /// Appended to the tool's argv.
    pub flags: Vec<String>,
}

impl WardenConfig {
    /// Profile named explicitly, else `default_profile`, else none.
    pub fn resolve_profile(&self, name: Option<&str>) -> Option<(&str, &Profile)> {
        let name = name.or(self.default_profile.as_deref())?;
        self.profiles
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let config = WardenConfig::default();
        assert!(config.tools.is_none());
        assert!(config.profiles.is_empty());
        assert!(config.per_tool.is_empty());
    }

    #[test]
    fn test_deserialize_full() {
        let yaml = r#"
default_profile: quick
tools: [trivy, semgrep]
results_dir: ./out
timeout: 300
retries: 2
per_tool:
  semgrep:
    timeout: 900
    flags: ["--exclude", "vendor"]
profiles:
  quick:
    tools: [trufflehog]
    timeout: 60
"#;
        let config: WardenConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.tools.as_deref().map(|t| t.len()), Some(2));
        assert_eq!(config.timeout, Some(300));
        assert_eq!(config.per_tool["semgrep"].timeout, Some(900));
        assert_eq!(config.per_tool["semgrep"].flags, vec!["--exclude", "vendor"]);

        let (name, profile) = config.resolve_profile(None).unwrap();
        assert_eq!(name, "quick");
        assert_eq!(profile.timeout, Some(60));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = "tools: [trivy]\ntimeot: 5\n";
        assert!(serde_yaml::from_str::<WardenConfig>(yaml).is_err());
    }

    #[test]
    fn test_resolve_missing_profile() {
        let config = WardenConfig::default();
        assert!(config.resolve_profile(Some("nope")).is_none());
        assert!(config.resolve_profile(None).is_none());
    }
}
