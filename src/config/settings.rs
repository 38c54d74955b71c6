use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::WardenError;
use crate::scanners::catalog;
use super::types::{Profile, ToolOverride, WardenConfig};

pub const DEFAULT_TIMEOUT_SECS: i64 = 600;
pub const DEFAULT_RETRIES: i64 = 1;
pub const DEFAULT_RESULTS_DIR: &str = "results";
pub const DEFAULT_GITLAB_URL: &str = "https://gitlab.com";

/// One unvalidated layer of scan settings (defaults, file, profile or CLI).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanSettings {
    pub tools: Option<Vec<String>>,
    pub results_dir: Option<PathBuf>,
    pub timeout: Option<i64>,
    pub retries: Option<i64>,
    pub threads: Option<i64>,
    pub allow_missing_tools: Option<bool>,
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub per_tool: BTreeMap<String, ToolOverride>,
    pub gitlab_url: Option<String>,
}

impl ScanSettings {
    /// Top-level file settings with the selected profile laid over them.
    pub fn from_config(config: &WardenConfig, profile: Option<&str>) -> Result<Self, WardenError> {
        let file_layer = Self {
            tools: config.tools.clone(),
            results_dir: config.results_dir.clone(),
            timeout: config.timeout,
            retries: config.retries,
            threads: config.threads,
            allow_missing_tools: config.allow_missing_tools,
            include: (!config.include.is_empty()).then(|| config.include.clone()),
            exclude: (!config.exclude.is_empty()).then(|| config.exclude.clone()),
            per_tool: config.per_tool.clone(),
            gitlab_url: config.gitlab_url.clone(),
        };

        if let Some(name) = profile {
            if !config.profiles.contains_key(name) {
                return Err(WardenError::Config(format!("Unknown profile '{}'", name)));
            }
        }

        Ok(match config.resolve_profile(profile) {
            Some((_, p)) => file_layer.overlay(Self::from_profile(p)),
            None => file_layer,
        })
    }

    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            tools: profile.tools.clone(),
            timeout: profile.timeout,
            retries: profile.retries,
            threads: profile.threads,
            allow_missing_tools: profile.allow_missing_tools,
            include: profile.include.clone(),
            exclude: profile.exclude.clone(),
            per_tool: profile.per_tool.clone(),
            ..Default::default()
        }
    }

    /// Fields set in `higher` win. Per-tool overrides merge by tool name.
    pub fn overlay(self, higher: ScanSettings) -> Self {
        let mut per_tool = self.per_tool;
        per_tool.extend(higher.per_tool);
        Self {
            tools: higher.tools.or(self.tools),
            results_dir: higher.results_dir.or(self.results_dir),
            timeout: higher.timeout.or(self.timeout),
            retries: higher.retries.or(self.retries),
            threads: higher.threads.or(self.threads),
            allow_missing_tools: higher.allow_missing_tools.or(self.allow_missing_tools),
            include: higher.include.or(self.include),
            exclude: higher.exclude.or(self.exclude),
            per_tool,
            gitlab_url: higher.gitlab_url.or(self.gitlab_url),
        }
    }
}

/// Validated per-tool override.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolSettings {
    pub timeout: Option<Duration>,
    pub flags: Vec<String>,
}

/// Validated scan configuration, built once per invocation.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub tools: Vec<String>,
    pub results_dir: PathBuf,
    pub timeout: Duration,
    pub retries: u32,
    /// `None` means auto-detect.
    pub max_workers: Option<usize>,
    pub allow_missing_tools: bool,
    pub include: Vec<glob::Pattern>,
    pub exclude: Vec<glob::Pattern>,
    pub per_tool: BTreeMap<String, ToolSettings>,
    pub gitlab_url: String,
}

impl ScanConfig {
    pub fn new(tools: Vec<String>, results_dir: impl Into<PathBuf>) -> Result<Self, WardenError> {
        ScanSettings {
            tools: Some(tools),
            results_dir: Some(results_dir.into()),
            ..Default::default()
        }
        .try_into()
    }

    pub fn tool_settings(&self, tool: &str) -> Option<&ToolSettings> {
        self.per_tool.get(tool)
    }
}

impl TryFrom<ScanSettings> for ScanConfig {
    type Error = WardenError;

    fn try_from(settings: ScanSettings) -> Result<Self, Self::Error> {
        let tools = validate_tools(settings.tools)?;

        let timeout = settings.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout <= 0 {
            return Err(WardenError::Config(format!(
                "timeout must be a positive number of seconds, got {}",
                timeout
            )));
        }

        let retries = settings.retries.unwrap_or(DEFAULT_RETRIES);
        if retries < 0 {
            return Err(WardenError::Config(format!("retries must not be negative, got {}", retries)));
        }
        let retries = u32::try_from(retries)
            .map_err(|_| WardenError::Config(format!("retries out of range: {}", retries)))?;

        let max_workers = match settings.threads {
            None => None,
            Some(n) if n < 1 => {
                return Err(WardenError::Config(format!("threads must be at least 1, got {}", n)))
            }
            Some(n) => Some(
                usize::try_from(n)
                    .map_err(|_| WardenError::Config(format!("threads out of range: {}", n)))?,
            ),
        };

        let mut per_tool = BTreeMap::new();
        for (name, over) in settings.per_tool {
            if catalog::lookup(&name).is_none() {
                return Err(WardenError::Config(format!("per_tool: unknown tool '{}'", name)));
            }
            let timeout = match over.timeout {
                None => None,
                Some(secs) if secs <= 0 => {
                    return Err(WardenError::Config(format!(
                        "per_tool.{}.timeout must be positive, got {}",
                        name, secs
                    )))
                }
                Some(secs) => Some(Duration::from_secs(secs as u64)),
            };
            per_tool.insert(name, ToolSettings { timeout, flags: over.flags });
        }

        Ok(Self {
            tools,
            results_dir: settings
                .results_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_DIR)),
            timeout: Duration::from_secs(timeout as u64),
            retries,
            max_workers,
            allow_missing_tools: settings.allow_missing_tools.unwrap_or(false),
            include: compile_patterns("include", settings.include.unwrap_or_default())?,
            exclude: compile_patterns("exclude", settings.exclude.unwrap_or_default())?,
            per_tool,
            gitlab_url: settings
                .gitlab_url
                .unwrap_or_else(|| DEFAULT_GITLAB_URL.to_string()),
        })
    }
}

fn validate_tools(tools: Option<Vec<String>>) -> Result<Vec<String>, WardenError> {
    let tools: Vec<String> = match tools {
        None => return Ok(catalog::tool_names().into_iter().map(String::from).collect()),
        Some(tools) => tools
            .into_iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect(),
    };
    if tools.is_empty() {
        return Err(WardenError::Config("at least one tool must be selected".into()));
    }

    let mut unique = Vec::with_capacity(tools.len());
    for tool in tools {
        if catalog::lookup(&tool).is_none() {
            return Err(WardenError::Config(format!(
                "unknown tool '{}' (known: {})",
                tool,
                catalog::tool_names().join(", ")
            )));
        }
        if !unique.contains(&tool) {
            unique.push(tool);
        }
    }
    Ok(unique)
}

fn compile_patterns(field: &str, patterns: Vec<String>) -> Result<Vec<glob::Pattern>, WardenError> {
    patterns
        .iter()
        .map(|p| {
            glob::Pattern::new(p)
                .map_err(|e| WardenError::Config(format!("invalid {} pattern '{}': {}", field, p, e)))
        })
        .collect()
}
