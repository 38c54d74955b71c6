use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WardenError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid tool definition: {0}")]
    InvalidTool(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Target discovery failed: {0}")]
    Discovery(String),

    #[error("No scan targets found")]
    NoTargets,

    #[error("Path traversal blocked: {} is outside {}", .path.display(), .base.display())]
    PathTraversal { path: PathBuf, base: PathBuf },

    #[error("GitLab API error: {0}")]
    Gitlab(String),

    #[error("Git error: {0}")]
    Git(String),

    #[error("Scan incomplete: {0} tool run(s) failed")]
    ScanIncomplete(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WardenError {
    /// Process exit code for a scan that ended with this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            WardenError::Config(_) | WardenError::InvalidTool(_) | WardenError::Yaml(_) => 2,
            WardenError::NoTargets => 3,
            WardenError::InvalidTarget(_) | WardenError::Discovery(_) => 4,
            WardenError::PathTraversal { .. } => 5,
            _ => 1,
        }
    }
}
