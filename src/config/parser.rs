use std::path::Path;

use tracing::{debug, warn};

use crate::errors::WardenError;
use super::types::WardenConfig;

const MAX_CONFIG_BYTES: u64 = 1_048_576;

pub async fn parse_config(path: &Path) -> Result<WardenConfig, WardenError> {
    if !path.exists() {
        return Err(WardenError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > MAX_CONFIG_BYTES {
        return Err(WardenError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    let config = parse_config_str(&content)
        .map_err(|e| WardenError::Config(format!("{}: {}", path.display(), e)))?;

    debug!(path = %path.display(), profiles = config.profiles.len(), "Config loaded");
    Ok(config)
}

pub fn parse_config_str(content: &str) -> Result<WardenConfig, WardenError> {
    // An empty file is a valid, empty config.
    if content.trim().is_empty() {
        return Ok(WardenConfig::default());
    }
    let config: WardenConfig = serde_yaml::from_str(content)?;
    validate_conflicts(&config)?;
    Ok(config)
}

/// Cross-field checks that serde cannot express.
fn validate_conflicts(config: &WardenConfig) -> Result<(), WardenError> {
    if let Some(name) = &config.default_profile {
        if !config.profiles.contains_key(name) {
            return Err(WardenError::Config(format!(
                "default_profile '{}' is not defined under profiles",
                name
            )));
        }
    }

    for pattern in &config.include {
        if config.exclude.contains(pattern) {
            warn!(pattern = %pattern, "Pattern is both included and excluded; exclude wins");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_content() {
        let config = parse_config_str("  \n").unwrap();
        assert!(config.tools.is_none());
    }

    #[test]
    fn test_undefined_default_profile() {
        let err = parse_config_str("default_profile: ci\n").unwrap_err();
        assert!(err.to_string().contains("ci"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_malformed_yaml() {
        assert!(parse_config_str("tools: [trivy").is_err());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = parse_config(Path::new("/nonexistent/scanwarden.yaml")).await.unwrap_err();
        assert!(matches!(err, WardenError::Config(_)));
    }

    #[tokio::test]
    async fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scanwarden.yaml");
        tokio::fs::write(&path, "tools: [trivy]\ntimeout: 30\n").await.unwrap();
        let config = parse_config(&path).await.unwrap();
        assert_eq!(config.timeout, Some(30));
    }
}
