use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::errors::WardenError;

pub const SCAN_LOG_FILE: &str = "scan.log";
pub const SUMMARY_FILE: &str = "scan-summary.json";

/// Append-only, human-readable log of one or more scans in a results directory.
#[derive(Debug, Clone)]
pub struct ScanLog {
    path: PathBuf,
}

impl ScanLog {
    pub fn new(results_dir: &Path) -> Self {
        Self { path: results_dir.join(SCAN_LOG_FILE) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a section header. Earlier scans in the same file are kept.
    pub async fn start(&self, scan_id: &str) -> Result<(), WardenError> {
        let header = format!(
            "\n# scanwarden scan {}\n# Started: {}\n",
            scan_id,
            Utc::now().to_rfc3339()
        );
        self.append(&header).await
    }

    pub async fn log_event(&self, message: &str) -> Result<(), WardenError> {
        let line = format!("[{}] {}\n", Utc::now().format("%H:%M:%S"), message);
        self.append(&line).await
    }

    async fn append(&self, text: &str) -> Result<(), WardenError> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(text.as_bytes()).await?;
        Ok(())
    }
}

/// Write `value` as pretty JSON via a temp file and rename.
pub async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), WardenError> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_appends_across_scans() {
        let dir = tempfile::tempdir().unwrap();
        let log = ScanLog::new(dir.path());
        log.start("first").await.unwrap();
        log.log_event("repo /src/a: 3/3 tools succeeded").await.unwrap();
        log.start("second").await.unwrap();

        let content = tokio::fs::read_to_string(log.path()).await.unwrap();
        assert!(content.contains("scan first"));
        assert!(content.contains("3/3 tools succeeded"));
        assert!(content.contains("scan second"));
    }

    #[tokio::test]
    async fn test_write_json_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SUMMARY_FILE);
        write_json_atomic(&path, &serde_json::json!({"ok": true})).await.unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();
        assert_eq!(parsed["ok"], true);
        assert!(!dir.path().join("scan-summary.json.tmp").exists());
    }
}
