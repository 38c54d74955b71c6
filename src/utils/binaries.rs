use std::collections::HashSet;
use std::path::Path;

/// Answers "is this scanner binary installed?" for the missing-tool policy.
pub trait ToolLocator: Send + Sync {
    fn is_installed(&self, binary: &str) -> bool;
}

/// Looks binaries up on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPath;

impl ToolLocator for SystemPath {
    fn is_installed(&self, binary: &str) -> bool {
        which_exists(binary)
    }
}

/// Fixed set of installed binaries, for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticLocator {
    installed: HashSet<String>,
}

impl StaticLocator {
    pub fn new<I, S>(installed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { installed: installed.into_iter().map(Into::into).collect() }
    }
}

impl ToolLocator for StaticLocator {
    fn is_installed(&self, binary: &str) -> bool {
        self.installed.contains(binary)
    }
}

pub fn which_exists(cmd: &str) -> bool {
    // Explicit paths are checked directly.
    if cmd.contains(std::path::MAIN_SEPARATOR) {
        return is_executable(Path::new(cmd));
    }
    std::env::var_os("PATH")
        .map(|path| std::env::split_paths(&path).any(|dir| is_executable(&dir.join(cmd))))
        .unwrap_or(false)
}

fn is_executable(candidate: &Path) -> bool {
    if !candidate.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(candidate)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_sh_is_found() {
        assert!(SystemPath.is_installed("sh"));
    }

    #[test]
    fn test_missing_binary() {
        assert!(!SystemPath.is_installed("scanwarden-no-such-binary-7f3a"));
    }

    #[test]
    fn test_static_locator() {
        let locator = StaticLocator::new(["trivy", "semgrep"]);
        assert!(locator.is_installed("trivy"));
        assert!(!locator.is_installed("zap.sh"));
    }
}
