use std::time::Duration;

use thiserror::Error;

/// Delay between attempts of the same tool.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Why a single launch of a tool did not count as a success.
#[derive(Debug, Error)]
pub enum AttemptFailure {
    #[error("tool binary not found: {program}")]
    NotFound { program: String },

    #[error("permission denied launching {program}: {source}")]
    PermissionDenied {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timeout after {:.1}s, process killed", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("exited with code {code}")]
    ExitCode { code: i32, stderr: Option<String> },

    #[error("failed waiting for process: {0}")]
    Wait(#[source] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub retryable: bool,
}

impl AttemptFailure {
    pub fn from_spawn(program: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { program: program.to_string() },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                program: program.to_string(),
                source: err,
            },
            _ => Self::Launch { program: program.to_string(), source: err },
        }
    }

    /// Classify this failure to determine whether another attempt can help.
    ///
    /// A missing binary stays missing, so it is the only failure that is
    /// never retried.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            Self::NotFound { .. } => ErrorClassification {
                error_type: "ToolNotFound",
                retryable: false,
            },
            Self::PermissionDenied { .. } => ErrorClassification {
                error_type: "PermissionDenied",
                retryable: true,
            },
            Self::Launch { .. } => ErrorClassification {
                error_type: "LaunchError",
                retryable: true,
            },
            Self::Timeout(_) => ErrorClassification {
                error_type: "Timeout",
                retryable: true,
            },
            Self::ExitCode { .. } => ErrorClassification {
                error_type: "NonZeroExit",
                retryable: true,
            },
            Self::Wait(_) => ErrorClassification {
                error_type: "WaitError",
                retryable: true,
            },
        }
    }
}

/// Retry pacing for [`crate::runner::ToolRunner`]. The number of attempts
/// comes from each tool definition; this only controls the pause.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self { delay }
    }

    /// No pause between attempts.
    pub fn immediate() -> Self {
        Self { delay: Duration::ZERO }
    }

    /// Delay before the attempt following `attempt` (1-based).
    pub fn delay_after(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RETRY_DELAY)
    }
}
