use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::WardenError;

/// Exit codes treated as "ran fine". Most scanners exit 1 when they found
/// something, which is not a crash.
pub const DEFAULT_OK_RETURN_CODES: [i32; 2] = [0, 1];
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(600);

/// One scanner invocation. Built through [`ToolDefinitionBuilder`], immutable
/// afterwards.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    name: String,
    command: Vec<String>,
    output_file: Option<PathBuf>,
    timeout: Duration,
    retries: u32,
    ok_return_codes: BTreeSet<i32>,
    capture_stdout: bool,
    env: Vec<(String, String)>,
}

impl ToolDefinition {
    pub fn builder(name: impl Into<String>, command: Vec<String>) -> ToolDefinitionBuilder {
        ToolDefinitionBuilder {
            name: name.into(),
            command,
            output_file: None,
            timeout: DEFAULT_TOOL_TIMEOUT,
            retries: 0,
            ok_return_codes: DEFAULT_OK_RETURN_CODES.into_iter().collect(),
            capture_stdout: false,
            env: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn program(&self) -> &str {
        &self.command[0]
    }

    pub fn output_file(&self) -> Option<&Path> {
        self.output_file.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn ok_return_codes(&self) -> &BTreeSet<i32> {
        &self.ok_return_codes
    }

    pub fn is_ok_code(&self, code: i32) -> bool {
        self.ok_return_codes.contains(&code)
    }

    pub fn capture_stdout(&self) -> bool {
        self.capture_stdout
    }

    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }
}

#[derive(Debug, Clone)]
pub struct ToolDefinitionBuilder {
    name: String,
    command: Vec<String>,
    output_file: Option<PathBuf>,
    timeout: Duration,
    retries: u32,
    ok_return_codes: BTreeSet<i32>,
    capture_stdout: bool,
    env: Vec<(String, String)>,
}

impl ToolDefinitionBuilder {
    pub fn output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout_secs(self, secs: u64) -> Self {
        self.timeout(Duration::from_secs(secs))
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn ok_return_codes<I: IntoIterator<Item = i32>>(mut self, codes: I) -> Self {
        self.ok_return_codes = codes.into_iter().collect();
        self
    }

    pub fn capture_stdout(mut self, capture: bool) -> Self {
        self.capture_stdout = capture;
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Append extra argv entries (per-tool flags from config).
    pub fn extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<ToolDefinition, WardenError> {
        if self.name.trim().is_empty() {
            return Err(WardenError::InvalidTool("tool name must not be empty".into()));
        }
        match self.command.first() {
            None => {
                return Err(WardenError::InvalidTool(format!(
                    "{}: command must not be empty",
                    self.name
                )))
            }
            Some(program) if program.trim().is_empty() => {
                return Err(WardenError::InvalidTool(format!(
                    "{}: program name must not be empty",
                    self.name
                )))
            }
            Some(_) => {}
        }
        if self.timeout.is_zero() {
            return Err(WardenError::InvalidTool(format!(
                "{}: timeout must be greater than zero",
                self.name
            )));
        }
        if self.ok_return_codes.is_empty() {
            return Err(WardenError::InvalidTool(format!(
                "{}: at least one acceptable return code is required",
                self.name
            )));
        }

        Ok(ToolDefinition {
            name: self.name,
            command: self.command,
            output_file: self.output_file,
            timeout: self.timeout,
            retries: self.retries,
            ok_return_codes: self.ok_return_codes,
            capture_stdout: self.capture_stdout,
            env: self.env,
        })
    }
}
