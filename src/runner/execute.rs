use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::utils::truncation::truncate_error;
use super::definition::ToolDefinition;
use super::result::{ToolResult, ToolStatus};
use super::retry::{AttemptFailure, RetryPolicy};

struct AttemptOutput {
    returncode: i32,
    stdout: Option<String>,
    stderr: Option<String>,
}

/// Run one tool to completion, retrying per its definition.
///
/// Never fails: every outcome, including a missing binary, is reported as a
/// [`ToolResult`].
pub async fn run_tool(tool: &ToolDefinition, policy: &RetryPolicy) -> ToolResult {
    let started = Instant::now();
    let max_attempts = tool.retries().saturating_add(1);
    let mut attempt: u32 = 1;

    loop {
        debug!(tool = %tool.name(), attempt, max = max_attempts, "Launching tool");

        let failure = match run_attempt(tool).await {
            Ok(output) => {
                info!(
                    tool = %tool.name(),
                    returncode = output.returncode,
                    attempts = attempt,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Tool finished"
                );
                return ToolResult {
                    tool: tool.name().to_string(),
                    status: ToolStatus::Success,
                    returncode: output.returncode,
                    attempts: attempt,
                    duration_ms: started.elapsed().as_millis() as u64,
                    stdout: output.stdout,
                    stderr: output.stderr.as_deref().map(truncate_error),
                    error_message: String::new(),
                    output_file: tool.output_file().map(|p| p.to_path_buf()),
                };
            }
            Err(failure) => failure,
        };

        let classification = failure.classify();
        if !classification.retryable || attempt >= max_attempts {
            if !classification.retryable {
                warn!(
                    tool = %tool.name(),
                    error_type = classification.error_type,
                    error = %failure,
                    "Non-retryable tool failure"
                );
            } else {
                warn!(
                    tool = %tool.name(),
                    attempts = attempt,
                    error_type = classification.error_type,
                    error = %failure,
                    "Tool failed, no attempts left"
                );
            }
            return final_failure(tool, &failure, attempt, started);
        }

        let delay = policy.delay_after(attempt);
        warn!(
            tool = %tool.name(),
            attempt,
            max = max_attempts,
            error_type = classification.error_type,
            delay_ms = delay.as_millis() as u64,
            error = %failure,
            "Retrying tool after failure"
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        attempt += 1;
    }
}

fn final_failure(
    tool: &ToolDefinition,
    failure: &AttemptFailure,
    attempts: u32,
    started: Instant,
) -> ToolResult {
    let (status, message) = match failure {
        AttemptFailure::ExitCode { code, stderr } => {
            let mut message = format!(
                "{} exited with code {} after {} attempt(s)",
                tool.name(),
                code,
                attempts
            );
            if let Some(stderr) = stderr.as_deref().filter(|s| !s.trim().is_empty()) {
                message.push_str(": ");
                message.push_str(&truncate_error(stderr));
            }
            (ToolStatus::RetryExhausted, message)
        }
        other => (ToolStatus::Error, format!("{}: {}", tool.name(), other)),
    };

    let mut result = ToolResult::failed(
        tool.name(),
        status,
        attempts,
        started.elapsed(),
        message,
        tool.output_file().map(|p| p.to_path_buf()),
    );
    if let AttemptFailure::ExitCode { stderr: Some(stderr), .. } = failure {
        result.stderr = Some(truncate_error(stderr));
    }
    result
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> Option<String> {
    let mut pipe = pipe?;
    let mut buf = Vec::new();
    match pipe.read_to_end(&mut buf).await {
        Ok(_) => Some(String::from_utf8_lossy(&buf).into_owned()),
        Err(e) => {
            debug!(error = %e, "Failed to read tool output pipe");
            None
        }
    }
}

/// SIGKILL the tool's whole process group. Must run before the child is reaped.
#[cfg(unix)]
fn kill_process_group(child: &Child) {
    let Some(pid) = child.id() else {
        return;
    };
    // SAFETY: killpg only sends a signal; the group id is the child's pid.
    let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
    if rc != 0 {
        debug!(pid, error = %std::io::Error::last_os_error(), "killpg failed");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) {}

async fn run_attempt(tool: &ToolDefinition) -> Result<AttemptOutput, AttemptFailure> {
    let program = tool.program();
    let mut cmd = Command::new(program);
    cmd.args(&tool.command()[1..])
        .stdin(Stdio::null())
        .kill_on_drop(true);
    // Own process group, so a timeout can take down wrapper scripts' children.
    #[cfg(unix)]
    cmd.process_group(0);
    for (key, value) in tool.env() {
        cmd.env(key, value);
    }
    // Without capture, output goes nowhere; large results belong in output_file.
    if tool.capture_stdout() {
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    } else {
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
    }

    let mut child = cmd
        .spawn()
        .map_err(|e| AttemptFailure::from_spawn(program, e))?;
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let outcome = tokio::time::timeout(tool.timeout(), async {
        tokio::join!(child.wait(), read_pipe(stdout), read_pipe(stderr))
    })
    .await;

    let (status, stdout, stderr) = match outcome {
        Ok((Ok(status), stdout, stderr)) => (status, stdout, stderr),
        Ok((Err(e), _, _)) => return Err(AttemptFailure::Wait(e)),
        Err(_) => {
            kill_process_group(&child);
            if let Err(e) = child.kill().await {
                debug!(tool = %tool.name(), error = %e, "Kill after timeout failed");
            }
            return Err(AttemptFailure::Timeout(tool.timeout()));
        }
    };

    // Terminated by a signal: no exit code.
    let returncode = status.code().unwrap_or(-1);
    if tool.is_ok_code(returncode) {
        Ok(AttemptOutput { returncode, stdout, stderr })
    } else {
        Err(AttemptFailure::ExitCode { code: returncode, stderr })
    }
}
