//! Subprocess invocation with a hard timeout
//!
//! One helper for both orchestrators: spawn, capture combined output, and
//! on timeout tear the child down (`kill_on_drop`) and report the unit as
//! timed out instead of failing the whole run.

use std::io;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

/// Captured result of one external tool invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Process exit code; -1 when unavailable (killed or timed out)
    pub exit_code: i32,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
    /// True when the timeout fired and the process was killed
    pub timed_out: bool,
}

impl CommandOutput {
    /// Stdout and stderr concatenated, for marker scanning.
    #[must_use]
    pub fn combined(&self) -> String {
        let mut combined = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
        combined.push_str(&self.stdout);
        if !self.stderr.is_empty() {
            combined.push('\n');
            combined.push_str(&self.stderr);
        }
        combined
    }
}

/// Invokes an external tool and captures its output.
///
/// Implement this to substitute subprocess execution, e.g. for in-process
/// fakes. The default implementation is [`SubprocessInvoker`].
#[async_trait::async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Run `program` with `args`, enforcing `timeout`.
    ///
    /// # Errors
    /// Propagates start failures (program missing, permissions). A timeout
    /// is not an error; it is reported in the returned output.
    async fn invoke(
        &self,
        program: &Path,
        args: &[String],
        cwd: Option<&Path>,
        timeout: Duration,
    ) -> io::Result<CommandOutput>;
}

/// Default invoker: a real subprocess, killed when the timeout fires.
#[derive(Debug, Default)]
pub struct SubprocessInvoker;

#[async_trait::async_trait]
impl ToolInvoker for SubprocessInvoker {
    async fn invoke(
        &self,
        program: &Path,
        args: &[String],
        cwd: Option<&Path>,
        timeout: Duration,
    ) -> io::Result<CommandOutput> {
        run_with_timeout(program, args, cwd, timeout).await
    }
}

/// Run `program` with `args`, killing it when `timeout` elapses.
///
/// # Errors
/// Propagates spawn failures (program missing, permissions). A timeout is
/// not an error; it is reported in the returned output.
async fn run_with_timeout(
    program: &Path,
    args: &[String],
    cwd: Option<&Path>,
    timeout: Duration,
) -> io::Result<CommandOutput> {
    let mut command = Command::new(program);
    command.args(args).kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let child = command
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => {
            let output = output?;
            Ok(CommandOutput {
                exit_code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                timed_out: false,
            })
        }
        // Dropping the wait future drops the child handle, and
        // kill_on_drop takes the process down with it.
        Err(_elapsed) => Ok(CommandOutput {
            exit_code: -1,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: true,
        }),
    }
}
