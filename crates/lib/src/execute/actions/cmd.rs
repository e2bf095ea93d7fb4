//! Shell command execution for command steps.

use std::path::Path;

use tokio::process::Command;
use tracing::{debug, info};

use crate::execute::RunnerError;

/// Run `cmd` through the platform shell with `cwd` as working directory.
///
/// The environment is inherited: steps call external geospatial tools that
/// must be found on the user's `PATH`. On failure the diagnostic carries
/// the exit code and the captured stderr and stdout.
///
/// # Returns
///
/// The stdout of the command on success (trimmed).
pub async fn run_shell(cmd: &str, cwd: &Path, shell: Option<&str>) -> Result<String, RunnerError> {
  info!(cmd = %cmd, "executing command");

  let (shell_cmd, shell_args) = get_shell(shell);

  let mut command = Command::new(&shell_cmd);
  command
    .args(&shell_args)
    .arg(cmd)
    .current_dir(cwd)
    .env("LANG", "C")
    .env("LC_ALL", "C");

  debug!(shell = %shell_cmd, working_dir = ?cwd, "spawning process");

  let output = command
    .output()
    .await
    .map_err(|e| RunnerError::new(format!("failed to spawn {}: {}", shell_cmd, e)))?;

  let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
  let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

  if !output.status.success() {
    let code = output
      .status
      .code()
      .map(|c| c.to_string())
      .unwrap_or_else(|| "signal".to_string());
    let mut message = format!("command exited with {}: {}", code, cmd);
    if !stderr.is_empty() {
      message.push_str("\nstderr:\n");
      message.push_str(&stderr);
    }
    if !stdout.is_empty() {
      message.push_str("\nstdout:\n");
      message.push_str(&stdout);
    }
    return Err(RunnerError::new(message));
  }

  if !stderr.is_empty() {
    debug!(stderr = %stderr, "command stderr");
  }
  if !stdout.is_empty() {
    debug!(stdout = %stdout, "command output");
  }

  Ok(stdout)
}

/// Get the shell command and arguments for the current platform.
///
/// Defaults to `/bin/sh -c` on Unix and PowerShell on Windows; an explicit
/// shell gets the argument style its name suggests.
fn get_shell(override_shell: Option<&str>) -> (String, Vec<String>) {
  if let Some(shell) = override_shell {
    let args = if shell.contains("powershell") || shell.contains("pwsh") {
      vec!["-NoProfile".to_string(), "-Command".to_string()]
    } else if shell.contains("cmd") {
      vec!["/C".to_string()]
    } else {
      vec!["-c".to_string()]
    };
    return (shell.to_string(), args);
  }

  #[cfg(unix)]
  {
    ("/bin/sh".to_string(), vec!["-c".to_string()])
  }

  #[cfg(windows)]
  {
    (
      "powershell.exe".to_string(),
      vec![
        "-NoProfile".to_string(),
        "-ExecutionPolicy".to_string(),
        "Bypass".to_string(),
        "-Command".to_string(),
      ],
    )
  }
}
