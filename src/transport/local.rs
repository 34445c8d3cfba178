//! Local execution transport.

use super::ExecOutput;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Execute a shell script locally via `bash`, script fed on stdin.
/// Uses bash (not sh/dash) because generated scripts use `set -o pipefail`.
pub fn exec_local(script: &str) -> Result<ExecOutput, String> {
    let mut child = Command::new("bash")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("failed to spawn bash: {}", e))?;

    if let Some(ref mut stdin) = child.stdin {
        stdin
            .write_all(script.as_bytes())
            .map_err(|e| format!("stdin write error: {}", e))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| format!("wait error: {}", e))?;

    Ok(to_exec_output(output))
}

/// Execute a single command line via `bash -c`, optionally inside `cwd`.
/// The caller checks that `cwd` exists; a vanished directory surfaces as a
/// spawn error here.
pub fn exec_command(command: &str, cwd: Option<&Path>) -> Result<ExecOutput, String> {
    let mut cmd = Command::new("bash");
    cmd.arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let output = cmd
        .output()
        .map_err(|e| format!("failed to spawn bash: {}", e))?;

    Ok(to_exec_output(output))
}

fn to_exec_output(output: std::process::Output) -> ExecOutput {
    ExecOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}
