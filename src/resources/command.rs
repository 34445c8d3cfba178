//! Execute handler: runs a command line in a step's working directory.

use crate::core::error::CommandError;
use crate::transport::{CommandRunner, ExecOutput};
use std::path::Path;

/// Run `command` via `runner`. A missing `cwd` fails before anything is
/// spawned; a non-zero exit carries the captured output.
pub fn run(
    runner: &mut dyn CommandRunner,
    command: &str,
    cwd: Option<&Path>,
) -> Result<ExecOutput, CommandError> {
    if let Some(dir) = cwd {
        if !dir.is_dir() {
            return Err(CommandError::MissingDirectory(dir.to_path_buf()));
        }
    }

    let out = runner
        .run(command, cwd)
        .map_err(|detail| CommandError::Spawn {
            command: command.to_string(),
            detail,
        })?;

    if out.success() {
        Ok(out)
    } else {
        Err(CommandError::Exit {
            command: command.to_string(),
            exit_code: out.exit_code,
            stdout: out.stdout,
            stderr: out.stderr,
        })
    }
}
