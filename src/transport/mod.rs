//! Command transport: runs step commands on the local host.

pub mod local;

use std::path::Path;

/// Output from executing a command or script.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs a command line with an optional working directory.
///
/// `Err` means the process could not be started; a non-zero exit is an
/// `Ok` output with `success() == false`.
pub trait CommandRunner {
    fn run(&mut self, command: &str, cwd: Option<&Path>) -> Result<ExecOutput, String>;
}

/// Runs commands on this machine through bash.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalRunner;

impl CommandRunner for LocalRunner {
    fn run(&mut self, command: &str, cwd: Option<&Path>) -> Result<ExecOutput, String> {
        local::exec_command(command, cwd)
    }
}
