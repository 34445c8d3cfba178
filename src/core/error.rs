//! Step error kinds.
//!
//! Every variant carries owned strings so a failure can be stored in a
//! `StepResult`, cloned into reports, and compared in tests.

use std::path::PathBuf;
use thiserror::Error;

/// Why a step failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("package install failed for '{package}': {detail}")]
    PackageInstall { package: String, detail: String },

    #[error("cannot create directory {}: {detail}", path.display())]
    DirectoryCreate { path: PathBuf, detail: String },

    #[error("precondition check failed for {step}: {detail}")]
    PreconditionCheck { step: String, detail: String },

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Failure of a command-running action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("working directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),

    #[error("failed to spawn '{command}': {detail}")]
    Spawn { command: String, detail: String },

    #[error("'{command}' exited with code {exit_code}: {}", summarize(stderr, stdout))]
    Exit {
        command: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },
}

/// Prefer stderr; fall back to stdout when the tool reports errors there.
fn summarize(stderr: &str, stdout: &str) -> String {
    let text = if stderr.trim().is_empty() { stdout } else { stderr };
    text.trim().to_string()
}
