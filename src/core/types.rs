//! Recipe schema, step model, and run outcome types.
//!
//! The YAML side (`RecipeConfig`, `StepSpec`) derives Serialize/Deserialize and
//! preserves declaration order. The runtime side (`Step`, `StepResult`,
//! `RunReport`) is what the executor consumes and produces.

use super::error::StepError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

// ============================================================================
// Top-level steprun.yaml
// ============================================================================

/// Root configuration: an ordered provisioning recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeConfig {
    /// Schema version (must be "1.0")
    pub version: String,

    /// Human-readable recipe name
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Template parameters
    #[serde(default)]
    pub params: HashMap<String, serde_yaml_ng::Value>,

    /// Recipe files whose steps run before this recipe's own steps
    #[serde(default)]
    pub include: Vec<String>,

    /// Step declarations (order-preserving, order is execution order)
    #[serde(default)]
    pub steps: IndexMap<String, StepSpec>,

    /// Execution policy
    #[serde(default)]
    pub policy: Policy,
}

/// A single declared step, before template resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepSpec {
    /// Step kind
    #[serde(rename = "type")]
    pub step_type: StepType,

    /// Display name (defaults to the step ID)
    #[serde(default)]
    pub name: Option<String>,

    // -- Package fields --
    /// Package name
    #[serde(default)]
    pub package: Option<String>,

    /// Package provider (apt, cargo)
    #[serde(default)]
    pub provider: Option<String>,

    // -- Directory fields --
    /// Directory path
    #[serde(default)]
    pub path: Option<String>,

    // -- Execute fields --
    /// Command line, run through bash
    #[serde(default)]
    pub command: Option<String>,

    /// Working directory for the command
    #[serde(default)]
    pub cwd: Option<String>,

    /// Skip the command when this file already exists
    #[serde(default)]
    pub creates: Option<String>,
}

/// Step kind enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Package,
    Directory,
    Execute,
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Package => write!(f, "package"),
            Self::Directory => write!(f, "directory"),
            Self::Execute => write!(f, "execute"),
        }
    }
}

// ============================================================================
// Policy
// ============================================================================

/// Execution policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Append provenance events for every run
    #[serde(default = "default_true")]
    pub tripwire: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self { tripwire: true }
    }
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Steps
// ============================================================================

/// Side-effecting operation performed when a step's precondition is unmet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    InstallPackage { package: String, provider: String },
    CreateDirectory { path: PathBuf },
    RunCommand { command: String },
}

/// Read-only check of host state. Satisfied means the action is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// No precondition: the action runs every time.
    Always,
    PackageInstalled(String),
    DirectoryExists(PathBuf),
    FileExists(PathBuf),
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "always"),
            Self::PackageInstalled(p) => write!(f, "package {} installed", p),
            Self::DirectoryExists(p) => write!(f, "directory {} exists", p.display()),
            Self::FileExists(p) => write!(f, "creates {}", p.display()),
        }
    }
}

/// One idempotent unit of provisioning work.
///
/// Constructed once and never mutated afterwards; the builder methods consume
/// `self` so configuration happens only at definition time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    name: String,
    precondition: Precondition,
    action: Action,
    working_directory: Option<PathBuf>,
    /// `creates` path as declared; relative paths are taken from the cwd
    creates: Option<PathBuf>,
}

impl Step {
    /// Ensure a package is installed via the default (apt) provider.
    pub fn package(package: impl Into<String>) -> Self {
        Self::package_with(package, "apt")
    }

    pub fn package_with(package: impl Into<String>, provider: impl Into<String>) -> Self {
        let package = package.into();
        Self {
            name: format!("package[{}]", package),
            precondition: Precondition::PackageInstalled(package.clone()),
            action: Action::InstallPackage {
                package,
                provider: provider.into(),
            },
            working_directory: None,
            creates: None,
        }
    }

    /// Ensure a directory (and its parents) exists.
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: format!("directory[{}]", path.display()),
            precondition: Precondition::DirectoryExists(path.clone()),
            action: Action::CreateDirectory { path },
            working_directory: None,
            creates: None,
        }
    }

    /// Run a command. Without `creates`, it runs on every invocation.
    pub fn execute(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            precondition: Precondition::Always,
            action: Action::RunCommand {
                command: command.into(),
            },
            working_directory: None,
            creates: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self.resolve_creates();
        self
    }

    /// Guard the step on a file: skip the action when `path` exists.
    /// A relative `path` is looked up inside the working directory.
    pub fn creates(mut self, path: impl Into<PathBuf>) -> Self {
        self.creates = Some(path.into());
        self.resolve_creates();
        self
    }

    fn resolve_creates(&mut self) {
        if let Some(path) = &self.creates {
            let guard = match &self.working_directory {
                Some(dir) if path.is_relative() => dir.join(path),
                _ => path.clone(),
            };
            self.precondition = Precondition::FileExists(guard);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn precondition(&self) -> &Precondition {
        &self.precondition
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn working_directory(&self) -> Option<&Path> {
        self.working_directory.as_deref()
    }

    /// Short description of the action for output lines.
    pub fn describe(&self) -> String {
        match &self.action {
            Action::InstallPackage { package, provider } => {
                format!("install {} ({})", package, provider)
            }
            Action::CreateDirectory { path } => format!("create {}", path.display()),
            Action::RunCommand { command } => match &self.working_directory {
                Some(dir) => format!("{} (in {})", command, dir.display()),
                None => command.clone(),
            },
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// Outcome of running one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    Unchanged,
    Changed,
    Failed(StepError),
}

impl StepResult {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchanged => write!(f, "UNCHANGED"),
            Self::Changed => write!(f, "CHANGED"),
            Self::Failed(_) => write!(f, "FAILED"),
        }
    }
}

/// A step's name paired with its outcome.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub name: String,
    pub result: StepResult,
    pub duration_seconds: f64,
}

/// Result of running a step sequence.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub records: Vec<StepRecord>,
    pub dry_run: bool,
    pub total_duration: std::time::Duration,
}

impl RunReport {
    pub fn results(&self) -> Vec<&StepResult> {
        self.records.iter().map(|r| &r.result).collect()
    }

    pub fn changed(&self) -> u32 {
        self.count(|r| matches!(r, StepResult::Changed))
    }

    pub fn unchanged(&self) -> u32 {
        self.count(|r| matches!(r, StepResult::Unchanged))
    }

    pub fn failed(&self) -> u32 {
        self.count(StepResult::is_failed)
    }

    /// The record that aborted the run, if any.
    pub fn failure(&self) -> Option<&StepRecord> {
        self.records.iter().find(|r| r.result.is_failed())
    }

    pub fn is_success(&self) -> bool {
        self.failure().is_none()
    }

    fn count(&self, pred: impl Fn(&StepResult) -> bool) -> u32 {
        self.records.iter().filter(|r| pred(&r.result)).count() as u32
    }
}

// ============================================================================
// Provenance events
// ============================================================================

/// Provenance event for the JSONL event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProvenanceEvent {
    RunStarted {
        host: String,
        run_id: String,
        steps: u32,
        steprun_version: String,
    },
    StepStarted {
        host: String,
        step: String,
        action: String,
    },
    StepChanged {
        host: String,
        step: String,
        duration_seconds: f64,
    },
    StepUnchanged {
        host: String,
        step: String,
    },
    StepFailed {
        host: String,
        step: String,
        error: String,
    },
    RunCompleted {
        host: String,
        run_id: String,
        steps_changed: u32,
        steps_unchanged: u32,
        steps_failed: u32,
        total_seconds: f64,
    },
}

/// Timestamped event wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub ts: String,
    #[serde(flatten)]
    pub event: ProvenanceEvent,
}

// ============================================================================
// Template helper
// ============================================================================

/// Convert a serde_yaml_ng::Value to a string for template resolution.
pub fn yaml_value_to_string(val: &serde_yaml_ng::Value) -> String {
    match val {
        serde_yaml_ng::Value::String(s) => s.clone(),
        serde_yaml_ng::Value::Number(n) => n.to_string(),
        serde_yaml_ng::Value::Bool(b) => b.to_string(),
        serde_yaml_ng::Value::Null => String::new(),
        other => format!("{:?}", other),
    }
}

// ============================================================================
// Tests
// ============================================================================
