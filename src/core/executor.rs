//! Executor: the idempotent step runner.
//!
//! For each step in order: check precondition → act if unmet → record.
//! The first failure stops the run; the partial report is returned.

use super::error::StepError;
use super::types::*;
use crate::resources::{self, package::PackageManager};
use crate::transport::CommandRunner;
use crate::tripwire::eventlog::{self, EventLog};
use std::io::Write;
use std::path::Path;
use std::time::Instant;

/// Everything a step needs from its surroundings, passed explicitly.
pub struct ExecContext<'a> {
    /// Human-readable progress lines
    pub sink: &'a mut dyn Write,
    pub packages: &'a mut dyn PackageManager,
    pub commands: &'a mut dyn CommandRunner,
    /// Evaluate preconditions, never act
    pub dry_run: bool,
    /// Skip preconditions, always act
    pub force: bool,
    /// Provenance log; `None` disables it
    pub events: Option<EventLog>,
}

impl ExecContext<'_> {
    fn log(&self, event: ProvenanceEvent) {
        if let Some(ref events) = self.events {
            events.record(event);
        }
    }

    fn host(&self) -> String {
        self.events
            .as_ref()
            .map(|e| e.host.clone())
            .unwrap_or_default()
    }

    /// Sink writes are best-effort; a closed stdout must not abort provisioning.
    fn say(&mut self, line: std::fmt::Arguments<'_>) {
        let _ = writeln!(self.sink, "{}", line);
    }
}

/// Run `steps` strictly in order, stopping at the first failure.
pub fn run(steps: &[Step], ctx: &mut ExecContext) -> RunReport {
    let start = Instant::now();
    let run_id = eventlog::generate_run_id();
    let host = ctx.host();

    tracing::info!(run_id = %run_id, steps = steps.len(), dry_run = ctx.dry_run, "run started");
    ctx.log(ProvenanceEvent::RunStarted {
        host: host.clone(),
        run_id: run_id.clone(),
        steps: steps.len() as u32,
        steprun_version: env!("CARGO_PKG_VERSION").to_string(),
    });

    let mut records = Vec::with_capacity(steps.len());
    for step in steps {
        let record = run_step(step, ctx, &host);
        let failed = record.result.is_failed();
        records.push(record);
        if failed {
            break;
        }
    }

    let report = RunReport {
        records,
        dry_run: ctx.dry_run,
        total_duration: start.elapsed(),
    };

    if let Some(rec) = report.failure() {
        let skipped = steps.len() - report.records.len();
        tracing::warn!(step = %rec.name, skipped, "run aborted");
    }

    ctx.log(ProvenanceEvent::RunCompleted {
        host,
        run_id,
        steps_changed: report.changed(),
        steps_unchanged: report.unchanged(),
        steps_failed: report.failed(),
        total_seconds: report.total_duration.as_secs_f64(),
    });

    report
}

fn run_step(step: &Step, ctx: &mut ExecContext, host: &str) -> StepRecord {
    let step_start = Instant::now();

    let result = match decide(step, ctx) {
        Err(e) => StepResult::Failed(e),
        Ok(true) => {
            tracing::debug!(step = step.name(), precondition = %step.precondition(), "satisfied");
            ctx.say(format_args!("  = {}: {}", step.name(), step.precondition()));
            StepResult::Unchanged
        }
        Ok(false) if ctx.dry_run => {
            ctx.say(format_args!("  ? {}: would {}", step.name(), step.describe()));
            StepResult::Changed
        }
        Ok(false) => {
            ctx.log(ProvenanceEvent::StepStarted {
                host: host.to_string(),
                step: step.name().to_string(),
                action: step.describe(),
            });
            ctx.say(format_args!("  + {}: {}", step.name(), step.describe()));
            match perform(step, ctx) {
                Ok(()) => StepResult::Changed,
                Err(e) => StepResult::Failed(e),
            }
        }
    };

    let duration = step_start.elapsed().as_secs_f64();
    match &result {
        StepResult::Unchanged => ctx.log(ProvenanceEvent::StepUnchanged {
            host: host.to_string(),
            step: step.name().to_string(),
        }),
        StepResult::Changed => ctx.log(ProvenanceEvent::StepChanged {
            host: host.to_string(),
            step: step.name().to_string(),
            duration_seconds: duration,
        }),
        StepResult::Failed(e) => {
            tracing::error!(step = step.name(), "{}", e);
            ctx.say(format_args!("  ! {}: {}", step.name(), e));
            ctx.log(ProvenanceEvent::StepFailed {
                host: host.to_string(),
                step: step.name().to_string(),
                error: e.to_string(),
            });
        }
    }

    StepRecord {
        name: step.name().to_string(),
        result,
        duration_seconds: duration,
    }
}

/// `Ok(true)` when the step can be skipped.
fn decide(step: &Step, ctx: &mut ExecContext) -> Result<bool, StepError> {
    if ctx.force {
        return Ok(false);
    }
    check_precondition(step, ctx.packages)
}

/// Evaluate a step's precondition against live host state.
pub fn check_precondition(
    step: &Step,
    packages: &mut dyn PackageManager,
) -> Result<bool, StepError> {
    let check_failed = |detail: String| StepError::PreconditionCheck {
        step: step.name().to_string(),
        detail,
    };
    match step.precondition() {
        Precondition::Always => Ok(false),
        Precondition::PackageInstalled(pkg) => {
            let provider = match step.action() {
                Action::InstallPackage { provider, .. } => provider.as_str(),
                _ => "apt",
            };
            packages.is_installed(pkg, provider).map_err(check_failed)
        }
        Precondition::DirectoryExists(path) => {
            Ok(path_exists(path).map_err(check_failed)? && path.is_dir())
        }
        Precondition::FileExists(path) => path_exists(path).map_err(check_failed),
    }
}

/// Existence check that distinguishes "absent" from "cannot tell".
/// A regular file standing in for an ancestor directory counts as absent.
fn path_exists(path: &Path) -> Result<bool, String> {
    match path.try_exists() {
        Ok(exists) => Ok(exists),
        Err(e) if e.kind() == std::io::ErrorKind::NotADirectory => Ok(false),
        Err(e) => Err(format!("cannot stat {}: {}", path.display(), e)),
    }
}

fn perform(step: &Step, ctx: &mut ExecContext) -> Result<(), StepError> {
    match step.action() {
        Action::InstallPackage { package, provider } => ctx
            .packages
            .install(package, provider)
            .map_err(|detail| StepError::PackageInstall {
                package: package.clone(),
                detail,
            }),
        Action::CreateDirectory { path } => resources::directory::create(path),
        Action::RunCommand { command } => {
            let out =
                resources::command::run(ctx.commands, command, step.working_directory())?;
            tracing::debug!(step = step.name(), stdout = %out.stdout.trim(), "command finished");
            Ok(())
        }
    }
}
