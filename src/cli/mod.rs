//! CLI subcommands: init, validate, plan, apply, history.

use crate::core::executor::{self, ExecContext};
use crate::core::types::{ProvenanceEvent, RunReport, StepResult};
use crate::core::{host, parser, recipe};
use crate::resources::package::{PackageManager, SystemPackages};
use crate::transport::{CommandRunner, LocalRunner};
use crate::tripwire::eventlog::{self, EventLog};
use clap::Subcommand;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new steprun recipe
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate steprun.yaml without touching the host
    Validate {
        /// Path to steprun.yaml
        #[arg(short, long, default_value = "steprun.yaml")]
        file: PathBuf,
    },

    /// Show which steps would act (evaluates preconditions only)
    Plan {
        /// Path to steprun.yaml
        #[arg(short, long, default_value = "steprun.yaml")]
        file: PathBuf,

        /// Host identifier (default: local hostname)
        #[arg(long)]
        host: Option<String>,
    },

    /// Run the step sequence
    Apply {
        /// Path to steprun.yaml
        #[arg(short, long, default_value = "steprun.yaml")]
        file: PathBuf,

        /// Host identifier (default: local hostname)
        #[arg(long)]
        host: Option<String>,

        /// Run every action, ignoring preconditions
        #[arg(long)]
        force: bool,

        /// Show what would be executed without running
        #[arg(long)]
        dry_run: bool,

        /// State directory for the provenance log
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,
    },

    /// Show the provenance event log
    History {
        /// State directory
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,

        /// Host identifier (default: local hostname)
        #[arg(long)]
        host: Option<String>,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Plan { file, host } => cmd_plan(&file, host.as_deref()),
        Commands::Apply {
            file,
            host,
            force,
            dry_run,
            state_dir,
        } => cmd_apply(&file, &state_dir, host.as_deref(), force, dry_run),
        Commands::History { state_dir, host } => cmd_history(&state_dir, host.as_deref()),
    }
}

const TEMPLATE: &str = r#"version: "1.0"
name: cmake-build
description: "Install a compiler and build in a per-host directory"

params:
  base: /home/vagrant/dev

steps:
  compiler:
    type: package
    package: g++

  workdir:
    type: directory
    path: "{{params.base}}/{{host}}"

  configure:
    type: execute
    name: run cmake
    command: cmake ..
    cwd: "{{params.base}}/{{host}}"
    creates: "{{params.base}}/{{host}}/Makefile"

  build:
    type: execute
    name: run make
    command: make
    cwd: "{{params.base}}/{{host}}"

policy:
  tripwire: true
"#;

fn cmd_init(path: &Path) -> Result<(), String> {
    let config_path = path.join("steprun.yaml");
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }

    let state_dir = path.join("state");
    std::fs::create_dir_all(&state_dir).map_err(|e| format!("cannot create state dir: {}", e))?;

    std::fs::write(&config_path, TEMPLATE)
        .map_err(|e| format!("cannot write {}: {}", config_path.display(), e))?;

    println!("Initialized steprun recipe at {}", path.display());
    println!("  Created: {}", config_path.display());
    println!("  Created: {}/", state_dir.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let config = parser::parse_recipe_file(file)?;
    let errors = parser::validate_recipe(&config);

    if errors.is_empty() {
        println!(
            "OK: {} ({} steps, {} includes)",
            config.name,
            config.steps.len(),
            config.include.len()
        );
        Ok(())
    } else {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        Err(format!("{} validation error(s)", errors.len()))
    }
}

/// Explicit host override, else the local hostname.
fn resolve_host(host_override: Option<&str>) -> Result<String, String> {
    match host_override {
        Some(h) => host::parse_host(h).map_err(|e| format!("--host: {}", e)),
        None => host::local_hostname(),
    }
}

fn cmd_plan(file: &Path, host_override: Option<&str>) -> Result<(), String> {
    let host = resolve_host(host_override)?;
    let mut stdout = std::io::stdout();
    let report = run_recipe(
        file,
        &host,
        &RunOptions {
            dry_run: true,
            force: false,
            state_dir: None,
        },
        &mut SystemPackages,
        &mut LocalRunner,
        &mut stdout,
    )?;
    println!();
    println!(
        "Plan: {} to change, {} unchanged.",
        report.changed(),
        report.unchanged()
    );
    finish(&report)
}

fn cmd_apply(
    file: &Path,
    state_dir: &Path,
    host_override: Option<&str>,
    force: bool,
    dry_run: bool,
) -> Result<(), String> {
    let host = resolve_host(host_override)?;
    let mut stdout = std::io::stdout();
    let report = run_recipe(
        file,
        &host,
        &RunOptions {
            dry_run,
            force,
            state_dir: Some(state_dir),
        },
        &mut SystemPackages,
        &mut LocalRunner,
        &mut stdout,
    )?;

    println!();
    if dry_run {
        println!("Dry run, no changes applied.");
    }
    println!(
        "{}: {} changed, {} unchanged, {} failed ({:.1}s)",
        host,
        report.changed(),
        report.unchanged(),
        report.failed(),
        report.total_duration.as_secs_f64()
    );
    finish(&report)
}

/// Turn a failed report into the aborting step's error.
fn finish(report: &RunReport) -> Result<(), String> {
    match report.failure() {
        Some(rec) => match &rec.result {
            StepResult::Failed(e) => Err(format!("step '{}' failed: {}", rec.name, e)),
            _ => Ok(()),
        },
        None => Ok(()),
    }
}

/// Per-invocation switches for `run_recipe`.
pub struct RunOptions<'a> {
    pub dry_run: bool,
    pub force: bool,
    /// Provenance log location; `None` disables logging
    pub state_dir: Option<&'a Path>,
}

/// Load a recipe for `host` and run it against the given collaborators.
pub fn run_recipe(
    file: &Path,
    host: &str,
    opts: &RunOptions,
    packages: &mut dyn PackageManager,
    commands: &mut dyn CommandRunner,
    sink: &mut dyn Write,
) -> Result<RunReport, String> {
    let loaded = recipe::load_steps(file, host)?;
    tracing::info!(recipe = %loaded.config.name, host, steps = loaded.steps.len(), "recipe loaded");

    let events = match opts.state_dir {
        Some(dir) if loaded.config.policy.tripwire && !opts.dry_run => {
            Some(EventLog::new(dir, host))
        }
        _ => None,
    };

    let _ = writeln!(
        sink,
        "{}: {} ({} steps)",
        host,
        loaded.config.name,
        loaded.steps.len()
    );

    let mut ctx = ExecContext {
        sink,
        packages,
        commands,
        dry_run: opts.dry_run,
        force: opts.force,
        events,
    };
    Ok(executor::run(&loaded.steps, &mut ctx))
}

fn cmd_history(state_dir: &Path, host_override: Option<&str>) -> Result<(), String> {
    let host = resolve_host(host_override)?;
    let events = eventlog::read_events(state_dir, &host)?;
    if events.is_empty() {
        println!("No history for {}. Run `steprun apply` first.", host);
        return Ok(());
    }
    for te in &events {
        println!("{} {}", te.ts, describe_event(&te.event));
    }
    Ok(())
}

fn describe_event(event: &ProvenanceEvent) -> String {
    match event {
        ProvenanceEvent::RunStarted { run_id, steps, .. } => {
            format!("run {} started: {} steps", run_id, steps)
        }
        ProvenanceEvent::StepStarted { step, action, .. } => {
            format!("  {} started: {}", step, action)
        }
        ProvenanceEvent::StepChanged {
            step,
            duration_seconds,
            ..
        } => format!("  {} CHANGED ({:.2}s)", step, duration_seconds),
        ProvenanceEvent::StepUnchanged { step, .. } => format!("  {} UNCHANGED", step),
        ProvenanceEvent::StepFailed { step, error, .. } => format!("  {} FAILED: {}", step, error),
        ProvenanceEvent::RunCompleted {
            run_id,
            steps_changed,
            steps_unchanged,
            steps_failed,
            total_seconds,
            ..
        } => format!(
            "run {} completed: {} changed, {} unchanged, {} failed ({:.1}s)",
            run_id, steps_changed, steps_unchanged, steps_failed, total_seconds
        ),
    }
}
