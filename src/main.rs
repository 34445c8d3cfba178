//! steprun CLI: idempotent provisioning step runner.

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "steprun",
    version,
    about = "Idempotent provisioning step runner: precondition-guarded steps, fail-fast"
)]
struct Cli {
    #[command(subcommand)]
    command: steprun::cli::Commands,
}

/// Diagnostics go to stderr; `RUST_LOG` overrides the default `warn` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(e) = steprun::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
