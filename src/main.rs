mod cmd;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use sweep::config::AppConfig;
use sweep::executor::CancelToken;
use sweep::logging::{self, LogFormat};
use sweep::report::Status;

#[derive(Parser)]
#[command(name = "sweep")]
#[command(about = "Remove dead containers and unreferenced container images")]
#[command(version)]
struct Cli {
    /// Runtime to use (docker, podman, or a path to a compatible binary)
    #[arg(long, global = true, env = "SWEEP_RUNTIME")]
    runtime: Option<String>,

    /// Output as JSON (optionally to a file)
    #[arg(long, global = true, num_args = 0..=1, default_missing_value = "-")]
    json: Option<String>,

    /// Don't draw progress bars
    #[arg(long, global = true)]
    no_progress: bool,

    /// Derive missing parent layers from image history
    #[arg(long, global = true, env = "SWEEP_HISTORY_PARENTS")]
    history_parents: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Delete dead containers, remote tags and unreferenced images (default)
    Run,

    /// Show what a run would delete, without deleting anything
    Plan,

    /// Detect installed container runtimes
    Probe,
}

/// Exit status for an interrupted run, as a shell reports SIGINT.
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_format)?;

    let cfg = AppConfig::from_cli(
        cli.runtime.as_deref(),
        cli.json,
        cli.no_progress,
        cli.history_parents,
    );

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let cancel = CancelToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupt received, stopping after the current removal");
                    on_interrupt.cancel();
                }
            });

            // Removals are blocking subprocess calls; keep them off the async workers.
            let report = tokio::task::spawn_blocking(move || cmd::run::run(&cfg, cancel)).await??;
            Ok(match report.status {
                Status::Done => ExitCode::SUCCESS,
                Status::Failed => ExitCode::FAILURE,
                Status::Cancelled => ExitCode::from(EXIT_CANCELLED),
            })
        }
        Commands::Plan => {
            tokio::task::spawn_blocking(move || cmd::plan::run(&cfg)).await??;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Probe => {
            cmd::probe::run(&cfg)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
