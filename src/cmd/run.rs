use anyhow::Result;
use crossterm::style::Stylize;

use sweep::collector::Collector;
use sweep::config::AppConfig;
use sweep::error::GcError;
use sweep::executor::CancelToken;
use sweep::progress::{BarProgress, NoProgress, ProgressSink};
use sweep::report::{Report, Status};

/// Perform a full collection run and print its report.
pub fn run(cfg: &AppConfig, cancel: CancelToken) -> Result<Report> {
    super::print_runtime_summary(cfg);

    let report = match cfg.cli_runtime() {
        Some(runtime) => {
            let bars = BarProgress::new();
            let progress: &dyn ProgressSink = if cfg.progress { &bars } else { &NoProgress };
            Collector::new(&runtime, progress)
                .with_cancel(cancel)
                .with_history_parents(cfg.history_parents)
                .run()
        }
        None => Report::aborted(GcError::RuntimeUnavailable(
            "no container runtime detected; install Docker or Podman, or pass --runtime".into(),
        )),
    };

    if let Some(dest) = &cfg.json {
        super::write_json(dest, &report)?;
    } else {
        print_report(&report);
    }
    Ok(report)
}

fn print_report(report: &Report) {
    if !report.phases.is_empty() {
        println!();
    }
    for p in &report.phases {
        let status = match p.status {
            Status::Done => format!("{:<9}", p.status).green(),
            Status::Failed => format!("{:<9}", p.status).red().bold(),
            Status::Cancelled => format!("{:<9}", p.status).yellow(),
        };
        println!(
            "{:<12} {} {} deleted, {} skipped ({} of {} processed)",
            p.phase, status, p.deleted, p.skipped, p.processed, p.total
        );
    }

    match (&report.status, &report.error) {
        (Status::Done, _) => println!(
            "\n{} Removed {}, {} already gone",
            "✔".green(),
            report.deleted(),
            report.skipped()
        ),
        (Status::Cancelled, _) => eprintln!("\n{} Run cancelled", "!".yellow().bold()),
        (Status::Failed, Some(err)) => eprintln!("\n{} {err}", "✘".red().bold()),
        (Status::Failed, None) => eprintln!("\n{} Run failed", "✘".red().bold()),
    }
}
