use std::cell::RefCell;

use crossterm::style::Stylize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::report::{Phase, Status};

/// Receives progress updates while a collection run deletes things.
pub trait ProgressSink {
    /// Called after every attempted deletion, including skipped ones.
    fn on_progress(&self, phase: Phase, completed: usize, total: usize);

    fn on_phase_complete(&self, phase: Phase, status: Status);
}

/// Discards all updates.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _phase: Phase, _completed: usize, _total: usize) {}

    fn on_phase_complete(&self, _phase: Phase, _status: Status) {}
}

/// A simple spinner for long-running stages.
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn new(message: impl Into<String>) -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.dim} {msg}") {
            bar.set_style(style);
        }
        bar.set_message(message.into());
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }

    /// Clear the spinner and print a `✔ message` line to stderr.
    pub fn finish(self, message: impl Into<String>) {
        self.bar.finish_and_clear();
        eprintln!("{} {}", "✔".green(), message.into());
    }
}

/// One progress bar per phase on stderr, replaced by a status line when
/// the phase ends.
#[derive(Default)]
pub struct BarProgress {
    current: RefCell<Option<(Phase, ProgressBar)>>,
}

impl BarProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn bar_for(&self, phase: Phase, total: usize) -> ProgressBar {
        let mut current = self.current.borrow_mut();
        if let Some((p, bar)) = current.as_ref() {
            if *p == phase {
                return bar.clone();
            }
            bar.finish_and_clear();
        }

        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.dim} Removing {msg} [{bar:20}] {pos}/{len} ({elapsed})",
        ) {
            bar.set_style(style.progress_chars("━╸░"));
        }
        bar.set_message(phase.name());
        *current = Some((phase, bar.clone()));
        bar
    }
}

impl ProgressSink for BarProgress {
    fn on_progress(&self, phase: Phase, completed: usize, total: usize) {
        let bar = self.bar_for(phase, total);
        bar.set_length(total as u64);
        bar.set_position(completed as u64);
    }

    fn on_phase_complete(&self, phase: Phase, status: Status) {
        let finished = self.current.borrow_mut().take();
        let count = match finished {
            Some((p, bar)) if p == phase => {
                let done = bar.position();
                bar.finish_and_clear();
                done
            }
            Some((_, bar)) => {
                bar.finish_and_clear();
                0
            }
            None => 0,
        };

        match status {
            Status::Done => eprintln!("{} {} ({count} processed)", "✔".green(), phase),
            Status::Cancelled => eprintln!("{} {} cancelled after {count}", "!".yellow().bold(), phase),
            Status::Failed => eprintln!("{} {} failed after {count}", "✘".red().bold(), phase),
        }
    }
}
