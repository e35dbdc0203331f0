//! Sequences one collection run: containers, then remote tags, then images.

use tracing::{error, info};

use crate::classify::{dead_containers, deletable_images, remote_tagged_images};
use crate::error::GcError;
use crate::executor::{CancelToken, Executor};
use crate::graph::ImageGraph;
use crate::progress::ProgressSink;
use crate::report::{Phase, PhaseReport, Report, Status};
use crate::runtime::Runtime;

/// Runs collection passes against a runtime.
///
/// A preflight snapshot validates the parent graph before anything is
/// deleted and plans the containers phase. Later phases read fresh runtime
/// state and plan only their own candidates. There is no rollback: removals made by earlier phases
/// stay removed when a later one fails.
pub struct Collector<'a, R: Runtime + ?Sized, P: ProgressSink + ?Sized> {
    runtime: &'a R,
    progress: &'a P,
    cancel: CancelToken,
    history_parents: bool,
}

impl<'a, R: Runtime + ?Sized, P: ProgressSink + ?Sized> Collector<'a, R, P> {
    pub fn new(runtime: &'a R, progress: &'a P) -> Self {
        Self {
            runtime,
            progress,
            cancel: CancelToken::new(),
            history_parents: false,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Resolve missing parent pointers through `image_history`.
    pub fn with_history_parents(mut self, enabled: bool) -> Self {
        self.history_parents = enabled;
        self
    }

    pub fn snapshot(&self) -> Result<ImageGraph, GcError> {
        ImageGraph::build(self.runtime, self.history_parents)
    }

    pub fn run(&self) -> Report {
        let preflight = match self.snapshot().and_then(|graph| graph.check_acyclic().map(|()| graph)) {
            Ok(graph) => graph,
            Err(err) => {
                error!(error = %err, "preflight failed, nothing deleted");
                return Report::aborted(err);
            }
        };

        let executor = Executor::new(self.runtime, self.progress, self.cancel.clone());
        let mut phases = Vec::with_capacity(Phase::ALL.len());
        // Nothing has been deleted yet, so the first phase plans on the preflight state.
        let mut fresh = Some(preflight);

        for phase in Phase::ALL {
            let snapshot = match fresh.take() {
                Some(graph) => Ok(graph),
                None => self.snapshot(),
            };
            let report = match snapshot {
                Ok(graph) => self.run_phase(&executor, phase, &graph),
                Err(err) => {
                    self.progress.on_phase_complete(phase, Status::Failed);
                    PhaseReport::failed(phase, err)
                }
            };
            let finished = report.status == Status::Done;
            phases.push(report);
            if !finished {
                break;
            }
        }

        let report = Report::from_phases(phases);
        info!(
            status = %report.status,
            deleted = report.deleted(),
            skipped = report.skipped(),
            "collection finished"
        );
        report
    }

    fn run_phase(&self, executor: &Executor<'_, R, P>, phase: Phase, graph: &ImageGraph) -> PhaseReport {
        match phase {
            Phase::Containers => executor.remove_containers(&dead_containers(graph)),
            Phase::RemoteTags => executor.remove_tags(&remote_tagged_images(graph)),
            Phase::Images => match deletable_images(graph) {
                Ok(images) => executor.remove_images(&images),
                Err(err) => {
                    error!(error = %err, "refusing to delete images");
                    self.progress.on_phase_complete(phase, Status::Failed);
                    PhaseReport::failed(phase, err)
                }
            },
        }
    }
}

/// Perform one full collection run with default options.
pub fn run_gc<R: Runtime + ?Sized, P: ProgressSink + ?Sized>(runtime: &R, progress: &P) -> Report {
    Collector::new(runtime, progress).run()
}
