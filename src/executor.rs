//! Issues removals against the runtime, one at a time, in plan order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{error, info, warn};

use crate::classify::{Plan, RemoteTag};
use crate::error::GcError;
use crate::model::{ContainerId, ImageId};
use crate::progress::ProgressSink;
use crate::report::{Phase, PhaseReport, Report, Status};
use crate::runtime::{Runtime, RuntimeError};

/// Shared flag asking a run to stop before its next deletion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Executor<'a, R: Runtime + ?Sized, P: ProgressSink + ?Sized> {
    runtime: &'a R,
    progress: &'a P,
    cancel: CancelToken,
}

impl<'a, R: Runtime + ?Sized, P: ProgressSink + ?Sized> Executor<'a, R, P> {
    pub fn new(runtime: &'a R, progress: &'a P, cancel: CancelToken) -> Self {
        Self {
            runtime,
            progress,
            cancel,
        }
    }

    /// Run every phase of `plan` in order, stopping at the first phase that
    /// does not finish.
    pub fn execute(&self, plan: &Plan) -> Report {
        let mut phases = Vec::with_capacity(Phase::ALL.len());
        for phase in Phase::ALL {
            let report = match phase {
                Phase::Containers => self.remove_containers(&plan.dead_containers),
                Phase::RemoteTags => self.remove_tags(&plan.remote_tags),
                Phase::Images => self.remove_images(&plan.images),
            };
            let finished = report.status == Status::Done;
            phases.push(report);
            if !finished {
                break;
            }
        }
        Report::from_phases(phases)
    }

    pub fn remove_containers(&self, containers: &[ContainerId]) -> PhaseReport {
        self.run_phase(Phase::Containers, containers, |id| {
            (id.to_string(), self.runtime.remove_container(id))
        })
    }

    pub fn remove_tags(&self, tags: &[RemoteTag]) -> PhaseReport {
        self.run_phase(Phase::RemoteTags, tags, |t| {
            (t.tag.clone(), self.runtime.remove_image_tag(&t.tag))
        })
    }

    /// `images` must already be ordered children first. Removal is forced
    /// but never prunes parents: parent order is decided here, not by the
    /// runtime.
    pub fn remove_images(&self, images: &[ImageId]) -> PhaseReport {
        self.run_phase(Phase::Images, images, |id| {
            (id.to_string(), self.runtime.remove_image(id, true, true))
        })
    }

    fn run_phase<T>(
        &self,
        phase: Phase,
        items: &[T],
        mut remove: impl FnMut(&T) -> (String, Result<(), RuntimeError>),
    ) -> PhaseReport {
        let mut report = PhaseReport::new(phase, items.len());

        for item in items {
            if self.cancel.is_cancelled() {
                warn!(%phase, processed = report.processed, "cancelled");
                report.status = Status::Cancelled;
                break;
            }

            let (target, result) = remove(item);
            match result {
                Ok(()) => {
                    info!(%phase, %target, "removed");
                    report.deleted += 1;
                }
                Err(RuntimeError::NotFound(_)) => {
                    warn!(%phase, %target, "already gone, skipping");
                    report.skipped += 1;
                }
                Err(RuntimeError::Unavailable(reason)) => {
                    error!(%phase, %target, %reason, "runtime unavailable");
                    report.status = Status::Failed;
                    report.error = Some(GcError::RuntimeUnavailable(reason));
                    break;
                }
                Err(RuntimeError::Rejected(reason)) => {
                    error!(%phase, %target, %reason, "removal rejected");
                    report.status = Status::Failed;
                    report.error = Some(GcError::DeletionRejected { target, reason });
                    break;
                }
            }

            report.processed += 1;
            self.progress.on_progress(phase, report.processed, report.total);
        }

        info!(
            %phase,
            status = %report.status,
            deleted = report.deleted,
            skipped = report.skipped,
            total = report.total,
            "phase finished"
        );
        self.progress.on_phase_complete(phase, report.status);
        report
    }
}
