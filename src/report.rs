use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::GcError;

/// Collection phases, in the order a run performs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Containers,
    RemoteTags,
    Images,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Containers, Phase::RemoteTags, Phase::Images];

    pub fn name(self) -> &'static str {
        match self {
            Phase::Containers => "containers",
            Phase::RemoteTags => "remote tags",
            Phase::Images => "images",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Terminal state of a phase or of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Done,
    Failed,
    Cancelled,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Status::Done => "done",
            Status::Failed => "failed",
            Status::Cancelled => "cancelled",
        })
    }
}

/// Outcome of a single phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseReport {
    pub phase: Phase,
    pub status: Status,

    /// Candidates planned for this phase
    pub total: usize,

    /// Candidates attempted, whether deleted or skipped
    pub processed: usize,

    pub deleted: usize,

    /// Candidates that vanished before their removal
    pub skipped: usize,

    #[serde(serialize_with = "error_message")]
    pub error: Option<GcError>,
}

impl PhaseReport {
    pub fn new(phase: Phase, total: usize) -> Self {
        Self {
            phase,
            status: Status::Done,
            total,
            processed: 0,
            deleted: 0,
            skipped: 0,
            error: None,
        }
    }

    pub(crate) fn failed(phase: Phase, error: GcError) -> Self {
        Self {
            status: Status::Failed,
            error: Some(error),
            ..Self::new(phase, 0)
        }
    }
}

/// Outcome of a whole collection run.
///
/// Phases that never started are absent from `phases`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub status: Status,
    pub phases: Vec<PhaseReport>,

    #[serde(serialize_with = "error_message")]
    pub error: Option<GcError>,
}

impl Report {
    /// A run that stopped before any phase started.
    pub fn aborted(error: GcError) -> Self {
        Self {
            status: Status::Failed,
            phases: Vec::new(),
            error: Some(error),
        }
    }

    /// Fold phase outcomes into a run outcome: the first phase that did not
    /// finish decides the status.
    pub(crate) fn from_phases(phases: Vec<PhaseReport>) -> Self {
        let stopped = phases.iter().find(|p| p.status != Status::Done);
        let status = stopped.map_or(Status::Done, |p| p.status);
        let error = stopped.and_then(|p| p.error.clone());
        Self {
            status,
            phases,
            error,
        }
    }

    pub fn phase(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.phase == phase)
    }

    pub fn deleted(&self) -> usize {
        self.phases.iter().map(|p| p.deleted).sum()
    }

    pub fn skipped(&self) -> usize {
        self.phases.iter().map(|p| p.skipped).sum()
    }
}

fn error_message<S: Serializer>(error: &Option<GcError>, s: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => s.serialize_some(&e.to_string()),
        None => s.serialize_none(),
    }
}
