//! Errors raised while planning or executing a collection run.

use thiserror::Error;

use crate::runtime::RuntimeError;

/// Fatal outcomes of a collection run.
///
/// A runtime "not found" on a removal is never one of these: the executor
/// records it as a skip and keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GcError {
    /// the runtime could not be reached at all
    #[error("container runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    /// the image parent graph is not a forest
    #[error("image parent graph contains a cycle at {0}")]
    CycleDetected(String),

    /// the runtime refused a removal for a reason other than "not found"
    #[error("runtime rejected removal of {target}: {reason}")]
    DeletionRejected { target: String, reason: String },

    /// the runtime answered a query with something unusable
    #[error("runtime query failed: {0}")]
    Query(String),
}

impl GcError {
    /// Map a failed snapshot query.
    pub(crate) fn from_query(err: RuntimeError) -> Self {
        match err {
            RuntimeError::Unavailable(reason) => GcError::RuntimeUnavailable(reason),
            RuntimeError::NotFound(what) => GcError::Query(format!("{what} not found")),
            RuntimeError::Rejected(reason) => GcError::Query(reason),
        }
    }
}
