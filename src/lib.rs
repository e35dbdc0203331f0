//! Garbage collection for container runtimes.
//!
//! A run removes dead containers, then registry-path tags, then every image
//! that is neither tagged locally (directly or as an ancestor of a tagged
//! image) nor backing a running container. Images go children first so the
//! runtime never sees a parent removed while a child still needs it.

pub mod classify;
pub mod collector;
pub mod config;
pub mod error;
pub mod executor;
pub mod graph;
pub mod logging;
pub mod model;
pub mod probe;
pub mod progress;
pub mod report;
pub mod runtime;
pub mod toposort;

pub use classify::Plan;
pub use collector::{Collector, run_gc};
pub use error::GcError;
pub use executor::{CancelToken, Executor};
pub use graph::ImageGraph;
pub use model::{Container, ContainerId, Image, ImageId};
pub use progress::{NoProgress, ProgressSink};
pub use report::{Phase, PhaseReport, Report, Status};
pub use runtime::{Runtime, RuntimeError};
