pub mod cli;
pub mod memory;

use thiserror::Error;

use crate::model::{Container, ContainerId, Image, ImageId};

/// Failures reported by a container runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// the entity no longer exists (removed concurrently)
    #[error("{0} not found")]
    NotFound(String),

    /// the runtime (daemon or binary) cannot be reached
    #[error("runtime unavailable: {0}")]
    Unavailable(String),

    /// the runtime refused the request
    #[error("{0}")]
    Rejected(String),
}

/// Operations the collector needs from a container runtime.
///
/// Implementations own all state; the collector only reads through the
/// listing calls and mutates through the removal calls.
pub trait Runtime {
    /// List images, including untagged intermediate layers when asked.
    fn list_images(&self, include_intermediate: bool) -> Result<Vec<Image>, RuntimeError>;

    /// List containers, including stopped ones when asked.
    fn list_containers(&self, include_stopped: bool) -> Result<Vec<Container>, RuntimeError>;

    /// Ancestor chain of an image, nearest parent first, excluding the image itself.
    fn image_history(&self, image: &ImageId) -> Result<Vec<ImageId>, RuntimeError>;

    fn remove_container(&self, container: &ContainerId) -> Result<(), RuntimeError>;

    /// Drop a single tag reference; content stays while anything else refers to it.
    fn remove_image_tag(&self, tag: &str) -> Result<(), RuntimeError>;

    fn remove_image(&self, image: &ImageId, force: bool, noprune: bool) -> Result<(), RuntimeError>;
}
