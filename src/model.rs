use std::fmt;

use serde::{Deserialize, Serialize};

/// Tag the runtime reports for an image with no human-assigned name.
pub const UNTAGGED: &str = "<none>:<none>";

/// Content-addressed image identifier (e.g. `sha256:abc123...`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(String);

impl ImageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Opaque container identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A single image layer as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    pub id: ImageId,

    /// The layer this image is built on, if any
    pub parent_id: Option<ImageId>,

    /// Human-assigned references (`repo:tag`)
    pub repo_tags: Vec<String>,
}

impl Image {
    pub fn new(id: impl Into<ImageId>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            repo_tags: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<ImageId>) -> Self {
        self.parent_id = Some(parent.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.repo_tags.push(tag.into());
        self
    }

    /// Whether at least one tag is a local name.
    pub fn is_named(&self) -> bool {
        self.repo_tags.iter().any(|t| is_local_tag(t))
    }

    /// Tags that point at a registry path rather than a local name.
    pub fn remote_tags(&self) -> impl Iterator<Item = &str> {
        self.repo_tags
            .iter()
            .map(String::as_str)
            .filter(|t| is_remote_tag(t))
    }
}

/// A container instance, running or stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Container {
    pub id: ContainerId,
    pub image_id: ImageId,
    pub running: bool,
}

impl Container {
    pub fn new(id: impl Into<ContainerId>, image_id: impl Into<ImageId>, running: bool) -> Self {
        Self {
            id: id.into(),
            image_id: image_id.into(),
            running,
        }
    }
}

/// A tag with two or more `/` separators originates from a registry path.
pub fn is_remote_tag(tag: &str) -> bool {
    tag.matches('/').count() >= 2
}

pub fn is_local_tag(tag: &str) -> bool {
    tag != UNTAGGED && !is_remote_tag(tag)
}
