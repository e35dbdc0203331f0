use std::cell::RefCell;
use std::collections::HashMap;

use super::{Runtime, RuntimeError};
use crate::model::{Container, ContainerId, Image, ImageId};

/// A removal request received by [`MemoryRuntime`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    RemoveContainer(ContainerId),
    RemoveTag(String),
    RemoveImage {
        id: ImageId,
        force: bool,
        noprune: bool,
    },
}

#[derive(Default)]
struct State {
    images: Vec<Image>,
    containers: Vec<Container>,
    calls: Vec<Call>,
    /// Errors to return instead of performing a removal, keyed by target.
    failures: HashMap<String, RuntimeError>,
    unavailable: bool,
}

/// In-process runtime holding images and containers in memory.
///
/// Removals mutate the held state and are recorded, so a caller can check
/// what was deleted and in which order. Like a real daemon it refuses to
/// delete a layer that still has children or backs a running container,
/// and to drop the last tag of an image a container still uses.
#[derive(Default)]
pub struct MemoryRuntime {
    state: RefCell<State>,
}

impl MemoryRuntime {
    pub fn new(images: Vec<Image>, containers: Vec<Container>) -> Self {
        Self {
            state: RefCell::new(State {
                images,
                containers,
                ..State::default()
            }),
        }
    }

    /// Make the next removal of `target` (container id, tag or image id) fail.
    pub fn fail_on(&self, target: impl Into<String>, err: RuntimeError) {
        self.state.borrow_mut().failures.insert(target.into(), err);
    }

    /// Make every call report the runtime as unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.borrow_mut().unavailable = unavailable;
    }

    /// Removal requests received so far.
    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn images(&self) -> Vec<Image> {
        self.state.borrow().images.clone()
    }

    pub fn containers(&self) -> Vec<Container> {
        self.state.borrow().containers.clone()
    }

    fn check_available(&self) -> Result<(), RuntimeError> {
        if self.state.borrow().unavailable {
            return Err(RuntimeError::Unavailable("memory runtime offline".into()));
        }
        Ok(())
    }

    fn record(&self, call: Call, target: &str) -> Result<(), RuntimeError> {
        self.check_available()?;
        let mut state = self.state.borrow_mut();
        state.calls.push(call);
        match state.failures.remove(target) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Runtime for MemoryRuntime {
    fn list_images(&self, include_intermediate: bool) -> Result<Vec<Image>, RuntimeError> {
        self.check_available()?;
        let state = self.state.borrow();
        Ok(state
            .images
            .iter()
            .filter(|img| {
                include_intermediate
                    || !img.repo_tags.is_empty()
                    || !state.images.iter().any(|c| c.parent_id.as_ref() == Some(&img.id))
            })
            .cloned()
            .collect())
    }

    fn list_containers(&self, include_stopped: bool) -> Result<Vec<Container>, RuntimeError> {
        self.check_available()?;
        Ok(self
            .state
            .borrow()
            .containers
            .iter()
            .filter(|c| include_stopped || c.running)
            .cloned()
            .collect())
    }

    fn image_history(&self, image: &ImageId) -> Result<Vec<ImageId>, RuntimeError> {
        self.check_available()?;
        let state = self.state.borrow();
        let by_id: HashMap<&ImageId, &Image> = state.images.iter().map(|i| (&i.id, i)).collect();
        let mut current = by_id
            .get(image)
            .ok_or_else(|| RuntimeError::NotFound(format!("image {image}")))?;

        let mut chain = Vec::new();
        while let Some(parent) = &current.parent_id {
            if chain.contains(parent) || parent == image {
                break;
            }
            chain.push(parent.clone());
            match by_id.get(parent) {
                Some(next) => current = next,
                None => break,
            }
        }
        Ok(chain)
    }

    fn remove_container(&self, container: &ContainerId) -> Result<(), RuntimeError> {
        self.record(Call::RemoveContainer(container.clone()), container.as_str())?;
        let mut state = self.state.borrow_mut();
        let before = state.containers.len();
        state.containers.retain(|c| &c.id != container);
        if state.containers.len() == before {
            return Err(RuntimeError::NotFound(format!("container {container}")));
        }
        Ok(())
    }

    fn remove_image_tag(&self, tag: &str) -> Result<(), RuntimeError> {
        self.record(Call::RemoveTag(tag.to_string()), tag)?;
        let mut state = self.state.borrow_mut();
        let State {
            images, containers, ..
        } = &mut *state;
        let image = images
            .iter_mut()
            .find(|img| img.repo_tags.iter().any(|t| t == tag))
            .ok_or_else(|| RuntimeError::NotFound(format!("tag {tag}")))?;

        // Dropping the last reference of an image in use needs force.
        if image.repo_tags.iter().all(|t| t == tag) {
            if let Some(c) = containers.iter().find(|c| c.image_id == image.id) {
                return Err(RuntimeError::Rejected(format!(
                    "conflict: unable to remove repository reference \"{tag}\" (must force) - container {} is using its referenced image {}",
                    c.id, image.id
                )));
            }
        }
        image.repo_tags.retain(|t| t != tag);
        Ok(())
    }

    fn remove_image(&self, image: &ImageId, force: bool, noprune: bool) -> Result<(), RuntimeError> {
        let call = Call::RemoveImage {
            id: image.clone(),
            force,
            noprune,
        };
        self.record(call, image.as_str())?;

        let mut state = self.state.borrow_mut();
        if !state.images.iter().any(|i| &i.id == image) {
            return Err(RuntimeError::NotFound(format!("image {image}")));
        }
        if state.images.iter().any(|i| i.parent_id.as_ref() == Some(image)) {
            return Err(RuntimeError::Rejected(format!(
                "conflict: unable to delete {image} (image has dependent child images)"
            )));
        }
        if let Some(c) = state
            .containers
            .iter()
            .find(|c| &c.image_id == image && (c.running || !force))
        {
            return Err(RuntimeError::Rejected(format!(
                "conflict: unable to delete {image} (must be forced) - image is being used by container {}",
                c.id
            )));
        }
        state.images.retain(|i| &i.id != image);
        Ok(())
    }
}
