//! Point-in-time view of the runtime's images and containers.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::{debug, warn};

use crate::error::GcError;
use crate::model::{Container, Image, ImageId};
use crate::runtime::Runtime;
use crate::toposort::topological_sort;

/// Snapshot of the image layer graph plus the sets derived from it.
#[derive(Debug, Clone, Default)]
pub struct ImageGraph {
    pub images: Vec<Image>,
    pub containers: Vec<Container>,

    /// Every image id known at snapshot time
    pub all_images: BTreeSet<ImageId>,

    /// Images carrying at least one local tag
    pub named_images: BTreeSet<ImageId>,

    /// Images backing a running container
    pub live_images: BTreeSet<ImageId>,

    pub parent_of: BTreeMap<ImageId, Option<ImageId>>,
}

impl ImageGraph {
    /// Query the runtime once and derive the graph.
    ///
    /// With `history_parents`, images the listing reports without a parent
    /// get one from `image_history`: the nearest ancestor present in the
    /// snapshot.
    pub fn build<R: Runtime + ?Sized>(runtime: &R, history_parents: bool) -> Result<Self, GcError> {
        let mut images = runtime.list_images(true).map_err(GcError::from_query)?;
        let containers = runtime.list_containers(true).map_err(GcError::from_query)?;
        debug!(images = images.len(), containers = containers.len(), "runtime snapshot");

        if history_parents {
            let known: HashSet<ImageId> = images.iter().map(|i| i.id.clone()).collect();
            for image in images.iter_mut().filter(|i| i.parent_id.is_none()) {
                let history = runtime
                    .image_history(&image.id)
                    .map_err(GcError::from_query)?;
                image.parent_id = history.into_iter().find(|a| known.contains(a));
            }
        }

        Ok(Self::from_parts(images, containers))
    }

    /// Derive the graph from already-fetched runtime state.
    pub fn from_parts(images: Vec<Image>, containers: Vec<Container>) -> Self {
        let all_images = images.iter().map(|i| i.id.clone()).collect();
        let named_images = images
            .iter()
            .filter(|i| i.is_named())
            .map(|i| i.id.clone())
            .collect();
        let live_images = containers
            .iter()
            .filter(|c| c.running)
            .map(|c| c.image_id.clone())
            .collect();
        let parent_of = images
            .iter()
            .map(|i| (i.id.clone(), i.parent_id.clone()))
            .collect();

        Self {
            images,
            containers,
            all_images,
            named_images,
            live_images,
            parent_of,
        }
    }

    pub fn parent(&self, id: &ImageId) -> Option<&ImageId> {
        self.parent_of.get(id).and_then(Option::as_ref)
    }

    /// Direct children of every image that has any.
    pub fn children(&self) -> BTreeMap<ImageId, Vec<ImageId>> {
        let mut children: BTreeMap<ImageId, Vec<ImageId>> = BTreeMap::new();
        for (child, parent) in &self.parent_of {
            if let Some(parent) = parent {
                children.entry(parent.clone()).or_default().push(child.clone());
            }
        }
        children
    }

    /// Fail if following parent pointers can ever loop.
    pub fn check_acyclic(&self) -> Result<(), GcError> {
        let children = self.children();
        topological_sort(self.all_images.iter().cloned(), |id| {
            children.get(id).cloned().unwrap_or_default()
        })
        .map(|_| ())
        .map_err(|cycle| {
            warn!(image = %cycle.0, "image parent graph contains a cycle");
            GcError::CycleDetected(cycle.0.to_string())
        })
    }
}
