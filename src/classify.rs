//! Deletion candidates derived from an [`ImageGraph`].

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::error::GcError;
use crate::graph::ImageGraph;
use crate::model::{ContainerId, ImageId};
use crate::toposort::topological_sort;

/// A registry-path tag to drop from an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteTag {
    pub image: ImageId,
    pub tag: String,
}

/// Containers that are not running. They have no inter-dependencies, so
/// any removal order works.
pub fn dead_containers(graph: &ImageGraph) -> Vec<ContainerId> {
    let running: HashSet<&ContainerId> = graph
        .containers
        .iter()
        .filter(|c| c.running)
        .map(|c| &c.id)
        .collect();

    let mut seen = HashSet::new();
    graph
        .containers
        .iter()
        .map(|c| &c.id)
        .filter(|id| !running.contains(id) && seen.insert(*id))
        .cloned()
        .collect()
}

/// One entry per (image, remote tag) pair.
pub fn remote_tagged_images(graph: &ImageGraph) -> Vec<RemoteTag> {
    graph
        .images
        .iter()
        .flat_map(|img| {
            img.remote_tags().map(|tag| RemoteTag {
                image: img.id.clone(),
                tag: tag.to_string(),
            })
        })
        .collect()
}

/// `named` plus every ancestor reachable through parent pointers.
pub fn dependency_closure(
    graph: &ImageGraph,
    named: &BTreeSet<ImageId>,
) -> Result<BTreeSet<ImageId>, GcError> {
    let mut closure = BTreeSet::new();

    for start in named {
        let mut walk = HashSet::new();
        let mut current = Some(start);
        while let Some(id) = current {
            if !walk.insert(id) {
                return Err(GcError::CycleDetected(id.to_string()));
            }
            if !closure.insert(id.clone()) && id != start {
                // Already covered by an earlier walk, and so is the rest of the chain.
                break;
            }
            current = graph.parent(id);
        }
    }

    Ok(closure)
}

/// Images that are neither named nor backing a running container, and are
/// not an ancestor of either, ordered children first so each can be removed
/// without orphaning a remaining layer.
pub fn deletable_images(graph: &ImageGraph) -> Result<Vec<ImageId>, GcError> {
    // A live image keeps its parent chain just like a tag does: the runtime
    // refuses to delete a layer with a child still present.
    let pinned: BTreeSet<ImageId> = graph
        .named_images
        .union(&graph.live_images)
        .cloned()
        .collect();
    let protected = dependency_closure(graph, &pinned)?;
    let candidates = graph
        .all_images
        .iter()
        .filter(|id| !protected.contains(*id))
        .cloned();

    let children = graph.children();
    topological_sort(candidates, |id| children.get(id).cloned().unwrap_or_default())
        .map_err(|cycle| GcError::CycleDetected(cycle.0.to_string()))
}

/// All three candidate sets, computed from one snapshot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Plan {
    pub dead_containers: Vec<ContainerId>,
    pub remote_tags: Vec<RemoteTag>,

    /// Children before parents
    pub images: Vec<ImageId>,
}

impl Plan {
    pub fn from_graph(graph: &ImageGraph) -> Result<Self, GcError> {
        Ok(Self {
            dead_containers: dead_containers(graph),
            remote_tags: remote_tagged_images(graph),
            images: deletable_images(graph)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.dead_containers.is_empty() && self.remote_tags.is_empty() && self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Container, Image, UNTAGGED};

    fn ids(list: &[&str]) -> BTreeSet<ImageId> {
        list.iter().map(|s| ImageId::from(*s)).collect()
    }

    fn as_set(images: Vec<ImageId>) -> BTreeSet<ImageId> {
        images.into_iter().collect()
    }

    fn index(order: &[ImageId], id: &str) -> usize {
        order.iter().position(|i| i.as_str() == id).unwrap()
    }

    #[test]
    fn dead_containers_excludes_running() {
        let graph = ImageGraph::from_parts(
            vec![Image::new("x")],
            vec![
                Container::new("up", "x", true),
                Container::new("down", "x", false),
                Container::new("exited", "x", false),
            ],
        );
        let dead = dead_containers(&graph);
        assert_eq!(dead, vec![ContainerId::from("down"), ContainerId::from("exited")]);
    }

    #[test]
    fn remote_tags_are_listed_per_tag() {
        let graph = ImageGraph::from_parts(
            vec![
                Image::new("a")
                    .with_tag("registry.example.com/org/name:latest")
                    .with_tag("registry.example.com/org/name:v2")
                    .with_tag("name:latest"),
                Image::new("b").with_tag("myimage:latest"),
            ],
            vec![],
        );
        let tags = remote_tagged_images(&graph);
        assert_eq!(tags.len(), 2);
        assert!(tags.iter().all(|t| t.image.as_str() == "a"));
        assert_eq!(tags[0].tag, "registry.example.com/org/name:latest");
    }

    #[test]
    fn named_image_is_never_deletable() {
        let graph = ImageGraph::from_parts(
            vec![
                Image::new("app").with_tag("app:v1"),
                Image::new("stale").with_tag("stale:old"),
            ],
            vec![Container::new("c", "stale", false)],
        );
        assert!(deletable_images(&graph).unwrap().is_empty());
    }

    #[test]
    fn ancestors_of_named_images_are_protected() {
        let graph = ImageGraph::from_parts(
            vec![
                Image::new("base"),
                Image::new("mid").with_parent("base"),
                Image::new("tip").with_parent("mid").with_tag("tip:1"),
            ],
            vec![],
        );
        assert_eq!(
            dependency_closure(&graph, &graph.named_images).unwrap(),
            ids(&["base", "mid", "tip"])
        );
        assert!(deletable_images(&graph).unwrap().is_empty());
    }

    #[test]
    fn running_container_pins_its_image() {
        let graph = ImageGraph::from_parts(
            vec![Image::new("x").with_tag(UNTAGGED)],
            vec![Container::new("a", "x", true)],
        );
        assert!(deletable_images(&graph).unwrap().is_empty());
    }

    #[test]
    fn running_container_pins_the_parent_chain() {
        let graph = ImageGraph::from_parts(
            vec![
                Image::new("base"),
                Image::new("P").with_parent("base"),
                Image::new("X").with_parent("P"),
                Image::new("sibling").with_parent("P"),
            ],
            vec![Container::new("web", "X", true)],
        );
        assert_eq!(deletable_images(&graph).unwrap(), vec![ImageId::from("sibling")]);
    }

    #[test]
    fn stopped_container_does_not_pin_its_image() {
        let graph = ImageGraph::from_parts(
            vec![Image::new("x")],
            vec![Container::new("a", "x", false)],
        );
        assert_eq!(deletable_images(&graph).unwrap(), vec![ImageId::from("x")]);
    }

    #[test]
    fn descendants_of_named_images_are_not_protected() {
        let graph = ImageGraph::from_parts(
            vec![
                Image::new("A").with_tag("app:v1"),
                Image::new("B").with_parent("A"),
                Image::new("C").with_parent("B"),
                Image::new("D"),
            ],
            vec![],
        );
        let order = deletable_images(&graph).unwrap();
        assert_eq!(as_set(order.clone()), ids(&["B", "C", "D"]));
        assert!(index(&order, "C") < index(&order, "B"));
    }

    #[test]
    fn remote_only_image_is_deletable() {
        let graph = ImageGraph::from_parts(
            vec![Image::new("r").with_tag("ghcr.io/org/r:1")],
            vec![],
        );
        assert_eq!(deletable_images(&graph).unwrap(), vec![ImageId::from("r")]);
    }

    #[test]
    fn cyclic_ancestry_is_rejected() {
        let graph = ImageGraph::from_parts(
            vec![
                Image::new("a").with_parent("b").with_tag("a:1"),
                Image::new("b").with_parent("a"),
            ],
            vec![],
        );
        assert!(matches!(deletable_images(&graph), Err(GcError::CycleDetected(_))));
    }

    #[test]
    fn plan_bundles_all_candidates() {
        let graph = ImageGraph::from_parts(
            vec![
                Image::new("base").with_tag("base:1"),
                Image::new("old").with_parent("base").with_tag("reg.io/team/old:1"),
            ],
            vec![Container::new("gone", "old", false)],
        );
        let plan = Plan::from_graph(&graph).unwrap();
        assert_eq!(plan.dead_containers, vec![ContainerId::from("gone")]);
        assert_eq!(plan.remote_tags.len(), 1);
        assert_eq!(plan.images, vec![ImageId::from("old")]);
        assert!(!plan.is_empty());
        assert!(Plan::default().is_empty());
    }
}
