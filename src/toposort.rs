//! Depth-first dependency ordering.
//!
//! Every key is emitted only after all of its dependencies, so callers that
//! pass "children of" as the dependency function get leaf layers first.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

/// A key was reached again while its own dependencies were still being visited.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("dependency cycle detected at {0:?}")]
pub struct CycleDetected<K: Debug>(pub K);

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Order `items` so each key follows all of its (transitive) dependencies.
///
/// Dependencies outside `items` are walked so that ordering through them is
/// respected, but they are not part of the output. Ties between independent
/// keys follow the iteration order of `items`.
pub fn topological_sort<K, I, F, D>(items: I, mut deps_of: F) -> Result<Vec<K>, CycleDetected<K>>
where
    K: Clone + Eq + Hash + Debug,
    I: IntoIterator<Item = K>,
    F: FnMut(&K) -> D,
    D: IntoIterator<Item = K>,
{
    let mut roots = Vec::new();
    let mut members = HashSet::new();
    for key in items {
        if members.insert(key.clone()) {
            roots.push(key);
        }
    }

    let mut marks: HashMap<K, Mark> = HashMap::with_capacity(roots.len());
    let mut order = Vec::with_capacity(roots.len());

    for root in roots {
        if marks.contains_key(&root) {
            continue;
        }

        // Explicit stack instead of recursion: layer chains can be deep.
        marks.insert(root.clone(), Mark::InProgress);
        let deps: Vec<K> = deps_of(&root).into_iter().collect();
        let mut stack = vec![(root, deps.into_iter())];

        while let Some(frame) = stack.last_mut() {
            match frame.1.next() {
                Some(dep) => match marks.get(&dep) {
                    Some(Mark::Done) => {}
                    Some(Mark::InProgress) => return Err(CycleDetected(dep)),
                    None => {
                        marks.insert(dep.clone(), Mark::InProgress);
                        let deps: Vec<K> = deps_of(&dep).into_iter().collect();
                        stack.push((dep, deps.into_iter()));
                    }
                },
                None => {
                    let Some((key, _)) = stack.pop() else { break };
                    marks.insert(key.clone(), Mark::Done);
                    if members.contains(&key) {
                        order.push(key);
                    }
                }
            }
        }
    }

    Ok(order)
}
