//! Depth-first topological sort over the caller-supplied target DAG.
//!
//! Produces a linear order such that every predecessor appears before its
//! successor. A directed cycle reachable from the root is a fatal error;
//! revisiting an already-finished node (diamond sharing) is fine and
//! happens naturally in any non-trivial build graph.

use std::sync::Arc;

use fnv::FnvHashSet;

use crate::error::{BuildError, Result};
use crate::target::{Target, TargetKey};

/// Linearize the DAG rooted at `root` into dependency order.
///
/// As a side effect, every node's `outdated` flag is cleared the first
/// time it is touched, before any cycle can be reported — this is the
/// one point in the engine where `OutdatedFlag::clear` is called.
pub fn topo_sort(root: &Arc<dyn Target>) -> Result<Vec<Arc<dyn Target>>> {
    let mut visited: FnvHashSet<TargetKey> = FnvHashSet::default();
    let mut on_stack: FnvHashSet<TargetKey> = FnvHashSet::default();
    let mut order: Vec<Arc<dyn Target>> = Vec::new();

    // Explicit stack of (node, next predecessor index) frames; avoids
    // recursion depth tracking the DAG's longest chain, which would be
    // an odd thing for a build engine to impose on its caller.
    let mut stack: Vec<(Arc<dyn Target>, usize)> = vec![(root.clone(), 0)];
    on_stack.insert(TargetKey::of(root));
    touch(root);

    while let Some((node, idx)) = stack.last().cloned() {
        let preds = node.predecessors();
        if idx < preds.len() {
            stack.last_mut().unwrap().1 += 1;
            let pred = &preds[idx];
            let key = TargetKey::of(pred);

            if on_stack.contains(&key) {
                return Err(BuildError::CyclicDependency);
            }
            if visited.contains(&key) {
                continue;
            }

            touch(pred);
            on_stack.insert(key);
            stack.push((pred.clone(), 0));
        } else {
            let key = TargetKey::of(&node);
            on_stack.remove(&key);
            visited.insert(key);
            order.push(node);
            stack.pop();
        }
    }

    Ok(order)
}

fn touch(target: &Arc<dyn Target>) {
    target.outdated_flag().clear();
}
