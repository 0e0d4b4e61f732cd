//! The prepare phase: parallel `prepare()` invocations over the linearized
//! target list, followed by transitive staleness promotion.
//!
//! A fixed-size worker pool drains the work list (spawn N threads, pull
//! work off a shared queue, block until more arrives); once every worker
//! has joined, a single linear sweep in topological order promotes any
//! target whose predecessor went stale during `prepare` but that did not
//! itself report staleness.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::bounded;
use log::{debug, trace};

use crate::target::Target;

/// Run `prepare()` for every target in `ordered` across up to
/// `max_threads` workers, then perform the transitive-promotion sweep.
///
/// Returns the subset of `ordered` that ended up outdated, in the same
/// relative order, ready to hand to the execute phase. `ordered` must
/// already be a valid topological order (predecessors before successors);
/// `graph::topo_sort`'s output satisfies this.
pub fn run(ordered: &[Arc<dyn Target>], max_threads: usize) -> Vec<Arc<dyn Target>> {
    let max_threads = max_threads.max(1);
    let workers = max_threads.min(ordered.len().max(1));

    // A bounded channel sized to the whole work list means no worker ever
    // blocks sending; consumers pull at their own pace.
    let (tx, rx) = bounded::<Arc<dyn Target>>(ordered.len().max(1));
    for target in ordered {
        tx.send(target.clone()).expect("channel sized to len(ordered)");
    }
    drop(tx);

    let prepared = AtomicUsize::new(0);
    std::thread::scope(|scope| {
        for _ in 0..workers {
            let rx = rx.clone();
            let prepared = &prepared;
            scope.spawn(move || {
                while let Ok(target) = rx.recv() {
                    if target.prepare() {
                        target.set_outdated();
                    }
                    prepared.fetch_add(1, Ordering::Relaxed);
                }
            });
        }
    });
    trace!("prepare: {} targets prepared", prepared.load(Ordering::Relaxed));

    // Transitive promotion: one linear sweep in topological order suffices
    // because every predecessor has already been visited by the time its
    // successor is reached.
    for target in ordered {
        if !target.is_outdated() && target.predecessors().iter().any(|p| p.is_outdated()) {
            target.set_outdated();
        }
    }

    let outdated: Vec<Arc<dyn Target>> = ordered.iter().filter(|t| t.is_outdated()).cloned().collect();
    debug!(
        "prepare: {} of {} targets outdated after propagation",
        outdated.len(),
        ordered.len()
    );
    outdated
}
