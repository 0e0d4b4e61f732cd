//! The execute phase: a bounded worker pool that consumes outdated
//! targets in dependency order, reports completions, and aborts on first
//! failure.
//!
//! Two MPMC channels carry the protocol: `inputs` offers targets (or a
//! shutdown sentinel) to workers, `outputs` returns completions to the
//! single scheduler thread (the caller's thread, which also serves as the
//! sole `executed()` reporter). `crossbeam-channel` supplies both queues
//! so the scheduler never has to hand-roll a condition-variable wakeup.

use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{info, warn};

use crate::target::Target;

/// `{total_jobs, completed_jobs}` — `success` is `total_jobs ==
/// completed_jobs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildResult {
    pub total_jobs: usize,
    pub completed_jobs: usize,
}

impl BuildResult {
    pub fn success(&self) -> bool {
        self.total_jobs == self.completed_jobs
    }
}

enum WorkItem {
    Run(Arc<dyn Target>),
    Stop,
}

/// Run the execute phase over `outdated`, an already topologically-valid
/// set of targets that need to run this build.
pub fn run(outdated: Vec<Arc<dyn Target>>, max_threads: usize) -> BuildResult {
    let total_jobs = outdated.len();
    if total_jobs == 0 {
        return BuildResult::default();
    }

    let workers = max_threads.max(1).min(total_jobs);
    let (input_tx, input_rx): (Sender<WorkItem>, Receiver<WorkItem>) = unbounded();
    let (output_tx, output_rx): (Sender<Arc<dyn Target>>, Receiver<Arc<dyn Target>>) = unbounded();

    let mut pending = outdated;
    let mut completed_jobs = 0usize;
    let mut aborted = false;

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let input_rx = input_rx.clone();
            let output_tx = output_tx.clone();
            scope.spawn(move || worker_loop(&input_rx, &output_tx));
        }

        while !pending.is_empty() && !aborted {
            // Step 1: offer every target all of whose predecessors are no
            // longer outdated (never-outdated or succeeded both qualify).
            let mut i = 0;
            while i < pending.len() {
                let ready = pending[i].predecessors().iter().all(|p| !p.is_outdated());
                if ready {
                    let target = pending.remove(i);
                    input_tx
                        .send(WorkItem::Run(target))
                        .expect("worker pool outlives scheduling loop");
                } else {
                    i += 1;
                }
            }

            // Step 2: block for at least one completion, then drain what's
            // immediately available.
            let first = match output_rx.recv() {
                Ok(t) => t,
                Err(_) => break,
            };
            let mut batch = vec![first];
            while let Ok(t) = output_rx.try_recv() {
                batch.push(t);
            }

            // Every completion in this batch already happened; report all
            // of them, but stop offering new work the moment any of them
            // is a failure. Failures are re-queued onto `outputs` so the
            // final drain pass (below) picks them up in the required
            // successes-before-failures order instead of being reported
            // twice or dropped.
            for target in batch {
                if target.is_outdated() {
                    warn!("execute: target failed, aborting further scheduling");
                    output_tx
                        .send(target)
                        .expect("output channel still open during scheduler lifetime");
                    aborted = true;
                } else {
                    target.executed();
                    completed_jobs += 1;
                }
            }
        }

        // Shutdown: one sentinel per worker, then join (implicit at scope
        // end), then drain any lingering completions.
        for _ in 0..workers {
            let _ = input_tx.send(WorkItem::Stop);
        }
        drop(input_tx);
    });

    // Final drain: anything left in `outputs` after all workers have
    // joined — the re-inserted failure plus any that raced it. Report
    // successes before failures (stable on the outdated flag) so a
    // straggling success that finished after the abort decision is still
    // counted.
    drop(output_tx);
    let mut stragglers: Vec<Arc<dyn Target>> = output_rx.try_iter().collect();
    stragglers.sort_by_key(|t| t.is_outdated());

    for target in stragglers {
        target.executed();
        if !target.is_outdated() {
            completed_jobs += 1;
        }
    }

    info!(
        "execute: {}/{} targets completed",
        completed_jobs, total_jobs
    );
    BuildResult {
        total_jobs,
        completed_jobs,
    }
}

fn worker_loop(input_rx: &Receiver<WorkItem>, output_tx: &Sender<Arc<dyn Target>>) {
    loop {
        match input_rx.recv() {
            Ok(WorkItem::Run(target)) => {
                let ok = target.execute();
                if ok {
                    target.outdated_flag().clear();
                } else {
                    target.set_outdated();
                }
                let _ = output_tx.send(target);
            }
            Ok(WorkItem::Stop) | Err(_) => break,
        }
    }
}
