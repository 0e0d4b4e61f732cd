//! The build facade: ties the graph sorter, prepare phase, and execute
//! phase together behind a single `execute(root)` call.
//!
//! A small `#[derive(Default, Debug)]` options struct carries plain `pub`
//! fields, and the facade type owns the knobs (`MaxThreads`) and runs
//! passes on demand, logging elapsed time when asked to.

use std::sync::Arc;
use std::time::Instant;

use log::info;

use crate::error::Result;
use crate::execute::{self, BuildResult};
use crate::graph;
use crate::prepare;
use crate::target::Target;

/// Options that affect a single build.
#[derive(Debug, Default, Clone)]
pub struct BuildOptions {
    /// If true, prepare still runs and the outdated set is still
    /// computed, but no target's `execute` is called; the predicted
    /// `total_jobs` is logged and returned with `completed_jobs: 0`.
    /// Off by default; does not change the semantics of a normal build.
    pub dry_run: bool,
    /// If true, the facade logs (via `log::info!`) the wall-clock
    /// duration of the prepare phase and the execute phase.
    pub timing: bool,
}

fn timed<R>(enabled: bool, name: &str, f: impl FnOnce() -> R) -> R {
    if !enabled {
        return f();
    }
    let start = Instant::now();
    let result = f();
    info!("{} took {:?}", name, start.elapsed());
    result
}

/// Ties the graph sorter, prepare phase, and execute phase together.
///
/// Owns `MaxThreads` (clamped to `[1, num_cpus]` on write) and an
/// optional `on_executing` callback invoked between prepare and execute,
/// so the caller can cache "how many jobs will run" for progress
/// reporting before any target actually executes.
pub struct BuildEngine {
    max_threads: usize,
    options: BuildOptions,
    on_executing: Option<Box<dyn Fn(usize) + Send + Sync>>,
}

impl BuildEngine {
    pub fn new(options: BuildOptions) -> Self {
        BuildEngine {
            max_threads: num_cpus::get().max(1),
            options,
            on_executing: None,
        }
    }

    /// Current worker-count ceiling.
    pub fn max_threads(&self) -> usize {
        self.max_threads
    }

    /// Set the worker-count ceiling, clamped to `[1, num_cpus::get()]`.
    pub fn set_max_threads(&mut self, threads: usize) {
        self.max_threads = threads.clamp(1, num_cpus::get().max(1));
    }

    /// Register a callback invoked once, between prepare and execute, with
    /// the number of targets about to be executed.
    pub fn set_on_executing<F>(&mut self, callback: F)
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.on_executing = Some(Box::new(callback));
    }

    /// Run a full build rooted at `root`.
    ///
    /// Returns `{0, 0}` if the root is absent (this crate never receives
    /// an absent root as `Option`; "absent" here means the caller never
    /// constructed one) or if nothing was outdated after prepare. The
    /// only fatal error is a cyclic dependency, detected before any
    /// `prepare` side effect runs.
    pub fn execute(&self, root: &Arc<dyn Target>) -> Result<BuildResult> {
        let ordered = graph::topo_sort(root)?;

        let outdated = timed(self.options.timing, "prepare", || {
            prepare::run(&ordered, self.max_threads)
        });

        if outdated.is_empty() {
            info!("build: nothing outdated, skipping execute phase");
            return Ok(BuildResult::default());
        }

        if let Some(cb) = &self.on_executing {
            cb(outdated.len());
        }

        if self.options.dry_run {
            info!(
                "build: dry run, {} target(s) would execute",
                outdated.len()
            );
            return Ok(BuildResult {
                total_jobs: outdated.len(),
                completed_jobs: 0,
            });
        }

        let result = timed(self.options.timing, "execute", || {
            execute::run(outdated, self.max_threads)
        });
        Ok(result)
    }
}
