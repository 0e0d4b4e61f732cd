//! The abstract unit of work in the build graph.
//!
//! A `Target` is an entity with identity (two targets are the same only if
//! they are the same object — reference equality, never structural
//! equality), an ordered list of predecessors, and a mutable `outdated`
//! flag. Concrete target implementations (compiling a file, linking,
//! converting an ELF image to raw binary, touching a version source) are
//! out of scope for this crate; callers implement this trait themselves.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The one-way-then-engine-clearable `outdated` switch.
///
/// Any thread may call `set`; only the engine (via `pub(crate) clear`) may
/// turn it back off, and it only does so once, at the start of the
/// topological sort. This asymmetry is what lets `prepare()` on one target
/// safely mark a *different* target outdated from any worker thread
/// without additional synchronization.
#[derive(Debug, Default)]
pub struct OutdatedFlag(AtomicBool);

impl OutdatedFlag {
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Current value. Relaxed-adjacent but uses `SeqCst` throughout since
    /// this flag is also the cross-thread signal that readiness checks in
    /// the execute phase depend on; the cost is negligible next to the
    /// I/O each target performs.
    pub fn get(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Mark outdated. Idempotent; never clears.
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Engine-only reset, used exactly once per target at the start of
    /// `graph::topo_sort`.
    pub(crate) fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A unit of work in the build DAG.
///
/// Implementations are created by the caller before the build begins and
/// retained for its duration; the engine never constructs or destroys a
/// `Target`. All three lifecycle hooks have sensible defaults: `prepare`
/// defaults to "not stale", `execute` defaults to "succeeded", `executed`
/// defaults to a no-op.
pub trait Target: Send + Sync {
    /// Predecessors that must execute-successfully before this target may
    /// execute. Duplicates are permitted but semantically ignored by the
    /// engine.
    fn predecessors(&self) -> &[Arc<dyn Target>];

    /// Storage for this target's `outdated` flag. Concrete targets
    /// typically hold one `OutdatedFlag` field and return a reference to
    /// it here.
    fn outdated_flag(&self) -> &OutdatedFlag;

    /// Decide whether this target needs to run. May perform I/O (e.g.
    /// query the dependency database, stat files) and must be safe to
    /// call concurrently with `prepare` on any other target. Called at
    /// most once per build, from an arbitrary prepare-phase worker
    /// thread.
    fn prepare(&self) -> bool {
        false
    }

    /// Run the target's actual work. Called from an arbitrary
    /// execute-phase worker thread, only after every predecessor's
    /// `execute` has completed and returned `true`. Must be safe to run
    /// concurrently with `execute` on any other target. Typically not
    /// called twice for the same target in one build.
    fn execute(&self) -> bool {
        true
    }

    /// Post-execution notification. Called exactly once per target that
    /// reached the execute phase (success or failure), always serialized
    /// on the scheduler thread — never concurrently with any other
    /// `executed` call, so implementations may freely touch shared state
    /// like stdout without locking.
    fn executed(&self) {}

    /// Convenience accessor, equivalent to `self.outdated_flag().get()`.
    fn is_outdated(&self) -> bool {
        self.outdated_flag().get()
    }

    /// Convenience mutator, equivalent to `self.outdated_flag().set()`.
    /// Concrete targets use this during `prepare` to mark *other* targets
    /// outdated — the mechanism by which a shared upstream (e.g. a
    /// version-stamp source) can fan staleness out to every target that
    /// depends on it.
    fn set_outdated(&self) {
        self.outdated_flag().set();
    }
}

/// Reference identity for an `Arc<dyn Target>`, for use as a hash map key
/// in the graph sorter and schedulers. Two targets compare equal here iff
/// they are the same allocation — structural content is irrelevant.
#[derive(Clone, Copy)]
pub struct TargetKey(*const ());

// SAFETY: a TargetKey is only ever compared and hashed, never dereferenced;
// the pointer is kept alive for the key's lifetime by the caller holding
// the originating Arc<dyn Target>.
unsafe impl Send for TargetKey {}
unsafe impl Sync for TargetKey {}

impl TargetKey {
    pub fn of(target: &Arc<dyn Target>) -> Self {
        TargetKey(Arc::as_ptr(target) as *const ())
    }
}

impl PartialEq for TargetKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for TargetKey {}

impl std::hash::Hash for TargetKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl std::fmt::Debug for TargetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TargetKey({:p})", self.0)
    }
}
