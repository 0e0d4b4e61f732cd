//! An incremental, parallel build engine for C/C++ projects targeting
//! microcontrollers.
//!
//! Given a root [`Target`] and the DAG of predecessors reachable from it,
//! the engine decides which targets are stale, runs stale targets in
//! parallel while respecting dependency order, and persists a header-
//! dependency database ([`depdb::DependencyDb`]) so a source file is
//! recompiled whenever any header it transitively includes has changed.
//!
//! The concrete work a target performs — compiling a file, linking,
//! converting an ELF image to a raw binary, touching a version source —
//! is the embedding application's responsibility; this crate only
//! provides the [`Target`] trait, the scheduler, and the dependency
//! database that feeds its staleness decisions.
//!
//! ```no_run
//! use std::sync::Arc;
//! use ucbuild::{BuildEngine, BuildOptions, OutdatedFlag, Target};
//!
//! struct CompileStep {
//!     outdated: OutdatedFlag,
//! }
//!
//! impl Target for CompileStep {
//!     fn predecessors(&self) -> &[Arc<dyn Target>] {
//!         &[]
//!     }
//!     fn outdated_flag(&self) -> &OutdatedFlag {
//!         &self.outdated
//!     }
//!     fn prepare(&self) -> bool {
//!         true // pretend the source changed
//!     }
//! }
//!
//! let root: Arc<dyn Target> = Arc::new(CompileStep { outdated: OutdatedFlag::new() });
//! let engine = BuildEngine::new(BuildOptions::default());
//! let result = engine.execute(&root).unwrap();
//! assert!(result.success());
//! ```

pub mod depdb;
pub mod engine;
pub mod error;
pub mod execute;
pub mod graph;
pub mod prepare;
pub mod target;

pub use depdb::DependencyDb;
pub use engine::{BuildEngine, BuildOptions};
pub use error::{BuildError, Result};
pub use execute::BuildResult;
pub use target::{OutdatedFlag, Target};
