//! Crate-wide error type.
//!
//! The engine itself has exactly one fatal error: a cyclic dependency
//! discovered while linearizing the target graph. Every other failure mode
//! (a target's `execute` returning `false`, a corrupt dependency database)
//! is data, not an exception, and is reported through `Target::executed` or
//! silently downgraded per spec — see `depdb` and `execute` for those
//! paths.

use thiserror::Error;

/// Errors that can escape the public API of this crate.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The target graph rooted at the build's root contains a directed
    /// cycle. No `prepare` or `execute` call is made on any target when
    /// this is returned.
    #[error("cyclic dependency detected in build graph")]
    CyclicDependency,

    /// An I/O error while saving the dependency database. Loading never
    /// produces this variant (see `depdb::DependencyDb::new`'s
    /// downgrade-to-empty policy); only `save` propagates I/O failures.
    #[error("I/O error in dependency database: {0}")]
    Io(#[from] std::io::Error),

    /// Reserved for callers that choose to serialize the observed table
    /// through a fallible path of their own; the engine's own `save`
    /// collapses JSON errors into `Io` since `serde_json::Error`
    /// implements `From<io::Error>` asymmetrically. Kept as a distinct
    /// variant for API stability.
    #[error("JSON error in dependency database: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BuildError>;
