//! Error types for the decisionkit library.
//!
//! ## Key Components
//!
//! - [`LoadError`]: Returned by [`LoadingCache::get`](crate::cache::LoadingCache::get)
//!   when the loader fails or panics. Failed loads are never cached.
//! - [`GraphError`]: Returned by dependency-graph operations (self-loops,
//!   cycles, unresolved identities).
//! - [`ConfigError`]: Returned when cache configuration parameters are invalid
//!   (e.g. zero capacity) through the fallible constructors.
//! - [`InvariantError`]: Returned when internal data-structure invariants are
//!   violated (`check_invariants` methods).
//!
//! ## Example Usage
//!
//! ```
//! use decisionkit::error::{ConfigError, GraphError};
//! use decisionkit::cache::LoadingCache;
//!
//! // Fallible constructor for user-configurable parameters
//! let bad: Result<LoadingCache<u32>, ConfigError> = LoadingCache::try_new(0);
//! assert!(bad.is_err());
//!
//! let err = GraphError::CycleDetected {
//!     path: vec!["a".into(), "b".into(), "a".into()],
//! };
//! assert_eq!(err.to_string(), "cycle detected: a -> b -> a");
//! ```

use thiserror::Error;

// ---------------------------------------------------------------------------
// LoadError
// ---------------------------------------------------------------------------

/// Error returned when a cache load attempt fails.
///
/// `E` is the loader's own error type; it is passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError<E> {
    /// The loader returned an error.
    #[error("{0}")]
    Loader(E),

    /// The loader panicked. Carries the rendered panic payload.
    #[error("loader panicked: {0}")]
    Panicked(String),
}

impl<E> LoadError<E> {
    /// Returns the loader's error, or `None` if the loader panicked.
    pub fn into_loader_error(self) -> Option<E> {
        match self {
            LoadError::Loader(err) => Some(err),
            LoadError::Panicked(_) => None,
        }
    }

    /// Returns `true` if the loader panicked.
    #[inline]
    pub fn is_panic(&self) -> bool {
        matches!(self, LoadError::Panicked(_))
    }
}

// ---------------------------------------------------------------------------
// GraphError
// ---------------------------------------------------------------------------

/// Errors produced by [`DependencyGraph`](crate::graph::DependencyGraph).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// An edge from an identity to itself was rejected.
    #[error("self-loop rejected: `{id}` cannot depend on itself")]
    SelfLoop { id: String },

    /// An identity is referenced by an edge but has no stored node.
    #[error("node not found: `{0}`")]
    NodeNotFound(String),

    /// The graph contains a cycle. `path` starts and ends at the same identity.
    #[error("cycle detected: {}", .path.join(" -> "))]
    CycleDetected { path: Vec<String> },

    /// The graph is not acyclic.
    #[error("graph is not a DAG")]
    NotADag,
}

impl GraphError {
    /// Returns the cycle path for [`GraphError::CycleDetected`].
    pub fn cycle_path(&self) -> Option<&[String]> {
        match self {
            GraphError::CycleDetected { path } => Some(path),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal cache invariants are violated.
///
/// Produced by `check_invariants` methods (e.g.
/// [`LoadingCache::check_invariants`](crate::cache::LoadingCache::check_invariants)).
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache configuration parameters are invalid.
///
/// Produced by fallible constructors such as
/// [`LoadingCache::try_new`](crate::cache::LoadingCache::try_new) and
/// [`LoadingCacheBuilder::try_build`](crate::builder::LoadingCacheBuilder::try_build).
///
/// # Example
///
/// ```
/// use decisionkit::cache::LoadingCache;
///
/// let err = LoadingCache::<u64>::try_new(0).unwrap_err();
/// assert!(err.to_string().contains("capacity"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
