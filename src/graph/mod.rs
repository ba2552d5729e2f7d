//! Dependency graph with on-demand cycle detection and deterministic
//! topological ordering.
//!
//! - [`DependencyGraph`]: nodes keyed by [`Identity`](crate::traits::Identity),
//!   edges keyed by identity strings
//! - [`NodeRef`]: identity plus optional stored value, returned by queries

pub mod dependency;
mod edges;
mod traversal;

pub use dependency::{DependencyGraph, NodeRef};
