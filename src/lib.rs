//! decisionkit: concurrency primitives for a policy-decision engine.
//!
//! - [`cache::LoadingCache`]: bounded LRU cache with per-key TTL and
//!   singleflight loading
//! - [`graph::DependencyGraph`]: dependency graph with cycle detection and
//!   deterministic topological ordering
//! - [`modules::ModuleSet`]: policy modules ordered by their imports
//! - [`decision::DecisionCache`]: decision results cached by request key
//!
//! The [`cache::loading`] and [`graph::dependency`] module docs describe the
//! internal layout, locking and ordering guarantees.

pub mod builder;
pub mod cache;
pub mod cancel;
pub mod decision;
pub mod ds;
pub mod error;
pub mod graph;
pub mod modules;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod prelude;
pub mod traits;
