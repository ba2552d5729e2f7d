pub use crate::builder::LoadingCacheBuilder;
pub use crate::cache::{Clock, LoadingCache, ManualClock, SystemClock};
pub use crate::cancel::{CancelToken, Canceled};
pub use crate::decision::{DecisionCache, DecisionCacheConfig, DecisionKey};
pub use crate::error::{ConfigError, GraphError, InvariantError, LoadError};
pub use crate::graph::{DependencyGraph, NodeRef};
#[cfg(feature = "metrics")]
pub use crate::metrics::{LoadingCacheMetricsSnapshot, MetricsSnapshotProvider};
pub use crate::modules::{ModuleError, ModuleSet, PolicyModule};
pub use crate::traits::Identity;
