//! # Dependency Graph
//!
//! Directed graph over values that expose a string [`Identity`]. Edges name
//! identities, so an edge may reference a node that has no stored value; such
//! identities still take part in ordering and cycle detection and surface as
//! [`NodeRef`]s without a value.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │                    DependencyGraph<T>                            │
//!   │                                                                  │
//!   │   values: FxHashMap<String, T>     written by add_node (&mut)    │
//!   │                                                                  │
//!   │   RwLock<EdgeSet>                  written by add_edge (&self)   │
//!   │   ┌──────────────────────────────────────────────────────────┐   │
//!   │   │  ids:       "A"→0  "B"→1  "C"→2        (first-seen order)│   │
//!   │   │  adjacency: 0→[1]  1→[2]  2→[0]                          │   │
//!   │   │  pairs:     {(0,1), (1,2), (2,0)}      (dedup)           │   │
//!   │   └──────────────────────────────────────────────────────────┘   │
//!   └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! - `add_edge`, `topo_sort` and the cycle queries take `&self` and may run
//!   concurrently; edge inserts take the write lock, reads take the read lock.
//! - `add_node` takes `&mut self`, so the borrow checker enforces the
//!   single-writer rule for node values.
//!
//! Validation is never cached: every ordering or cycle query recomputes from
//! the current edges.

use std::fmt;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use super::edges::EdgeSet;
use super::traversal::{closed_cycle, find_cycles, kahn_order};
use crate::error::GraphError;
use crate::traits::Identity;

/// A node identity returned by graph queries, with its stored value if any.
#[derive(Debug, PartialEq, Eq)]
pub struct NodeRef<'a, T> {
    id: String,
    value: Option<&'a T>,
}

impl<'a, T> NodeRef<'a, T> {
    /// Identity of the node.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Stored value, or `None` if the identity only appears in edges.
    #[inline]
    pub fn value(&self) -> Option<&'a T> {
        self.value
    }

    /// Stored value, or [`GraphError::NodeNotFound`].
    pub fn resolve(&self) -> Result<&'a T, GraphError> {
        self.value.ok_or_else(|| GraphError::NodeNotFound(self.id.clone()))
    }

    /// Consumes the reference and returns the identity.
    pub fn into_id(self) -> String {
        self.id
    }
}

impl<T> Clone for NodeRef<'_, T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            value: self.value,
        }
    }
}

/// Directed dependency graph with on-demand cycle detection.
///
/// # Example
///
/// ```
/// use decisionkit::graph::DependencyGraph;
///
/// let mut graph: DependencyGraph<String> = DependencyGraph::new();
/// graph.add_node("base".to_string());
/// graph.add_node("app".to_string());
/// graph.add_edge("base", "app").unwrap();
///
/// let order: Vec<&String> = graph.topo_sort_values().unwrap();
/// assert_eq!(order, vec!["base", "app"]);
/// ```
pub struct DependencyGraph<T> {
    values: FxHashMap<String, T>,
    edges: RwLock<EdgeSet>,
}

impl<T: Identity> DependencyGraph<T> {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self {
            values: FxHashMap::default(),
            edges: RwLock::new(EdgeSet::default()),
        }
    }

    /// Inserts `node`, replacing any value stored under the same identity.
    ///
    /// Edges are unaffected; an identity already referenced by edges keeps
    /// its position in tie-breaking order.
    pub fn add_node(&mut self, node: T) {
        let id = node.identity().to_owned();
        self.edges.get_mut().intern(&id);
        self.values.insert(id, node);
    }

    /// Adds the edge `source -> destination`, meaning `source` must come
    /// before `destination` in topological order.
    ///
    /// Neither endpoint needs a stored value. Duplicate edges are accepted and
    /// ignored. Multi-node cycles are accepted here and reported by the
    /// ordering and cycle queries.
    ///
    /// # Errors
    ///
    /// [`GraphError::SelfLoop`] if both identities are equal; the edge set is
    /// left unchanged.
    pub fn add_edge(&self, source: &str, destination: &str) -> Result<(), GraphError> {
        if source == destination {
            return Err(GraphError::SelfLoop {
                id: source.to_owned(),
            });
        }
        let inserted = self.edges.write().insert(source, destination);
        trace!(source, destination, inserted, "dependency edge added");
        Ok(())
    }

    /// [`add_edge`](Self::add_edge) keyed by the identities of two values.
    pub fn add_edge_between(&self, source: &T, destination: &T) -> Result<(), GraphError> {
        self.add_edge(source.identity(), destination.identity())
    }

    /// Stored value for `id`.
    pub fn node(&self, id: &str) -> Option<&T> {
        self.values.get(id)
    }

    /// Returns `true` if `id` has a stored value or appears in any edge.
    pub fn contains(&self, id: &str) -> bool {
        self.values.contains_key(id) || self.edges.read().handle(id).is_some()
    }

    /// Number of known identities, including those that only appear in edges.
    pub fn node_count(&self) -> usize {
        self.edges.read().vertex_count()
    }

    /// Number of distinct edges.
    pub fn edge_count(&self) -> usize {
        self.edges.read().edge_count()
    }

    /// Identities `id` points to, in edge insertion order.
    pub fn successors(&self, id: &str) -> Vec<String> {
        let edges = self.edges.read();
        let Some(vertex) = edges.handle(id) else {
            return Vec::new();
        };
        edges
            .successors(vertex)
            .iter()
            .map(|&next| edges.name(next).to_owned())
            .collect()
    }

    /// Identities in first-seen order.
    pub fn ids(&self) -> Vec<String> {
        self.edges.read().names().map(str::to_owned).collect()
    }

    /// Orders every known identity so that each edge's source precedes its
    /// destination. Unconstrained identities keep first-seen order.
    ///
    /// # Errors
    ///
    /// [`GraphError::CycleDetected`] with the full cycle path, first identity
    /// repeated at the end (`A -> B -> C -> A`).
    pub fn topo_sort(&self) -> Result<Vec<NodeRef<'_, T>>, GraphError> {
        let edges = self.edges.read();
        match kahn_order(&edges) {
            Ok(order) => Ok(order
                .into_iter()
                .map(|vertex| self.node_ref(edges.name(vertex)))
                .collect()),
            Err(leftover) => {
                let path: Vec<String> = closed_cycle(&edges, leftover)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|vertex| edges.name(vertex).to_owned())
                    .collect();
                debug!(cycle = %path.join(" -> "), "dependency cycle detected");
                Err(GraphError::CycleDetected { path })
            },
        }
    }

    /// [`topo_sort`](Self::topo_sort) resolved to stored values.
    ///
    /// # Errors
    ///
    /// [`GraphError::CycleDetected`] as for `topo_sort`, or
    /// [`GraphError::NodeNotFound`] for the first identity without a value.
    pub fn topo_sort_values(&self) -> Result<Vec<&T>, GraphError> {
        self.topo_sort()?.iter().map(NodeRef::resolve).collect()
    }

    /// Members of the first cycle found by a depth-first search in first-seen
    /// order, in path order without repeating the start. Empty if acyclic.
    pub fn detect_first_cycle(&self) -> Vec<NodeRef<'_, T>> {
        let edges = self.edges.read();
        find_cycles(&edges, 0..edges.vertex_count(), true)
            .pop()
            .map(|cycle| self.node_refs(&edges, &cycle))
            .unwrap_or_default()
    }

    /// One cycle per back edge of a full depth-first search. Overlapping
    /// cycles are not deduplicated, but every cyclic component contributes at
    /// least one entry.
    pub fn detect_all_cycles(&self) -> Vec<Vec<NodeRef<'_, T>>> {
        let edges = self.edges.read();
        let cycles = find_cycles(&edges, 0..edges.vertex_count(), false);
        if !cycles.is_empty() {
            debug!(count = cycles.len(), "dependency cycles detected");
        }
        cycles
            .iter()
            .map(|cycle| self.node_refs(&edges, cycle))
            .collect()
    }

    /// Returns `true` if the graph has no cycle.
    pub fn is_acyclic(&self) -> bool {
        kahn_order(&self.edges.read()).is_ok()
    }

    /// # Errors
    ///
    /// [`GraphError::NotADag`] if the graph has a cycle.
    pub fn ensure_acyclic(&self) -> Result<(), GraphError> {
        if self.is_acyclic() {
            Ok(())
        } else {
            Err(GraphError::NotADag)
        }
    }

    fn node_ref(&self, id: &str) -> NodeRef<'_, T> {
        NodeRef {
            id: id.to_owned(),
            value: self.values.get(id),
        }
    }

    fn node_refs(&self, edges: &EdgeSet, vertices: &[usize]) -> Vec<NodeRef<'_, T>> {
        vertices
            .iter()
            .map(|&vertex| self.node_ref(edges.name(vertex)))
            .collect()
    }
}

impl<T: Identity> Default for DependencyGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Identity> Extend<T> for DependencyGraph<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, nodes: I) {
        for node in nodes {
            self.add_node(node);
        }
    }
}

impl<T: Identity> FromIterator<T> for DependencyGraph<T> {
    fn from_iter<I: IntoIterator<Item = T>>(nodes: I) -> Self {
        let mut graph = Self::new();
        graph.extend(nodes);
        graph
    }
}

impl<T> fmt::Debug for DependencyGraph<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let edges = self.edges.read();
        f.debug_struct("DependencyGraph")
            .field("values", &self.values.len())
            .field("vertices", &edges.vertex_count())
            .field("edges", &edges.edge_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    struct Task {
        name: &'static str,
        weight: u32,
    }

    impl Identity for Task {
        fn identity(&self) -> &str {
            self.name
        }
    }

    fn ids<T>(refs: &[NodeRef<'_, T>]) -> Vec<String> {
        refs.iter().map(|node| node.id().to_string()).collect()
    }

    fn graph_of(names: &[&str], edges: &[(&str, &str)]) -> DependencyGraph<String> {
        let graph: DependencyGraph<String> = names.iter().map(|n| n.to_string()).collect();
        for (from, to) in edges {
            graph.add_edge(from, to).unwrap();
        }
        graph
    }

    fn position(order: &[String], id: &str) -> usize {
        order.iter().position(|o| o == id).unwrap()
    }

    // ==============================================
    // Edges
    // ==============================================

    #[test]
    fn self_loop_rejected_without_mutation() {
        let graph: DependencyGraph<String> = DependencyGraph::new();
        let err = graph.add_edge("a", "a").unwrap_err();
        assert_eq!(err, GraphError::SelfLoop { id: "a".into() });
        assert_eq!(err.to_string(), "self-loop rejected: `a` cannot depend on itself");
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.node_count(), 0);
        assert!(!graph.contains("a"));
    }

    #[test]
    fn duplicate_edge_is_idempotent() {
        let graph: DependencyGraph<String> = DependencyGraph::new();
        graph.add_edge("a", "b").unwrap();
        graph.add_edge("a", "b").unwrap();
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.successors("a"), vec!["b"]);
        assert!(graph.successors("missing").is_empty());
    }

    #[test]
    fn add_edge_between_uses_identity() {
        let mut graph = DependencyGraph::new();
        let parse = Task { name: "parse", weight: 1 };
        let check = Task { name: "check", weight: 2 };
        graph.add_edge_between(&parse, &check).unwrap();
        assert!(graph.add_edge_between(&parse, &Task { name: "parse", weight: 9 }).is_err());
        graph.add_node(parse);
        graph.add_node(check);
        let order: Vec<&str> = graph.topo_sort_values().unwrap().iter().map(|t| t.name).collect();
        assert_eq!(order, vec!["parse", "check"]);
    }

    // ==============================================
    // Nodes
    // ==============================================

    #[test]
    fn add_node_last_write_wins() {
        let mut graph = DependencyGraph::new();
        graph.add_node(Task { name: "t", weight: 1 });
        graph.add_node(Task { name: "t", weight: 2 });
        assert_eq!(graph.node("t").map(|t| t.weight), Some(2));
        assert_eq!(graph.node_count(), 1);
        let sorted = graph.topo_sort_values().unwrap();
        assert_eq!(sorted.len(), 1);
        assert_eq!(sorted[0].weight, 2);
    }

    #[test]
    fn edge_only_identity_has_no_value() {
        let mut graph = DependencyGraph::new();
        graph.add_node(Task { name: "known", weight: 1 });
        graph.add_edge("known", "ghost").unwrap();

        let order = graph.topo_sort().unwrap();
        assert_eq!(ids(&order), vec!["known", "ghost"]);
        assert!(order[0].value().is_some());
        assert_eq!(order[1].value(), None);
        assert_eq!(
            order[1].resolve().unwrap_err(),
            GraphError::NodeNotFound("ghost".into())
        );
        assert_eq!(
            graph.topo_sort_values().unwrap_err().to_string(),
            "node not found: `ghost`"
        );
        assert!(graph.contains("ghost"));
        assert!(graph.node("ghost").is_none());
    }

    // ==============================================
    // Topological sort
    // ==============================================

    #[test]
    fn empty_graph_sorts_to_empty() {
        let graph: DependencyGraph<String> = DependencyGraph::default();
        assert!(graph.topo_sort().unwrap().is_empty());
        assert!(graph.detect_first_cycle().is_empty());
        assert!(graph.detect_all_cycles().is_empty());
        assert!(graph.is_acyclic());
    }

    #[test]
    fn diamond_ordering() {
        let graph = graph_of(&["A", "B", "C", "D"], &[("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")]);
        let order = ids(&graph.topo_sort().unwrap());
        assert!(position(&order, "A") < position(&order, "B"));
        assert!(position(&order, "A") < position(&order, "C"));
        assert!(position(&order, "B") < position(&order, "D"));
        assert!(position(&order, "C") < position(&order, "D"));
        assert_eq!(order, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let graph = graph_of(&["z", "y", "x"], &[]);
        assert_eq!(ids(&graph.topo_sort().unwrap()), vec!["z", "y", "x"]);
    }

    #[test]
    fn edges_reorder_against_insertion() {
        let graph = graph_of(&["first", "second", "third"], &[("third", "first")]);
        assert_eq!(
            ids(&graph.topo_sort().unwrap()),
            vec!["second", "third", "first"]
        );
    }

    #[test]
    fn cycle_path_is_reported() {
        let graph = graph_of(&["A", "B", "C"], &[("A", "B"), ("B", "C"), ("C", "A")]);
        let err = graph.topo_sort().unwrap_err();
        assert_eq!(
            err.cycle_path(),
            Some(&["A".to_string(), "B".into(), "C".into(), "A".into()][..])
        );
        assert_eq!(err.to_string(), "cycle detected: A -> B -> C -> A");
    }

    #[test]
    fn cycle_downstream_of_acyclic_prefix() {
        let graph = graph_of(&[], &[("root", "x"), ("x", "y"), ("y", "x"), ("y", "leaf")]);
        let err = graph.topo_sort().unwrap_err();
        assert_eq!(err.to_string(), "cycle detected: x -> y -> x");
    }

    #[test]
    fn sort_is_recomputed_after_new_edges() {
        let graph = graph_of(&["a", "b"], &[("a", "b")]);
        assert!(graph.topo_sort().is_ok());
        graph.add_edge("b", "a").unwrap();
        assert!(graph.topo_sort().is_err());
        assert_eq!(graph.ensure_acyclic(), Err(GraphError::NotADag));
    }

    // ==============================================
    // Cycle queries
    // ==============================================

    #[test]
    fn first_cycle_members_in_path_order() {
        let graph = graph_of(&["A", "B", "C"], &[("A", "B"), ("B", "C"), ("C", "A")]);
        let cycle = graph.detect_first_cycle();
        assert_eq!(ids(&cycle), vec!["A", "B", "C"]);
        assert!(cycle.iter().all(|node| node.value().is_some()));
        assert!(!graph.is_acyclic());
    }

    #[test]
    fn all_cycles_cover_each_component() {
        let graph = graph_of(
            &[],
            &[("a", "b"), ("b", "a"), ("c", "d"), ("d", "e"), ("e", "c"), ("x", "y")],
        );
        let cycles: Vec<Vec<String>> = graph.detect_all_cycles().iter().map(|c| ids(c)).collect();
        assert_eq!(cycles, vec![vec!["a", "b"], vec!["c", "d", "e"]]);
    }

    #[test]
    fn acyclic_graph_passes_checks() {
        let graph = graph_of(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("a", "c")]);
        assert!(graph.detect_first_cycle().is_empty());
        assert!(graph.ensure_acyclic().is_ok());
    }

    #[test]
    fn debug_reports_counts() {
        let graph = graph_of(&["a"], &[("a", "b")]);
        assert_eq!(
            format!("{graph:?}"),
            "DependencyGraph { values: 1, vertices: 2, edges: 1 }"
        );
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: for a DAG (edges only from lower to higher index), every
        /// edge's source precedes its destination in the sorted order
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_topo_order_respects_edges(
            node_count in 1usize..25,
            raw_edges in prop::collection::vec((0usize..25, 0usize..25), 0..80)
        ) {
            let mut graph: DependencyGraph<String> = DependencyGraph::new();
            for i in 0..node_count {
                graph.add_node(format!("n{i}"));
            }
            let mut edges = Vec::new();
            for (a, b) in raw_edges {
                let (a, b) = (a % node_count, b % node_count);
                if a < b {
                    graph.add_edge(&format!("n{a}"), &format!("n{b}")).unwrap();
                    edges.push((a, b));
                }
            }

            let order: Vec<String> = graph
                .topo_sort()
                .unwrap()
                .into_iter()
                .map(NodeRef::into_id)
                .collect();
            prop_assert_eq!(order.len(), node_count);
            for (a, b) in edges {
                let pa = order.iter().position(|id| *id == format!("n{a}")).unwrap();
                let pb = order.iter().position(|id| *id == format!("n{b}")).unwrap();
                prop_assert!(pa < pb);
            }
            prop_assert!(graph.detect_first_cycle().is_empty());
        }

        /// Property: a ring of any length is reported with its full path
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_ring_cycle_path(len in 2usize..12) {
            let graph: DependencyGraph<String> = DependencyGraph::new();
            for i in 0..len {
                graph.add_edge(&format!("r{i}"), &format!("r{}", (i + 1) % len)).unwrap();
            }
            let err = graph.topo_sort().unwrap_err();
            let path = err.cycle_path().unwrap();
            prop_assert_eq!(path.len(), len + 1);
            prop_assert_eq!(path.first(), path.last());
            prop_assert_eq!(&path[0], "r0");
        }
    }
}
