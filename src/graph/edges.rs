//! Interned adjacency storage shared by the ordering and cycle searches.

use rustc_hash::FxHashSet;

use crate::ds::KeyInterner;

/// Directed edges between interned identities.
///
/// Vertex handles are dense and follow first-seen order. Successor lists keep
/// edge insertion order; `pairs` makes repeated inserts idempotent.
#[derive(Debug, Default)]
pub(crate) struct EdgeSet {
    ids: KeyInterner,
    adjacency: Vec<Vec<usize>>,
    pairs: FxHashSet<(usize, usize)>,
}

impl EdgeSet {
    pub(crate) fn intern(&mut self, id: &str) -> usize {
        let handle = self.ids.intern(id);
        if handle == self.adjacency.len() {
            self.adjacency.push(Vec::new());
        }
        handle
    }

    /// Adds `source -> destination`; returns `false` if the edge already existed.
    pub(crate) fn insert(&mut self, source: &str, destination: &str) -> bool {
        let from = self.intern(source);
        let to = self.intern(destination);
        if !self.pairs.insert((from, to)) {
            return false;
        }
        self.adjacency[from].push(to);
        true
    }

    #[inline]
    pub(crate) fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    #[inline]
    pub(crate) fn edge_count(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub(crate) fn handle(&self, id: &str) -> Option<usize> {
        self.ids.get_handle(id)
    }

    #[inline]
    pub(crate) fn successors(&self, vertex: usize) -> &[usize] {
        self.adjacency.get(vertex).map(Vec::as_slice).unwrap_or_default()
    }

    /// Identity of `vertex`; empty for an unknown handle.
    #[inline]
    pub(crate) fn name(&self, vertex: usize) -> &str {
        self.ids.resolve(vertex).unwrap_or_default()
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.ids.iter()
    }
}
