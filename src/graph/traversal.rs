//! Ordering and cycle searches over an [`EdgeSet`].
//!
//! ## Kahn ordering
//!
//! ```text
//!   in_degree[v] = number of edges u -> v
//!   ready        = min-heap of vertices with in_degree 0   (smallest handle first)
//!
//!   pop v, emit v, decrement successors, push those reaching 0
//!
//!   emitted < vertex_count  ⇒  leftover vertices contain a cycle
//! ```
//!
//! Handles are first-seen order, so popping the smallest ready handle breaks
//! ties by insertion order and makes the output deterministic.
//!
//! ## Cycle search
//!
//! Iterative depth-first search with white/gray/black marks. A gray successor
//! is on the active stack, so the edge to it closes a cycle: the stack slice
//! from that successor to the current vertex, in path order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::edges::EdgeSet;

/// Returns all vertices in topological order, or the vertices that could not
/// be ordered because they lie on or downstream of a cycle.
pub(crate) fn kahn_order(edges: &EdgeSet) -> Result<Vec<usize>, Vec<usize>> {
    let count = edges.vertex_count();
    let mut in_degree = vec![0usize; count];
    for vertex in 0..count {
        for &next in edges.successors(vertex) {
            in_degree[next] += 1;
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = (0..count)
        .filter(|&vertex| in_degree[vertex] == 0)
        .map(Reverse)
        .collect();
    let mut order = Vec::with_capacity(count);

    while let Some(Reverse(vertex)) = ready.pop() {
        order.push(vertex);
        for &next in edges.successors(vertex) {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    if order.len() == count {
        Ok(order)
    } else {
        Err((0..count).filter(|&vertex| in_degree[vertex] > 0).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    White,
    Gray,
    Black,
}

/// Depth-first search from `roots` (in the given order), recording one cycle
/// per back edge. Each cycle lists its vertices in path order without
/// repeating the first one.
pub(crate) fn find_cycles(
    edges: &EdgeSet,
    roots: impl IntoIterator<Item = usize>,
    stop_at_first: bool,
) -> Vec<Vec<usize>> {
    let mut marks = vec![Mark::White; edges.vertex_count()];
    let mut cycles = Vec::new();
    // (vertex, index of the next successor to visit)
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in roots {
        if marks.get(root) != Some(&Mark::White) {
            continue;
        }
        marks[root] = Mark::Gray;
        stack.push((root, 0));

        while let Some(frame) = stack.last_mut() {
            let (vertex, cursor) = *frame;
            let Some(&next) = edges.successors(vertex).get(cursor) else {
                marks[vertex] = Mark::Black;
                stack.pop();
                continue;
            };
            frame.1 += 1;

            match marks[next] {
                Mark::White => {
                    marks[next] = Mark::Gray;
                    stack.push((next, 0));
                },
                Mark::Gray => {
                    let start = stack
                        .iter()
                        .position(|&(on_stack, _)| on_stack == next)
                        .unwrap_or(0);
                    cycles.push(stack[start..].iter().map(|&(v, _)| v).collect());
                    if stop_at_first {
                        return cycles;
                    }
                },
                Mark::Black => {},
            }
        }
    }
    cycles
}

/// First cycle reachable from `roots`, closed by repeating its start vertex.
pub(crate) fn closed_cycle(
    edges: &EdgeSet,
    roots: impl IntoIterator<Item = usize>,
) -> Option<Vec<usize>> {
    let mut cycle = find_cycles(edges, roots, true).pop()?;
    let start = *cycle.first()?;
    cycle.push(start);
    Some(cycle)
}
