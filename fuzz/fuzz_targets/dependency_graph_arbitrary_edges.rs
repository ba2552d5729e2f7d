#![no_main]

use decisionkit::error::GraphError;
use decisionkit::graph::DependencyGraph;
use libfuzzer_sys::fuzz_target;

// Fuzz arbitrary edge sets: a successful sort must respect every edge, and a
// failed sort must report a closed path made of real edges.
fuzz_target!(|data: &[u8]| {
    let graph: DependencyGraph<String> = DependencyGraph::new();

    for pair in data.chunks_exact(2) {
        let from = format!("n{}", pair[0] % 24);
        let to = format!("n{}", pair[1] % 24);
        let result = graph.add_edge(&from, &to);
        assert_eq!(result.is_err(), from == to);
    }

    match graph.topo_sort() {
        Ok(order) => {
            assert_eq!(order.len(), graph.node_count());
            let position = |id: &str| order.iter().position(|node| node.id() == id);
            for node in &order {
                for next in graph.successors(node.id()) {
                    assert!(position(node.id()) < position(&next));
                }
            }
            assert!(graph.detect_first_cycle().is_empty());
        }
        Err(GraphError::CycleDetected { path }) => {
            assert!(path.len() >= 3);
            assert_eq!(path.first(), path.last());
            for step in path.windows(2) {
                assert!(graph.successors(&step[0]).contains(&step[1]));
            }
            assert!(!graph.detect_all_cycles().is_empty());
        }
        Err(other) => panic!("unexpected error: {other}"),
    }
});
