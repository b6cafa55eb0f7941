// src/dag/cycle.rs

//! Cycle detection over dependent edges.
//!
//! Three-colour depth-first search: a node is unvisited, in progress (on the
//! current DFS path) or resolved. Reaching an in-progress node again closes a
//! cycle. The search starts at the root's dependents and then sweeps any node
//! the root could not reach, so loops that hang off no free job are caught
//! too. Dependent sets are ordered, so the reported cycle is stable.

use crate::dag::graph::{Graph, NodeIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Resolved,
}

/// Return the first cycle found, as the node path that starts and ends at
/// the revisited node (`[x, y, x]`), or `None` for an acyclic graph.
pub fn find_cycle(graph: &Graph) -> Option<Vec<NodeIndex>> {
    let mut marks = vec![Mark::Unvisited; graph.len()];
    let mut path = Vec::new();

    let starts = graph
        .root()
        .dependents
        .iter()
        .copied()
        .chain(graph.nodes().map(|(idx, _)| idx));

    for start in starts {
        if marks[start.0] != Mark::Unvisited {
            continue;
        }
        if let Some(cycle) = visit(graph, start, &mut marks, &mut path) {
            return Some(cycle);
        }
    }

    None
}

fn visit(
    graph: &Graph,
    idx: NodeIndex,
    marks: &mut [Mark],
    path: &mut Vec<NodeIndex>,
) -> Option<Vec<NodeIndex>> {
    marks[idx.0] = Mark::InProgress;
    path.push(idx);

    for &dependent in graph.node(idx).dependents.iter() {
        match marks[dependent.0] {
            Mark::Resolved => continue,
            Mark::InProgress => {
                let start = path.iter().rposition(|n| *n == dependent)?;
                let mut cycle = path[start..].to_vec();
                cycle.push(dependent);
                return Some(cycle);
            }
            Mark::Unvisited => {
                if let Some(cycle) = visit(graph, dependent, marks, path) {
                    return Some(cycle);
                }
            }
        }
    }

    path.pop();
    marks[idx.0] = Mark::Resolved;
    None
}
