//! Structural checks that rule out graphs the simulators cannot finish.

use tracing::debug;

use super::{EdgeId, Msag, NodeId};
use crate::analysis::AnalysisError;

/// Reject graphs that can never complete two iterations of every node.
///
/// - A cycle whose edges carry no tokens never fires: [AnalysisError::Deadlock].
/// - A set of zero-delay nodes whose every predecessor is itself such
///   a node (a cycle of them, or one without any predecessor) can fire
///   again and again without letting time pass: [AnalysisError::ZenoCycle].
pub fn check(graph: &Msag) -> Result<(), AnalysisError> {
    if let Some(cycle) = find_cycle(graph, |e| graph.edges()[e].tokens.max() == 0) {
        debug!(?cycle, "zero-token cycle");
        return Err(AnalysisError::Deadlock { cycle });
    }

    // A node is grounded if it takes time itself or waits for some
    // node that is grounded.
    let mut grounded = vec![false; graph.len()];
    let mut pending: Vec<NodeId> = (0..graph.len())
        .filter(|n| !graph.node(*n).delay.is_zero())
        .collect();
    for n in &pending {
        grounded[*n] = true;
    }
    while let Some(n) = pending.pop() {
        for e in graph.outgoing(n) {
            let succ = graph.edges()[*e].dst;
            if !grounded[succ] {
                grounded[succ] = true;
                pending.push(succ);
            }
        }
    }

    if let Some(root) = (0..graph.len()).find(|n| !grounded[*n] && graph.incoming(*n).is_empty()) {
        debug!(node = root, "unconstrained zero-delay node");
        return Err(AnalysisError::ZenoCycle { cycle: vec![root] });
    }
    let ungrounded = |e: EdgeId| {
        let edge = &graph.edges()[e];
        !grounded[edge.src] && !grounded[edge.dst]
    };
    if let Some(cycle) = find_cycle(graph, ungrounded) {
        debug!(?cycle, "zero-delay cycle");
        return Err(AnalysisError::ZenoCycle { cycle });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Open,
    Done,
}

/// Find some directed cycle that uses only edges accepted by `keep`.
/// The cycle is returned as the sequence of nodes along it.
pub(crate) fn find_cycle<F>(graph: &Msag, keep: F) -> Option<Vec<NodeId>>
where
    F: Fn(EdgeId) -> bool,
{
    let mut visit = vec![Visit::New; graph.len()];
    for root in 0..graph.len() {
        if visit[root] != Visit::New {
            continue;
        }
        visit[root] = Visit::Open;
        // depth-first search; each frame remembers the next outgoing edge to try
        let mut stack = vec![(root, 0usize)];
        while let Some((node, next_edge)) = stack.last_mut() {
            let node = *node;
            match graph.outgoing(node).get(*next_edge) {
                Some(&e) => {
                    *next_edge += 1;
                    if !keep(e) {
                        continue;
                    }
                    let succ = graph.edges()[e].dst;
                    match visit[succ] {
                        Visit::New => {
                            visit[succ] = Visit::Open;
                            stack.push((succ, 0));
                        }
                        Visit::Open => {
                            let from = stack
                                .iter()
                                .position(|(n, _)| *n == succ)
                                .expect("open node not on the search stack");
                            return Some(stack[from..].iter().map(|(n, _)| *n).collect());
                        }
                        Visit::Done => {}
                    }
                }
                None => {
                    visit[node] = Visit::Done;
                    stack.pop();
                }
            }
        }
    }
    None
}
