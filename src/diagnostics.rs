/*! Observing the analysis.

The analysis reports its intermediate results to a [DiagnosticsSink].
The default sink, [NoDiagnostics], ignores them; [Recorder] keeps
text renderings of the graph ([dot]) and of the derived schedules
([schedule_text]) for later inspection. */

use auto_impl::auto_impl;
use itertools::Itertools;

use crate::bounds::Bounds;
use crate::msag::{Msag, Node, NodeKind};
use crate::sim::{Schedule, Trace};
use crate::snapshot::Snapshot;

/// Receiver of intermediate analysis results. Every hook does nothing
/// by default.
#[auto_impl(&mut, Box)]
pub trait DiagnosticsSink {
    /// Called once the MSAG has been constructed.
    fn graph_built(&mut self, _graph: &Msag) {}

    /// Called once the schedules have been simulated and the bounds
    /// extracted from them.
    fn schedule_derived(
        &mut self,
        _snapshot: &Snapshot,
        _graph: &Msag,
        _schedule: &Schedule,
        _bounds: &Bounds,
    ) {
    }
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDiagnostics;

impl DiagnosticsSink for NoDiagnostics {}

/// A sink that keeps the renderings of the last graph and schedule seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recorder {
    pub dot: Option<String>,
    pub schedule: Option<String>,
}

impl DiagnosticsSink for Recorder {
    fn graph_built(&mut self, graph: &Msag) {
        self.dot = Some(dot(graph));
    }

    fn schedule_derived(
        &mut self,
        snapshot: &Snapshot,
        graph: &Msag,
        schedule: &Schedule,
        bounds: &Bounds,
    ) {
        self.schedule = Some(schedule_text(snapshot, graph, schedule, bounds));
    }
}

fn edge_label(src: &Node, dst: &Node, tokens: u64) -> Option<String> {
    match (src.kind, dst.kind) {
        (NodeKind::Block(c), NodeKind::Actor(_)) => Some(format!("send_buff (ch{})", c)),
        (NodeKind::Receive(c), NodeKind::Send(s)) if c == s => Some(format!("rec_buff (ch{})", c)),
        _ if tokens > 0 => Some(format!("init({})", tokens)),
        _ => None,
    }
}

/// Render `graph` in Graphviz DOT syntax. Nodes are labelled with
/// their delay; buffer edges and edges carrying initial tokens are
/// labelled as well. Receive nodes are ranked with their destination.
pub fn dot(graph: &Msag) -> String {
    let nodes = graph
        .nodes()
        .iter()
        .map(|n| format!("  {} [label=\"{}\\n{}\"];", n.kind, n.kind, n.delay));

    let edges = graph.edges().iter().map(|e| {
        let (src, dst) = (graph.node(e.src), graph.node(e.dst));
        match edge_label(src, dst, e.tokens.max()) {
            Some(label) => format!("  {} -> {} [label=\"{}\"];", src.kind, dst.kind, label),
            None => format!("  {} -> {};", src.kind, dst.kind),
        }
    });

    let ranks = (0..graph.actors()).filter_map(|actor| {
        let receives = graph
            .transfers()
            .iter()
            .flatten()
            .filter(|t| t.destination == actor)
            .map(|t| graph.node(t.receive).kind)
            .collect_vec();
        if receives.is_empty() {
            None
        } else {
            Some(format!(
                "  {{ rank=same; {}; {}; }}",
                graph.node(actor).kind,
                receives.iter().join("; ")
            ))
        }
    });

    format!(
        "digraph msag {{\n{}\n}}\n",
        nodes.chain(edges).chain(ranks).join("\n")
    )
}

fn intervals(trace: &Trace) -> String {
    trace
        .iter()
        .map(|a| format!("[{}, {})", a.start, a.end))
        .join(" ")
}

/// Render the schedules node by node, followed by the latency and
/// period of every application.
///
/// Each node is listed with the processor it runs on (`-` if that is
/// not decided yet); transfer nodes are listed with the processor of
/// the channel's source.
pub fn schedule_text(
    snapshot: &Snapshot,
    graph: &Msag,
    schedule: &Schedule,
    bounds: &Bounds,
) -> String {
    let assignment = snapshot.processor_assignment();
    let processor = |node: &Node| {
        let actor = match node.kind {
            NodeKind::Actor(a) => a,
            NodeKind::Block(c) | NodeKind::Send(c) | NodeKind::Receive(c) => {
                snapshot.channels()[c].source
            }
        };
        assignment[actor].map_or_else(|| "-".to_string(), |p| format!("p{}", p))
    };

    let mut lines = Vec::new();
    for (id, node) in graph.nodes().iter().enumerate() {
        lines.push(format!(
            "{:<12} {:<4} max: {}",
            node.kind.to_string(),
            processor(node),
            intervals(&schedule.max[id])
        ));
        if let Some(min) = &schedule.min {
            lines.push(format!("{:<17} min: {}", "", intervals(&min[id])));
        }
    }
    for (app, b) in bounds.applications.iter().enumerate() {
        lines.push(format!(
            "application {}: latency {}, period {}",
            app, b.latency_bound, b.period_bound
        ));
    }
    lines.join("\n")
}
