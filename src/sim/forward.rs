use itertools::Itertools;
use tracing::debug;

use super::{Marking, Occupancy, OccupancyWatch, Trace};
use crate::analysis::AnalysisError;
use crate::msag::Msag;
use crate::time::{Duration, Instant};

/// The outcome of the worst-case simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardRun {
    /// The activations of every node.
    pub traces: Vec<Trace>,
    /// The clock when the simulation stopped.
    pub end: Instant,
    /// Per application, the time by which each of its nodes has
    /// completed once; `None` for an application without nodes.
    pub latency: Vec<Option<Instant>>,
    /// Per application, the largest distance between two consecutive
    /// completions of any of its nodes.
    pub period: Vec<Duration>,
    /// The largest number of completions of any single node.
    pub peak_iterations: usize,
    /// Per channel, the peak buffer occupancy while not every node has
    /// completed once. `None` for channels without transfer nodes.
    pub occupancy: Vec<Option<Occupancy>>,
}

/// Execute `graph` as soon as possible until every node has completed
/// at least two activations.
///
/// Each round starts every node that has a token on each incoming
/// edge, advances the clock to the next completion, and completes all
/// nodes due at that point. Zero-delay nodes thus start and complete
/// in the same round. If no node is active after the start step, the
/// graph cannot make progress and [AnalysisError::Deadlock] reports a
/// cycle of empty edges.
pub fn simulate_forward(graph: &Msag) -> Result<ForwardRun, AnalysisError> {
    let mut marking = Marking::new(graph);
    let mut watch = OccupancyWatch::new(graph);
    let mut latency = vec![None; graph.applications()];
    let mut clock = Instant::zero();
    let mut window_open = true;

    while marking.completions().iter().any(|c| *c < 2) {
        marking.start_enabled(clock, |_, _| true);
        if window_open {
            watch.observe(&marking);
        }

        let delta = match marking.next_completion() {
            Some(delta) => delta,
            None => {
                let cycle = marking.stalled_cycle();
                debug!(?cycle, at = %clock, "simulation stalled");
                return Err(AnalysisError::Deadlock { cycle });
            }
        };
        clock += delta;
        marking.elapse(delta);
        for node in marking.complete_due(clock) {
            if marking.completions()[node] == 1 {
                latency[graph.node(node).app] = Some(clock);
            }
        }
        window_open = window_open && marking.completions().contains(&0);
    }

    let peak_iterations = marking.completions().iter().copied().max().unwrap_or(0);
    let traces = marking.into_traces();

    let mut period = vec![Duration::zero(); graph.applications()];
    for (node, trace) in traces.iter().enumerate() {
        let app = graph.node(node).app;
        if let Some(gap) = trace
            .iter()
            .tuple_windows()
            .map(|(a, b)| b.end - a.end)
            .max()
        {
            period[app] = period[app].max(gap);
        }
    }

    debug!(end = %clock, peak_iterations, ?latency, ?period, "forward simulation finished");
    Ok(ForwardRun {
        traces,
        end: clock,
        latency,
        period,
        peak_iterations,
        occupancy: watch.into_peaks(),
    })
}
