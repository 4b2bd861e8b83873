use tracing::debug;

use super::{Activation, ForwardRun, Marking, Occupancy, OccupancyWatch, Trace};
use crate::msag::{Msag, NodeId};
use crate::time::{Duration, Instant};

/// The outcome of the best-case simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReverseRun {
    /// The activations of every node, in ascending order of time and
    /// never more than the node completed in the forward run.
    pub traces: Vec<Trace>,
    /// Per channel, the peak buffer occupancy while not every node has
    /// completed once in reverse.
    pub occupancy: Vec<Option<Occupancy>>,
}

/// Execute `graph` backwards in time, as late as possible, starting
/// from the end of `forward`.
///
/// The token game is played on the transposed graph while the clock
/// counts down to zero. A node is not restarted once it has completed
/// as often as it did in the forward run. After its first activation,
/// a node is further held back until the clock has moved down by one
/// period (of its application) from that activation's start; a node
/// that would have to wait past time zero is not restarted at all.
/// Activities that would end before time zero end at time zero.
pub fn simulate_reverse(graph: &Msag, forward: &ForwardRun) -> ReverseRun {
    let transposed = graph.transposed();
    let mut marking = Marking::new(&transposed);
    let mut watch = OccupancyWatch::new(graph);
    let quota: Vec<usize> = forward.traces.iter().map(Vec::len).collect();
    let period = |node: NodeId| forward.period[graph.node(node).app];
    // the earliest (i.e., highest) clock value at which a node may start again
    let release = |first: Option<Instant>, node: NodeId| first?.checked_sub(period(node));

    let mut first_start: Vec<Option<Instant>> = vec![None; graph.len()];
    let mut clock = forward.end;
    let mut window_open = true;

    loop {
        let started = marking.start_enabled(clock, |node, done| {
            done < quota[node]
                && (done == 0 || release(first_start[node], node).map_or(false, |at| clock <= at))
        });
        for node in started {
            if first_start[node].is_none() {
                first_start[node] = Some(clock);
            }
        }
        if window_open {
            watch.observe(&marking);
        }

        let hold_back = (0..graph.len())
            .filter(|node| {
                let done = marking.completions()[*node];
                !marking.is_active(*node) && done >= 1 && done < quota[*node]
            })
            .filter_map(|node| release(first_start[node], node))
            .filter(|at| clock > *at)
            .map(|at| clock - at)
            .min();
        let delta: Option<Duration> = marking.next_completion().into_iter().chain(hold_back).min();
        let Some(delta) = delta else { break };

        clock = clock.saturating_sub(delta);
        marking.elapse(delta);
        marking.complete_due(clock);
        window_open = window_open && marking.completions().contains(&0);
        if clock == Instant::zero() {
            break;
        }
    }

    let traces: Vec<Trace> = marking
        .into_traces()
        .into_iter()
        .zip(quota.iter())
        .map(|(mut trace, quota)| {
            trace.truncate(*quota);
            trace
                .into_iter()
                .rev()
                .map(|a| Activation {
                    start: a.end,
                    end: a.start,
                })
                .collect()
        })
        .collect();

    debug!(stopped_at = %clock, "reverse simulation finished");
    ReverseRun {
        traces,
        occupancy: watch.into_peaks(),
    }
}
