/*! Self-timed execution of an MSAG.

Both simulators share the same token game: a node starts as soon as
every incoming edge holds a token, consuming one token per edge, and
produces one token on every outgoing edge when its delay has elapsed.
The [forward] simulator plays this game on the graph itself, starting
at time zero, and thereby yields the worst-case ("max") schedule. The
[reverse] simulator plays it on the transposed graph, counting down
from the end of the forward run, which postpones every activity as
far as possible and yields the best-case ("min") schedule.
*/

use tracing::trace;

use crate::msag::liveness::find_cycle;
use crate::msag::{EdgeId, Msag, NodeId};
use crate::snapshot::ChannelId;
use crate::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod forward;
pub mod reverse;

pub use forward::{simulate_forward, ForwardRun};
pub use reverse::{simulate_reverse, ReverseRun};

/// One firing of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Activation {
    pub start: Instant,
    pub end: Instant,
}

impl Activation {
    /// Did the activation run entirely before `horizon`?
    /// Activations that end exactly at the horizon count, those that
    /// start there do not.
    pub fn completes_by(&self, horizon: Instant) -> bool {
        self.end <= horizon && self.start < horizon
    }
}

/// The activations of one node, in ascending order of time.
pub type Trace = Vec<Activation>;

/// The traces of every node under the worst-case (`max`) and, if the
/// reverse pass ran, the best-case (`min`) schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Schedule {
    pub max: Vec<Trace>,
    pub min: Option<Vec<Trace>>,
}

/// The largest number of tokens held in the buffers of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Occupancy {
    pub send_buffer: u64,
    pub receive_buffer: u64,
}

/// The state of the token game.
#[derive(Debug, Clone)]
pub(crate) struct Marking<'g> {
    graph: &'g Msag,
    tokens: Vec<u64>,
    remaining: Vec<Option<Duration>>,
    started: Vec<Instant>,
    completions: Vec<usize>,
    traces: Vec<Trace>,
}

impl<'g> Marking<'g> {
    /// The initial marking: every edge holds the upper end of its token range.
    pub(crate) fn new(graph: &'g Msag) -> Self {
        let n = graph.len();
        Marking {
            graph,
            tokens: graph.edges().iter().map(|e| e.tokens.max()).collect(),
            remaining: vec![None; n],
            started: vec![Instant::zero(); n],
            completions: vec![0; n],
            traces: vec![Vec::new(); n],
        }
    }

    pub(crate) fn tokens(&self, edge: EdgeId) -> u64 {
        self.tokens[edge]
    }

    pub(crate) fn is_active(&self, node: NodeId) -> bool {
        self.remaining[node].is_some()
    }

    /// The number of completed activations of every node.
    pub(crate) fn completions(&self) -> &[usize] {
        &self.completions
    }

    fn is_enabled(&self, node: NodeId) -> bool {
        !self.is_active(node) && self.graph.incoming(node).iter().all(|e| self.tokens[*e] > 0)
    }

    /// Start every idle node that has a token on each incoming edge
    /// and is admitted by `admit`, which sees the node and its number
    /// of completed activations. Returns the nodes started.
    pub(crate) fn start_enabled<F>(&mut self, now: Instant, admit: F) -> Vec<NodeId>
    where
        F: Fn(NodeId, usize) -> bool,
    {
        let mut started = Vec::new();
        for node in 0..self.graph.len() {
            if !self.is_enabled(node) || !admit(node, self.completions[node]) {
                continue;
            }
            for e in self.graph.incoming(node) {
                self.tokens[*e] -= 1;
            }
            self.remaining[node] = Some(self.graph.node(node).delay);
            self.started[node] = now;
            trace!(node, at = %now, "start");
            started.push(node);
        }
        started
    }

    /// The time until the next active node completes.
    pub(crate) fn next_completion(&self) -> Option<Duration> {
        self.remaining.iter().flatten().min().copied()
    }

    /// Let `delta` pass for every active node.
    pub(crate) fn elapse(&mut self, delta: Duration) {
        for r in self.remaining.iter_mut().flatten() {
            *r = r.saturating_sub(delta);
        }
    }

    /// Complete every active node whose delay has fully elapsed.
    /// Returns the nodes completed.
    pub(crate) fn complete_due(&mut self, now: Instant) -> Vec<NodeId> {
        let mut done = Vec::new();
        for node in 0..self.graph.len() {
            if self.remaining[node] != Some(Duration::zero()) {
                continue;
            }
            self.remaining[node] = None;
            for e in self.graph.outgoing(node) {
                self.tokens[*e] += 1;
            }
            self.completions[node] += 1;
            self.traces[node].push(Activation {
                start: self.started[node],
                end: now,
            });
            trace!(node, at = %now, "complete");
            done.push(node);
        }
        done
    }

    /// A cycle of currently empty edges. Some such cycle exists
    /// whenever every node is idle and none can start.
    pub(crate) fn stalled_cycle(&self) -> Vec<NodeId> {
        find_cycle(self.graph, |e| self.tokens[e] == 0).unwrap_or_default()
    }

    pub(crate) fn into_traces(self) -> Vec<Trace> {
        self.traces
    }
}

/// Tracks the peak buffer occupancy of every interconnect channel.
///
/// The occupancy of a buffer is the number of free slots the buffer
/// edge held initially minus the number it holds now.
#[derive(Debug, Clone)]
pub(crate) struct OccupancyWatch {
    buffers: Vec<Option<(EdgeId, EdgeId)>>,
    initial: Vec<u64>,
    peak: Vec<Option<Occupancy>>,
}

impl OccupancyWatch {
    /// Watch the buffer edges of `graph`. Markings of the transposed
    /// graph can be observed as well, since it has the same edge ids.
    pub(crate) fn new(graph: &Msag) -> Self {
        let buffers: Vec<_> = (0..graph.transfers().len())
            .map(|ch: ChannelId| Some((graph.send_buffer_edge(ch)?, graph.receive_buffer_edge(ch)?)))
            .collect();
        let peak = buffers
            .iter()
            .map(|b| b.map(|_| Occupancy::default()))
            .collect();
        OccupancyWatch {
            buffers,
            initial: graph.edges().iter().map(|e| e.tokens.max()).collect(),
            peak,
        }
    }

    pub(crate) fn observe(&mut self, marking: &Marking<'_>) {
        for (buffers, peak) in self.buffers.iter().zip(self.peak.iter_mut()) {
            if let (Some((send, receive)), Some(peak)) = (buffers, peak) {
                let used = |e: EdgeId| self.initial[e].saturating_sub(marking.tokens(e));
                peak.send_buffer = peak.send_buffer.max(used(*send));
                peak.receive_buffer = peak.receive_buffer.max(used(*receive));
            }
        }
    }

    pub(crate) fn into_peaks(self) -> Vec<Option<Occupancy>> {
        self.peak
    }
}
