/*! Bounds derived from the simulated schedules.

The worst-case schedule yields the latency and period of every
application and the largest number of activations (and buffer
occupancy) that can occur before an application has completed its
first iteration. The best-case schedule, if it was computed, yields
the smallest such numbers.

How much the caller may rely on a latency or period depends on how
much of the snapshot is decided:

- once all timing inputs are decided, the values are exact;
- otherwise, as long as some channel is known to cross the
  interconnect, they are lower bounds on every completion of the
  remaining decisions;
- if every channel is local but something else is still open, the
  partial graph says nothing reliable and the bound is unknown.
*/

use crate::domain::Bound;
use crate::msag::Msag;
use crate::sim::{ForwardRun, ReverseRun, Trace};
use crate::snapshot::Snapshot;
use crate::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The range of the number of activations of a node (or a channel's
/// send node) within its application's latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IterationBounds {
    pub min: usize,
    pub max: usize,
}

/// The range of the peak number of tokens held in a buffer before
/// the application completes its first iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BufferBounds {
    pub min: u64,
    pub max: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ApplicationBounds {
    /// Raw latency from the worst-case schedule.
    pub latency: Option<Instant>,
    /// Raw period from the worst-case schedule.
    pub period: Duration,
    pub latency_bound: Bound<Instant>,
    pub period_bound: Bound<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelBounds {
    /// Activations of the channel's send node.
    pub iterations: IterationBounds,
    pub send_buffer: BufferBounds,
    pub receive_buffer: BufferBounds,
}

/// Everything the analysis reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bounds {
    pub applications: Vec<ApplicationBounds>,
    /// Per MSAG node.
    pub nodes: Vec<IterationBounds>,
    /// Per channel; `None` for channels without transfer nodes.
    pub channels: Vec<Option<ChannelBounds>>,
}

/// Classify a raw value according to how much of `snapshot` is decided.
pub fn classify<T: Copy + Ord>(snapshot: &Snapshot, value: Option<T>) -> Bound<T> {
    match value {
        None => Bound::Unknown,
        Some(v) if snapshot.timing_decided() => Bound::Exactly(v),
        Some(v) if !snapshot.all_channels_local() => Bound::AtLeast(v),
        Some(_) => Bound::Unknown,
    }
}

fn count_within(trace: &Trace, horizon: Option<Instant>) -> usize {
    horizon.map_or(0, |h| trace.iter().filter(|a| a.completes_by(h)).count())
}

/// Derive all bounds from the forward run and, if available, the
/// reverse run on `graph`.
pub fn extract(
    snapshot: &Snapshot,
    graph: &Msag,
    forward: &ForwardRun,
    reverse: Option<&ReverseRun>,
) -> Bounds {
    let applications: Vec<ApplicationBounds> = forward
        .latency
        .iter()
        .zip(forward.period.iter())
        .map(|(latency, period)| ApplicationBounds {
            latency: *latency,
            period: *period,
            latency_bound: classify(snapshot, *latency),
            period_bound: classify(snapshot, latency.map(|_| *period)),
        })
        .collect();

    let nodes: Vec<IterationBounds> = (0..graph.len())
        .map(|node| {
            let horizon = applications[graph.node(node).app].latency;
            IterationBounds {
                min: reverse.map_or(0, |r| count_within(&r.traces[node], horizon)),
                max: count_within(&forward.traces[node], horizon),
            }
        })
        .collect();

    let channels = (0..snapshot.channels().len())
        .map(|ch| {
            let t = graph.transfer(ch)?;
            let max = forward.occupancy[ch]?;
            let min = reverse
                .and_then(|r| r.occupancy[ch])
                .unwrap_or_default();
            Some(ChannelBounds {
                iterations: nodes[t.send],
                send_buffer: BufferBounds {
                    min: min.send_buffer,
                    max: max.send_buffer,
                },
                receive_buffer: BufferBounds {
                    min: min.receive_buffer,
                    max: max.receive_buffer,
                },
            })
        })
        .collect();

    Bounds {
        applications,
        nodes,
        channels,
    }
}
