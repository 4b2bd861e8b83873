/*! The analysis pipeline.

One call to [analyze] (or [analyze_with]) turns a [Snapshot] into an
[Analysis]: it builds the MSAG, rejects graphs that cannot be
simulated, runs the worst-case and (if warranted) the best-case
simulation, and extracts the bounds. Nothing is cached between calls;
every result is a fresh, owned value.
*/

use thiserror::Error;
use tracing::debug;

use crate::bounds::{self, Bounds};
use crate::diagnostics::{DiagnosticsSink, NoDiagnostics};
use crate::msag::{self, liveness, Msag, NodeId};
use crate::sim::{self, Schedule};
use crate::snapshot::{ChannelId, Snapshot};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Error type returned when a snapshot describes a system that cannot
/// be simulated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// The listed nodes form a cycle without tokens; none of them can
    /// ever start.
    #[error("deadlock: no tokens on the cycle through nodes {cycle:?}")]
    Deadlock { cycle: Vec<NodeId> },

    /// The listed nodes take no time and can start again immediately,
    /// so the clock would never advance.
    #[error("zero-delay cycle through nodes {cycle:?}")]
    ZenoCycle { cycle: Vec<NodeId> },

    /// A channel starts with more tokens than its receive buffer holds.
    #[error("receive buffer of channel {channel} cannot hold its {initial_tokens} initial tokens")]
    ReceiveBufferBelowInitialTokens {
        channel: ChannelId,
        initial_tokens: u64,
    },
}

/// When to run the best-case simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ReversePass {
    /// Only if some node completed more than two activations in the
    /// worst-case run, i.e., if there is slack to recover.
    #[default]
    WhenSlack,
    Always,
    Never,
}

/// Parameters of the analysis itself (as opposed to the system analysed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    pub reverse_pass: ReversePass,
    /// Check the graph for zero-token and zero-delay cycles before
    /// simulating it. Without the check, a deadlock is still detected
    /// once the simulation stalls, but a zero-delay cycle makes the
    /// simulation run forever.
    pub check_liveness: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            reverse_pass: ReversePass::default(),
            check_liveness: true,
        }
    }
}

/// Whether the decision process needs to call the analysis again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Status {
    /// Further decisions may still tighten the bounds.
    Fix,
    /// The bounds can no longer change.
    Subsumed,
}

impl Status {
    fn of(snapshot: &Snapshot) -> Status {
        let settled = snapshot.fully_decided()
            || (snapshot.all_channels_local()
                && snapshot.wcets_decided()
                && snapshot.actor_order().is_decided());
        if settled {
            Status::Subsumed
        } else {
            Status::Fix
        }
    }
}

/// The result of analysing one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub graph: Msag,
    pub schedule: Schedule,
    pub bounds: Bounds,
    pub status: Status,
}

/// Analyse `snapshot` with the default configuration.
pub fn analyze(snapshot: &Snapshot) -> Result<Analysis, AnalysisError> {
    analyze_with(snapshot, &Config::default(), &mut NoDiagnostics)
}

/// Analyse `snapshot`, reporting intermediate results to `sink`.
pub fn analyze_with<S>(
    snapshot: &Snapshot,
    config: &Config,
    sink: &mut S,
) -> Result<Analysis, AnalysisError>
where
    S: DiagnosticsSink + ?Sized,
{
    if let Some((channel, ch)) = snapshot
        .channels()
        .iter()
        .enumerate()
        .find(|(_, ch)| ch.is_interconnect() && ch.receive_buffer.max() < ch.initial_tokens)
    {
        return Err(AnalysisError::ReceiveBufferBelowInitialTokens {
            channel,
            initial_tokens: ch.initial_tokens,
        });
    }

    let graph = msag::build_with(snapshot, &mut *sink);
    if config.check_liveness {
        liveness::check(&graph)?;
    }

    let forward = sim::simulate_forward(&graph)?;
    let run_reverse = match config.reverse_pass {
        ReversePass::WhenSlack => forward.peak_iterations > 2,
        ReversePass::Always => true,
        ReversePass::Never => false,
    };
    let reverse = if run_reverse {
        Some(sim::simulate_reverse(&graph, &forward))
    } else {
        None
    };

    let bounds = bounds::extract(snapshot, &graph, &forward, reverse.as_ref());
    let schedule = Schedule {
        max: forward.traces,
        min: reverse.map(|r| r.traces),
    };
    let status = Status::of(snapshot);
    debug!(
        latency = ?bounds.applications.iter().map(|a| a.latency_bound).collect::<Vec<_>>(),
        period = ?bounds.applications.iter().map(|a| a.period_bound).collect::<Vec<_>>(),
        reverse = run_reverse,
        ?status,
        "analysis finished"
    );
    sink.schedule_derived(snapshot, &graph, &schedule, &bounds);

    Ok(Analysis {
        graph,
        schedule,
        bounds,
        status,
    })
}
