/*! The parameters of one analysis call.

A [Snapshot] captures the current state of every decision variable
that influences the timing of the mapped application: execution and
transfer times, buffer capacities, and the (possibly partial)
execution orders on processors and on the interconnect. It is
validated once, when it is constructed; afterwards, the graph
construction may rely on every index being in range.

## Order encoding

Each execution order is given as a *successor array* over `n`
elements (actors or channels) followed by one *head slot* per
processor. For an element `e < n`, entry `e` names the element that
follows `e` on the same resource, or a value `v >= n` to signal that
`e` is the last element on its processor. The head slot `n + p`
names the first element on processor `p`. A terminator `v > n` leads
back to the head slot `n + (v - n - 1) mod P`; the terminator `v == n`
leads back to the last head slot `n + P - 1`. Together, the order
therefore forms one cycle through all elements and head slots, and
following a terminator to its head slot closes the per-processor
execution cycle.
*/

use itertools::Itertools;
use thiserror::Error;

use crate::domain::Interval;
use crate::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Index of an actor.
pub type ActorId = usize;

/// Index of a channel.
pub type ChannelId = usize;

/// Index of an application (a contiguous range of actors).
pub type AppId = usize;

/// Error type returned when the parameters handed to
/// [Snapshot::new] are inconsistent with each other.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The actor order must provide at least one head slot.
    #[error("actor order has {entries} entries for {actors} actors; at least one processor is required")]
    NoProcessors { actors: usize, entries: usize },

    /// A channel order does not match the number of channels and processors.
    #[error("{order} order has {found} entries, expected {expected}")]
    ChaseLengthMismatch {
        order: OrderKind,
        expected: usize,
        found: usize,
    },

    /// A channel refers to an actor that does not exist.
    #[error("channel {channel} refers to actor {actor}, but there are only {actors} actors")]
    EndpointOutOfRange {
        channel: ChannelId,
        actor: ActorId,
        actors: usize,
    },

    /// A successor domain contains values beyond the order's range.
    #[error("{order} order entry {index} may take value {value}, beyond the {len} entries of the order")]
    PointerOutOfRange {
        order: OrderKind,
        index: usize,
        value: usize,
        len: usize,
    },

    /// There must be at least one application.
    #[error("no application boundaries given")]
    NoApplications,

    /// Application boundaries must be non-decreasing.
    #[error("application {app} ends at actor {last}, before the previous application")]
    NonMonotonicApplications { app: AppId, last: ActorId },

    /// The last application must end with the last actor.
    #[error("applications end at actor {last:?}, but the last actor is {expected:?}")]
    ApplicationsDoNotCoverActors {
        last: Option<ActorId>,
        expected: Option<ActorId>,
    },
}

/// The three successor arrays of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OrderKind {
    #[display(fmt = "actor")]
    Actor,
    #[display(fmt = "send")]
    Send,
    #[display(fmt = "receive")]
    Receive,
}

/// A schedulable unit of computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Actor {
    /// The worst-case execution time of one firing.
    pub wcet: Interval<Duration>,
}

impl Actor {
    pub fn new(wcet: impl Into<Interval<Duration>>) -> Self {
        Actor { wcet: wcet.into() }
    }
}

/// A directed, buffered communication link between two actors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Channel {
    pub source: ActorId,
    pub destination: ActorId,
    /// Tokens present on the channel before the first firing.
    pub initial_tokens: u64,
    /// Time to transmit one token over the interconnect; zero iff
    /// both endpoints share a processor.
    pub send_time: Interval<Duration>,
    /// Time from the source's completion until the transfer can
    /// begin (e.g., waiting for the interconnect).
    pub send_latency: Interval<Duration>,
    /// Time to move one token from the receive buffer to the destination.
    pub receive_time: Interval<Duration>,
    /// Capacity of the source-side buffer, in tokens.
    pub send_buffer: Interval<u64>,
    /// Capacity of the destination-side buffer, in tokens.
    pub receive_buffer: Interval<u64>,
}

impl Channel {
    /// A channel between two actors mapped to the same processor.
    pub fn local(source: ActorId, destination: ActorId, initial_tokens: u64) -> Self {
        Channel {
            source,
            destination,
            initial_tokens,
            send_time: Interval::decided(Duration::zero()),
            send_latency: Interval::decided(Duration::zero()),
            receive_time: Interval::decided(Duration::zero()),
            send_buffer: Interval::decided(1),
            receive_buffer: Interval::decided(initial_tokens.max(1)),
        }
    }

    /// Does the transfer certainly cross the interconnect?
    pub fn is_interconnect(&self) -> bool {
        !self.send_time.min().is_zero()
    }

    /// Does the transfer certainly stay on one processor?
    pub fn is_local(&self) -> bool {
        self.send_time.max().is_zero()
    }
}

/// Where following one entry of an order leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The successor is not decided yet.
    Undecided,
    /// The successor is the given element.
    Next(usize),
    /// The element is the last on its processor; the chain continues
    /// at the given head slot (an index `>= len`).
    Wrap(usize),
}

/// A successor array over `len` elements followed by one head slot
/// per processor (see the module documentation).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Order {
    successors: Vec<Interval<usize>>,
    len: usize,
}

impl Order {
    fn new(
        kind: OrderKind,
        successors: Vec<Interval<usize>>,
        len: usize,
    ) -> Result<Order, ConfigError> {
        if let Some((index, value)) = successors
            .iter()
            .enumerate()
            .find(|(_, dom)| dom.max() >= successors.len())
            .map(|(i, dom)| (i, dom.max()))
        {
            return Err(ConfigError::PointerOutOfRange {
                order: kind,
                index,
                value,
                len: successors.len(),
            });
        }
        Ok(Order { successors, len })
    }

    /// The number of ordered elements (excluding head slots).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The number of processors, i.e., of head slots.
    pub fn processors(&self) -> usize {
        self.successors.len() - self.len
    }

    /// The head slot of processor `p`.
    pub fn head_slot(&self, p: usize) -> usize {
        self.len + p
    }

    /// The raw successor domain of entry `index`.
    pub fn successor(&self, index: usize) -> Interval<usize> {
        self.successors[index]
    }

    pub fn is_decided(&self) -> bool {
        self.successors.iter().all(Interval::is_decided)
    }

    /// The head slot reached by following the terminator `value`.
    pub fn closing_slot(&self, value: usize) -> usize {
        debug_assert!(value >= self.len);
        if value > self.len {
            self.len + (value - self.len - 1) % self.processors()
        } else {
            self.len + self.processors() - 1
        }
    }

    /// Follow the successor pointer of entry `index`.
    pub fn step(&self, index: usize) -> Step {
        match self.successors[index].value() {
            None => Step::Undecided,
            Some(v) if v < self.len => Step::Next(v),
            Some(v) => Step::Wrap(self.closing_slot(v)),
        }
    }

    /// The element at the head of the chain that starts in head slot
    /// `slot`: `Next(first)` if decided and the processor is not
    /// empty, `Undecided` otherwise.
    pub fn first_after(&self, slot: usize) -> Step {
        match self.successors[slot].value() {
            Some(v) if v < self.len => Step::Next(v),
            _ => Step::Undecided,
        }
    }
}

/// A complete, validated parameter snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Snapshot {
    actors: Vec<Actor>,
    channels: Vec<Channel>,
    actor_order: Order,
    send_order: Order,
    receive_order: Order,
    applications: Vec<ActorId>,
}

impl Snapshot {
    /// Validate and bundle the parameters of one analysis call.
    ///
    /// - `next_actor` has one entry per actor plus one head slot per
    ///   processor; its length determines the number of processors.
    /// - `next_send` and `next_receive` have one entry per channel
    ///   plus one head slot per processor.
    /// - `applications[i]` is the index of the last actor of
    ///   application `i`.
    pub fn new(
        actors: Vec<Actor>,
        channels: Vec<Channel>,
        next_actor: Vec<Interval<usize>>,
        next_send: Vec<Interval<usize>>,
        next_receive: Vec<Interval<usize>>,
        applications: Vec<ActorId>,
    ) -> Result<Snapshot, ConfigError> {
        let n_actors = actors.len();
        let n_channels = channels.len();
        if next_actor.len() <= n_actors {
            return Err(ConfigError::NoProcessors {
                actors: n_actors,
                entries: next_actor.len(),
            });
        }
        let procs = next_actor.len() - n_actors;
        for (kind, order) in [(OrderKind::Send, &next_send), (OrderKind::Receive, &next_receive)] {
            if order.len() != n_channels + procs {
                return Err(ConfigError::ChaseLengthMismatch {
                    order: kind,
                    expected: n_channels + procs,
                    found: order.len(),
                });
            }
        }
        for (id, ch) in channels.iter().enumerate() {
            if let Some(actor) = [ch.source, ch.destination]
                .into_iter()
                .find(|a| *a >= n_actors)
            {
                return Err(ConfigError::EndpointOutOfRange {
                    channel: id,
                    actor,
                    actors: n_actors,
                });
            }
        }
        if applications.is_empty() {
            return Err(ConfigError::NoApplications);
        }
        if let Some((app, (_, last))) = applications
            .iter()
            .tuple_windows()
            .enumerate()
            .find(|(_, (prev, last))| last < prev)
        {
            return Err(ConfigError::NonMonotonicApplications {
                app: app + 1,
                last: *last,
            });
        }
        let expected = n_actors.checked_sub(1);
        let last = applications.last().copied();
        if last != expected {
            return Err(ConfigError::ApplicationsDoNotCoverActors { last, expected });
        }

        Ok(Snapshot {
            actor_order: Order::new(OrderKind::Actor, next_actor, n_actors)?,
            send_order: Order::new(OrderKind::Send, next_send, n_channels)?,
            receive_order: Order::new(OrderKind::Receive, next_receive, n_channels)?,
            actors,
            channels,
            applications,
        })
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn actor_order(&self) -> &Order {
        &self.actor_order
    }

    pub fn send_order(&self) -> &Order {
        &self.send_order
    }

    pub fn receive_order(&self) -> &Order {
        &self.receive_order
    }

    /// The index of the last actor of each application.
    pub fn applications(&self) -> &[ActorId] {
        &self.applications
    }

    pub fn processors(&self) -> usize {
        self.actor_order.processors()
    }

    /// The application that actor `actor` belongs to.
    pub fn application_of(&self, actor: ActorId) -> AppId {
        let app = self.applications.partition_point(|last| *last < actor);
        assert!(app < self.applications.len(), "actor {} out of range", actor);
        app
    }

    /// The range of actor indices belonging to application `app`.
    pub fn actors_of(&self, app: AppId) -> std::ops::RangeInclusive<ActorId> {
        let first = if app == 0 {
            0
        } else {
            self.applications[app - 1] + 1
        };
        first..=self.applications[app]
    }

    pub fn wcets_decided(&self) -> bool {
        self.actors.iter().all(|a| a.wcet.is_decided())
    }

    pub fn send_times_decided(&self) -> bool {
        self.channels.iter().all(|c| c.send_time.is_decided())
    }

    pub fn send_latencies_decided(&self) -> bool {
        self.channels.iter().all(|c| c.send_latency.is_decided())
    }

    pub fn receive_times_decided(&self) -> bool {
        self.channels.iter().all(|c| c.receive_time.is_decided())
    }

    pub fn buffers_decided(&self) -> bool {
        self.channels
            .iter()
            .all(|c| c.send_buffer.is_decided() && c.receive_buffer.is_decided())
    }

    /// Is every channel known to stay on its processor?
    pub fn all_channels_local(&self) -> bool {
        self.channels
            .iter()
            .all(|c| c.send_time.is_decided() && c.send_time.min().is_zero())
    }

    /// Are all inputs that shape the worst-case schedule decided?
    /// Once they are, the computed latency and period are exact.
    pub fn timing_decided(&self) -> bool {
        self.actor_order.is_decided()
            && self.wcets_decided()
            && self.send_times_decided()
            && self.send_latencies_decided()
            && self.send_order.is_decided()
            && self.receive_times_decided()
    }

    /// Is every single input decided?
    pub fn fully_decided(&self) -> bool {
        self.timing_decided() && self.receive_order.is_decided() && self.buffers_decided()
    }

    /// Determine the processor of every actor by walking the decided
    /// part of each processor's actor chain. Actors on a chain that is
    /// still undecided are reported as `None`.
    pub fn processor_assignment(&self) -> Vec<Option<usize>> {
        let order = &self.actor_order;
        let mut assignment = vec![None; self.actors.len()];
        for p in 0..order.processors() {
            let mut step = order.first_after(order.head_slot(p));
            // a consistent chain visits every actor at most once
            for _ in 0..self.actors.len() {
                match step {
                    Step::Next(a) if assignment[a].is_none() => {
                        assignment[a] = Some(p);
                        step = order.step(a);
                    }
                    _ => break,
                }
            }
        }
        assignment
    }
}
