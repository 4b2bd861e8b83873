/*! The mapping- and scheduling-aware graph (MSAG).

An MSAG is a timed marked graph. Its nodes are timed activities (the
firing of an actor, or the blocking, sending and receiving phases of
a transfer over the interconnect); its edges carry tokens that
represent available synchronization slots. A node may start once
every incoming edge holds a token; when it completes, it places one
token on every outgoing edge.

The graph is stored as an arena of nodes and a list of edges indexed
by node id. At most one edge connects any ordered pair of nodes, so
the graph can equivalently be read as a token matrix in which a
missing edge and an edge holding zero tokens are clearly distinct
([Msag::edge] returns an `Option`).
*/

use std::collections::HashMap;
use std::fmt;

use crate::domain::Interval;
use crate::snapshot::{ActorId, AppId, ChannelId};
use crate::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Index of a node in the graph.
pub type NodeId = usize;

/// Index of an edge in the graph.
pub type EdgeId = usize;

/// The activity a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NodeKind {
    /// One firing of an actor.
    Actor(ActorId),
    /// Waiting for the interconnect before a transfer on a channel.
    Block(ChannelId),
    /// Transmitting one token of a channel.
    Send(ChannelId),
    /// Moving one token of a channel into its destination.
    Receive(ChannelId),
}

impl NodeKind {
    /// The channel a transfer node belongs to.
    pub fn channel(&self) -> Option<ChannelId> {
        match self {
            NodeKind::Actor(_) => None,
            NodeKind::Block(c) | NodeKind::Send(c) | NodeKind::Receive(c) => Some(*c),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Actor(a) => write!(f, "actor_{}", a),
            NodeKind::Block(c) => write!(f, "block_ch{}", c),
            NodeKind::Send(c) => write!(f, "send_ch{}", c),
            NodeKind::Receive(c) => write!(f, "rec_ch{}", c),
        }
    }
}

/// A timed activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Node {
    pub kind: NodeKind,
    /// How long one firing of the node takes.
    pub delay: Duration,
    /// The application whose latency and period the node contributes to.
    pub app: AppId,
}

/// A directed edge carrying synchronization tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Edge {
    pub src: NodeId,
    pub dst: NodeId,
    /// The range of initial tokens; simulation uses the upper end.
    pub tokens: Interval<u64>,
}

/// The three nodes modelling a transfer over the interconnect, and
/// the actors at either end of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransferNodes {
    pub block: NodeId,
    pub send: NodeId,
    pub receive: NodeId,
    pub source: ActorId,
    pub destination: ActorId,
}

/// A mapping- and scheduling-aware graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Msag {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    incoming: Vec<Vec<EdgeId>>,
    outgoing: Vec<Vec<EdgeId>>,
    index: HashMap<(NodeId, NodeId), EdgeId>,
    transfers: Vec<Option<TransferNodes>>,
    leading_receive: Vec<Option<NodeId>>,
    applications: usize,
}

impl Msag {
    /// An edgeless graph with the given nodes. `transfers[c]` lists
    /// the transfer nodes of channel `c`, if it crosses the interconnect.
    pub(crate) fn with_nodes(
        nodes: Vec<Node>,
        transfers: Vec<Option<TransferNodes>>,
        actors: usize,
        applications: usize,
    ) -> Msag {
        let n = nodes.len();
        Msag {
            nodes,
            edges: Vec::new(),
            incoming: vec![Vec::new(); n],
            outgoing: vec![Vec::new(); n],
            index: HashMap::new(),
            transfers,
            leading_receive: vec![None; actors],
            applications,
        }
    }

    /// Connect `src` to `dst`. An existing edge between the same pair
    /// of nodes is overwritten.
    pub(crate) fn add_edge(&mut self, src: NodeId, dst: NodeId, tokens: Interval<u64>) -> EdgeId {
        assert!(src < self.nodes.len() && dst < self.nodes.len());
        if let Some(&id) = self.index.get(&(src, dst)) {
            self.edges[id].tokens = tokens;
            return id;
        }
        let id = self.edges.len();
        self.edges.push(Edge { src, dst, tokens });
        self.outgoing[src].push(id);
        self.incoming[dst].push(id);
        self.index.insert((src, dst), id);
        id
    }

    pub(crate) fn set_leading_receive(&mut self, actor: ActorId, node: Option<NodeId>) {
        self.leading_receive[actor] = node;
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// The edge from `src` to `dst`, if there is one.
    pub fn edge(&self, src: NodeId, dst: NodeId) -> Option<&Edge> {
        self.index.get(&(src, dst)).map(|id| &self.edges[*id])
    }

    /// The id of the edge from `src` to `dst`, if there is one.
    pub fn edge_id(&self, src: NodeId, dst: NodeId) -> Option<EdgeId> {
        self.index.get(&(src, dst)).copied()
    }

    pub fn incoming(&self, node: NodeId) -> &[EdgeId] {
        &self.incoming[node]
    }

    pub fn outgoing(&self, node: NodeId) -> &[EdgeId] {
        &self.outgoing[node]
    }

    /// The number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The number of actors; actor `a` is node `a`.
    pub fn actors(&self) -> usize {
        self.leading_receive.len()
    }

    pub fn applications(&self) -> usize {
        self.applications
    }

    /// The transfer nodes of channel `ch`, or `None` for a channel
    /// that does not (yet) cross the interconnect.
    pub fn transfer(&self, ch: ChannelId) -> Option<TransferNodes> {
        self.transfers[ch]
    }

    pub fn transfers(&self) -> &[Option<TransferNodes>] {
        &self.transfers
    }

    /// The receive node that precedes all other receive nodes of
    /// `actor`, if the receive order singles one out.
    pub fn leading_receive(&self, actor: ActorId) -> Option<NodeId> {
        self.leading_receive[actor]
    }

    /// The edge whose tokens represent the free slots of the send
    /// buffer of channel `ch` (block node back to the source actor).
    pub fn send_buffer_edge(&self, ch: ChannelId) -> Option<EdgeId> {
        self.transfers[ch].and_then(|t| self.edge_id(t.block, t.source))
    }

    /// The edge whose tokens represent the free slots of the receive
    /// buffer of channel `ch` (receive node back to the send node).
    pub fn receive_buffer_edge(&self, ch: ChannelId) -> Option<EdgeId> {
        self.transfers[ch].and_then(|t| self.edge_id(t.receive, t.send))
    }

    /// The same graph with every edge reversed. Edge ids are preserved.
    pub fn transposed(&self) -> Msag {
        let mut flipped = self.clone();
        flipped.index.clear();
        for (id, e) in flipped.edges.iter_mut().enumerate() {
            std::mem::swap(&mut e.src, &mut e.dst);
            flipped.index.insert((e.src, e.dst), id);
        }
        std::mem::swap(&mut flipped.incoming, &mut flipped.outgoing);
        flipped
    }
}

pub mod builder;
pub mod liveness;

pub use builder::{build, build_with};

#[cfg(test)]
mod tests;
