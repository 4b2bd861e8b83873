//! Construction of an MSAG from a (partially decided) parameter snapshot.

use itertools::Itertools;
use tracing::debug;

use super::{Msag, Node, NodeKind, TransferNodes};
use crate::diagnostics::{DiagnosticsSink, NoDiagnostics};
use crate::domain::Interval;
use crate::snapshot::{ChannelId, Snapshot, Step};

/// Build the MSAG that reflects every execution and communication
/// dependency implied by the decisions in `snapshot`.
pub fn build(snapshot: &Snapshot) -> Msag {
    build_with(snapshot, &mut NoDiagnostics)
}

/// Same as [build], but report the finished graph to `sink`.
///
/// The graph is assembled in five passes:
///
/// 1. one node per actor, plus a block/send/receive triple for every
///    channel that certainly crosses the interconnect;
/// 2. the edges of each channel: a direct dependency for channels on
///    a single processor, a six-edge buffer cycle otherwise;
/// 3. the send order on the interconnect (send node to the block node
///    of the next transfer);
/// 4. the receive order at each destination (receive node to the next
///    receive node of the same destination, or to the destination);
/// 5. the actor order on each processor, including the token-carrying
///    edge that closes each processor's execution cycle.
///
/// Orders that are not decided yet contribute nothing; their edges
/// appear in later calls once the decisions have been made.
pub fn build_with<S>(snapshot: &Snapshot, sink: &mut S) -> Msag
where
    S: DiagnosticsSink + ?Sized,
{
    let mut graph = allocate_nodes(snapshot);
    add_channel_edges(snapshot, &mut graph);
    add_send_order_edges(snapshot, &mut graph);
    add_receive_order_edges(snapshot, &mut graph);
    add_actor_order_edges(snapshot, &mut graph);
    debug!(
        nodes = graph.len(),
        edges = graph.edges().len(),
        transfers = graph.transfers().iter().flatten().count(),
        "built MSAG"
    );
    sink.graph_built(&graph);
    graph
}

fn allocate_nodes(snapshot: &Snapshot) -> Msag {
    let mut nodes: Vec<Node> = snapshot
        .actors()
        .iter()
        .enumerate()
        .map(|(a, actor)| Node {
            kind: NodeKind::Actor(a),
            delay: actor.wcet.min(),
            app: snapshot.application_of(a),
        })
        .collect();

    let transfers = snapshot
        .channels()
        .iter()
        .enumerate()
        .map(|(c, ch)| {
            if !ch.is_interconnect() {
                return None;
            }
            // transfer nodes count towards the receiving application
            let app = snapshot.application_of(ch.destination);
            let block = nodes.len();
            nodes.push(Node {
                kind: NodeKind::Block(c),
                delay: ch.send_latency.min(),
                app,
            });
            nodes.push(Node {
                kind: NodeKind::Send(c),
                delay: ch.send_time.min(),
                app,
            });
            nodes.push(Node {
                kind: NodeKind::Receive(c),
                delay: ch.receive_time.min(),
                app,
            });
            Some(TransferNodes {
                block,
                send: block + 1,
                receive: block + 2,
                source: ch.source,
                destination: ch.destination,
            })
        })
        .collect();

    Msag::with_nodes(
        nodes,
        transfers,
        snapshot.actors().len(),
        snapshot.applications().len(),
    )
}

fn add_channel_edges(snapshot: &Snapshot, graph: &mut Msag) {
    let none = Interval::decided(0);
    let one = Interval::decided(1);
    for (c, ch) in snapshot.channels().iter().enumerate() {
        let initial = Interval::decided(ch.initial_tokens);
        match graph.transfer(c) {
            Some(t) => {
                // source -> block -> send -> receive, each stage handing
                // back a token once it frees its slot
                graph.add_edge(ch.source, t.block, none);
                graph.add_edge(t.block, ch.source, ch.send_buffer);
                graph.add_edge(t.block, t.send, none);
                graph.add_edge(t.send, t.block, one);
                graph.add_edge(t.send, t.receive, initial);
                graph.add_edge(
                    t.receive,
                    t.send,
                    ch.receive_buffer
                        .map(|cap| cap.saturating_sub(ch.initial_tokens)),
                );
            }
            None => {
                // Without initial tokens, a decided local channel is
                // covered by the processor's actor order.
                let covered = ch.send_time.is_decided()
                    && ch.initial_tokens == 0
                    && snapshot.actor_order().successor(ch.source).is_decided();
                if !covered {
                    graph.add_edge(ch.source, ch.destination, initial);
                }
            }
        }
    }
}

/// Follow the send order from channel `from` to the next channel that
/// crosses the interconnect. Also report whether the walk wrapped
/// around the end of the processor's send order.
fn next_interconnect_send(snapshot: &Snapshot, from: ChannelId) -> Option<(ChannelId, bool)> {
    let order = snapshot.send_order();
    let channels = snapshot.channels();
    let mut wrapped = false;
    let mut at = from;
    // a consistent order returns to `from` within one full cycle
    for _ in 0..=order.len() + order.processors() {
        let next = match order.step(at) {
            Step::Undecided => return None,
            Step::Next(n) => n,
            Step::Wrap(slot) => {
                wrapped = true;
                match order.first_after(slot) {
                    Step::Next(n) => n,
                    _ => return None,
                }
            }
        };
        if channels[next].is_interconnect() {
            return Some((next, wrapped));
        }
        at = next;
    }
    None
}

fn add_send_order_edges(snapshot: &Snapshot, graph: &mut Msag) {
    for c in 0..snapshot.channels().len() {
        let Some(t) = graph.transfer(c) else { continue };
        let Some((next, wrapped)) = next_interconnect_send(snapshot, c) else {
            continue;
        };
        // a channel alone on its processor is already serialized by
        // its own send -> block edge
        if next == c {
            continue;
        }
        let block = graph
            .transfer(next)
            .expect("interconnect channel without transfer nodes")
            .block;
        graph.add_edge(t.send, block, Interval::decided(u64::from(wrapped)));
    }
}

/// Follow the receive order from channel `from` to the next channel
/// that crosses the interconnect into the same destination.
fn next_interconnect_receive(snapshot: &Snapshot, from: ChannelId) -> Option<ChannelId> {
    let order = snapshot.receive_order();
    let channels = snapshot.channels();
    let dst = channels[from].destination;
    let mut at = from;
    for _ in 0..order.len() {
        match order.step(at) {
            Step::Next(n) if n != from && channels[n].destination == dst => {
                if channels[n].is_interconnect() {
                    return Some(n);
                }
                at = n;
            }
            _ => return None,
        }
    }
    None
}

fn add_receive_order_edges(snapshot: &Snapshot, graph: &mut Msag) {
    let none = Interval::decided(0);
    let mut chained = vec![false; graph.len()];
    for (c, ch) in snapshot.channels().iter().enumerate() {
        let Some(t) = graph.transfer(c) else { continue };
        match next_interconnect_receive(snapshot, c) {
            Some(next) => {
                let receive = graph
                    .transfer(next)
                    .expect("interconnect channel without transfer nodes")
                    .receive;
                chained[receive] = true;
                graph.add_edge(t.receive, receive, none);
            }
            None => {
                graph.add_edge(t.receive, ch.destination, none);
            }
        }
    }

    // The leading receive node of an actor is the only one of its
    // receive nodes that no other receive node chains into.
    for actor in 0..snapshot.actors().len() {
        let leading = snapshot
            .channels()
            .iter()
            .enumerate()
            .filter(|(_, ch)| ch.destination == actor)
            .filter_map(|(c, _)| graph.transfer(c))
            .map(|t| t.receive)
            .filter(|r| !chained[*r])
            .exactly_one()
            .ok();
        graph.set_leading_receive(actor, leading);
    }
}

fn add_actor_order_edges(snapshot: &Snapshot, graph: &mut Msag) {
    let order = snapshot.actor_order();
    for a in 0..snapshot.actors().len() {
        let (successor, tokens) = match order.step(a) {
            Step::Undecided => continue,
            Step::Next(s) => (s, 0),
            // last actor on its processor: close the cycle back to the first
            Step::Wrap(slot) => match order.first_after(slot) {
                Step::Next(first) => (first, 1),
                _ => continue,
            },
        };
        let target = graph.leading_receive(successor).unwrap_or(successor);
        graph.add_edge(a, target, Interval::decided(tokens));
    }
}
