use crate::analysis::AnalysisError;
use crate::domain::Interval;
use crate::msag::{self, liveness, NodeKind};
use crate::snapshot::{Actor, Channel, Snapshot};
use crate::tests::{d, free, link, to};

fn two_actors(channels: Vec<Channel>, next_actor: Vec<Interval<usize>>) -> Snapshot {
    let n = channels.len();
    Snapshot::new(
        vec![Actor::new(d(1)), Actor::new(d(1))],
        channels,
        next_actor,
        free(n + 2),
        free(n + 2),
        vec![1],
    )
    .unwrap()
}

// actor 0 alone on processor 0, actor 1 alone on processor 1
fn split() -> Vec<Interval<usize>> {
    vec![to(3), to(2), to(0), to(1)]
}

#[test]
fn local_channel_is_direct_edge() {
    let snapshot = Snapshot::new(
        vec![Actor::new(d(1)), Actor::new(d(1))],
        vec![Channel::local(0, 1, 2)],
        free(3),
        free(2),
        free(2),
        vec![1],
    )
    .unwrap();
    let g = msag::build(&snapshot);
    assert_eq!(g.len(), 2);
    assert_eq!(g.edges().len(), 1);
    assert_eq!(g.edge(0, 1).map(|e| e.tokens), Some(Interval::decided(2)));
    assert!(g.edge(1, 0).is_none());
}

#[test]
fn decided_local_channel_is_covered_by_actor_order() {
    // actor 0 then actor 1 on a single processor
    let snapshot = Snapshot::new(
        vec![Actor::new(d(1)), Actor::new(d(1))],
        vec![Channel::local(0, 1, 0)],
        vec![to(1), to(2), to(0)],
        free(2),
        free(2),
        vec![1],
    )
    .unwrap();
    let g = msag::build(&snapshot);
    assert_eq!(g.edges().len(), 2);
    assert_eq!(g.edge(0, 1).map(|e| e.tokens), Some(Interval::decided(0)));
    assert_eq!(g.edge(1, 0).map(|e| e.tokens), Some(Interval::decided(1)));
}

#[test]
fn interconnect_channel_adds_six_edges() {
    let local = msag::build(&two_actors(vec![Channel::local(0, 1, 0)], free(4)));
    let remote = msag::build(&two_actors(vec![link(0, 1, 2, 1, 1)], free(4)));

    assert_eq!(remote.len(), local.len() + 3);
    // the direct edge 0 -> 1 becomes receive -> 1, plus the transfer cycle
    assert_eq!(remote.edges().len(), local.edges().len() + 6);

    let t = remote.transfer(0).unwrap();
    assert_eq!(remote.node(t.block).kind, NodeKind::Block(0));
    assert_eq!(remote.node(t.send).kind, NodeKind::Send(0));
    assert_eq!(remote.node(t.receive).kind, NodeKind::Receive(0));
    assert_eq!(remote.node(t.block).delay, d(1));
    assert_eq!(remote.node(t.send).delay, d(2));
    assert_eq!(remote.node(t.receive).delay, d(1));

    let tokens = |src, dst| remote.edge(src, dst).map(|e| e.tokens.max());
    assert_eq!(tokens(0, t.block), Some(0));
    assert_eq!(tokens(t.block, 0), Some(1));
    assert_eq!(tokens(t.block, t.send), Some(0));
    assert_eq!(tokens(t.send, t.block), Some(1));
    assert_eq!(tokens(t.send, t.receive), Some(0));
    assert_eq!(tokens(t.receive, t.send), Some(1));
    assert_eq!(tokens(t.receive, 1), Some(0));
    assert!(remote.edge(0, 1).is_none());

    assert_eq!(remote.send_buffer_edge(0), remote.edge_id(t.block, 0));
    assert_eq!(remote.receive_buffer_edge(0), remote.edge_id(t.receive, t.send));
    assert_eq!(local.send_buffer_edge(0), None);
}

#[test]
fn receive_buffer_edge_excludes_initial_tokens() {
    let mut ch = link(0, 1, 2, 1, 1);
    ch.initial_tokens = 2;
    ch.receive_buffer = Interval::new(3, 5);
    let g = msag::build(&two_actors(vec![ch], free(4)));
    let t = g.transfer(0).unwrap();
    assert_eq!(g.edge(t.send, t.receive).unwrap().tokens, Interval::decided(2));
    assert_eq!(g.edge(t.receive, t.send).unwrap().tokens, Interval::new(1, 3));
}

#[test]
fn channel_nodes_belong_to_destination_application() {
    let snapshot = Snapshot::new(
        vec![Actor::new(d(1)), Actor::new(d(1))],
        vec![link(0, 1, 2, 1, 1)],
        free(4),
        free(3),
        free(3),
        vec![0, 1],
    )
    .unwrap();
    let g = msag::build(&snapshot);
    assert_eq!(g.applications(), 2);
    assert_eq!(g.node(0).app, 0);
    assert_eq!(g.node(1).app, 1);
    let t = g.transfer(0).unwrap();
    assert!([t.block, t.send, t.receive].iter().all(|n| g.node(*n).app == 1));
}

#[test]
fn send_order_closes_with_token() {
    // channels 0 and 1 both leave processor 0; send order 0, 1, wrap
    let snapshot = Snapshot::new(
        vec![Actor::new(d(1)), Actor::new(d(1))],
        vec![link(0, 1, 2, 1, 1), link(0, 1, 3, 1, 1)],
        split(),
        vec![to(1), to(3), to(0), to(3)],
        free(4),
        vec![1],
    )
    .unwrap();
    let g = msag::build(&snapshot);
    let c0 = g.transfer(0).unwrap();
    let c1 = g.transfer(1).unwrap();
    assert_eq!(g.edge(c0.send, c1.block).map(|e| e.tokens.max()), Some(0));
    assert_eq!(g.edge(c1.send, c0.block).map(|e| e.tokens.max()), Some(1));
}

#[test]
fn send_order_skips_local_channels() {
    // channel 1 stays on processor 0 and sits between the two transfers
    let snapshot = Snapshot::new(
        vec![Actor::new(d(1)), Actor::new(d(1))],
        vec![link(0, 1, 2, 1, 1), Channel::local(0, 0, 1), link(0, 1, 3, 1, 1)],
        split(),
        vec![to(1), to(2), to(4), to(0), to(4)],
        free(5),
        vec![1],
    )
    .unwrap();
    let g = msag::build(&snapshot);
    let c0 = g.transfer(0).unwrap();
    let c2 = g.transfer(2).unwrap();
    assert!(g.transfer(1).is_none());
    assert_eq!(g.edge(c0.send, c2.block).map(|e| e.tokens.max()), Some(0));
    assert_eq!(g.edge(c2.send, c0.block).map(|e| e.tokens.max()), Some(1));
}

#[test]
fn lone_transfer_has_no_send_order_edge() {
    let snapshot = Snapshot::new(
        vec![Actor::new(d(1)), Actor::new(d(1))],
        vec![link(0, 1, 2, 1, 1)],
        split(),
        vec![to(2), to(0), to(2)],
        free(3),
        vec![1],
    )
    .unwrap();
    let g = msag::build(&snapshot);
    let t = g.transfer(0).unwrap();
    assert_eq!(g.outgoing(t.send).len(), 2);
}

#[test]
fn undecided_send_order_adds_nothing() {
    let snapshot = two_actors(vec![link(0, 1, 2, 1, 1), link(0, 1, 3, 1, 1)], split());
    let g = msag::build(&snapshot);
    let c0 = g.transfer(0).unwrap();
    let c1 = g.transfer(1).unwrap();
    assert!(g.edge(c0.send, c1.block).is_none());
    assert!(g.edge(c1.send, c0.block).is_none());
}

#[test]
fn receive_order_selects_leading_receive() {
    // channel 0 is received before channel 1 on actor 1's processor
    let snapshot = Snapshot::new(
        vec![Actor::new(d(1)), Actor::new(d(1))],
        vec![link(0, 1, 2, 1, 1), link(0, 1, 3, 1, 1)],
        split(),
        free(4),
        vec![to(1), to(2), to(0), to(3)],
        vec![1],
    )
    .unwrap();
    let g = msag::build(&snapshot);
    let c0 = g.transfer(0).unwrap();
    let c1 = g.transfer(1).unwrap();
    assert_eq!(g.edge(c0.receive, c1.receive).map(|e| e.tokens.max()), Some(0));
    assert_eq!(g.edge(c1.receive, 1).map(|e| e.tokens.max()), Some(0));
    assert!(g.edge(c0.receive, 1).is_none());
    assert_eq!(g.leading_receive(1), Some(c0.receive));
    assert_eq!(g.leading_receive(0), None);

    // actor 1 closes its processor cycle through its leading receive
    assert_eq!(g.edge(1, c0.receive).map(|e| e.tokens.max()), Some(1));
    assert!(g.edge(1, 1).is_none());
    assert_eq!(g.edge(0, 0).map(|e| e.tokens.max()), Some(1));
}

#[test]
fn undecided_receive_order_has_no_leading_receive() {
    let snapshot = two_actors(vec![link(0, 1, 2, 1, 1), link(0, 1, 3, 1, 1)], split());
    let g = msag::build(&snapshot);
    let c0 = g.transfer(0).unwrap();
    let c1 = g.transfer(1).unwrap();
    assert_eq!(g.leading_receive(1), None);
    assert!(g.edge(c0.receive, 1).is_some());
    assert!(g.edge(c1.receive, 1).is_some());
    assert_eq!(g.edge(1, 1).map(|e| e.tokens.max()), Some(1));
}

#[test]
fn single_receive_leads_its_destination() {
    let snapshot = two_actors(vec![link(0, 1, 2, 1, 1)], split());
    let g = msag::build(&snapshot);
    let t = g.transfer(0).unwrap();
    assert_eq!(g.leading_receive(1), Some(t.receive));
}

#[test]
fn actor_order_wraps_with_one_token() {
    // processor 0 runs 0, 2; processor 1 runs 1
    let snapshot = Snapshot::new(
        vec![Actor::new(d(1)), Actor::new(d(2)), Actor::new(d(3))],
        vec![],
        vec![to(2), to(3), to(4), to(0), to(1)],
        free(2),
        free(2),
        vec![2],
    )
    .unwrap();
    let g = msag::build(&snapshot);
    assert_eq!(g.edges().len(), 3);
    assert_eq!(g.edge(0, 2).map(|e| e.tokens.max()), Some(0));
    assert_eq!(g.edge(2, 0).map(|e| e.tokens.max()), Some(1));
    assert_eq!(g.edge(1, 1).map(|e| e.tokens.max()), Some(1));
}

#[test]
fn undecided_head_slot_leaves_cycle_open() {
    let snapshot = Snapshot::new(
        vec![Actor::new(d(1)), Actor::new(d(1))],
        vec![],
        vec![to(1), to(2), Interval::new(0, 1)],
        free(1),
        free(1),
        vec![1],
    )
    .unwrap();
    let g = msag::build(&snapshot);
    assert_eq!(g.edges().len(), 1);
    assert!(g.edge(0, 1).is_some());
}

#[test]
fn reinserted_edge_replaces_tokens() {
    // the channel's tokens are replaced by the actor order's closing edge
    let snapshot = Snapshot::new(
        vec![Actor::new(d(1))],
        vec![Channel::local(0, 0, 3)],
        vec![to(1), to(0)],
        free(2),
        free(2),
        vec![0],
    )
    .unwrap();
    let g = msag::build(&snapshot);
    assert_eq!(g.edges().len(), 1);
    assert_eq!(g.edge(0, 0).map(|e| e.tokens.max()), Some(1));
}

#[test]
fn transposition_flips_every_edge() {
    let g = msag::build(&two_actors(vec![link(0, 1, 2, 1, 1)], split()));
    let t = g.transposed();
    assert_eq!(g.edges().len(), t.edges().len());
    for (id, e) in g.edges().iter().enumerate() {
        let f = &t.edges()[id];
        assert_eq!((f.src, f.dst, f.tokens), (e.dst, e.src, e.tokens));
        assert_eq!(t.edge_id(e.dst, e.src), Some(id));
        assert!(t.incoming(e.src).contains(&id));
        assert!(t.outgoing(e.dst).contains(&id));
    }
}

#[test]
fn node_names() {
    let g = msag::build(&two_actors(vec![link(0, 1, 2, 1, 1)], free(4)));
    let names: Vec<String> = g.nodes().iter().map(|n| n.kind.to_string()).collect();
    assert_eq!(names, ["actor_0", "actor_1", "block_ch0", "send_ch0", "rec_ch0"]);
}

#[test]
fn live_graph_passes() {
    let g = msag::build(&two_actors(vec![link(0, 1, 2, 1, 1)], split()));
    assert_eq!(liveness::check(&g), Ok(()));
}

#[test]
fn empty_send_buffer_deadlocks() {
    let mut ch = link(0, 1, 2, 1, 1);
    ch.send_buffer = Interval::decided(0);
    let g = msag::build(&two_actors(vec![ch], split()));
    let t = g.transfer(0).unwrap();
    match liveness::check(&g) {
        Err(AnalysisError::Deadlock { cycle }) => {
            assert_eq!(cycle.len(), 2);
            assert!(cycle.contains(&0));
            assert!(cycle.contains(&t.block));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn zero_token_cycle_deadlocks() {
    let snapshot = two_actors(vec![Channel::local(0, 1, 0), Channel::local(1, 0, 0)], free(4));
    let g = msag::build(&snapshot);
    assert!(matches!(liveness::check(&g), Err(AnalysisError::Deadlock { .. })));
}

#[test]
fn zero_delay_self_loop_is_zeno() {
    let snapshot = Snapshot::new(
        vec![Actor::new(Interval::new(d(0), d(4)))],
        vec![],
        vec![to(1), to(0)],
        free(1),
        free(1),
        vec![0],
    )
    .unwrap();
    let g = msag::build(&snapshot);
    assert_eq!(liveness::check(&g), Err(AnalysisError::ZenoCycle { cycle: vec![0] }));
}

#[test]
fn gated_zero_delay_node_is_not_zeno() {
    // actor 1 takes no time but waits for actor 0 every iteration
    let snapshot = Snapshot::new(
        vec![Actor::new(d(2)), Actor::new(d(0))],
        vec![Channel::local(0, 1, 0)],
        free(4),
        free(3),
        free(3),
        vec![1],
    )
    .unwrap();
    let g = msag::build(&snapshot);
    assert_eq!(liveness::check(&g), Ok(()));
}

#[test]
fn unconstrained_zero_delay_node_is_zeno() {
    let snapshot = Snapshot::new(
        vec![Actor::new(d(0))],
        vec![],
        free(2),
        free(1),
        free(1),
        vec![0],
    )
    .unwrap();
    let g = msag::build(&snapshot);
    assert_eq!(liveness::check(&g), Err(AnalysisError::ZenoCycle { cycle: vec![0] }));
}
