//! Shared fixtures for unit tests.

use cred_core::address::NodeAddress;
use cred_core::graph::{Edge, EdgeWeight, Node, WeightedGraph};
use cred_core::interval::Interval;
use cred_core::types::{IdentityId, Participant};

pub(crate) const DAY: i64 = 86_400_000;

pub(crate) struct Fixture {
    pub graph: WeightedGraph,
    pub intervals: Vec<Interval>,
    pub participants: Vec<Participant>,
}

pub(crate) fn addr(parts: &[&str]) -> NodeAddress {
    NodeAddress::new(parts.iter().copied()).unwrap()
}

pub(crate) fn node(address: &NodeAddress, timestamp_ms: Option<i64>, weight: f64) -> Node {
    Node {
        address: address.clone(),
        description: address.to_string(),
        timestamp_ms,
        weight,
    }
}

pub(crate) fn edge(
    name: &str,
    src: &NodeAddress,
    dst: &NodeAddress,
    timestamp_ms: i64,
    weight: EdgeWeight,
) -> Edge {
    Edge {
        address: addr(&["test", "EDGE", name]),
        src: src.clone(),
        dst: dst.clone(),
        timestamp_ms,
        weight,
    }
}

pub(crate) fn participant(name: &str) -> Participant {
    Participant {
        id: IdentityId::from_name(name),
        address: addr(&["test", "USER", name]),
        description: name.to_string(),
    }
}

/// Two days, two participants.
///
/// alice authors PR (day 1, weight 3), which fixes ISSUE (day 0, weight 1)
/// by bob; REVIEW (day 1) references the PR.
pub(crate) fn two_contributors() -> Fixture {
    let alice = participant("alice");
    let bob = participant("bob");
    let pr = addr(&["test", "PR", "1"]);
    let issue = addr(&["test", "ISSUE", "1"]);
    let review = addr(&["test", "REVIEW", "1"]);

    let mut graph = WeightedGraph::new();
    graph.add_node(node(&alice.address, None, 0.0)).unwrap();
    graph.add_node(node(&bob.address, None, 0.0)).unwrap();
    graph.add_node(node(&pr, Some(DAY + 100), 3.0)).unwrap();
    graph.add_node(node(&issue, Some(100), 1.0)).unwrap();
    graph.add_node(node(&review, Some(DAY + 200), 0.0)).unwrap();

    let both = EdgeWeight::new(1.0, 1.0);
    graph.add_edge(edge("alice-pr", &alice.address, &pr, DAY + 100, both)).unwrap();
    graph.add_edge(edge("bob-issue", &bob.address, &issue, 100, both)).unwrap();
    graph.add_edge(edge("review-pr", &review, &pr, DAY + 200, both)).unwrap();
    graph
        .add_edge(edge("pr-issue", &pr, &issue, DAY + 100, EdgeWeight::new(1.0, 0.0)))
        .unwrap();

    Fixture {
        graph,
        intervals: vec![Interval::new(0, DAY), Interval::new(DAY, 2 * DAY)],
        participants: vec![alice, bob],
    }
}
