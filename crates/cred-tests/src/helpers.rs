//! Shared builders for integration tests.

use cred_core::address::NodeAddress;
use cred_core::constants::MS_PER_WEEK;
use cred_core::graph::{Edge, EdgeWeight, Node, WeightedGraph};
use cred_core::grain::Grain;
use cred_core::interval::Interval;
use cred_core::types::{AllocationIdentity, IdentityId, Participant};

/// One authored contribution.
#[derive(Clone, Debug)]
pub struct Post {
    pub author: usize,
    pub week: i64,
    pub weight: f64,
    /// Index of an earlier post this one references.
    pub references: Option<usize>,
}

/// A contribution graph with its participants and weekly intervals.
pub struct Community {
    pub graph: WeightedGraph,
    pub intervals: Vec<Interval>,
    pub participants: Vec<Participant>,
}

impl Community {
    pub fn participant(&self, name: &str) -> &Participant {
        self.participants
            .iter()
            .find(|p| p.description == name)
            .expect("participant exists")
    }
}

pub fn address(kind: &str, name: &str) -> NodeAddress {
    NodeAddress::new(["forum", kind, name]).expect("valid address")
}

/// Start timestamp of week `week`, offset to its middle.
pub fn mid_week(week: i64) -> i64 {
    week * MS_PER_WEEK + MS_PER_WEEK / 2
}

/// Build a community of `members` over `weeks` epoch-aligned weeks.
///
/// Each post gets an authorship edge from its author (both directions
/// weighted 1) and, when it references an earlier post, a forward-only
/// reference edge.
pub fn community(members: &[&str], weeks: i64, posts: &[Post]) -> Community {
    let mut graph = WeightedGraph::new();
    let participants: Vec<Participant> = members
        .iter()
        .map(|&name| {
            let address = address("USER", name);
            graph
                .add_node(Node {
                    address: address.clone(),
                    description: name.to_string(),
                    timestamp_ms: None,
                    weight: 0.0,
                })
                .expect("unique user");
            Participant {
                id: IdentityId::from_name(name),
                address,
                description: name.to_string(),
            }
        })
        .collect();

    for (i, post) in posts.iter().enumerate() {
        let id = i.to_string();
        let node = address("POST", &id);
        let timestamp_ms = mid_week(post.week);
        graph
            .add_node(Node {
                address: node.clone(),
                description: format!("post {i}"),
                timestamp_ms: Some(timestamp_ms),
                weight: post.weight,
            })
            .expect("unique post");
        graph
            .add_edge(Edge {
                address: address("AUTHORS", &id),
                src: participants[post.author].address.clone(),
                dst: node.clone(),
                timestamp_ms,
                weight: EdgeWeight::new(1.0, 1.0),
            })
            .expect("unique edge");
        if let Some(target) = post.references {
            graph
                .add_edge(Edge {
                    address: address("REFERENCES", &id),
                    src: node,
                    dst: address("POST", &target.to_string()),
                    timestamp_ms,
                    weight: EdgeWeight::new(1.0, 0.0),
                })
                .expect("unique edge");
        }
    }

    let intervals = (0..weeks)
        .map(|w| Interval::new(w * MS_PER_WEEK, (w + 1) * MS_PER_WEEK))
        .collect();
    Community { graph, intervals, participants }
}

pub fn post(author: usize, week: i64, weight: f64) -> Post {
    Post { author, week, weight, references: None }
}

pub fn identity(seed: u8, paid: u128, cred: &[f64]) -> AllocationIdentity {
    AllocationIdentity::new(IdentityId([seed; 16]), Grain(paid), cred.to_vec())
}
