//! Markov process graph construction.
//!
//! Turns a [`WeightedGraph`] plus its participants and intervals into a
//! row-stochastic transition structure. Node indices are laid out as
//! base nodes (graph address order), then one seed per participant, then
//! one epoch per (participant, interval) in participant-major order.
//!
//! Transitions are stored sparsely as explicit entries plus a per-node
//! teleport mass spread uniformly over the seeds. The seed rows share a
//! single mint distribution.

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::sync::Arc;

use cred_core::address::NodeAddress;
use cred_core::constants::ROW_SUM_TOLERANCE;
use cred_core::error::{ConfigError, InvariantError};
use cred_core::graph::{Edge, WeightedGraph};
use cred_core::interval::{Interval, Intervals};
use cred_core::types::{IdentityId, Participant, PersonalAttribution};
use tracing::debug;

use crate::attribution::AttributionIndex;
use crate::config::MarkovParameters;

/// What a Markov node stands for. Participant and interval fields are
/// indices into [`MarkovProcessGraph::participants`] and
/// [`MarkovProcessGraph::intervals`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkovNodeKind {
    Base,
    Seed { participant: usize },
    Epoch { participant: usize, interval: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkovNode {
    pub address: NodeAddress,
    pub kind: MarkovNodeKind,
}

#[derive(Debug, Clone, Copy)]
struct Layout {
    base: usize,
    participants: usize,
    intervals: usize,
}

impl Layout {
    fn epoch(&self, participant: usize, interval: usize) -> usize {
        self.base + self.participants + participant * self.intervals + interval
    }

    fn seeds(&self) -> Range<usize> {
        self.base..self.base + self.participants
    }

    fn epochs(&self) -> Range<usize> {
        self.base + self.participants..self.total()
    }

    fn total(&self) -> usize {
        self.base + self.participants * (1 + self.intervals)
    }
}

#[derive(Debug, Clone)]
pub struct MarkovProcessGraph {
    nodes: Arc<[MarkovNode]>,
    index: Arc<BTreeMap<NodeAddress, usize>>,
    /// Explicit out-transitions per node, sorted by destination, no zeros.
    rows: Vec<Vec<(usize, f64)>>,
    /// Mass each node sends uniformly across all seeds.
    teleport: Vec<f64>,
    /// Shared non-teleport row of every seed node.
    seed_row: Vec<(usize, f64)>,
    layout: Layout,
    participants: Vec<Participant>,
    intervals: Intervals,
    total_mint: f64,
}

impl MarkovProcessGraph {
    /// Build the process graph. Pure and deterministic: the same inputs
    /// always produce the same node indexing and transitions.
    pub fn build(
        graph: &WeightedGraph,
        intervals: &[Interval],
        participants: &[Participant],
        params: &MarkovParameters,
        attributions: &[PersonalAttribution],
    ) -> Result<Self, ConfigError> {
        params.validate()?;
        let intervals = Intervals::new(intervals.to_vec())?;
        if participants.is_empty() {
            return Err(ConfigError::NoParticipants);
        }

        let mut participant_index: HashMap<IdentityId, usize> = HashMap::new();
        let mut participant_at: HashMap<&NodeAddress, usize> = HashMap::new();
        for (i, p) in participants.iter().enumerate() {
            if participant_index.insert(p.id, i).is_some() {
                return Err(ConfigError::DuplicateParticipant(p.id.to_string()));
            }
            if participant_at.insert(&p.address, i).is_some() {
                return Err(ConfigError::DuplicateParticipant(p.address.to_string()));
            }
            if !graph.contains_node(&p.address) {
                return Err(ConfigError::MissingParticipantNode {
                    id: p.id,
                    address: p.address.to_string(),
                });
            }
        }
        let attribution = AttributionIndex::new(attributions, &participant_index)?;

        let layout = Layout {
            base: graph.node_count(),
            participants: participants.len(),
            intervals: intervals.len(),
        };

        let mut nodes = Vec::with_capacity(layout.total());
        let mut index = BTreeMap::new();
        for node in graph.nodes() {
            push_node(&mut nodes, &mut index, node.address.clone(), MarkovNodeKind::Base)?;
        }
        for (participant, p) in participants.iter().enumerate() {
            let kind = MarkovNodeKind::Seed { participant };
            push_node(&mut nodes, &mut index, NodeAddress::seed(&p.id), kind)?;
        }
        for (participant, p) in participants.iter().enumerate() {
            for (interval, iv) in intervals.iter().enumerate() {
                let address = NodeAddress::epoch(&p.id, iv.start_time_ms);
                let kind = MarkovNodeKind::Epoch { participant, interval };
                push_node(&mut nodes, &mut index, address, kind)?;
            }
        }

        // Scaled out-weights after rewiring participant endpoints.
        let mut out: Vec<Vec<(usize, f64)>> = vec![Vec::new(); layout.total()];
        let mut kept_edges = 0usize;
        let endpoints = Endpoints {
            graph,
            index: &index,
            participant_at: &participant_at,
            intervals: &intervals,
            layout,
        };
        for edge in graph.edges() {
            for end in [&edge.src, &edge.dst] {
                if !graph.contains_node(end) {
                    return Err(ConfigError::DanglingEdge {
                        edge: edge.address.to_string(),
                        node: end.to_string(),
                    });
                }
            }
            if edge.weight.is_zero() {
                continue;
            }
            let src = endpoints.resolve(edge, &edge.src, &edge.dst)?;
            let dst = endpoints.resolve(edge, &edge.dst, &edge.src)?;
            let forwards = params.gamma_forward * edge.weight.forwards;
            let backwards = params.gamma_backward * edge.weight.backwards;
            if !(forwards.is_finite() && backwards.is_finite()) {
                return Err(ConfigError::WeightOverflow(edge.address.to_string()));
            }
            if forwards > 0.0 {
                out[src].push((dst, forwards));
            }
            if backwards > 0.0 {
                out[dst].push((src, backwards));
            }
            kept_edges += 1;
        }

        let remainder = params.epoch_remainder();
        let mut teleport = vec![params.alpha; layout.total()];
        let mut rows = Vec::with_capacity(layout.total());
        for (i, node) in nodes.iter().enumerate() {
            let mut row = Vec::new();
            let spread = match node.kind {
                MarkovNodeKind::Base => 1.0 - params.alpha,
                MarkovNodeKind::Seed { .. } => {
                    rows.push(row);
                    continue;
                }
                MarkovNodeKind::Epoch { participant, interval } => {
                    let next = if interval + 1 < layout.intervals {
                        layout.epoch(participant, interval + 1)
                    } else {
                        i
                    };
                    row.push((next, params.beta));
                    let start = intervals.as_slice()[interval].start_time_ms;
                    let mut attributed = 0.0;
                    for (to, value) in attribution.recipients_at(participant, start) {
                        row.push((layout.epoch(to, interval), remainder * value));
                        attributed += value;
                    }
                    remainder * (1.0 - attributed).max(0.0)
                }
            };
            // Relative to the heaviest edge, so the sum stays finite.
            let heaviest = out[i].iter().map(|&(_, w)| w).fold(0.0_f64, f64::max);
            let out_weight: f64 = out[i].iter().map(|(_, w)| w / heaviest).sum();
            if heaviest > 0.0 {
                row.extend(
                    out[i]
                        .iter()
                        .map(|&(dst, w)| (dst, spread * (w / heaviest) / out_weight)),
                );
            } else {
                teleport[i] += spread;
            }
            rows.push(merge_row(row));
        }

        let total_mint = graph.total_node_weight();
        if !total_mint.is_finite() {
            return Err(ConfigError::WeightOverflow("total node weight".to_string()));
        }
        let seed_spread = 1.0 - params.alpha;
        let seed_row: Vec<(usize, f64)> = if total_mint > 0.0 {
            graph
                .nodes()
                .enumerate()
                .map(|(i, n)| (i, seed_spread * n.weight / total_mint))
                .collect()
        } else {
            let epochs = layout.epochs();
            let share = seed_spread / epochs.len() as f64;
            epochs.map(|i| (i, share)).collect()
        };
        let seed_row = merge_row(seed_row);

        let built = Self {
            nodes: nodes.into(),
            index: Arc::new(index),
            rows,
            teleport,
            seed_row,
            layout,
            participants: participants.to_vec(),
            intervals,
            total_mint,
        };
        built.check_rows()?;

        debug!(
            nodes = built.node_count(),
            edges = kept_edges,
            participants = layout.participants,
            intervals = layout.intervals,
            transitions = built.rows.iter().map(Vec::len).sum::<usize>(),
            "markov: built process graph"
        );
        Ok(built)
    }

    fn check_rows(&self) -> Result<(), InvariantError> {
        let seed_mass: f64 = self.seed_row.iter().map(|(_, p)| p).sum();
        for (i, node) in self.nodes.iter().enumerate() {
            let explicit: f64 = self.rows[i].iter().map(|(_, p)| p).sum();
            let seed = if self.is_seed(i) { seed_mass } else { 0.0 };
            let sum = explicit + self.teleport[i] + seed;
            if !((sum - 1.0).abs() <= ROW_SUM_TOLERANCE) {
                return Err(InvariantError::RowNotStochastic {
                    node: node.address.to_string(),
                    sum,
                });
            }
        }
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, index: usize) -> Option<&MarkovNode> {
        self.nodes.get(index)
    }

    pub fn nodes(&self) -> &[MarkovNode] {
        &self.nodes
    }

    pub fn index_of(&self, address: &NodeAddress) -> Option<usize> {
        self.index.get(address).copied()
    }

    /// Probability of stepping from `src` to `dst`, or `None` when there
    /// is no such transition (or either address is unknown).
    pub fn transition_probability(&self, src: &NodeAddress, dst: &NodeAddress) -> Option<f64> {
        let p = self.transition(self.index_of(src)?, self.index_of(dst)?);
        (p > 0.0).then_some(p)
    }

    fn transition(&self, src: usize, dst: usize) -> f64 {
        let lookup = |row: &[(usize, f64)]| {
            row.binary_search_by_key(&dst, |&(d, _)| d)
                .map_or(0.0, |at| row[at].1)
        };
        let mut p = lookup(&self.rows[src]);
        if self.is_seed(src) {
            p += lookup(&self.seed_row);
        }
        if self.is_seed(dst) {
            p += self.teleport[src] / self.layout.participants as f64;
        }
        p
    }

    /// The full outgoing row of `address`, teleport included, ordered by
    /// destination index.
    pub fn transitions_from(&self, address: &NodeAddress) -> Option<Vec<(usize, f64)>> {
        let src = self.index_of(address)?;
        let mut row = self.rows[src].clone();
        if self.is_seed(src) {
            row.extend_from_slice(&self.seed_row);
        }
        let per_seed = self.teleport[src] / self.layout.participants as f64;
        row.extend(self.layout.seeds().map(|s| (s, per_seed)));
        Some(merge_row(row))
    }

    pub fn epoch_index(&self, participant: usize, interval: usize) -> Option<usize> {
        (participant < self.layout.participants && interval < self.layout.intervals)
            .then(|| self.layout.epoch(participant, interval))
    }

    pub fn seed_indices(&self) -> Range<usize> {
        self.layout.seeds()
    }

    /// Indices of every epoch node, participant-major.
    pub fn epoch_indices(&self) -> Range<usize> {
        self.layout.epochs()
    }

    /// Indices of one participant's epoch nodes, oldest interval first.
    pub fn participant_epochs(&self, participant: usize) -> Range<usize> {
        let start = self.layout.epoch(participant, 0);
        start..start + self.layout.intervals
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn intervals(&self) -> &Intervals {
        &self.intervals
    }

    /// Sum of all base node weights.
    pub fn total_mint(&self) -> f64 {
        self.total_mint
    }

    fn is_seed(&self, index: usize) -> bool {
        self.layout.seeds().contains(&index)
    }

    pub(crate) fn rows(&self) -> &[Vec<(usize, f64)>] {
        &self.rows
    }

    pub(crate) fn teleport(&self) -> &[f64] {
        &self.teleport
    }

    pub(crate) fn seed_row(&self) -> &[(usize, f64)] {
        &self.seed_row
    }

    pub(crate) fn shared_index(&self) -> (Arc<[MarkovNode]>, Arc<BTreeMap<NodeAddress, usize>>) {
        (Arc::clone(&self.nodes), Arc::clone(&self.index))
    }
}

fn push_node(
    nodes: &mut Vec<MarkovNode>,
    index: &mut BTreeMap<NodeAddress, usize>,
    address: NodeAddress,
    kind: MarkovNodeKind,
) -> Result<(), ConfigError> {
    if index.contains_key(&address) {
        return Err(ConfigError::DuplicateNode(address.to_string()));
    }
    index.insert(address.clone(), nodes.len());
    nodes.push(MarkovNode { address, kind });
    Ok(())
}

/// Sort by destination, merge duplicates and drop zero entries.
fn merge_row(mut row: Vec<(usize, f64)>) -> Vec<(usize, f64)> {
    row.sort_by_key(|&(dst, _)| dst);
    let mut merged: Vec<(usize, f64)> = Vec::with_capacity(row.len());
    for (dst, p) in row {
        match merged.last_mut() {
            Some(last) if last.0 == dst => last.1 += p,
            _ => merged.push((dst, p)),
        }
    }
    merged.retain(|&(_, p)| p > 0.0);
    merged
}

struct Endpoints<'a> {
    graph: &'a WeightedGraph,
    index: &'a BTreeMap<NodeAddress, usize>,
    participant_at: &'a HashMap<&'a NodeAddress, usize>,
    intervals: &'a Intervals,
    layout: Layout,
}

impl Endpoints<'_> {
    /// Markov index for one end of `edge`. A participant end binds to the
    /// epoch containing the other end's node timestamp, falling back to
    /// the edge timestamp; between two participants the edge timestamp
    /// always applies.
    fn resolve(&self, edge: &Edge, end: &NodeAddress, other: &NodeAddress) -> Result<usize, ConfigError> {
        let Some(&participant) = self.participant_at.get(end) else {
            return self.index.get(end).copied().ok_or_else(|| ConfigError::DanglingEdge {
                edge: edge.address.to_string(),
                node: end.to_string(),
            });
        };
        let timestamp_ms = if self.participant_at.contains_key(other) {
            edge.timestamp_ms
        } else {
            self.graph
                .node(other)
                .and_then(|n| n.timestamp_ms)
                .unwrap_or(edge.timestamp_ms)
        };
        let interval = self.intervals.interval_containing(timestamp_ms).ok_or_else(|| {
            ConfigError::TimestampOutOfRange {
                edge: edge.address.to_string(),
                timestamp_ms,
            }
        })?;
        Ok(self.layout.epoch(participant, interval))
    }
}
