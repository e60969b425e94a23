//! Stationary distribution by power iteration.
//!
//! Each step pulls mass into every node over the transposed explicit
//! transitions, then adds the shared seed-row mass and the uniform
//! teleport. Iteration order is fixed, so results are bit-for-bit
//! reproducible for the same process graph and options.

use std::collections::BTreeMap;
use std::sync::Arc;

use cred_core::address::NodeAddress;
use cred_core::error::{InvariantError, SolverError};
use tracing::{info, warn};

use crate::builder::{MarkovNode, MarkovProcessGraph};
use crate::config::SolverOptions;

/// One probability per Markov node, indexed like the process graph.
#[derive(Debug, Clone)]
pub struct StationaryDistribution {
    probabilities: Vec<f64>,
    iterations: usize,
    delta: f64,
    nodes: Arc<[MarkovNode]>,
    index: Arc<BTreeMap<NodeAddress, usize>>,
}

impl StationaryDistribution {
    pub fn probability(&self, address: &NodeAddress) -> Option<f64> {
        self.index.get(address).map(|&i| self.probabilities[i])
    }

    /// `(address, probability)` in node index order.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeAddress, f64)> + '_ {
        self.nodes
            .iter()
            .zip(self.probabilities.iter())
            .map(|(n, &p)| (&n.address, p))
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// Iterations run before convergence.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// L1 distance between the last two iterates.
    pub fn delta(&self) -> f64 {
        self.delta
    }
}

/// Incoming explicit transitions per node, sources ascending.
fn transpose(rows: &[Vec<(usize, f64)>]) -> Vec<Vec<(usize, f64)>> {
    let mut incoming: Vec<Vec<(usize, f64)>> = vec![Vec::new(); rows.len()];
    for (src, row) in rows.iter().enumerate() {
        for &(dst, p) in row {
            incoming[dst].push((src, p));
        }
    }
    incoming
}

/// Run power iteration from the uniform distribution.
pub fn solve(
    graph: &MarkovProcessGraph,
    options: &SolverOptions,
) -> Result<StationaryDistribution, SolverError> {
    options.validate()?;

    let n = graph.node_count();
    let incoming = transpose(graph.rows());
    let teleport = graph.teleport();
    let seed_row = graph.seed_row();
    let seeds = graph.seed_indices();
    let seed_count = seeds.len() as f64;

    let mut current = vec![1.0 / n as f64; n];
    let mut next = vec![0.0; n];
    let mut delta = f64::INFINITY;

    for iteration in 1..=options.max_iterations {
        let teleported: f64 = current.iter().zip(teleport).map(|(p, t)| p * t).sum();
        let seed_mass: f64 = current[seeds.clone()].iter().sum();

        for (slot, sources) in next.iter_mut().zip(&incoming) {
            *slot = sources.iter().map(|&(src, p)| current[src] * p).sum();
        }
        for &(dst, p) in seed_row {
            next[dst] += seed_mass * p;
        }
        let per_seed = teleported / seed_count;
        for s in seeds.clone() {
            next[s] += per_seed;
        }

        delta = current.iter().zip(&next).map(|(a, b)| (a - b).abs()).sum();
        std::mem::swap(&mut current, &mut next);

        if delta < options.epsilon {
            let probabilities = finalize(graph, current, options.epsilon)?;
            info!(iterations = iteration, delta, nodes = n, "solver: converged");
            let (nodes, index) = graph.shared_index();
            return Ok(StationaryDistribution {
                probabilities,
                iterations: iteration,
                delta,
                nodes,
                index,
            });
        }
    }

    warn!(
        iterations = options.max_iterations,
        delta,
        epsilon = options.epsilon,
        "solver: did not converge"
    );
    Err(SolverError::NotConverged {
        iterations: options.max_iterations,
        delta,
    })
}

fn finalize(
    graph: &MarkovProcessGraph,
    mut probabilities: Vec<f64>,
    epsilon: f64,
) -> Result<Vec<f64>, InvariantError> {
    if let Some(i) = probabilities.iter().position(|&p| p < 0.0 || p.is_nan()) {
        let node = graph.node(i).map_or_else(|| i.to_string(), |n| n.address.to_string());
        return Err(InvariantError::NegativeProbability { node });
    }
    let sum: f64 = probabilities.iter().sum();
    if !((sum - 1.0).abs() <= epsilon) {
        return Err(InvariantError::DistributionNotNormalized { sum });
    }
    for p in &mut probabilities {
        *p /= sum;
    }
    Ok(probabilities)
}
