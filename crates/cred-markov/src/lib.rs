//! # cred-markov
//!
//! Cred computation over a weighted contribution graph.
//!
//! ## Pipeline
//!
//! 1. [`builder::MarkovProcessGraph::build`] adds seed and epoch nodes,
//!    rewires participant edges and produces a row-stochastic chain.
//! 2. [`solver::solve`] finds the stationary distribution by bounded power
//!    iteration.
//! 3. [`cred_graph::CredGraph::assemble`] scales epoch-node mass into
//!    per-participant, per-interval cred.
//!
//! [`compute_cred`] runs all three.

mod attribution;
pub mod builder;
pub mod config;
pub mod cred_graph;
pub mod solver;

#[cfg(test)]
mod test_support;

pub use builder::{MarkovNode, MarkovNodeKind, MarkovProcessGraph};
pub use config::{CredConfig, CredScale, MarkovParameters, SolverOptions};
pub use cred_graph::{CredGraph, ParticipantCred};
pub use solver::{solve, StationaryDistribution};

use cred_core::error::CredError;
use cred_core::graph::WeightedGraph;
use cred_core::interval::Interval;
use cred_core::types::{Participant, PersonalAttribution};
use tracing::info;

/// Build, solve and assemble in one call.
pub fn compute_cred(
    graph: &WeightedGraph,
    intervals: &[Interval],
    participants: &[Participant],
    attributions: &[PersonalAttribution],
    config: &CredConfig,
) -> Result<CredGraph, CredError> {
    let markov =
        MarkovProcessGraph::build(graph, intervals, participants, &config.parameters, attributions)?;
    let distribution = solve(&markov, &config.solver)?;
    let scale = match config.scale {
        CredScale::Mint => CredGraph::mint_scale(&markov, &distribution),
        CredScale::Fixed(scale) => scale,
    };
    let cred = CredGraph::assemble(&markov, &distribution, scale)?;
    info!(
        participants = cred.participants().len(),
        intervals = cred.intervals().len(),
        iterations = distribution.iterations(),
        total_cred = cred.total_cred(),
        "cred: computed"
    );
    Ok(cred)
}
