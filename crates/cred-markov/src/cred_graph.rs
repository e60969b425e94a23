//! Per-participant cred read off the stationary distribution.

use cred_core::error::ConfigError;
use cred_core::interval::Intervals;
use cred_core::types::{IdentityId, Participant};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::builder::MarkovProcessGraph;
use crate::solver::StationaryDistribution;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantCred {
    pub participant: Participant,
    /// Sum of `cred_per_interval`.
    pub cred: f64,
    /// Scaled epoch-node mass, one entry per interval.
    pub cred_per_interval: Vec<f64>,
}

/// Cred for every participant across the interval sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredGraph {
    intervals: Intervals,
    participants: Vec<ParticipantCred>,
}

impl CredGraph {
    pub fn assemble(
        graph: &MarkovProcessGraph,
        distribution: &StationaryDistribution,
        scale: f64,
    ) -> Result<Self, ConfigError> {
        if !(scale.is_finite() && scale >= 0.0) {
            return Err(ConfigError::InvalidScale(scale));
        }
        if distribution.len() != graph.node_count() {
            return Err(ConfigError::DistributionMismatch {
                expected: graph.node_count(),
                got: distribution.len(),
            });
        }

        let probabilities = distribution.probabilities();
        let participants: Vec<ParticipantCred> = graph
            .participants()
            .iter()
            .enumerate()
            .map(|(i, participant)| {
                let cred_per_interval: Vec<f64> = probabilities[graph.participant_epochs(i)]
                    .iter()
                    .map(|p| p * scale)
                    .collect();
                ParticipantCred {
                    participant: participant.clone(),
                    cred: cred_per_interval.iter().sum(),
                    cred_per_interval,
                }
            })
            .collect();

        let assembled = Self { intervals: graph.intervals().clone(), participants };
        debug!(
            participants = assembled.participants.len(),
            scale,
            total_cred = assembled.total_cred(),
            "cred: assembled cred graph"
        );
        Ok(assembled)
    }

    /// The scale making total cred equal the graph's total mint.
    ///
    /// Falls back to 1 when either the epoch mass or the mint is zero, or
    /// when `distribution` does not belong to `graph`.
    pub fn mint_scale(graph: &MarkovProcessGraph, distribution: &StationaryDistribution) -> f64 {
        let epoch_mass: f64 = distribution
            .probabilities()
            .get(graph.epoch_indices())
            .map_or(0.0, |epochs| epochs.iter().sum());
        let mint = graph.total_mint();
        if epoch_mass > 0.0 && mint > 0.0 {
            mint / epoch_mass
        } else {
            1.0
        }
    }

    pub fn participant(&self, id: &IdentityId) -> Option<&ParticipantCred> {
        self.participants.iter().find(|p| p.participant.id == *id)
    }

    /// Participants in input order.
    pub fn participants(&self) -> &[ParticipantCred] {
        &self.participants
    }

    pub fn intervals(&self) -> &Intervals {
        &self.intervals
    }

    pub fn total_cred(&self) -> f64 {
        self.participants.iter().map(|p| p.cred).sum()
    }

    /// `(id, per-interval cred)` pairs, ready for a ledger.
    pub fn cred_histories(&self) -> impl Iterator<Item = (IdentityId, &[f64])> + '_ {
        self.participants
            .iter()
            .map(|p| (p.participant.id, p.cred_per_interval.as_slice()))
    }
}
