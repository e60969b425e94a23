//! Per-epoch distributions: one allocation per configured policy.

use cred_core::allocation::{AllocationId, AllocationPolicy, Distribution};
use cred_core::constants::{DEFAULT_IMMEDIATE_LOOKBACK, DEFAULT_RECENT_WEEKLY_DECAY};
use cred_core::error::{AllocationError, CredError};
use cred_core::grain::Grain;
use cred_core::traits::Ledger;
use cred_core::types::AllocationIdentity;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::{compute_allocation, validate};

/// Weekly grain budgets, one per policy kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GrainConfig {
    pub immediate_per_week: Grain,
    pub recent_per_week: Grain,
    pub recent_weekly_decay_rate: f64,
    pub balanced_per_week: Grain,
    pub immediate_lookback: usize,
}

impl Default for GrainConfig {
    fn default() -> Self {
        Self {
            immediate_per_week: Grain::ZERO,
            recent_per_week: Grain::ZERO,
            recent_weekly_decay_rate: DEFAULT_RECENT_WEEKLY_DECAY,
            balanced_per_week: Grain::ZERO,
            immediate_lookback: DEFAULT_IMMEDIATE_LOOKBACK,
        }
    }
}

impl GrainConfig {
    /// Equal weekly budgets for all three cred-based policies.
    pub fn even(per_policy: Grain) -> Self {
        Self {
            immediate_per_week: per_policy,
            recent_per_week: per_policy,
            balanced_per_week: per_policy,
            ..Self::default()
        }
    }

    /// IMMEDIATE, RECENT and BALANCED policies in that order, skipping any
    /// with a zero budget.
    pub fn policies(&self) -> Vec<AllocationPolicy> {
        [
            AllocationPolicy::Immediate {
                budget: self.immediate_per_week,
                num_intervals_lookback: self.immediate_lookback,
            },
            AllocationPolicy::Recent {
                budget: self.recent_per_week,
                discount: self.recent_weekly_decay_rate,
            },
            AllocationPolicy::Balanced { budget: self.balanced_per_week },
        ]
        .into_iter()
        .filter(|p| !p.budget().is_zero())
        .collect()
    }
}

/// Compute one allocation per policy against the same identities.
///
/// Every policy is validated before any allocation is computed, so either
/// the whole distribution is produced or nothing is.
pub fn compute_distribution(
    policies: &[AllocationPolicy],
    identities: &[AllocationIdentity],
    cred_timestamp_ms: i64,
) -> Result<Distribution, AllocationError> {
    for policy in policies {
        validate(policy, identities)?;
    }
    let allocations = policies
        .iter()
        .map(|policy| compute_allocation(policy, identities))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Distribution {
        id: AllocationId::random(),
        cred_timestamp_ms,
        allocations,
    })
}

/// Read identities from `ledger`, compute the configured distribution and
/// append it.
pub fn run_distribution(
    ledger: &mut dyn Ledger,
    config: &GrainConfig,
    cred_timestamp_ms: i64,
) -> Result<Distribution, CredError> {
    let identities = ledger.identities();
    let distribution = compute_distribution(&config.policies(), &identities, cred_timestamp_ms)?;
    ledger.distribute(&distribution)?;
    info!(
        distribution = %distribution.id,
        allocations = distribution.allocations.len(),
        identities = identities.len(),
        cred_timestamp_ms,
        "grain: distribution recorded"
    );
    Ok(distribution)
}
