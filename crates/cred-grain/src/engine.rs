//! Allocation engine: turns one policy and a set of identities into an
//! exactly budget-conserving [`Allocation`].
//!
//! Every input is validated before any arithmetic runs, so a failed call
//! never produces partial output. The engine is pure; recording the
//! result is the ledger's job.

use cred_core::allocation::{Allocation, AllocationId, AllocationPolicy, GrainReceipt};
use cred_core::error::{AllocationError, InvariantError};
use cred_core::grain::Grain;
use cred_core::types::AllocationIdentity;
use tracing::info;

use crate::split::{mul_div, quantize, split_budget};

/// Check identities and policy parameters. Shared by single allocations
/// and whole distributions.
pub fn validate(
    policy: &AllocationPolicy,
    identities: &[AllocationIdentity],
) -> Result<(), AllocationError> {
    let first = identities.first().ok_or(AllocationError::NoIdentities)?;
    let expected = first.cred.len();
    for (index, identity) in identities.iter().enumerate() {
        if identity.cred.len() != expected {
            return Err(AllocationError::InconsistentCredLength {
                index,
                expected,
                got: identity.cred.len(),
            });
        }
    }
    for (index, identity) in identities.iter().enumerate() {
        if identity.cred.iter().any(|c| !(c.is_finite() && *c >= 0.0)) {
            return Err(AllocationError::InvalidCred { index });
        }
    }

    let all_zero = identities.iter().all(|i| i.cred.iter().all(|&c| c == 0.0));
    if !matches!(policy, AllocationPolicy::Special { .. }) && all_zero {
        return Err(AllocationError::CredIsZero);
    }

    match policy {
        AllocationPolicy::Immediate { num_intervals_lookback, .. } if *num_intervals_lookback == 0 => {
            Err(AllocationError::InvalidPolicy(
                "numIntervalsLookback must be at least 1".to_string(),
            ))
        }
        AllocationPolicy::Recent { discount, .. }
            if !(discount.is_finite() && (0.0..=1.0).contains(discount)) =>
        {
            Err(AllocationError::InvalidPolicy(format!(
                "discount must be in [0, 1], got {discount}"
            )))
        }
        AllocationPolicy::Special { recipient, .. }
            if !identities.iter().any(|i| i.id == *recipient) =>
        {
            Err(AllocationError::UnknownRecipient(*recipient))
        }
        _ => Ok(()),
    }
}

/// Compute an allocation. Receipts follow the order of `identities`.
pub fn compute_allocation(
    policy: &AllocationPolicy,
    identities: &[AllocationIdentity],
) -> Result<Allocation, AllocationError> {
    validate(policy, identities)?;
    let budget = policy.budget();
    let scale = cred_scale(identities);

    let amounts = match policy {
        AllocationPolicy::Immediate { num_intervals_lookback, .. } => {
            split_budget(budget, &immediate_weights(identities, *num_intervals_lookback, scale))?
        }
        AllocationPolicy::Recent { discount, .. } => {
            split_budget(budget, &recent_weights(identities, *discount, scale))?
        }
        AllocationPolicy::Balanced { .. } => {
            split_budget(budget, &balanced_shortfalls(identities, budget, scale)?)?
        }
        AllocationPolicy::Special { recipient, .. } => {
            let mut paid = false;
            identities
                .iter()
                .map(|i| {
                    if i.id == *recipient && !paid {
                        paid = true;
                        budget
                    } else {
                        Grain::ZERO
                    }
                })
                .collect()
        }
    };

    let receipts: Vec<GrainReceipt> = identities
        .iter()
        .zip(amounts)
        .map(|(identity, amount)| GrainReceipt { id: identity.id, amount })
        .collect();
    let allocation = Allocation {
        id: AllocationId::random(),
        policy: policy.clone(),
        receipts,
    };

    let actual = allocation.total().ok_or(AllocationError::ArithmeticOverflow)?;
    if actual != budget {
        return Err(InvariantError::BudgetNotConserved {
            expected: budget.0,
            actual: actual.0,
        }
        .into());
    }

    info!(
        allocation = %allocation.id,
        policy = %policy.kind(),
        budget = %budget,
        identities = identities.len(),
        "grain: computed allocation"
    );
    Ok(allocation)
}

/// Largest single cred value. Weights are computed on cred divided by
/// this, so their sums stay finite for any finite input.
fn cred_scale(identities: &[AllocationIdentity]) -> f64 {
    let max = identities
        .iter()
        .flat_map(|i| i.cred.iter().copied())
        .fold(0.0_f64, f64::max);
    if max > 0.0 { max } else { 1.0 }
}

/// Cred over the last `min(lookback, n)` intervals.
fn immediate_weights(identities: &[AllocationIdentity], lookback: usize, scale: f64) -> Vec<f64> {
    identities
        .iter()
        .map(|i| {
            let start = i.cred.len().saturating_sub(lookback);
            i.cred[start..].iter().map(|c| c / scale).sum()
        })
        .collect()
}

/// `Σ cred[i] · (1 − discount)^(n−1−i)`, evaluated oldest first.
fn recent_weights(identities: &[AllocationIdentity], discount: f64, scale: f64) -> Vec<f64> {
    let retained = 1.0 - discount;
    identities
        .iter()
        .map(|i| i.cred.iter().fold(0.0, |acc, c| acc * retained + c / scale))
        .collect()
}

/// Distance of each identity below its lifetime fair share of everything
/// paid so far plus `budget`, in attograin.
///
/// Falls back to plain lifetime cred when nobody is below target, which
/// only happens when flooring the targets ate the whole budget.
fn balanced_shortfalls(
    identities: &[AllocationIdentity],
    budget: Grain,
    scale: f64,
) -> Result<Vec<f64>, AllocationError> {
    let total_paid = Grain::checked_sum(identities.iter().map(|i| i.paid))
        .ok_or(AllocationError::ArithmeticOverflow)?;
    let pool = budget
        .checked_add(total_paid)
        .ok_or(AllocationError::ArithmeticOverflow)?;
    let lifetime: Vec<f64> = identities
        .iter()
        .map(|i| i.cred.iter().map(|c| c / scale).sum())
        .collect();
    let shares = quantize(&lifetime)?;
    let total_shares: u128 = shares.iter().sum();

    let mut shortfalls = Vec::with_capacity(identities.len());
    for (identity, &share) in identities.iter().zip(&shares) {
        let (target, _) = mul_div(pool.0, share, total_shares)?;
        shortfalls.push(target.saturating_sub(identity.paid.0) as f64);
    }
    if shortfalls.iter().all(|&s| s == 0.0) {
        return Ok(lifetime);
    }
    Ok(shortfalls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cred_core::types::IdentityId;
    use proptest::prelude::*;

    fn identity(seed: u8, paid: u128, cred: &[f64]) -> AllocationIdentity {
        AllocationIdentity::new(IdentityId([seed; 16]), Grain(paid), cred.to_vec())
    }

    fn amounts(allocation: &Allocation) -> Vec<u128> {
        allocation.receipts.iter().map(|r| r.amount.0).collect()
    }

    #[test]
    fn immediate_uses_last_interval() {
        let ids = vec![identity(1, 100, &[10.0, 2.0]), identity(2, 0, &[0.0, 3.0])];
        let policy = AllocationPolicy::Immediate { budget: Grain(10), num_intervals_lookback: 1 };
        let allocation = compute_allocation(&policy, &ids).unwrap();
        assert_eq!(amounts(&allocation), vec![4, 6]);
        assert_eq!(allocation.receipts[0].id, ids[0].id);
        assert_eq!(allocation.policy, policy);
    }

    #[test]
    fn immediate_lookback_longer_than_history_uses_everything() {
        let ids = vec![identity(1, 0, &[1.0, 1.0]), identity(2, 0, &[2.0, 0.0])];
        let policy = AllocationPolicy::Immediate { budget: Grain(40), num_intervals_lookback: 5 };
        assert_eq!(amounts(&compute_allocation(&policy, &ids).unwrap()), vec![20, 20]);
    }

    #[test]
    fn recent_full_discount_counts_final_interval() {
        let ids = vec![identity(1, 0, &[100.0, 1.0]), identity(2, 0, &[0.0, 3.0])];
        let policy = AllocationPolicy::Recent { budget: Grain(100), discount: 1.0 };
        assert_eq!(amounts(&compute_allocation(&policy, &ids).unwrap()), vec![25, 75]);
    }

    #[test]
    fn recent_full_discount_ignores_earlier_history() {
        let ids = vec![identity(1, 0, &[100.0, 0.0]), identity(2, 0, &[0.0, 5.0])];
        let policy = AllocationPolicy::Recent { budget: Grain(100), discount: 1.0 };
        assert_eq!(amounts(&compute_allocation(&policy, &ids).unwrap()), vec![0, 100]);
    }

    #[test]
    fn recent_zero_discount_is_lifetime() {
        let ids = vec![identity(1, 0, &[3.0, 1.0]), identity(2, 0, &[0.0, 4.0])];
        let policy = AllocationPolicy::Recent { budget: Grain(100), discount: 0.0 };
        assert_eq!(amounts(&compute_allocation(&policy, &ids).unwrap()), vec![50, 50]);
    }

    #[test]
    fn recent_half_discount_weights_older_less() {
        // weights: 4 * 0.5 + 0 = 2, 0 * 0.5 + 2 = 2
        let ids = vec![identity(1, 0, &[4.0, 0.0]), identity(2, 0, &[0.0, 2.0])];
        let policy = AllocationPolicy::Recent { budget: Grain(10), discount: 0.5 };
        assert_eq!(amounts(&compute_allocation(&policy, &ids).unwrap()), vec![5, 5]);
    }

    #[test]
    fn balanced_pays_underpaid_identity() {
        let ids = vec![identity(1, 0, &[1.0, 1.0]), identity(2, 30, &[3.0, 0.0])];
        let policy = AllocationPolicy::Balanced { budget: Grain(20) };
        assert_eq!(amounts(&compute_allocation(&policy, &ids).unwrap()), vec![20, 0]);
    }

    #[test]
    fn balanced_redistributes_overpaid_slack() {
        // targets of a 10 + 100 pool: 55, 55; identity 1 is over target by 45.
        let ids = vec![identity(1, 100, &[1.0]), identity(2, 0, &[1.0])];
        let policy = AllocationPolicy::Balanced { budget: Grain(10) };
        assert_eq!(amounts(&compute_allocation(&policy, &ids).unwrap()), vec![0, 10]);
    }

    #[test]
    fn balanced_with_no_history_matches_lifetime_share() {
        let ids = vec![identity(1, 0, &[1.0]), identity(2, 0, &[3.0])];
        let policy = AllocationPolicy::Balanced { budget: Grain(100) };
        assert_eq!(amounts(&compute_allocation(&policy, &ids).unwrap()), vec![25, 75]);
    }

    #[test]
    fn special_pays_recipient_only() {
        let ids = vec![identity(1, 0, &[0.0]), identity(2, 0, &[0.0])];
        let policy = AllocationPolicy::Special {
            budget: Grain(77),
            memo: "bounty".to_string(),
            recipient: IdentityId([2; 16]),
        };
        // Zero cred is fine for SPECIAL.
        assert_eq!(amounts(&compute_allocation(&policy, &ids).unwrap()), vec![0, 77]);
    }

    #[test]
    fn special_missing_recipient_rejected() {
        let ids = vec![identity(1, 0, &[1.0])];
        let policy = AllocationPolicy::Special {
            budget: Grain(5),
            memo: String::new(),
            recipient: IdentityId([9; 16]),
        };
        let err = compute_allocation(&policy, &ids).unwrap_err();
        assert_eq!(err, AllocationError::UnknownRecipient(IdentityId([9; 16])));
        assert!(err.to_string().starts_with("no active grain account for identity"));
    }

    #[test]
    fn validation_errors() {
        let policy = AllocationPolicy::Balanced { budget: Grain(5) };
        assert_eq!(compute_allocation(&policy, &[]).unwrap_err(), AllocationError::NoIdentities);

        let uneven = vec![identity(1, 0, &[1.0]), identity(2, 0, &[1.0, 2.0])];
        assert_eq!(
            compute_allocation(&policy, &uneven).unwrap_err().to_string(),
            "inconsistent cred length"
        );

        let nan = vec![identity(1, 0, &[1.0]), identity(2, 0, &[f64::NAN])];
        assert_eq!(
            compute_allocation(&policy, &nan).unwrap_err(),
            AllocationError::InvalidCred { index: 1 }
        );
        let negative = vec![identity(1, 0, &[-1.0])];
        assert_eq!(compute_allocation(&policy, &negative).unwrap_err().to_string(), "invalid cred");

        let zero = vec![identity(1, 0, &[0.0, 0.0])];
        assert_eq!(compute_allocation(&policy, &zero).unwrap_err().to_string(), "cred is zero");
    }

    #[test]
    fn policy_parameters_validated() {
        let ids = vec![identity(1, 0, &[1.0])];
        let lookback = AllocationPolicy::Immediate { budget: Grain(1), num_intervals_lookback: 0 };
        assert!(matches!(
            compute_allocation(&lookback, &ids),
            Err(AllocationError::InvalidPolicy(_))
        ));
        for discount in [-0.1, 1.1, f64::NAN] {
            let recent = AllocationPolicy::Recent { budget: Grain(1), discount };
            assert!(matches!(
                compute_allocation(&recent, &ids),
                Err(AllocationError::InvalidPolicy(_))
            ));
        }
    }

    #[test]
    fn empty_window_with_budget_is_cred_is_zero() {
        let ids = vec![identity(1, 0, &[5.0, 0.0])];
        let policy = AllocationPolicy::Immediate { budget: Grain(3), num_intervals_lookback: 1 };
        assert_eq!(compute_allocation(&policy, &ids).unwrap_err(), AllocationError::CredIsZero);
    }

    #[test]
    fn extreme_but_finite_cred_is_allocated() {
        let huge = vec![identity(1, 0, &[1e308, 1e308]), identity(2, 0, &[1.0, 1.0])];
        let balanced = AllocationPolicy::Balanced { budget: Grain(10) };
        assert_eq!(amounts(&compute_allocation(&balanced, &huge).unwrap()), vec![10, 0]);
        let recent = AllocationPolicy::Recent { budget: Grain(10), discount: 0.0 };
        assert_eq!(amounts(&compute_allocation(&recent, &huge).unwrap()), vec![10, 0]);

        let tiny = vec![identity(1, 0, &[1e-300]), identity(2, 0, &[1e-300])];
        let immediate = AllocationPolicy::Immediate { budget: Grain(10), num_intervals_lookback: 1 };
        assert_eq!(amounts(&compute_allocation(&immediate, &tiny).unwrap()), vec![5, 5]);
    }

    #[test]
    fn zero_budget_yields_zero_receipts() {
        let ids = vec![identity(1, 0, &[1.0]), identity(2, 0, &[2.0])];
        let policy = AllocationPolicy::Recent { budget: Grain::ZERO, discount: 0.5 };
        assert_eq!(amounts(&compute_allocation(&policy, &ids).unwrap()), vec![0, 0]);
    }

    #[test]
    fn receipts_are_deterministic() {
        let ids = vec![
            identity(1, 3, &[0.3, 1.7, 2.2]),
            identity(2, 9, &[1.1, 0.0, 0.4]),
            identity(3, 0, &[0.0, 0.9, 5.0]),
        ];
        let policy = AllocationPolicy::Recent { budget: Grain(1_000_003), discount: 0.25 };
        let a = compute_allocation(&policy, &ids).unwrap();
        let b = compute_allocation(&policy, &ids).unwrap();
        assert_eq!(a.receipts, b.receipts);
        assert_ne!(a.id, b.id);
    }

    fn arb_policy() -> impl Strategy<Value = AllocationPolicy> {
        let budget = (0u128..(1u128 << 100)).prop_map(Grain);
        prop_oneof![
            (budget.clone(), 1usize..6).prop_map(|(budget, num_intervals_lookback)| {
                AllocationPolicy::Immediate { budget, num_intervals_lookback }
            }),
            (budget.clone(), 0.0f64..=1.0)
                .prop_map(|(budget, discount)| AllocationPolicy::Recent { budget, discount }),
            budget.clone().prop_map(|budget| AllocationPolicy::Balanced { budget }),
            budget.prop_map(|budget| AllocationPolicy::Special {
                budget,
                memo: String::new(),
                recipient: IdentityId([0; 16]),
            }),
        ]
    }

    proptest! {
        #[test]
        fn every_policy_conserves_budget(
            policy in arb_policy(),
            rows in prop::collection::vec(
                (0u128..(1u128 << 90), prop::collection::vec(0.01f64..1e6, 4)),
                1..12,
            ),
        ) {
            let ids: Vec<AllocationIdentity> = rows
                .into_iter()
                .enumerate()
                .map(|(i, (paid, cred))| identity(i as u8, paid, &cred))
                .collect();
            let allocation = compute_allocation(&policy, &ids).unwrap();
            prop_assert_eq!(allocation.receipts.len(), ids.len());
            prop_assert_eq!(allocation.total(), Some(policy.budget()));
        }
    }
}
