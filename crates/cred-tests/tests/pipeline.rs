//! End-to-end tests: contribution graph → cred → ledger → grain.

use cred_core::allocation::{AllocationPolicy, PolicyKind};
use cred_core::constants::ONE_GRAIN;
use cred_core::error::{AllocationError, CredError, LedgerError};
use cred_core::grain::Grain;
use cred_core::traits::Ledger;
use cred_core::types::{AttributionRecipient, PersonalAttribution, Proportion};
use cred_grain::{compute_allocation, run_distribution, GrainConfig, MemoryLedger};
use cred_markov::{compute_cred, CredConfig, CredGraph, CredScale};
use cred_tests::helpers::*;

fn forum() -> Community {
    community(
        &["ada", "grace", "linus"],
        3,
        &[
            post(0, 0, 4.0),
            Post { author: 1, week: 1, weight: 2.0, references: Some(0) },
            post(1, 2, 1.0),
            Post { author: 2, week: 2, weight: 1.0, references: Some(1) },
        ],
    )
}

fn cred(c: &Community, attributions: &[PersonalAttribution]) -> CredGraph {
    compute_cred(&c.graph, &c.intervals, &c.participants, attributions, &CredConfig::precise())
        .unwrap()
}

fn ledger_for(c: &Community, cred: &CredGraph) -> MemoryLedger {
    let mut ledger = MemoryLedger::new();
    for p in &c.participants {
        let id = ledger.create_identity(&p.description, p.address.clone()).unwrap();
        assert_eq!(id, p.id);
    }
    ledger.update_cred(cred.cred_histories()).unwrap();
    ledger
}

// ---------------------------------------------------------------------------
// Cred
// ---------------------------------------------------------------------------

#[test]
fn cred_totals_match_mint() {
    let c = forum();
    let g = cred(&c, &[]);
    assert!((g.total_cred() - c.graph.total_node_weight()).abs() < 1e-6);
    for p in g.participants() {
        let sum: f64 = p.cred_per_interval.iter().sum();
        assert!((p.cred - sum).abs() < 1e-9);
        assert_eq!(p.cred_per_interval.len(), 3);
    }
}

#[test]
fn cred_lands_in_the_interval_of_the_work() {
    let c = forum();
    let g = cred(&c, &[]);
    let linus = g.participant(&c.participant("linus").id).unwrap();
    // linus only posted in week 2.
    assert_eq!(linus.cred_per_interval[0], 0.0);
    assert_eq!(linus.cred_per_interval[1], 0.0);
    assert!(linus.cred_per_interval[2] > 0.0);
}

#[test]
fn heavier_mint_earns_more_cred() {
    let c = forum();
    let g = cred(&c, &[]);
    let ada = g.participant(&c.participant("ada").id).unwrap().cred;
    let linus = g.participant(&c.participant("linus").id).unwrap().cred;
    assert!(ada > linus);
}

#[test]
fn attribution_moves_cred_between_participants() {
    let c = forum();
    let (ada, linus) = (c.participant("ada").id, c.participant("linus").id);
    let attributions = vec![PersonalAttribution {
        from: ada,
        recipients: vec![AttributionRecipient {
            to: linus,
            proportions: vec![Proportion { timestamp_ms: 0, value: 0.3 }],
        }],
    }];
    let plain = cred(&c, &[]);
    let shifted = cred(&c, &attributions);
    let get = |g: &CredGraph, id| g.participant(id).unwrap().cred;
    assert!(get(&shifted, &ada) < get(&plain, &ada));
    assert!(get(&shifted, &linus) > get(&plain, &linus));
    // Mint-scaled totals are unchanged by redirection.
    assert!((shifted.total_cred() - plain.total_cred()).abs() < 1e-6);
}

#[test]
fn weekly_intervals_from_timestamps() {
    let c = forum();
    let timestamps = c.graph.nodes().filter_map(|n| n.timestamp_ms);
    let weekly = cred_core::interval::Intervals::weekly(timestamps).unwrap();
    assert_eq!(weekly.as_slice(), c.intervals.as_slice());
}

// ---------------------------------------------------------------------------
// Ledger and grain
// ---------------------------------------------------------------------------

#[test]
fn full_epoch_through_the_ledger() {
    let c = forum();
    let g = cred(&c, &[]);
    let mut ledger = ledger_for(&c, &g);
    let config = GrainConfig::even(Grain::from_whole(100));

    let d = run_distribution(&mut ledger, &config, c.intervals[2].end_time_ms).unwrap();
    assert_eq!(d.allocations.len(), 3);
    for allocation in &d.allocations {
        assert_eq!(allocation.total(), Some(Grain::from_whole(100)));
    }

    let paid: u128 = ledger.accounts().iter().map(|a| a.paid.0).sum();
    assert_eq!(paid, 300 * ONE_GRAIN);
    assert_eq!(ledger.distributions().len(), 1);
    assert_eq!(ledger.allocations().len(), 3);
}

#[test]
fn balanced_catches_up_over_epochs() {
    let c = forum();
    let g = cred(&c, &[]);
    let mut ledger = ledger_for(&c, &g);
    let ada = c.participant("ada").id;

    // ada's work is old, so her last-week share is below her lifetime share.
    let ada_cred = g.participant(&ada).unwrap();
    let last = |p: &cred_markov::ParticipantCred| p.cred_per_interval[2];
    let last_week_share = last(ada_cred) / g.participants().iter().map(last).sum::<f64>();
    let lifetime_share = ada_cred.cred / g.total_cred();
    assert!(last_week_share < lifetime_share);

    let immediate = GrainConfig { immediate_per_week: Grain::from_whole(90), ..Default::default() };
    let first = run_distribution(&mut ledger, &immediate, 0).unwrap();

    let balanced = GrainConfig { balanced_per_week: Grain::from_whole(30), ..Default::default() };
    let second = run_distribution(&mut ledger, &balanced, 1).unwrap();
    assert_eq!(second.allocations[0].policy.kind(), PolicyKind::Balanced);

    let to_ada = |d: &cred_core::allocation::Distribution| {
        d.allocations[0].receipts.iter().find(|r| r.id == ada).unwrap().amount
    };
    assert!(to_ada(&second) > Grain::ZERO);
    assert_eq!(
        ledger.account(&ada).unwrap().paid,
        to_ada(&first).checked_add(to_ada(&second)).unwrap()
    );
}

#[test]
fn inactive_identities_are_excluded() {
    let c = forum();
    let g = cred(&c, &[]);
    let mut ledger = ledger_for(&c, &g);
    let linus = c.participant("linus").id;
    ledger.deactivate(linus).unwrap();

    let d = run_distribution(&mut ledger, &GrainConfig::even(Grain(1_000)), 0).unwrap();
    for allocation in &d.allocations {
        assert_eq!(allocation.receipts.len(), 2);
        assert!(allocation.receipts.iter().all(|r| r.id != linus));
    }
    assert_eq!(ledger.account(&linus).unwrap().paid, Grain::ZERO);
}

#[test]
fn special_allocation_to_deactivated_identity_is_rejected() {
    let c = forum();
    let g = cred(&c, &[]);
    let mut ledger = ledger_for(&c, &g);
    let grace = c.participant("grace").id;
    ledger.deactivate(grace).unwrap();

    let policy = AllocationPolicy::Special {
        budget: Grain::from_whole(5),
        memo: "conference talk".to_string(),
        recipient: grace,
    };
    let err = compute_allocation(&policy, &ledger.identities()).unwrap_err();
    assert_eq!(err, AllocationError::UnknownRecipient(grace));
    assert!(err.to_string().starts_with("no active grain account for identity"));
}

#[test]
fn allocation_recorded_once() {
    let c = forum();
    let g = cred(&c, &[]);
    let mut ledger = ledger_for(&c, &g);
    let policy = AllocationPolicy::Recent { budget: Grain::from_whole(10), discount: 0.5 };
    let allocation = compute_allocation(&policy, &ledger.identities()).unwrap();
    assert_eq!(allocation.policy.kind(), PolicyKind::Recent);

    ledger.distribute_grain(&allocation).unwrap();
    assert!(matches!(
        ledger.distribute_grain(&allocation),
        Err(LedgerError::DuplicateAllocation(_))
    ));
    let paid: u128 = ledger.accounts().iter().map(|a| a.paid.0).sum();
    assert_eq!(paid, 10 * ONE_GRAIN);
}

#[test]
fn empty_ledger_cannot_distribute() {
    let mut ledger = MemoryLedger::new();
    let err = run_distribution(&mut ledger, &GrainConfig::even(Grain(10)), 0).unwrap_err();
    assert!(matches!(err, CredError::Allocation(AllocationError::NoIdentities)));
    assert!(!err.is_fatal());
}

#[test]
fn fixed_scale_cred_feeds_allocation() {
    let c = forum();
    let config = CredConfig { scale: CredScale::Fixed(1_000.0), ..CredConfig::precise() };
    let g = compute_cred(&c.graph, &c.intervals, &c.participants, &[], &config).unwrap();
    let ledger = ledger_for(&c, &g);
    let policy = AllocationPolicy::Balanced { budget: Grain(999_999_999_999) };
    let allocation = compute_allocation(&policy, &ledger.identities()).unwrap();
    assert_eq!(allocation.total(), Some(Grain(999_999_999_999)));
}

#[test]
fn distribution_serializes_with_string_amounts() {
    let c = forum();
    let g = cred(&c, &[]);
    let mut ledger = ledger_for(&c, &g);
    let d = run_distribution(&mut ledger, &GrainConfig::even(Grain::ONE), 7).unwrap();
    let json = serde_json::to_value(&d).unwrap();
    assert_eq!(json["credTimestampMs"], 7);
    assert!(json["allocations"][0]["receipts"][0]["amount"].is_string());
    assert_eq!(json["allocations"][0]["policy"]["policyType"], "IMMEDIATE");
}
