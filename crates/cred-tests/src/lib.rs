//! Integration test suite for the cred and grain pipeline.
//!
//! Tests live under `tests/`: `pipeline.rs` runs graph → cred → ledger →
//! grain end to end, `adversarial.rs` checks the conservation and
//! stochasticity invariants under randomized inputs.

pub mod helpers;
