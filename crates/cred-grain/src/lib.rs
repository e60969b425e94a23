//! # cred-grain
//!
//! Budget-conserving grain allocation.
//!
//! All grain arithmetic is integer-only (`u128` attograin) for determinism
//! and exact conservation.
//!
//! - **Splitting**: real-valued weights are quantized to integer shares and
//!   the budget is apportioned by largest remainder, ties broken by input
//!   order.
//! - **Policies**: IMMEDIATE (recent window), RECENT (exponential discount),
//!   BALANCED (lifetime fair share net of past payments) and SPECIAL (one
//!   recipient).
//! - **Distributions**: one allocation per configured policy, validated
//!   together and appended to a [`Ledger`](cred_core::traits::Ledger) in a
//!   single call.

pub mod distribution;
pub mod engine;
pub mod ledger;
pub mod split;

pub use distribution::{compute_distribution, run_distribution, GrainConfig};
pub use engine::compute_allocation;
pub use ledger::MemoryLedger;
pub use split::split_budget;
