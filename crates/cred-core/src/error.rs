//! Error types for cred computation and grain allocation.
//!
//! Variants of [`InvariantError`] signal a defect in the algorithms
//! themselves. Every enum exposes `is_fatal()`; a fatal error must abort the
//! run and never be retried or ignored.
use thiserror::Error;

use crate::types::IdentityId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvariantError {
    #[error("transition row of {node} sums to {sum}")] RowNotStochastic { node: String, sum: f64 },
    #[error("stationary distribution sums to {sum}")] DistributionNotNormalized { sum: f64 },
    #[error("negative probability at {node}")] NegativeProbability { node: String },
    #[error("budget not conserved: expected {expected}, receipts sum to {actual}")] BudgetNotConserved { expected: u128, actual: u128 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("address part contains NUL: {0:?}")] NulInPart(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("alpha must be in (0, 1], got {0}")] InvalidAlpha(f64),
    #[error("beta must be in [0, 1), got {0}")] InvalidBeta(f64),
    #[error("gamma must be finite and non-negative, got {0}")] InvalidGamma(f64),
    #[error("alpha + beta exceeds 1: {alpha} + {beta}")] ParametersExceedOne { alpha: f64, beta: f64 },
    #[error("no intervals")] NoIntervals,
    #[error("interval {index} is empty or inverted: [{start}, {end})")] EmptyInterval { index: usize, start: i64, end: i64 },
    #[error("interval {index} overlaps or precedes its predecessor")] UnorderedIntervals { index: usize },
    #[error("weeks {first} to {last} do not fit in weekly intervals")] WeeklyRangeTooLarge { first: i64, last: i64 },
    #[error("duplicate node: {0}")] DuplicateNode(String),
    #[error("duplicate edge: {0}")] DuplicateEdge(String),
    #[error("edge {edge} references missing node {node}")] DanglingEdge { edge: String, node: String },
    #[error("invalid weight on {0}")] InvalidWeight(String),
    #[error("weights on {0} overflow f64")] WeightOverflow(String),
    #[error("no participants")] NoParticipants,
    #[error("duplicate participant: {0}")] DuplicateParticipant(String),
    #[error("participant {id} has no graph node at {address}")] MissingParticipantNode { id: IdentityId, address: String },
    #[error("timestamp {timestamp_ms} on {edge} is outside all intervals")] TimestampOutOfRange { edge: String, timestamp_ms: i64 },
    #[error("attribution references unknown participant {0}")] UnknownAttributionParticipant(IdentityId),
    #[error("participant {0} attributes cred to itself")] SelfAttribution(IdentityId),
    #[error("invalid attribution proportion {value} from {from}")] InvalidProportion { from: IdentityId, value: f64 },
    #[error("attribution proportions from {from} sum to {total} at {timestamp_ms}")] ProportionsExceedOne { from: IdentityId, timestamp_ms: i64, total: f64 },
    #[error("invalid cred scale: {0}")] InvalidScale(f64),
    #[error("distribution has {got} entries, graph has {expected} nodes")] DistributionMismatch { expected: usize, got: usize },
    #[error(transparent)] Address(#[from] AddressError),
    #[error(transparent)] Invariant(#[from] InvariantError),
}

impl ConfigError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Invariant(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("did not converge after {iterations} iterations (delta {delta})")] NotConverged { iterations: usize, delta: f64 },
    #[error("invalid solver options: {0}")] InvalidOptions(String),
    #[error(transparent)] Invariant(#[from] InvariantError),
}

impl SolverError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Invariant(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AllocationError {
    #[error("must have at least one identity")] NoIdentities,
    #[error("inconsistent cred length")] InconsistentCredLength { index: usize, expected: usize, got: usize },
    #[error("invalid cred")] InvalidCred { index: usize },
    #[error("cred is zero")] CredIsZero,
    #[error("no active grain account for identity: {0}")] UnknownRecipient(IdentityId),
    #[error("invalid policy: {0}")] InvalidPolicy(String),
    #[error("grain arithmetic overflow")] ArithmeticOverflow,
    #[error(transparent)] Invariant(#[from] InvariantError),
}

impl AllocationError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Invariant(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("unknown identity: {0}")] UnknownIdentity(IdentityId),
    #[error("identity is not active: {0}")] InactiveIdentity(IdentityId),
    #[error("identity name already taken: {0}")] DuplicateName(String),
    #[error("allocation already recorded: {0}")] DuplicateAllocation(String),
    #[error("paid balance overflow for {0}")] BalanceOverflow(IdentityId),
    #[error("cred history for {id} has {got} intervals, expected {expected}")] CredLengthMismatch { id: IdentityId, expected: usize, got: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrainParseError {
    #[error("empty grain string")] Empty,
    #[error("invalid character in grain string: {0:?}")] InvalidCharacter(char),
    #[error("more than {max} decimal places")] TooPrecise { max: u32 },
    #[error("grain amount overflows")] Overflow,
}

#[derive(Error, Debug)]
pub enum CredError {
    #[error(transparent)] Config(#[from] ConfigError),
    #[error(transparent)] Solver(#[from] SolverError),
    #[error(transparent)] Allocation(#[from] AllocationError),
    #[error(transparent)] Ledger(#[from] LedgerError),
}

impl CredError {
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Config(e) => e.is_fatal(),
            Self::Solver(e) => e.is_fatal(),
            Self::Allocation(e) => e.is_fatal(),
            Self::Ledger(_) => false,
        }
    }
}
