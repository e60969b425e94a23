//! Allocation policies and their results.
//!
//! An [`Allocation`] is created once by the allocation engine and never
//! mutated; its receipts always sum to exactly the policy budget.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grain::Grain;
use crate::types::IdentityId;

/// Fresh 16-byte identifier for an allocation or distribution.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AllocationId(pub [u8; 16]);

impl AllocationId {
    pub fn random() -> Self {
        Self(rand::random())
    }
}

impl fmt::Display for AllocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for AllocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AllocationId({self})")
    }
}

impl TryFrom<String> for AllocationId {
    type Error = hex::FromHexError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl From<AllocationId> for String {
    fn from(id: AllocationId) -> Self {
        id.to_string()
    }
}

/// How a budget is split among identities.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "policyType",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum AllocationPolicy {
    /// Pay by cred earned in the last `num_intervals_lookback` intervals.
    Immediate { budget: Grain, num_intervals_lookback: usize },
    /// Pay by cred with exponential decay toward the past.
    Recent { budget: Grain, discount: f64 },
    /// Pay toward each identity's lifetime fair share, net of past payments.
    Balanced { budget: Grain },
    /// Pay the whole budget to one recipient.
    Special { budget: Grain, memo: String, recipient: IdentityId },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    Immediate,
    Recent,
    Balanced,
    Special,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Immediate => "IMMEDIATE",
            Self::Recent => "RECENT",
            Self::Balanced => "BALANCED",
            Self::Special => "SPECIAL",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AllocationPolicy {
    pub fn budget(&self) -> Grain {
        match self {
            Self::Immediate { budget, .. }
            | Self::Recent { budget, .. }
            | Self::Balanced { budget }
            | Self::Special { budget, .. } => *budget,
        }
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::Immediate { .. } => PolicyKind::Immediate,
            Self::Recent { .. } => PolicyKind::Recent,
            Self::Balanced { .. } => PolicyKind::Balanced,
            Self::Special { .. } => PolicyKind::Special,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrainReceipt {
    pub id: IdentityId,
    pub amount: Grain,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: AllocationId,
    pub policy: AllocationPolicy,
    /// One receipt per input identity, in input order.
    pub receipts: Vec<GrainReceipt>,
}

impl Allocation {
    /// Sum of receipt amounts, `None` on overflow.
    pub fn total(&self) -> Option<Grain> {
        Grain::checked_sum(self.receipts.iter().map(|r| r.amount))
    }
}

/// All allocations computed together for one epoch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distribution {
    pub id: AllocationId,
    /// End of the cred interval the distribution was computed from.
    pub cred_timestamp_ms: i64,
    pub allocations: Vec<Allocation>,
}
