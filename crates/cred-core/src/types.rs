//! Identity, participant and attribution types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::NodeAddress;
use crate::grain::Grain;

/// An opaque 16-byte identity identifier, displayed as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityId(pub [u8; 16]);

impl IdentityId {
    /// A fresh random identifier.
    pub fn random() -> Self {
        Self(rand::random())
    }

    /// Deterministic identifier derived from a name (first 16 bytes of its BLAKE3 hash).
    pub fn from_name(name: &str) -> Self {
        let hash = blake3::hash(name.as_bytes());
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&hash.as_bytes()[..16]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityId({self})")
    }
}

impl TryFrom<String> for IdentityId {
    type Error = hex::FromHexError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl From<IdentityId> for String {
    fn from(id: IdentityId) -> Self {
        id.to_string()
    }
}

/// An identity eligible to receive cred, bound to its node in the graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: IdentityId,
    pub address: NodeAddress,
    pub description: String,
}

/// A proportion of cred redirected starting at `timestamp_ms`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proportion {
    pub timestamp_ms: i64,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributionRecipient {
    pub to: IdentityId,
    pub proportions: Vec<Proportion>,
}

impl AttributionRecipient {
    /// The proportion in effect at `timestamp_ms`: the most recent one at or
    /// before it, or 0 when none has started yet.
    pub fn proportion_at(&self, timestamp_ms: i64) -> f64 {
        self.proportions
            .iter()
            .filter(|p| p.timestamp_ms <= timestamp_ms)
            .max_by_key(|p| p.timestamp_ms)
            .map_or(0.0, |p| p.value)
    }
}

/// A participant's configured redirection of part of their own cred.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersonalAttribution {
    pub from: IdentityId,
    pub recipients: Vec<AttributionRecipient>,
}

/// One identity as seen by the allocation engine.
///
/// `cred` holds one value per interval; all identities passed to a single
/// allocation call share the same interval sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AllocationIdentity {
    pub id: IdentityId,
    pub paid: Grain,
    pub cred: Vec<f64>,
}

impl AllocationIdentity {
    pub fn new(id: IdentityId, paid: Grain, cred: Vec<f64>) -> Self {
        Self { id, paid, cred }
    }

    pub fn lifetime_cred(&self) -> f64 {
        self.cred.iter().sum()
    }
}
