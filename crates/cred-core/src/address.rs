//! Hierarchical graph addresses.
//!
//! An address is a sequence of string parts, e.g. `["github", "ISSUE", "42"]`.
//! Parts are reference-counted, so cloning an address never copies string
//! data, and an [`AddressInterner`] lets many addresses share one allocation
//! per distinct part.
//!
//! Addresses order lexicographically by part. Every address that extends a
//! prefix `P` therefore sorts contiguously right after `P`, which turns any
//! `BTreeMap` keyed by address into a prefix index: see
//! [`NodeAddress::prefix_range`].

use std::collections::HashSet;
use std::fmt;
use std::ops::Bound;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::constants::{CORE_ADDRESS_PREFIX, EPOCH_ADDRESS_PART, SEED_ADDRESS_PART};
use crate::error::AddressError;
use crate::types::IdentityId;

/// A hierarchical address for a node (or edge) in a contribution graph.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct NodeAddress(Arc<[Arc<str>]>);

/// Edges share the address representation of nodes.
pub type EdgeAddress = NodeAddress;

impl NodeAddress {
    /// Build an address from parts. Parts may not contain NUL.
    pub fn new<I, S>(parts: I) -> Result<Self, AddressError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parts = parts
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                if p.contains('\0') {
                    Err(AddressError::NulInPart(p.to_string()))
                } else {
                    Ok(Arc::<str>::from(p))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(parts.into()))
    }

    /// The empty address. Every address has it as a prefix.
    pub fn empty() -> Self {
        Self(Arc::from(Vec::new()))
    }

    /// Synthetic seed node for a participant: `cred/core/SEED/<id>`.
    pub fn seed(participant: &IdentityId) -> Self {
        Self::synthetic([SEED_ADDRESS_PART.to_string(), participant.to_string()])
    }

    /// Synthetic epoch node: `cred/core/EPOCH/<id>/<interval start ms>`.
    pub fn epoch(participant: &IdentityId, interval_start_ms: i64) -> Self {
        Self::synthetic([
            EPOCH_ADDRESS_PART.to_string(),
            participant.to_string(),
            interval_start_ms.to_string(),
        ])
    }

    // Hex ids, decimal integers and the fixed prefix never contain NUL.
    fn synthetic<const N: usize>(tail: [String; N]) -> Self {
        let parts: Vec<Arc<str>> = CORE_ADDRESS_PREFIX
            .iter()
            .map(|p| Arc::<str>::from(*p))
            .chain(tail.into_iter().map(Arc::<str>::from))
            .collect();
        Self(parts.into())
    }

    pub fn parts(&self) -> impl ExactSizeIterator<Item = &str> {
        self.0.iter().map(|p| &**p)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `prefix` is a part-wise prefix of this address.
    pub fn has_prefix(&self, prefix: &NodeAddress) -> bool {
        prefix.0.len() <= self.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }

    /// Whether this address lives under the synthetic `cred/core` namespace.
    pub fn is_synthetic(&self) -> bool {
        self.0.len() >= CORE_ADDRESS_PREFIX.len()
            && self.0.iter().zip(CORE_ADDRESS_PREFIX).all(|(a, b)| &**a == b)
    }

    /// A new address with `part` appended.
    pub fn append(&self, part: &str) -> Result<Self, AddressError> {
        if part.contains('\0') {
            return Err(AddressError::NulInPart(part.to_string()));
        }
        let mut parts: Vec<Arc<str>> = self.0.to_vec();
        parts.push(Arc::from(part));
        Ok(Self(parts.into()))
    }

    /// Range bounds selecting every key of an ordered map that has this
    /// address as a prefix, starting at the prefix itself. Callers still
    /// stop at the first key failing [`has_prefix`](Self::has_prefix).
    pub fn prefix_range(&self) -> (Bound<&NodeAddress>, Bound<&NodeAddress>) {
        (Bound::Included(self), Bound::Unbounded)
    }
}

impl TryFrom<Vec<String>> for NodeAddress {
    type Error = AddressError;

    fn try_from(parts: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(parts)
    }
}

impl From<NodeAddress> for Vec<String> {
    fn from(address: NodeAddress) -> Self {
        address.parts().map(str::to_string).collect()
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            f.write_str(part)?;
        }
        Ok(())
    }
}

impl fmt::Debug for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

/// Deduplicates address parts so that equal parts share one allocation.
///
/// Owned by whoever builds a graph; there is no process-wide table.
#[derive(Debug, Default)]
pub struct AddressInterner {
    parts: HashSet<Arc<str>>,
}

impl AddressInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an address whose parts are shared with every earlier address
    /// built through this interner.
    pub fn address<I, S>(&mut self, parts: I) -> Result<NodeAddress, AddressError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parts = parts
            .into_iter()
            .map(|p| self.intern(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NodeAddress(parts.into()))
    }

    fn intern(&mut self, part: &str) -> Result<Arc<str>, AddressError> {
        if part.contains('\0') {
            return Err(AddressError::NulInPart(part.to_string()));
        }
        if let Some(existing) = self.parts.get(part) {
            return Ok(Arc::clone(existing));
        }
        let part: Arc<str> = Arc::from(part);
        self.parts.insert(Arc::clone(&part));
        Ok(part)
    }

    /// Number of distinct parts interned so far.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}
